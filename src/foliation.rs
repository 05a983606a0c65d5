//! Foliation scoring: how close a recognized folio is to the page position.

use serde::{Deserialize, Serialize};

/// Verdict comparing recognized digits with the expected page number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoliationCheck {
    #[serde(rename = "match")]
    pub is_match: bool,
    /// Absolute distance from the expected page; `None` when nothing was read.
    pub diff: Option<u64>,
    /// Score in `[0, 1]`, rounded to two decimals.
    pub confidence: f64,
    pub match_percentage: u8,
}

impl FoliationCheck {
    /// The verdict for empty or unusable digits.
    pub fn unread() -> Self {
        Self {
            is_match: false,
            diff: None,
            confidence: 0.0,
            match_percentage: 0,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Score `digits` against the 1-based page number `expected`.
pub fn compare_foliation(digits: &str, expected: u32) -> FoliationCheck {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return FoliationCheck::unread();
    }
    // Folios longer than u64 can hold are not page numbers.
    let detected: u64 = match digits.parse() {
        Ok(n) => n,
        Err(_) => return FoliationCheck::unread(),
    };

    let diff = detected.abs_diff(u64::from(expected));
    let (confidence, match_percentage) = match diff {
        0 => (1.0, 100),
        1 => (0.8, 80),
        2 | 3 => (0.5, 50),
        _ => {
            let confidence = (1.0 - diff as f64 / 10.0).max(0.0);
            (confidence, (confidence * 100.0) as u8)
        }
    };

    FoliationCheck {
        is_match: diff == 0,
        diff: Some(diff),
        confidence: round_to(confidence, 2),
        match_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let check = compare_foliation("7", 7);
        assert!(check.is_match);
        assert_eq!(check.diff, Some(0));
        assert_eq!(check.confidence, 1.0);
        assert_eq!(check.match_percentage, 100);
    }

    #[test]
    fn test_score_bands() {
        let cases = [
            ("12", 11, 0.8, 80),
            ("10", 12, 0.5, 50),
            ("9", 12, 0.5, 50),
            ("4", 9, 0.5, 50),
            ("1", 7, 0.4, 40),
            ("20", 10, 0.0, 0),
            ("500", 3, 0.0, 0),
        ];
        for (digits, page, confidence, percentage) in cases {
            let check = compare_foliation(digits, page);
            assert!(!check.is_match, "{} vs {}", digits, page);
            assert_eq!(check.confidence, confidence, "{} vs {}", digits, page);
            assert_eq!(check.match_percentage, percentage, "{} vs {}", digits, page);
        }
    }

    #[test]
    fn test_leading_zeros_parse() {
        let check = compare_foliation("007", 7);
        assert!(check.is_match);
    }

    #[test]
    fn test_unreadable_digits() {
        for digits in ["", "12a", " 3", "99999999999999999999999"] {
            assert_eq!(compare_foliation(digits, 1), FoliationCheck::unread());
        }
    }

    #[test]
    fn test_neighbours_score_the_same() {
        for n in 2..200u32 {
            let below = compare_foliation(&(n - 1).to_string(), n);
            let above = compare_foliation(&(n + 1).to_string(), n);
            assert_eq!(below, above);
            assert_eq!(below.confidence, 0.8);
        }
    }

    #[test]
    fn test_self_comparison_always_matches() {
        for n in 1..500u32 {
            let check = compare_foliation(&n.to_string(), n);
            assert!(check.is_match);
            assert_eq!(check.confidence, 1.0);
        }
    }

    #[test]
    fn test_serializes_match_key() {
        let json = serde_json::to_value(compare_foliation("3", 3)).unwrap();
        assert_eq!(json["match"], true);
        assert_eq!(json["diff"], 0);
        assert_eq!(json["match_percentage"], 100);
    }
}
