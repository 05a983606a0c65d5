//! Folio digit normalization.

/// Map glyphs OCR engines commonly confuse with digits.
fn confusable_digit(ch: char) -> char {
    match ch {
        'O' | 'o' | 'D' | 'Q' => '0',
        'I' | 'l' | '|' | '!' => '1',
        'Z' => '2',
        'E' => '3',
        'A' => '4',
        'S' | 's' => '5',
        'G' => '6',
        'T' => '7',
        'B' => '8',
        'g' | 'q' => '9',
        other => other,
    }
}

/// Correct confusable glyphs, then keep only ASCII digits.
///
/// Total and idempotent: the output only ever contains `0-9`.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(confusable_digit)
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// Keep ASCII digits only, without glyph correction.
pub fn strip_non_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_table() {
        assert_eq!(normalize_digits("OoDQ"), "0000");
        assert_eq!(normalize_digits("Il|!"), "1111");
        assert_eq!(normalize_digits("ZEASsGTBgq"), "2345567899");
    }

    #[test]
    fn test_strips_everything_else() {
        assert_eq!(normalize_digits("#: 1O2"), "102");
        assert_eq!(normalize_digits("  4 5\n"), "45");
        assert_eq!(normalize_digits(""), "");
        assert_eq!(normalize_digits("xyz"), "");
    }

    #[test]
    fn test_label_letters_are_read_as_digits() {
        // A printed label next to the number leaks its confusable glyphs.
        assert_eq!(normalize_digits("Folio: 1O2"), "010102");
        assert_eq!(normalize_digits("fol. 12"), "0112");
    }

    #[test]
    fn test_non_ascii_digits_dropped() {
        // Arabic-Indic and full-width digits are not folio digits.
        assert_eq!(normalize_digits("٣12"), "12");
        assert_eq!(normalize_digits("１2"), "2");
    }

    #[test]
    fn test_idempotent() {
        for input in ["l2O", "B-8 g", "page 17", "!!!", "", "S0S"] {
            let once = normalize_digits(input);
            assert_eq!(normalize_digits(&once), once);
            assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_strip_non_digits_keeps_letters_out() {
        assert_eq!(strip_non_digits("O12 "), "12");
    }
}
