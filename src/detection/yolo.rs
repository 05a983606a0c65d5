//! Decoding of YOLOv8-style detection heads.
//!
//! Output layout is `[1, 4 + classes, anchors]`: for anchor `a` and feature
//! `f` the value lives at `data[f * anchors + a]`. Features 0..4 are the box
//! center and size in model-input pixels, the rest are class scores.

use std::cmp::Ordering;

/// A raw candidate in page pixels, before ids and labels are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
    pub class_id: usize,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f32 {
        let (ax1, ay1) = (self.cx - self.width / 2.0, self.cy - self.height / 2.0);
        let (ax2, ay2) = (self.cx + self.width / 2.0, self.cy + self.height / 2.0);
        let (bx1, by1) = (other.cx - other.width / 2.0, other.cy - other.height / 2.0);
        let (bx2, by2) = (other.cx + other.width / 2.0, other.cy + other.height / 2.0);

        let inter = (ax2.min(bx2) - ax1.max(bx1)).max(0.0) * (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let union = self.width * self.height + other.width * other.height - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Geometry needed to map model coordinates back onto the page.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub input_size: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub min_score: f32,
}

/// Decode a `[1, features, anchors]` head into page-space candidates.
pub fn decode(dims: &[usize], data: &[f32], params: &DecodeParams) -> Result<Vec<Candidate>, String> {
    if dims.len() != 3 {
        return Err(format!("Expected 3D output tensor, got {}D", dims.len()));
    }
    let num_features = dims[1];
    let num_anchors = dims[2];
    if num_features <= 4 {
        return Err(format!("Output has {} features, need at least 5", num_features));
    }
    if data.len() < num_features * num_anchors {
        return Err(format!(
            "Output holds {} values, shape needs {}",
            data.len(),
            num_features * num_anchors
        ));
    }

    let scale_x = params.image_width as f32 / params.input_size as f32;
    let scale_y = params.image_height as f32 / params.input_size as f32;
    let mut candidates = Vec::new();

    for anchor in 0..num_anchors {
        let feature = |f: usize| data[f * num_anchors + anchor];

        let (class_id, score) = (4..num_features)
            .map(|f| (f - 4, feature(f)))
            .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < params.min_score {
            continue;
        }

        candidates.push(Candidate {
            cx: feature(0) * scale_x,
            cy: feature(1) * scale_y,
            width: feature(2) * scale_x,
            height: feature(3) * scale_y,
            score,
            class_id,
        });
    }

    Ok(candidates)
}

/// Per-class non-maximum suppression, highest score first, capped at `max_keep`.
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32, max_keep: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len().min(max_keep));
    for candidate in candidates {
        if keep.len() >= max_keep {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}
