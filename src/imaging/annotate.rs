//! Draw detection boxes on page images for visual review.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::Detection;

const LINE_THICKNESS: u32 = 3;

const MATCH_COLOR: Rgb<u8> = Rgb([0, 170, 0]);
const MISMATCH_COLOR: Rgb<u8> = Rgb([255, 140, 0]);
const LOW_CONFIDENCE_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const UNREAD_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Box color for a detection's review status.
pub fn status_color(detection: &Detection) -> Rgb<u8> {
    if detection.low_confidence {
        return LOW_CONFIDENCE_COLOR;
    }
    match detection.foliation {
        Some(check) if check.is_match => MATCH_COLOR,
        Some(_) => MISMATCH_COLOR,
        None => UNREAD_COLOR,
    }
}

/// Copy of `page` with one rectangle per detection, clamped to the image.
pub fn annotate_page(page: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut img = page.clone();
    let (page_w, page_h) = img.dimensions();

    for detection in detections {
        let (x1, y1, x2, y2) = detection.bbox.to_xyxy();
        let x = x1.max(0.0).round() as u32;
        let y = y1.max(0.0).round() as u32;
        if x >= page_w || y >= page_h {
            continue;
        }
        let right = (x2.round().max(0.0) as u32).min(page_w);
        let bottom = (y2.round().max(0.0) as u32).min(page_h);
        let w = right.saturating_sub(x);
        let h = bottom.saturating_sub(y);
        if w == 0 || h == 0 {
            continue;
        }

        let color = status_color(detection);
        for t in 0..LINE_THICKNESS {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w > 0 && inner_h > 0 {
                let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(inner_w, inner_h);
                draw_hollow_rect_mut(&mut img, rect, color);
            }
        }
    }
    img
}

/// File name for an annotated page: `<stem>_p0001.png`.
pub fn annotation_file_name(stem: &str, page_number: u32) -> String {
    format!("{}_p{:04}.png", stem, page_number)
}

/// Write an annotated page into `dir`, returning the written path.
pub fn save_annotated(
    dir: &Path,
    stem: &str,
    page_number: u32,
    page: &RgbImage,
    detections: &[Detection],
) -> Result<PathBuf, image::ImageError> {
    let path = dir.join(annotation_file_name(stem, page_number));
    annotate_page(page, detections).save(&path)?;
    Ok(path)
}
