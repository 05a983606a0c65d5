//! Padded region crops.

use image::{imageops, RgbImage};

use crate::detection::BoundingBox;

/// Crop `bbox` out of `image`, padded by `pad_ratio` of the box size on every
/// side and clamped to the image. A degenerate result is a 0x0 image.
pub fn crop_with_pad(image: &RgbImage, bbox: &BoundingBox, pad_ratio: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return RgbImage::new(0, 0);
    }

    let px = bbox.width * pad_ratio;
    let py = bbox.height * pad_ratio;
    let max_x = f64::from(w - 1);
    let max_y = f64::from(h - 1);

    let x1 = clamp_round(bbox.x - bbox.width / 2.0 - px, max_x);
    let y1 = clamp_round(bbox.y - bbox.height / 2.0 - py, max_y);
    let x2 = clamp_round(bbox.x + bbox.width / 2.0 + px, max_x);
    let y2 = clamp_round(bbox.y + bbox.height / 2.0 + py, max_y);

    if x2 <= x1 || y2 <= y1 {
        return RgbImage::new(0, 0);
    }
    imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image()
}

fn clamp_round(value: f64, max: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, max).round_ties_even() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> RgbImage {
        RgbImage::from_fn(200, 100, |x, y| image::Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn test_padded_crop() {
        let bbox = BoundingBox::new(100.0, 50.0, 20.0, 10.0);
        let crop = crop_with_pad(&page(), &bbox, 0.5);
        // 90-10 .. 110+10, 45-5 .. 55+5
        assert_eq!(crop.dimensions(), (40, 20));
        assert_eq!(crop.get_pixel(0, 0), &image::Rgb([80, 40, 0]));
    }

    #[test]
    fn test_clamps_to_image() {
        let bbox = BoundingBox::new(195.0, 5.0, 20.0, 20.0);
        let crop = crop_with_pad(&page(), &bbox, 0.15);
        // x: 182 .. clamped 199, y: clamped 0 .. 18
        assert_eq!(crop.dimensions(), (17, 18));
    }

    #[test]
    fn test_outside_image_is_empty() {
        let bbox = BoundingBox::new(500.0, 500.0, 20.0, 20.0);
        let crop = crop_with_pad(&page(), &bbox, 0.15);
        assert_eq!(crop.dimensions(), (0, 0));

        let negative = BoundingBox::new(-50.0, 50.0, 10.0, 10.0);
        assert_eq!(crop_with_pad(&page(), &negative, 0.15).dimensions(), (0, 0));
    }

    #[test]
    fn test_zero_size_box_is_empty() {
        let bbox = BoundingBox::new(100.0, 50.0, 0.0, 0.0);
        assert_eq!(crop_with_pad(&page(), &bbox, 0.15).dimensions(), (0, 0));
    }

    #[test]
    fn test_empty_page() {
        let bbox = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        assert_eq!(crop_with_pad(&RgbImage::new(0, 0), &bbox, 0.15).dimensions(), (0, 0));
    }
}
