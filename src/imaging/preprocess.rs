//! Crop preprocessing ahead of digit OCR.
//!
//! Both modes upscale, equalize local contrast (CLAHE) and binarize with an
//! adaptive threshold. `Light` smooths with a small Gaussian and thresholds
//! against a Gaussian-weighted neighbourhood; `Strong` uses an edge-preserving
//! bilateral filter and a wider mean neighbourhood.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::{bilateral_filter, box_filter, gaussian_blur_f32};

const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;

/// Sigma of a 3x3 Gaussian kernel when none is given explicitly.
const LIGHT_BLUR_SIGMA: f32 = 0.8;
/// Sigma matching an 11x11 Gaussian-weighted threshold window.
const LIGHT_THRESHOLD_SIGMA: f32 = 2.0;
const LIGHT_THRESHOLD_C: i16 = 2;

/// 5x5 neighbourhood.
const BILATERAL_WINDOW: u32 = 5;
const BILATERAL_SIGMA_COLOR: f32 = 50.0;
const BILATERAL_SIGMA_SPACE: f32 = 50.0;
/// Radius of the 15x15 mean threshold window.
const STRONG_THRESHOLD_RADIUS: u32 = 7;
const STRONG_THRESHOLD_C: i16 = 3;

/// Preprocessing intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessMode {
    Light,
    Strong,
}

impl PreprocessMode {
    /// `light` and `none` select light; anything else is strong.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "light" | "none" => PreprocessMode::Light,
            _ => PreprocessMode::Strong,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreprocessMode::Light => "light",
            PreprocessMode::Strong => "strong",
        }
    }

    pub fn scale(&self) -> u32 {
        match self {
            PreprocessMode::Light => 2,
            PreprocessMode::Strong => 3,
        }
    }
}

/// Prepare a crop for digit OCR. Empty crops pass through unchanged.
pub fn preprocess(crop: &RgbImage, mode: PreprocessMode) -> GrayImage {
    if crop.width() == 0 || crop.height() == 0 {
        return GrayImage::new(0, 0);
    }

    let gray = imageops::grayscale(crop);
    let scale = mode.scale();
    let upscaled = imageops::resize(
        &gray,
        gray.width() * scale,
        gray.height() * scale,
        FilterType::CatmullRom,
    );
    let equalized = clahe(&upscaled, CLAHE_CLIP_LIMIT, CLAHE_TILES);

    match mode {
        PreprocessMode::Light => {
            let smoothed = gaussian_blur_f32(&equalized, LIGHT_BLUR_SIGMA);
            let local = gaussian_blur_f32(&smoothed, LIGHT_THRESHOLD_SIGMA);
            threshold_against(&smoothed, &local, LIGHT_THRESHOLD_C)
        }
        PreprocessMode::Strong => {
            let smoothed = bilateral_filter(
                &equalized,
                BILATERAL_WINDOW,
                BILATERAL_SIGMA_COLOR,
                BILATERAL_SIGMA_SPACE,
            );
            let local = box_filter(&smoothed, STRONG_THRESHOLD_RADIUS, STRONG_THRESHOLD_RADIUS);
            threshold_against(&smoothed, &local, STRONG_THRESHOLD_C)
        }
    }
}

/// Binarize: white where `src > local - c`, black elsewhere.
fn threshold_against(src: &GrayImage, local: &GrayImage, c: i16) -> GrayImage {
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        let value = i16::from(src.get_pixel(x, y)[0]);
        let cutoff = i16::from(local.get_pixel(x, y)[0]) - c;
        Luma([if value > cutoff { 255 } else { 0 }])
    })
}

/// Contrast-limited adaptive histogram equalization over a `tiles x tiles`
/// grid, with bilinear blending between neighbouring tile mappings.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let tiles_x = tiles.min(w).max(1);
    let tiles_y = tiles.min(h).max(1);
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1.saturating_sub(x0)) * (y1.saturating_sub(y0));
            luts[(ty * tiles_x + tx) as usize] = clipped_equalization(&mut hist, area, clip_limit);
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(w, h, |x, y| {
        let value = image.get_pixel(x, y)[0] as usize;

        let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = gx.floor().max(0.0) as u32;
        let ty0 = gy.floor().max(0.0) as u32;
        let tx0 = tx0.min(tiles_x - 1);
        let ty0 = ty0.min(tiles_y - 1);
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let fx = (gx - tx0 as f32).clamp(0.0, 1.0);
        let fy = (gy - ty0 as f32).clamp(0.0, 1.0);

        let top = f32::from(lut_at(tx0, ty0)[value]) * (1.0 - fx) + f32::from(lut_at(tx1, ty0)[value]) * fx;
        let bottom = f32::from(lut_at(tx0, ty1)[value]) * (1.0 - fx) + f32::from(lut_at(tx1, ty1)[value]) * fx;
        Luma([(top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8])
    })
}

/// Clip a tile histogram, redistribute the excess, and return the CDF mapping.
fn clipped_equalization(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step).take(residual as usize) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (bin, v) in hist.iter().zip(lut.iter_mut()) {
        cumulative += bin;
        *v = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit_like_crop() -> RgbImage {
        RgbImage::from_fn(30, 12, |x, _| {
            if (10..14).contains(&x) {
                image::Rgb([20, 20, 20])
            } else {
                image::Rgb([230, 225, 220])
            }
        })
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(PreprocessMode::from_name("light"), PreprocessMode::Light);
        assert_eq!(PreprocessMode::from_name("none"), PreprocessMode::Light);
        assert_eq!(PreprocessMode::from_name("LIGHT"), PreprocessMode::Light);
        assert_eq!(PreprocessMode::from_name("strong"), PreprocessMode::Strong);
        assert_eq!(PreprocessMode::from_name("anything"), PreprocessMode::Strong);
    }

    #[test]
    fn test_empty_crop_passes_through() {
        for mode in [PreprocessMode::Light, PreprocessMode::Strong] {
            let out = preprocess(&RgbImage::new(0, 0), mode);
            assert_eq!(out.dimensions(), (0, 0));
        }
    }

    #[test]
    fn test_upscale_factors() {
        let crop = digit_like_crop();
        assert_eq!(preprocess(&crop, PreprocessMode::Light).dimensions(), (60, 24));
        assert_eq!(preprocess(&crop, PreprocessMode::Strong).dimensions(), (90, 36));
    }

    #[test]
    fn test_output_is_binary() {
        let crop = digit_like_crop();
        for mode in [PreprocessMode::Light, PreprocessMode::Strong] {
            let out = preprocess(&crop, mode);
            assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        }
    }

    #[test]
    fn test_dark_stroke_turns_black() {
        let out = preprocess(&digit_like_crop(), PreprocessMode::Strong);
        // Middle of the stroke, scaled by 3.
        assert_eq!(out.get_pixel(36, 18)[0], 0);
    }

    #[test]
    fn test_clahe_keeps_flat_image_flat() {
        let flat = GrayImage::from_pixel(64, 64, Luma([128]));
        let out = clahe(&flat, 2.0, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_strong_smoothing_preserves_edges() {
        let edge = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 255 }]));
        let out = bilateral_filter(&edge, BILATERAL_WINDOW, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE);
        assert_eq!(out.get_pixel(4, 5)[0], 0);
        assert_eq!(out.get_pixel(5, 5)[0], 255);
    }
}
