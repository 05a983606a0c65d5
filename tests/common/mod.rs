//! Scripted engines shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{GrayImage, Rgb, RgbImage};

use foliacheck::detection::{BoundingBox, Detection, DetectionEngine, DetectionError};
use foliacheck::ocr::{
    DigitEngineKind, DigitOcrEngine, GeneralOcrEngine, OcrCascade, OcrError, OcrWord,
};
use foliacheck::raster::{PageImage, RasterError, Rasterizer};
use foliacheck::FoliationPipeline;

/// Folio box used by [`FakeDetector`]: x 160..240, y 30..70.
pub const FOLIO_BOX: (f64, f64, f64, f64) = (200.0, 50.0, 80.0, 40.0);

/// Blank white pages; selected pages fail to render.
pub struct FakeRasterizer {
    pub pages: u32,
    pub failing: Vec<u32>,
    pub unreadable: bool,
}

impl FakeRasterizer {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            failing: Vec::new(),
            unreadable: false,
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn page_count(&self, _document: &Path) -> Result<u32, RasterError> {
        if self.unreadable {
            return Err(RasterError::Failed("not a PDF".to_string()));
        }
        Ok(self.pages)
    }

    fn render_page(&self, _document: &Path, page: u32, _dpi: u32) -> Result<PageImage, RasterError> {
        if self.failing.contains(&page) {
            return Err(RasterError::Failed(format!("page {} is corrupt", page)));
        }
        Ok(PageImage::new(
            page,
            RgbImage::from_pixel(400, 600, Rgb([255, 255, 255])),
        ))
    }
}

/// Returns one detection per configured confidence on every page.
pub struct FakeDetector {
    pub confidences: Vec<f64>,
    /// 0-based call numbers that fail.
    pub failing_calls: Vec<usize>,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn new(confidences: Vec<f64>) -> Self {
        Self {
            confidences,
            failing_calls: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl DetectionEngine for FakeDetector {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn detect(
        &self,
        _image: &RgbImage,
        _target_size: u32,
        _min_confidence: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_calls.contains(&call) {
            return Err(DetectionError::Inference("model exploded".to_string()));
        }
        let (x, y, w, h) = FOLIO_BOX;
        Ok(self
            .confidences
            .iter()
            .map(|&conf| Detection::new(BoundingBox::new(x, y, w, h), conf, "folio".to_string(), 0))
            .collect())
    }
}

/// Digit engine that replays scripted answers in call order.
pub struct ScriptedDigits {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedDigits {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reading(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(*t)).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DigitOcrEngine for ScriptedDigits {
    fn kind(&self) -> DigitEngineKind {
        DigitEngineKind::Tesseract
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        "scripted".to_string()
    }

    fn recognize(&self, _crop: &GrayImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(OcrError::OcrFailed(message)),
            None => Ok(String::new()),
        }
    }
}

/// Whole-page reader returning fixed words.
pub struct FixedWords(pub Vec<OcrWord>);

impl GeneralOcrEngine for FixedWords {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read_words(&self, _page: &RgbImage) -> Result<Vec<OcrWord>, OcrError> {
        Ok(self.0.clone())
    }
}

/// A word centred inside [`FOLIO_BOX`].
pub fn word_in_folio_box(text: &str) -> OcrWord {
    OcrWord {
        text: text.to_string(),
        left: 190,
        top: 40,
        width: 20,
        height: 20,
    }
}

pub fn build_pipeline(
    rasterizer: FakeRasterizer,
    detector: FakeDetector,
    digits: Arc<ScriptedDigits>,
    general: Option<FixedWords>,
) -> FoliationPipeline {
    let general = general.map(|g| Arc::new(g) as Arc<dyn GeneralOcrEngine>);
    let cascade = OcrCascade::new(vec![digits as Arc<dyn DigitOcrEngine>], general);
    FoliationPipeline::new(Arc::new(rasterizer), Arc::new(detector), Arc::new(cascade))
}
