//! End-to-end pipeline runs with scripted engines.

mod common;

use std::sync::Arc;

use foliacheck::ocr::OcrEngineUsed;
use foliacheck::{FoliationError, PipelineParams};

use common::{build_pipeline, word_in_folio_box, FakeDetector, FakeRasterizer, FixedWords, ScriptedDigits};

const PDF: &[u8] = b"%PDF-1.4 stand-in";

#[test]
fn test_three_page_report() {
    let digits = Arc::new(ScriptedDigits::reading(&["1", "2", "5"]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(3),
        FakeDetector::new(vec![0.9]),
        digits.clone(),
        None,
    );

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();

    assert_eq!(report.pages.len(), 3);
    assert_eq!(digits.calls(), 3);
    let numbers: Vec<u32> = report.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let third = &report.pages[2].detections[0];
    let check = third.foliation.unwrap();
    assert!(!check.is_match);
    assert_eq!(check.diff, Some(2));
    assert_eq!(check.confidence, 0.5);
    assert_eq!(check.match_percentage, 50);

    let summary = &report.summary;
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.total_detections, 3);
    assert_eq!(summary.pages_with_detections, 3);
    assert_eq!(summary.exact_matches, 2);
    assert_eq!(summary.pages_without_match, 1);
    assert!((summary.average_confidence - 0.833).abs() < 1e-9);
}

#[test]
fn test_render_failure_stays_on_its_page() {
    let mut rasterizer = FakeRasterizer::new(3);
    rasterizer.failing = vec![2];
    let digits = Arc::new(ScriptedDigits::reading(&["1", "3"]));
    let pipeline = build_pipeline(rasterizer, FakeDetector::new(vec![0.9]), digits, None);

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();

    let failed = &report.pages[1];
    assert_eq!(failed.page_number, 2);
    assert!(failed.detections.is_empty());
    assert!(failed.error.as_deref().unwrap().contains("corrupt"));

    assert!(report.pages[0].error.is_none());
    assert!(report.pages[2].error.is_none());
    assert_eq!(report.summary.total_pages, 3);
    assert_eq!(report.summary.exact_matches, 2);
    assert_eq!(report.summary.pages_without_match, 1);
}

#[test]
fn test_detection_failure_stays_on_its_page() {
    let mut detector = FakeDetector::new(vec![0.9]);
    detector.failing_calls = vec![0];
    let digits = Arc::new(ScriptedDigits::reading(&["2"]));
    let pipeline = build_pipeline(FakeRasterizer::new(2), detector, digits, None);

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();

    let first = &report.pages[0];
    assert!(first.detections.is_empty());
    assert!(first.error.as_deref().unwrap().starts_with("detection failed"));
    assert!(first.image_dimensions.is_some());

    let second = &report.pages[1];
    assert!(second.detections[0].foliation.unwrap().is_match);
}

#[test]
fn test_low_confidence_regions_are_not_read() {
    let digits = Arc::new(ScriptedDigits::reading(&["1"]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.3, 0.9]),
        digits.clone(),
        None,
    );

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();
    let detections = &report.pages[0].detections;

    assert_eq!(detections.len(), 2);
    assert!(detections[0].low_confidence);
    assert!(detections[0].skip_reason.is_some());
    assert!(detections[0].ocr.is_none());
    assert!(detections[0].foliation.is_none());

    assert!(!detections[1].low_confidence);
    assert!(detections[1].foliation.unwrap().is_match);
    assert_eq!(digits.calls(), 1);
}

#[test]
fn test_ocr_disabled() {
    let digits = Arc::new(ScriptedDigits::reading(&["1"]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.9]),
        digits.clone(),
        None,
    );
    let params = PipelineParams {
        ocr: false,
        ..Default::default()
    };

    let report = pipeline.run(PDF, &params).unwrap();

    assert_eq!(digits.calls(), 0);
    let detection = &report.pages[0].detections[0];
    assert!(detection.ocr.is_none());
    assert!(detection.foliation.is_none());
    assert_eq!(report.summary.total_detections, 1);
    assert_eq!(report.summary.average_confidence, 0.0);
}

#[test]
fn test_engine_error_is_recorded_and_fallback_reads_digits() {
    let digits = Arc::new(ScriptedDigits::new(vec![Err("engine crashed")]));
    let general = FixedWords(vec![word_in_folio_box("1")]);
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.9]),
        digits,
        Some(general),
    );

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();
    let page = &report.pages[0];

    assert_eq!(page.errors, vec!["tesseract: OCR failed: engine crashed".to_string()]);
    assert!(page.error.is_none());

    let ocr = page.detections[0].ocr.as_ref().unwrap();
    assert_eq!(ocr.ocr_digits, "1");
    assert_eq!(ocr.ocr_digits_engine, OcrEngineUsed::General);
    assert!(page.detections[0].foliation.unwrap().is_match);
}

#[test]
fn test_unread_region_has_no_foliation() {
    let digits = Arc::new(ScriptedDigits::reading(&["Folio"]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.9]),
        digits,
        None,
    );

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();
    let detection = &report.pages[0].detections[0];

    let ocr = detection.ocr.as_ref().unwrap();
    assert_eq!(ocr.ocr_digits, "");
    assert_eq!(ocr.ocr_digits_engine, OcrEngineUsed::None);
    assert!(detection.foliation.is_none());
    assert_eq!(report.summary.exact_matches, 0);
    assert_eq!(report.summary.pages_without_match, 1);
}

#[test]
fn test_full_ocr_fields_in_json() {
    let digits = Arc::new(ScriptedDigits::reading(&[" 1 "]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.9]),
        digits,
        None,
    );
    let params = PipelineParams {
        digits_only: false,
        ..Default::default()
    };

    let report = pipeline.run(PDF, &params).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let detection = &json["pages"][0]["detections"][0];

    assert_eq!(detection["class"], "folio");
    assert_eq!(detection["x"], 200.0);
    assert_eq!(detection["ocr_digits"], "1");
    assert_eq!(detection["ocr_digits_engine"], "tesseract");
    assert_eq!(detection["ocr_text"], "1");
    assert_eq!(detection["ocr_words"], serde_json::json!(["1"]));
    assert_eq!(detection["foliation"]["match"], true);
    assert_eq!(json["summary"]["exact_matches"], 1);
}

#[test]
fn test_digits_only_hides_text() {
    let digits = Arc::new(ScriptedDigits::reading(&["1"]));
    let pipeline = build_pipeline(
        FakeRasterizer::new(1),
        FakeDetector::new(vec![0.9]),
        digits,
        None,
    );

    let report = pipeline.run(PDF, &PipelineParams::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let detection = &json["pages"][0]["detections"][0];

    assert_eq!(detection["ocr_digits"], "1");
    assert!(detection.get("ocr_text").is_none());
    assert!(detection.get("ocr_words").is_none());
}

#[test]
fn test_empty_document_is_an_ingest_error() {
    let digits = Arc::new(ScriptedDigits::reading(&[]));
    let pipeline = build_pipeline(FakeRasterizer::new(1), FakeDetector::new(vec![0.9]), digits, None);

    let err = pipeline.run(&[], &PipelineParams::default()).unwrap_err();
    assert!(matches!(err, FoliationError::Ingest(_)));
}

#[test]
fn test_unreadable_document_is_an_ingest_error() {
    let mut rasterizer = FakeRasterizer::new(1);
    rasterizer.unreadable = true;
    let digits = Arc::new(ScriptedDigits::reading(&[]));
    let pipeline = build_pipeline(rasterizer, FakeDetector::new(vec![0.9]), digits, None);

    let err = pipeline.run(PDF, &PipelineParams::default()).unwrap_err();
    assert!(matches!(err, FoliationError::Ingest(_)));
    assert!(err.is_client_error());
}

#[test]
fn test_observer_sees_every_rendered_page() {
    let mut rasterizer = FakeRasterizer::new(3);
    rasterizer.failing = vec![3];
    let digits = Arc::new(ScriptedDigits::reading(&["1", "2"]));
    let pipeline = build_pipeline(rasterizer, FakeDetector::new(vec![0.9]), digits, None);

    let file = tempfile::NamedTempFile::new().unwrap();
    let mut seen = Vec::new();
    let report = pipeline
        .run_with_observer(file.path(), &PipelineParams::default(), |page, result| {
            assert_eq!(page.page_number, result.page_number);
            seen.push(page.page_number);
        })
        .unwrap();

    assert_eq!(seen, vec![1, 2]);
    assert_eq!(report.pages.len(), 3);
}
