use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::types::{OcrEngine, OcrPageResult, TextExtraction};
use super::ExtractionError;

/// Run `engine` over an image and report the outcome.
///
/// Never fails: engine errors come back as an unsuccessful
/// `TextExtraction` so callers can carry on without OCR text.
pub fn extract_text(engine: &dyn OcrEngine, image_bytes: &[u8]) -> TextExtraction {
    if image_bytes.is_empty() {
        return TextExtraction::failed(ExtractionError::EmptyImage.to_string());
    }

    let start = Instant::now();
    tracing::debug!(bytes = image_bytes.len(), "OCR started");

    match engine.ocr_image(image_bytes) {
        Ok(page) => {
            let confidence = page.confidence.clamp(0.0, 100.0);
            tracing::info!(
                chars = page.text.len(),
                confidence,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "OCR completed"
            );
            TextExtraction {
                text: page.text,
                confidence,
                success: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "OCR failed, continuing without extracted text");
            TextExtraction::failed(e.to_string())
        }
    }
}

/// Pick the OCR backend for this build.
///
/// With the `ocr` feature, a Tesseract engine rooted at `tessdata_dir`
/// (or the library's default search path). Without it, or when Tesseract
/// cannot be set up, an engine that always reports itself unavailable.
pub fn default_engine(tessdata_dir: Option<&Path>) -> Arc<dyn OcrEngine + Send + Sync> {
    #[cfg(feature = "ocr")]
    {
        match BundledTesseract::new(tessdata_dir) {
            Ok(engine) => return Arc::new(engine),
            Err(e) => tracing::warn!(error = %e, "Tesseract unavailable, OCR disabled"),
        }
    }
    #[cfg(not(feature = "ocr"))]
    {
        let _ = tessdata_dir;
        tracing::info!("Built without the `ocr` feature, OCR disabled");
    }
    Arc::new(UnavailableOcr)
}

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<std::path::PathBuf>,
}

/// Tesseract language pack used for every page.
#[cfg(feature = "ocr")]
const OCR_LANGUAGE: &str = "eng";

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: Option<&Path>) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            if !dir.join("eng.traineddata").exists() {
                return Err(ExtractionError::TessdataNotFound(dir.to_path_buf()));
            }
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(datapath, Some(OCR_LANGUAGE))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        Ok(OcrPageResult {
            text,
            confidence: tess.mean_text_conf().max(0) as f32,
        })
    }
}

/// Stand-in when no OCR backend is compiled in or it failed to initialise.
pub struct UnavailableOcr;

impl OcrEngine for UnavailableOcr {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::EngineUnavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
            Err(ExtractionError::OcrProcessing("leptonica could not read image".into()))
        }
    }

    #[test]
    fn successful_ocr_returns_raw_text() {
        let engine = MockOcrEngine::new("  Glucose:  130 mg/dL \n", 87.0);
        let result = extract_text(&engine, b"fake-image");
        assert!(result.success);
        assert_eq!(result.text, "  Glucose:  130 mg/dL \n");
        assert_eq!(result.confidence, 87.0);
        assert!(result.error.is_none());
    }

    #[test]
    fn engine_failure_degrades_to_empty_result() {
        let result = extract_text(&FailingOcr, b"fake-image");
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert!(result.text.is_empty());
        assert!(result.error.unwrap().contains("leptonica"));
    }

    #[test]
    fn empty_buffer_is_reported_not_sent_to_engine() {
        let engine = MockOcrEngine::new("should not appear", 99.0);
        let result = extract_text(&engine, &[]);
        assert!(!result.success);
        assert!(result.text.is_empty());
    }

    #[test]
    fn confidence_is_clamped_to_percent_range() {
        let engine = MockOcrEngine::new("text", 140.0);
        assert_eq!(extract_text(&engine, b"img").confidence, 100.0);
    }

    #[test]
    fn unavailable_engine_reports_itself() {
        let engine = UnavailableOcr;
        assert!(!engine.is_available());
        let result = extract_text(&engine, b"img");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No OCR engine available in this build"));
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn default_engine_without_feature_is_unavailable() {
        assert!(!default_engine(None).is_available());
    }
}
