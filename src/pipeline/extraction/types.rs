use serde::Serialize;

use super::ExtractionError;

/// Outcome of one OCR pass over an image.
///
/// `success == false` always comes with `confidence == 0`, empty `text`
/// and the failure detail in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextExtraction {
    /// Raw engine transcription, not cleaned.
    pub text: String,
    /// Mean engine confidence, 0-100.
    pub confidence: f32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TextExtraction {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// 0-100, as reported by the engine.
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;

    /// Whether this engine can run at all. Used by the diagnosis endpoint.
    fn is_available(&self) -> bool {
        true
    }
}
