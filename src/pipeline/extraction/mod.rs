pub mod ocr;
pub mod sanitize;
pub mod types;

pub use ocr::*;
pub use sanitize::*;
pub use types::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("No OCR engine available in this build")]
    EngineUnavailable,

    #[error("Image buffer is empty")]
    EmptyImage,
}
