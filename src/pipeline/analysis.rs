//! Report analysis orchestrator.
//!
//! Drives one run: validate input → load image → OCR → model call →
//! parse → persist. Strictly sequential and synchronous; the HTTP layer
//! runs it on a blocking thread. A report is written once, after the
//! analysis is complete, or not at all.

use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::core_state::CoreState;
use crate::db::{self, DatabaseError};
use crate::models::{Identity, NewReport, Report};
use crate::pipeline::extraction::{clean_medical_text, extract_text, looks_like_medical_text};
use crate::pipeline::structuring::{
    build_analysis_prompt, parse_with_outcome, StructuringError, VisionRequest,
    ANALYSIS_SYSTEM_PROMPT,
};
use crate::uploads::UploadError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Analysis service failed: {0}")]
    ServiceFailure(#[from] StructuringError),

    #[error("Could not save report: {0}")]
    PersistenceFailure(#[from] DatabaseError),
}

/// Analyze an uploaded image for `identity` and store the result.
pub fn analyze_report(
    core: &CoreState,
    identity: &Identity,
    image_reference: &str,
    title: &str,
) -> Result<Report, AnalysisError> {
    let image_reference = image_reference.trim();
    let title = title.trim();
    if image_reference.is_empty() || title.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Image URL and title are required".into(),
        ));
    }

    let start = Instant::now();
    let user_id = identity.user_id;

    let image = core
        .uploads()
        .resolve(&user_id, image_reference)
        .map_err(|e| {
            if let UploadError::Io(io) = &e {
                tracing::warn!(user_id = %user_id, error = %io, "Image read failed");
            }
            AnalysisError::ImageNotFound(image_reference.to_string())
        })?;
    tracing::info!(
        user_id = %user_id,
        bytes = image.bytes.len(),
        mime = image.kind.mime_type(),
        "Analysis: image loaded"
    );

    // OCR never stops the run; a failure just means no text context.
    let ocr = extract_text(core.ocr(), &image.bytes);
    let ocr_text = if ocr.success && !ocr.text.is_empty() {
        let cleaned = clean_medical_text(&ocr.text);
        if looks_like_medical_text(&cleaned) {
            tracing::info!(text_len = cleaned.len(), "OCR text looks like a medical report");
        } else {
            tracing::warn!(text_len = cleaned.len(), "OCR text may not be medical content");
        }
        Some(cleaned)
    } else {
        None
    };

    let vision = core.vision().ok_or(StructuringError::NotConfigured)?;
    let image_base64 = STANDARD.encode(&image.bytes);
    let user_prompt = build_analysis_prompt(ocr_text.as_deref());
    let completion = vision.analyze_image(&VisionRequest {
        system_prompt: ANALYSIS_SYSTEM_PROMPT,
        user_prompt: &user_prompt,
        image_base64: &image_base64,
        mime_type: image.kind.mime_type(),
    })?;

    let (analysis, outcome) = parse_with_outcome(&completion);
    tracing::info!(
        user_id = %user_id,
        parse_outcome = ?outcome,
        severity = analysis.severity.as_str(),
        "Analysis: completion parsed"
    );

    let report = core.db().with_conn(|conn| {
        db::insert_report(
            conn,
            &NewReport {
                owner_id: user_id,
                title: title.to_string(),
                image_reference: image_reference.to_string(),
                analysis,
            },
        )
    })?;

    tracing::info!(
        report_id = %report.id,
        user_id = %user_id,
        ocr_confidence = ocr.confidence,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Analysis complete"
    );
    Ok(report)
}
