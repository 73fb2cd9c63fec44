pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"Analyze this medical report image and return ONLY valid JSON in this exact format:
{
  "summary": "Brief overview in 1-2 sentences",
  "reportType": "Type of medical report",
  "keyFindings": ["Finding 1", "Finding 2"],
  "recommendations": ["Recommendation 1", "Recommendation 2"],
  "medicinesSuggested": ["Medicine 1"],
  "severity": "low"
}

Rules:
- Return ONLY valid JSON, no other text
- severity must be one of: low, medium, high
- Keep responses concise
- Always recommend consulting healthcare professionals"#;

/// OCR context beyond this many characters is cut off.
const MAX_OCR_CONTEXT_CHARS: usize = 4000;

/// Build the user turn. Cleaned OCR text, when there is any, is attached as
/// secondary context; the image stays the source of truth.
pub fn build_analysis_prompt(ocr_text: Option<&str>) -> String {
    let base = "Analyze this medical report and return valid JSON only.";

    match ocr_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            let excerpt: String = text.chars().take(MAX_OCR_CONTEXT_CHARS).collect();
            format!(
                "{base}\n\nText recognized from the image by OCR (may contain errors; \
                 prefer the image where they disagree):\n<ocr>\n{excerpt}\n</ocr>"
            )
        }
        None => base.to_string(),
    }
}
