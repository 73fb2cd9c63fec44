use std::sync::OnceLock;

use regex::Regex;

/// Vocabulary for `looks_like_medical_text`.
const MEDICAL_KEYWORDS: [&str; 26] = [
    "test", "result", "normal", "abnormal", "level", "mg", "ml", "mmol", "blood", "urine",
    "glucose", "cholesterol", "hemoglobin", "patient", "doctor", "hospital", "clinic",
    "laboratory", "report", "date", "reference", "range", "high", "low", "positive",
    "negative",
];

/// Distinct keywords needed before text is considered medical.
const MIN_KEYWORD_HITS: usize = 2;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9A-Za-z_\s./():;,%-]").expect("static regex"))
}

/// Normalize OCR output for use as model context.
///
/// Whitespace runs become one space, anything outside ASCII word
/// characters and `- . , : ; / ( ) %` becomes a space, then whitespace is
/// collapsed again and the ends trimmed. Idempotent.
pub fn clean_medical_text(raw: &str) -> String {
    let collapsed = whitespace_re().replace_all(raw, " ");
    let filtered = disallowed_re().replace_all(&collapsed, " ");
    whitespace_re()
        .replace_all(&filtered, " ")
        .trim()
        .to_string()
}

/// Heuristic: does `text` mention at least two medical keywords?
///
/// Case-insensitive substring match. Informational only; nothing is
/// rejected on a `false`.
pub fn looks_like_medical_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    let hits = MEDICAL_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count();
    hits >= MIN_KEYWORD_HITS
}
