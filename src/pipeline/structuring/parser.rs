//! Turns a model completion into an `Analysis`. Never fails: anything that
//! cannot be read as the expected JSON becomes a complete fallback record.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Analysis, Severity};

pub const DEFAULT_SUMMARY: &str = "Medical report analyzed";
pub const DEFAULT_REPORT_TYPE: &str = "Medical Report";
pub const DEFAULT_KEY_FINDING: &str = "Key findings processed";
pub const DEFAULT_RECOMMENDATION: &str = "Consult with healthcare professional";
pub const TEXT_ONLY_FINDING: &str = "Analysis provided as text";
pub const UNPARSEABLE_FINDING: &str = "Analysis could not be parsed properly";

/// Fallback summaries keep this many characters of the completion.
const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Every shape a model has been seen to emit for an analysis field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    List(Vec<Value>),
    Other(Value),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    summary: Option<Loose>,
    report_type: Option<Loose>,
    key_findings: Option<Loose>,
    recommendations: Option<Loose>,
    medicines_suggested: Option<Loose>,
    severity: Option<Loose>,
}

/// How a completion was interpreted. Logged; not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Structured,
    NoJson,
    InvalidJson,
}

/// Parse a raw completion into a fully populated `Analysis`.
pub fn parse_analysis_response(completion: &str) -> Analysis {
    parse_with_outcome(completion).0
}

pub fn parse_with_outcome(completion: &str) -> (Analysis, ParseOutcome) {
    let Some(span) = json_span(completion) else {
        tracing::warn!("No JSON object in model completion, using text fallback");
        return (
            fallback(completion, TEXT_ONLY_FINDING),
            ParseOutcome::NoJson,
        );
    };

    // Through `Value` so a repeated key keeps its last value instead of
    // failing the derived struct's duplicate-field check.
    match serde_json::from_str::<Value>(span).and_then(RawAnalysis::deserialize) {
        Ok(raw) => (normalize(raw), ParseOutcome::Structured),
        Err(e) => {
            tracing::warn!(error = %e, span_len = span.len(), "Model JSON could not be decoded");
            (
                fallback(completion, UNPARSEABLE_FINDING),
                ParseOutcome::InvalidJson,
            )
        }
    }
}

/// First `{` through last `}`. Greedy on purpose: prose around a single
/// object is tolerated, two objects yield an invalid span.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize(raw: RawAnalysis) -> Analysis {
    Analysis {
        summary: text_or(raw.summary, DEFAULT_SUMMARY),
        report_type: text_or(raw.report_type, DEFAULT_REPORT_TYPE),
        key_findings: list_or(raw.key_findings, || vec![DEFAULT_KEY_FINDING.to_string()]),
        recommendations: list_or(raw.recommendations, || {
            vec![DEFAULT_RECOMMENDATION.to_string()]
        }),
        medicines_suggested: list_or(raw.medicines_suggested, Vec::new),
        severity: match raw.severity {
            Some(Loose::Text(s)) if !s.trim().is_empty() => Severity::normalize(&s),
            _ => Severity::Medium,
        },
    }
}

fn text_or(value: Option<Loose>, default: &str) -> String {
    match value {
        Some(Loose::Text(s)) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

/// A list stays a list, a lone string becomes a one-item list, anything
/// else gets the field's placeholder.
fn list_or(value: Option<Loose>, default: impl FnOnce() -> Vec<String>) -> Vec<String> {
    match value {
        Some(Loose::List(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(Loose::Text(s)) => vec![s],
        Some(Loose::Other(_)) | None => default(),
    }
}

fn fallback(completion: &str, finding: &str) -> Analysis {
    let mut summary: String = completion.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    if summary.trim().is_empty() {
        summary = DEFAULT_SUMMARY.to_string();
    }
    Analysis {
        summary,
        report_type: DEFAULT_REPORT_TYPE.to_string(),
        key_findings: vec![finding.to_string()],
        recommendations: vec![DEFAULT_RECOMMENDATION.to_string()],
        medicines_suggested: Vec::new(),
        severity: Severity::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_is_taken_verbatim() {
        let raw = r#"{"summary":"Mild anemia","reportType":"Blood Test",
            "keyFindings":["Hb 10.9 g/dL"],"recommendations":["Iron studies"],
            "medicinesSuggested":["Ferrous sulfate"],"severity":"low"}"#;
        let (analysis, outcome) = parse_with_outcome(raw);
        assert_eq!(outcome, ParseOutcome::Structured);
        assert_eq!(analysis.summary, "Mild anemia");
        assert_eq!(analysis.report_type, "Blood Test");
        assert_eq!(analysis.key_findings, vec!["Hb 10.9 g/dL"]);
        assert_eq!(analysis.recommendations, vec!["Iron studies"]);
        assert_eq!(analysis.medicines_suggested, vec!["Ferrous sulfate"]);
        assert_eq!(analysis.severity, Severity::Low);
    }

    #[test]
    fn json_inside_prose_and_fences_is_found() {
        let raw = "Here is the analysis:\n```json\n{\"summary\":\"ok\",\"severity\":\"high\"}\n```\nStay well.";
        let analysis = parse_analysis_response(raw);
        assert_eq!(analysis.summary, "ok");
        assert_eq!(analysis.severity, Severity::High);
    }

    #[test]
    fn bare_string_list_fields_are_wrapped() {
        let raw = r#"{"summary":"ok","reportType":"Blood Test","keyFindings":"Glucose high",
            "recommendations":"See a GP","medicinesSuggested":"Metformin","severity":"high"}"#;
        let analysis = parse_analysis_response(raw);
        assert_eq!(analysis.key_findings, vec!["Glucose high"]);
        assert_eq!(analysis.recommendations, vec!["See a GP"]);
        assert_eq!(analysis.medicines_suggested, vec!["Metformin"]);
    }

    #[test]
    fn missing_fields_get_placeholders() {
        let analysis = parse_analysis_response("{}");
        assert_eq!(analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(analysis.report_type, DEFAULT_REPORT_TYPE);
        assert_eq!(analysis.key_findings, vec![DEFAULT_KEY_FINDING]);
        assert_eq!(analysis.recommendations, vec![DEFAULT_RECOMMENDATION]);
        assert!(analysis.medicines_suggested.is_empty());
        assert_eq!(analysis.severity, Severity::Medium);
    }

    #[test]
    fn wrong_typed_fields_get_placeholders() {
        let raw = r#"{"summary":42,"reportType":null,"keyFindings":{"a":1},
            "recommendations":7,"medicinesSuggested":true,"severity":3}"#;
        let analysis = parse_analysis_response(raw);
        assert_eq!(analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(analysis.report_type, DEFAULT_REPORT_TYPE);
        assert_eq!(analysis.key_findings, vec![DEFAULT_KEY_FINDING]);
        assert_eq!(analysis.recommendations, vec![DEFAULT_RECOMMENDATION]);
        assert!(analysis.medicines_suggested.is_empty());
        assert_eq!(analysis.severity, Severity::Medium);
    }

    #[test]
    fn empty_strings_fall_back_like_missing_values() {
        let analysis = parse_analysis_response(r#"{"summary":"","reportType":"  ","severity":""}"#);
        assert_eq!(analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(analysis.report_type, DEFAULT_REPORT_TYPE);
        assert_eq!(analysis.severity, Severity::Medium);
    }

    #[test]
    fn non_string_list_items_are_stringified() {
        let analysis = parse_analysis_response(r#"{"keyFindings":["WBC", 11.2, null]}"#);
        assert_eq!(analysis.key_findings, vec!["WBC", "11.2", "null"]);
    }

    #[test]
    fn empty_list_stays_empty() {
        let analysis = parse_analysis_response(r#"{"keyFindings":[],"recommendations":[]}"#);
        assert!(analysis.key_findings.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn severity_is_normalized() {
        for (raw, expected) in [
            ("HIGH", Severity::High),
            (" Low ", Severity::Low),
            ("moderate", Severity::Medium),
            ("critical", Severity::Medium),
        ] {
            let json = format!(r#"{{"severity":"{raw}"}}"#);
            assert_eq!(parse_analysis_response(&json).severity, expected, "{raw}");
        }
    }

    #[test]
    fn no_braces_gives_text_fallback() {
        let raw = "The report shows normal values throughout.";
        let (analysis, outcome) = parse_with_outcome(raw);
        assert_eq!(outcome, ParseOutcome::NoJson);
        assert_eq!(analysis.summary, raw);
        assert_eq!(analysis.key_findings, vec![TEXT_ONLY_FINDING]);
        assert_eq!(analysis.recommendations, vec![DEFAULT_RECOMMENDATION]);
        assert!(analysis.medicines_suggested.is_empty());
        assert_eq!(analysis.severity, Severity::Medium);
        assert_eq!(analysis.report_type, DEFAULT_REPORT_TYPE);
    }

    #[test]
    fn text_fallback_summary_is_first_500_chars() {
        let raw: String = "é".repeat(800);
        let analysis = parse_analysis_response(&raw);
        assert_eq!(analysis.summary.chars().count(), 500);
        assert!(raw.starts_with(&analysis.summary));
    }

    #[test]
    fn closing_brace_before_opening_is_not_a_span() {
        let analysis = parse_analysis_response("} nothing here {");
        assert_eq!(analysis.key_findings, vec![TEXT_ONLY_FINDING]);
    }

    #[test]
    fn invalid_json_span_gives_unparseable_fallback() {
        let raw = "Result: {summary: 'unquoted keys'}";
        let (analysis, outcome) = parse_with_outcome(raw);
        assert_eq!(outcome, ParseOutcome::InvalidJson);
        assert_eq!(analysis.summary, raw);
        assert_eq!(analysis.key_findings, vec![UNPARSEABLE_FINDING]);
        assert_eq!(analysis.recommendations, vec![DEFAULT_RECOMMENDATION]);
        assert_eq!(analysis.severity, Severity::Medium);
    }

    #[test]
    fn two_objects_make_an_invalid_span() {
        let raw = r#"{"summary":"a"} and also {"summary":"b"}"#;
        let (analysis, outcome) = parse_with_outcome(raw);
        assert_eq!(outcome, ParseOutcome::InvalidJson);
        assert_eq!(analysis.key_findings, vec![UNPARSEABLE_FINDING]);
    }

    #[test]
    fn empty_completion_still_has_a_summary() {
        let analysis = parse_analysis_response("");
        assert_eq!(analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(analysis.key_findings, vec![TEXT_ONLY_FINDING]);
    }

    #[test]
    fn duplicate_keys_keep_the_last_value() {
        let (analysis, outcome) =
            parse_with_outcome(r#"{"summary":"a","severity":"low","summary":"b"}"#);
        assert_eq!(outcome, ParseOutcome::Structured);
        assert_eq!(analysis.summary, "b");
        assert_eq!(analysis.severity, Severity::Low);
    }

    #[test]
    fn whitespace_only_completion_uses_default_summary() {
        let analysis = parse_analysis_response("   \n  ");
        assert_eq!(analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(analysis.key_findings, vec![TEXT_ONLY_FINDING]);
    }
}
