use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Severity;

/// Structured output of one analysis run. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    pub report_type: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub medicines_suggested: Vec<String>,
    pub severity: Severity,
}

/// A persisted analysis, owned by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub image_reference: String,
    pub analysis: Analysis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `insert_report`; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub owner_id: Uuid,
    pub title: String,
    pub image_reference: String,
    pub analysis: Analysis,
}
