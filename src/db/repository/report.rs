use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

/// Default page size for `list_reports`.
pub const DEFAULT_LIST_LIMIT: usize = 50;

const REPORT_COLUMNS: &str = "id, owner_id, title, image_reference, summary, report_type,
     key_findings, recommendations, medicines_suggested, severity, created_at, updated_at";

/// Fields the generic update path may change. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct ReportUpdate {
    pub title: Option<String>,
    pub analysis: Option<Analysis>,
}

/// Persist a new report with a generated id and store-assigned timestamps.
pub fn insert_report(conn: &Connection, new: &NewReport) -> Result<Report, DatabaseError> {
    let now = stored_now();
    let report = Report {
        id: Uuid::new_v4(),
        owner_id: new.owner_id,
        title: new.title.clone(),
        image_reference: new.image_reference.clone(),
        analysis: new.analysis.clone(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO reports (id, owner_id, title, image_reference, summary, report_type,
         key_findings, recommendations, medicines_suggested, severity, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            report.id.to_string(),
            report.owner_id.to_string(),
            report.title,
            report.image_reference,
            report.analysis.summary,
            report.analysis.report_type,
            encode_list(&report.analysis.key_findings)?,
            encode_list(&report.analysis.recommendations)?,
            encode_list(&report.analysis.medicines_suggested)?,
            report.analysis.severity.as_str(),
            format_timestamp(&report.created_at),
            format_timestamp(&report.updated_at),
        ],
    )?;

    Ok(report)
}

/// Newest-first reports for `owner_id`, at most `limit` of them.
pub fn list_reports(
    conn: &Connection,
    owner_id: &Uuid,
    limit: usize,
) -> Result<Vec<Report>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;

    let rows = stmt.query_map(params![owner_id.to_string(), limit as i64], read_row)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(report_from_row(row?)?);
    }
    Ok(reports)
}

/// Fetch one report. A report owned by someone else is reported exactly
/// like a missing one.
pub fn get_report(conn: &Connection, owner_id: &Uuid, id: &Uuid) -> Result<Report, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1 AND owner_id = ?2"
    ))?;

    match stmt.query_row(params![id.to_string(), owner_id.to_string()], read_row) {
        Ok(row) => report_from_row(row),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// Remove a report and return what was removed. Same ownership rule as `get_report`.
pub fn delete_report(conn: &Connection, owner_id: &Uuid, id: &Uuid) -> Result<Report, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let report = get_report(&tx, owner_id, id)?;
    tx.execute(
        "DELETE FROM reports WHERE id = ?1 AND owner_id = ?2",
        params![id.to_string(), owner_id.to_string()],
    )?;
    tx.commit()?;

    tracing::info!(report_id = %id, owner_id = %owner_id, "Report deleted");
    Ok(report)
}

/// Generic update path. Bumps `updated_at`; owner, image and creation time
/// never change.
pub fn update_report(
    conn: &Connection,
    owner_id: &Uuid,
    id: &Uuid,
    update: &ReportUpdate,
) -> Result<Report, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let mut report = get_report(&tx, owner_id, id)?;

    if let Some(title) = &update.title {
        report.title = title.clone();
    }
    if let Some(analysis) = &update.analysis {
        report.analysis = analysis.clone();
    }
    report.updated_at = stored_now();

    tx.execute(
        "UPDATE reports SET title = ?3, summary = ?4, report_type = ?5, key_findings = ?6,
         recommendations = ?7, medicines_suggested = ?8, severity = ?9, updated_at = ?10
         WHERE id = ?1 AND owner_id = ?2",
        params![
            id.to_string(),
            owner_id.to_string(),
            report.title,
            report.analysis.summary,
            report.analysis.report_type,
            encode_list(&report.analysis.key_findings)?,
            encode_list(&report.analysis.recommendations)?,
            encode_list(&report.analysis.medicines_suggested)?,
            report.analysis.severity.as_str(),
            format_timestamp(&report.updated_at),
        ],
    )?;
    tx.commit()?;

    Ok(report)
}

pub fn count_reports(conn: &Connection, owner_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM reports WHERE owner_id = ?1",
        params![owner_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Current time at the precision the store keeps, so returned values
/// compare equal to what a later read produces.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "Report".into(),
        id: id.to_string(),
    }
}

fn encode_list(items: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(items).map_err(|e| DatabaseError::Corrupt(e.to_string()))
}

fn decode_list(raw: &str) -> Result<Vec<String>, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Corrupt(e.to_string()))
}

// Internal row type for Report mapping
struct ReportRow {
    id: String,
    owner_id: String,
    title: String,
    image_reference: String,
    summary: String,
    report_type: String,
    key_findings: String,
    recommendations: String,
    medicines_suggested: String,
    severity: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        image_reference: row.get(3)?,
        summary: row.get(4)?,
        report_type: row.get(5)?,
        key_findings: row.get(6)?,
        recommendations: row.get(7)?,
        medicines_suggested: row.get(8)?,
        severity: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn report_from_row(row: ReportRow) -> Result<Report, DatabaseError> {
    Ok(Report {
        id: parse_uuid(&row.id)?,
        owner_id: parse_uuid(&row.owner_id)?,
        title: row.title,
        image_reference: row.image_reference,
        analysis: Analysis {
            summary: row.summary,
            report_type: row.report_type,
            key_findings: decode_list(&row.key_findings)?,
            recommendations: decode_list(&row.recommendations)?,
            medicines_suggested: decode_list(&row.medicines_suggested)?,
            severity: Severity::from_str(&row.severity)?,
        },
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
