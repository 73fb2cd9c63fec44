//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per table.
//! Report functions always take the owner id; there is no unscoped read.

mod report;
mod session;
mod user;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use report::*;
pub use session::*;
pub use user::*;

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// lexical order matches chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::Corrupt(format!("uuid {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;
    use chrono::{Duration, SubsecRound};
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_user(conn: &Connection, email: &str) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.into(),
            name: "Test Patient".into(),
            password_hash: "pbkdf2-sha256$1$AAAA$BBBB".into(),
            created_at: now,
            updated_at: now,
        };
        insert_user(conn, &user).unwrap();
        user.id
    }

    fn sample_analysis() -> Analysis {
        Analysis {
            summary: "Fasting glucose above range".into(),
            report_type: "Blood Test".into(),
            key_findings: vec!["Glucose 130 mg/dL".into(), "HbA1c 6.8%".into()],
            recommendations: vec!["Repeat test in 3 months".into()],
            medicines_suggested: vec![],
            severity: Severity::High,
        }
    }

    fn make_report(conn: &Connection, owner: Uuid, title: &str) -> Report {
        insert_report(
            conn,
            &NewReport {
                owner_id: owner,
                title: title.into(),
                image_reference: "/uploads/x/1.jpg".into(),
                analysis: sample_analysis(),
            },
        )
        .unwrap()
    }

    // ── users ──

    #[test]
    fn user_round_trip_by_email_and_id() {
        let conn = test_db();
        let id = make_user(&conn, "marie@example.com");

        let by_email = get_user_by_email(&conn, "marie@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        let by_id = get_user(&conn, &id).unwrap().unwrap();
        assert_eq!(by_id.email, "marie@example.com");
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let conn = test_db();
        make_user(&conn, "dup@example.com");
        let now = Utc::now();
        let result = insert_user(
            &conn,
            &User {
                id: Uuid::new_v4(),
                email: "dup@example.com".into(),
                name: "Other".into(),
                password_hash: "x".into(),
                created_at: now,
                updated_at: now,
            },
        );
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn unknown_email_is_none() {
        let conn = test_db();
        assert!(get_user_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    // ── sessions ──

    #[test]
    fn session_resolves_identity_until_expiry() {
        let conn = test_db();
        let user_id = make_user(&conn, "s@example.com");
        let now = Utc::now();
        insert_session(&conn, "hash-1", &user_id, &now, &(now + Duration::days(7))).unwrap();

        let identity = find_identity(&conn, "hash-1", &now).unwrap().unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email, "s@example.com");

        let later = now + Duration::days(8);
        assert!(find_identity(&conn, "hash-1", &later).unwrap().is_none());
    }

    #[test]
    fn deleted_session_no_longer_resolves() {
        let conn = test_db();
        let user_id = make_user(&conn, "d@example.com");
        let now = Utc::now();
        insert_session(&conn, "hash-2", &user_id, &now, &(now + Duration::hours(1))).unwrap();

        assert!(delete_session(&conn, "hash-2").unwrap());
        assert!(!delete_session(&conn, "hash-2").unwrap());
        assert!(find_identity(&conn, "hash-2", &now).unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let conn = test_db();
        let user_id = make_user(&conn, "p@example.com");
        let now = Utc::now();
        insert_session(&conn, "old", &user_id, &now, &(now - Duration::seconds(1))).unwrap();
        insert_session(&conn, "new", &user_id, &now, &(now + Duration::hours(1))).unwrap();

        assert_eq!(purge_expired_sessions(&conn, &now).unwrap(), 1);
        assert!(find_identity(&conn, "new", &now).unwrap().is_some());
    }

    // ── reports ──

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let conn = test_db();
        let owner = make_user(&conn, "r@example.com");
        let report = make_report(&conn, owner, "CBC March");

        assert_eq!(report.created_at, report.updated_at);
        let fetched = get_report(&conn, &owner, &report.id).unwrap();
        assert_eq!(fetched.title, "CBC March");
        assert_eq!(fetched.analysis, sample_analysis());
        assert_eq!(fetched.created_at, report.created_at);
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let conn = test_db();
        let owner = make_user(&conn, "l@example.com");
        let first = make_report(&conn, owner, "first");
        let second = make_report(&conn, owner, "second");
        let third = make_report(&conn, owner, "third");

        let all = list_reports(&conn, &owner, DEFAULT_LIST_LIMIT).unwrap();
        let ids: Vec<Uuid> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let limited = list_reports(&conn, &owner, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, third.id);
    }

    #[test]
    fn list_only_returns_own_reports() {
        let conn = test_db();
        let alice = make_user(&conn, "alice@example.com");
        let bob = make_user(&conn, "bob@example.com");
        make_report(&conn, alice, "alice's");
        make_report(&conn, bob, "bob's");

        let reports = list_reports(&conn, &alice, DEFAULT_LIST_LIMIT).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].title, "alice's");
    }

    #[test]
    fn foreign_report_is_indistinguishable_from_missing() {
        let conn = test_db();
        let alice = make_user(&conn, "a2@example.com");
        let bob = make_user(&conn, "b2@example.com");
        let bobs = make_report(&conn, bob, "bob's");

        let foreign = get_report(&conn, &alice, &bobs.id).unwrap_err();
        let missing = get_report(&conn, &alice, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(foreign, DatabaseError::NotFound { .. }));
        assert!(matches!(missing, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn delete_returns_report_and_respects_owner() {
        let conn = test_db();
        let alice = make_user(&conn, "a3@example.com");
        let bob = make_user(&conn, "b3@example.com");
        let bobs = make_report(&conn, bob, "bob's");

        assert!(matches!(
            delete_report(&conn, &alice, &bobs.id),
            Err(DatabaseError::NotFound { .. })
        ));
        assert_eq!(count_reports(&conn, &bob).unwrap(), 1);

        let removed = delete_report(&conn, &bob, &bobs.id).unwrap();
        assert_eq!(removed.id, bobs.id);
        assert_eq!(count_reports(&conn, &bob).unwrap(), 0);
        assert!(matches!(
            delete_report(&conn, &bob, &bobs.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn update_changes_fields_and_bumps_updated_at() {
        let conn = test_db();
        let owner = make_user(&conn, "u@example.com");
        let report = make_report(&conn, owner, "before");

        let mut analysis = sample_analysis();
        analysis.severity = Severity::Low;
        let updated = update_report(
            &conn,
            &owner,
            &report.id,
            &ReportUpdate {
                title: Some("after".into()),
                analysis: Some(analysis.clone()),
            },
        )
        .unwrap();

        assert_eq!(updated.title, "after");
        assert!(updated.updated_at >= report.updated_at);
        assert_eq!(updated.created_at, report.created_at);

        let fetched = get_report(&conn, &owner, &report.id).unwrap();
        assert_eq!(fetched.analysis.severity, Severity::Low);
        assert_eq!(fetched.image_reference, report.image_reference);
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc::now().trunc_subsecs(6);
        let late = early + Duration::milliseconds(5);
        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert_eq!(parse_timestamp(&format_timestamp(&early)).unwrap(), early);
    }
}
