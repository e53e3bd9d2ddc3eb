use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use rusqlite::{params, Connection, Row};
use vigil_core::{Decision, Freshness, Outcome, TrailEntry, TrailError, TrailFilter};
use vigil_trail::{date_key, entry_id, filter_matches, rfc3339, TrailStore};

/// Durable trail store. The connection mutex serializes counter
/// increments and appends within the process; the schema's primary keys
/// keep the invariants honest across processes.
pub struct SqliteTrailStore {
    conn: Mutex<Connection>,
}

impl SqliteTrailStore {
    pub fn open(db_path: &Path) -> Result<Self, TrailError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))
            .map_err(TrailError::Storage)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(TrailError::storage)?;
        // bounded waits; a stuck trail write surfaces as an error instead
        // of blocking the pipeline indefinitely
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(TrailError::storage)?;
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).map_err(TrailError::storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, TrailError> {
        let conn = Connection::open_in_memory().map_err(TrailError::storage)?;
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).map_err(TrailError::storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn outcome_to_str(o: Outcome) -> &'static str {
        o.as_str()
    }

    fn str_to_outcome(s: &str) -> Outcome {
        match s {
            "pass" => Outcome::Pass,
            "fail" => Outcome::Fail,
            _ => Outcome::Info,
        }
    }

    fn row_to_entry(r: &Row<'_>) -> rusqlite::Result<TrailEntry> {
        Ok(TrailEntry {
            id: r.get(0)?,
            kind: r.get(1)?,
            actor: r.get(2)?,
            description: r.get(3)?,
            rationale: r.get(4)?,
            outcome: Self::str_to_outcome(&r.get::<_, String>(5)?),
            created_at: r.get(6)?,
            created_at_unix: r.get(7)?,
            source_ref: r.get(8)?,
            freshness: Freshness::parse(&r.get::<_, String>(9)?),
            bedrock_eligible: r.get::<_, i64>(10)? != 0,
            verified: r.get::<_, i64>(11)? != 0,
            verified_at: r.get(12)?,
            verified_by: r.get(13)?,
        })
    }

    const ENTRY_COLS: &'static str = "id, kind, actor, description, rationale, outcome, \
         created_at, created_at_unix, source_ref, freshness, bedrock_eligible, \
         verified, verified_at, verified_by";
}

impl TrailStore for SqliteTrailStore {
    fn log_decision(&self, decision: &Decision, now_unix: i64) -> Result<String, TrailError> {
        let date = date_key(now_unix)?;
        let created_at = rfc3339(now_unix)?;

        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction().map_err(TrailError::storage)?;

        let seq: i64 = tx
            .query_row(
                "INSERT INTO counters(kind, date, value) VALUES (?1, ?2, 1)
                 ON CONFLICT(kind, date) DO UPDATE SET value = value + 1
                 RETURNING value",
                params![decision.kind, date],
                |r| r.get(0),
            )
            .map_err(TrailError::storage)?;

        let id = entry_id(&decision.kind, &date, seq as u64, &decision.action);

        let payload = serde_json::to_string(decision).map_err(TrailError::storage)?;
        tx.execute(
            "INSERT INTO trail_journal(entry_id, recorded_at, payload_json) VALUES (?1, ?2, ?3)",
            params![id, now_unix, payload],
        )
        .map_err(TrailError::storage)?;

        tx.execute(
            "INSERT INTO trail_entries(id, kind, actor, description, rationale, outcome,
                                       created_at, created_at_unix, source_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                decision.kind,
                decision.actor,
                decision.action,
                decision.rationale,
                Self::outcome_to_str(decision.outcome),
                created_at,
                now_unix,
                decision.source_ref
            ],
        )
        .map_err(TrailError::storage)?;

        tx.commit().map_err(TrailError::storage)?;
        Ok(id)
    }

    fn next_seq(&self, kind: &str, date: &str) -> Result<u64, TrailError> {
        let conn = self.conn.lock().unwrap();
        let seq: i64 = conn
            .query_row(
                "INSERT INTO counters(kind, date, value) VALUES (?1, ?2, 1)
                 ON CONFLICT(kind, date) DO UPDATE SET value = value + 1
                 RETURNING value",
                params![kind, date],
                |r| r.get(0),
            )
            .map_err(TrailError::storage)?;
        Ok(seq as u64)
    }

    fn entry(&self, id: &str) -> Result<Option<TrailEntry>, TrailError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM trail_entries WHERE id = ?1", Self::ENTRY_COLS);
        let mut stmt = conn.prepare(&sql).map_err(TrailError::storage)?;
        let mut rows = stmt
            .query_map(params![id], Self::row_to_entry)
            .map_err(TrailError::storage)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(TrailError::storage)?)),
            None => Ok(None),
        }
    }

    fn query(&self, filter: &TrailFilter) -> Result<Vec<TrailEntry>, TrailError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM trail_entries ORDER BY rowid",
            Self::ENTRY_COLS
        );
        let mut stmt = conn.prepare(&sql).map_err(TrailError::storage)?;
        let rows = stmt
            .query_map([], Self::row_to_entry)
            .map_err(TrailError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            let e = row.map_err(TrailError::storage)?;
            if filter_matches(filter, &e) {
                out.push(e);
            }
        }
        if filter.newest_first {
            out.reverse();
        }
        Ok(out)
    }

    fn unarchived_entries(&self) -> Result<Vec<TrailEntry>, TrailError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM trail_entries e
             WHERE NOT EXISTS (SELECT 1 FROM bedrock b WHERE b.id = e.id)
             ORDER BY e.rowid",
            Self::ENTRY_COLS
        );
        let mut stmt = conn.prepare(&sql).map_err(TrailError::storage)?;
        let rows = stmt
            .query_map([], Self::row_to_entry)
            .map_err(TrailError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(TrailError::storage)?);
        }
        Ok(out)
    }

    fn advance_freshness(
        &self,
        id: &str,
        freshness: Freshness,
        bedrock_eligible: bool,
    ) -> Result<(), TrailError> {
        let conn = self.conn.lock().unwrap();
        let current: String = conn
            .query_row(
                "SELECT freshness FROM trail_entries WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => TrailError::NotFound(id.to_string()),
                other => TrailError::storage(other),
            })?;
        // forward-only; regressions are ignored
        if freshness <= Freshness::parse(&current) {
            if bedrock_eligible {
                conn.execute(
                    "UPDATE trail_entries SET bedrock_eligible = 1 WHERE id = ?1",
                    params![id],
                )
                .map_err(TrailError::storage)?;
            }
            return Ok(());
        }
        conn.execute(
            "UPDATE trail_entries SET freshness = ?1,
                    bedrock_eligible = CASE WHEN ?2 THEN 1 ELSE bedrock_eligible END
             WHERE id = ?3",
            params![freshness.as_str(), bedrock_eligible, id],
        )
        .map_err(TrailError::storage)?;
        Ok(())
    }

    fn mark_verified(&self, id: &str, by: &str, at_unix: i64) -> Result<(), TrailError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE trail_entries SET verified = 1, verified_at = ?1, verified_by = ?2
                 WHERE id = ?3 AND verified = 0",
                params![at_unix, by, id],
            )
            .map_err(TrailError::storage)?;
        if updated == 0 {
            // no-op when already verified; error when absent
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(1) FROM trail_entries WHERE id = ?1",
                    params![id],
                    |r| r.get(0),
                )
                .map_err(TrailError::storage)?;
            if exists == 0 {
                return Err(TrailError::NotFound(id.to_string()));
            }
        }
        Ok(())
    }

    fn archive_copy(&self, entry: &TrailEntry) -> Result<bool, TrailError> {
        let conn = self.conn.lock().unwrap();
        let entry_json = serde_json::to_string(entry).map_err(TrailError::storage)?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO bedrock(id, archived_at, entry_json) VALUES (?1, ?2, ?3)",
                params![entry.id, entry.created_at_unix, entry_json],
            )
            .map_err(TrailError::storage)?;
        Ok(inserted > 0)
    }

    fn is_archived(&self, id: &str) -> Result<bool, TrailError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(1) FROM bedrock WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .map_err(TrailError::storage)?;
        Ok(count > 0)
    }

    fn archived_entries(&self) -> Result<Vec<TrailEntry>, TrailError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT entry_json FROM bedrock ORDER BY id")
            .map_err(TrailError::storage)?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(TrailError::storage)?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(TrailError::storage)?;
            out.push(serde_json::from_str(&json).map_err(TrailError::storage)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;

    fn decision(kind: &str, action: &str, outcome: Outcome) -> Decision {
        Decision {
            kind: kind.to_string(),
            actor: "test".to_string(),
            action: action.to_string(),
            rationale: "because".to_string(),
            outcome,
            source_ref: None,
        }
    }

    #[test]
    fn open_and_migrate() {
        let dir = tempdir().unwrap();
        let _ = SqliteTrailStore::open(&dir.path().join("vigil.db")).unwrap();
    }

    #[test]
    fn log_and_fetch_round_trip() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let now = 1_787_788_800;
        let id = store
            .log_decision(&decision("gate", "origin pass", Outcome::Pass), now)
            .unwrap();
        assert!(id.starts_with("GATE-20260827-0001-"));

        let e = store.entry(&id).unwrap().unwrap();
        assert_eq!(e.kind, "gate");
        assert_eq!(e.outcome, Outcome::Pass);
        assert_eq!(e.created_at_unix, now);
        assert!(e.created_at.starts_with("2026-08-27"));
        assert_eq!(e.freshness, Freshness::Fresh);
        assert!(!e.verified);
    }

    #[test]
    fn sequences_increase_per_kind_and_date() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let now = 1_787_788_800;
        let a = store
            .log_decision(&decision("gate", "a", Outcome::Pass), now)
            .unwrap();
        let b = store
            .log_decision(&decision("gate", "b", Outcome::Pass), now)
            .unwrap();
        let c = store
            .log_decision(&decision("verify", "c", Outcome::Pass), now)
            .unwrap();
        assert!(a.contains("-0001-"));
        assert!(b.contains("-0002-"));
        assert!(c.contains("-0001-"));
    }

    #[test]
    fn concurrent_next_seq_covers_one_to_n() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteTrailStore::open(&dir.path().join("vigil.db")).unwrap());
        let n = 16;
        let mut handles = Vec::new();
        for _ in 0..n {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.next_seq("gate", "20260827").unwrap()
            }));
        }
        let mut seqs: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=n as u64).collect::<Vec<_>>());
    }

    #[test]
    fn query_filters_match_memory_semantics() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let now = 1_787_788_800;
        store
            .log_decision(&decision("gate", "first", Outcome::Pass), now)
            .unwrap();
        store
            .log_decision(&decision("gate", "second", Outcome::Fail), now + 10)
            .unwrap();
        store
            .log_decision(&decision("verify", "third", Outcome::Info), now + 20)
            .unwrap();

        assert_eq!(store.query(&TrailFilter::default()).unwrap().len(), 3);
        assert_eq!(
            store
                .query(&TrailFilter {
                    outcome: Some(Outcome::Fail),
                    ..Default::default()
                })
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store
                .query(&TrailFilter {
                    kind: Some("gate".into()),
                    created_after_unix: Some(now + 5),
                    ..Default::default()
                })
                .unwrap()
                .len(),
            1
        );
        let newest = store
            .query(&TrailFilter {
                newest_first: true,
                ..Default::default()
            })
            .unwrap();
        assert!(newest[0].description.contains("third"));
    }

    #[test]
    fn freshness_updates_are_forward_only() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let id = store
            .log_decision(&decision("gate", "x", Outcome::Pass), 1_787_788_800)
            .unwrap();
        store
            .advance_freshness(&id, Freshness::Settled, false)
            .unwrap();
        store.advance_freshness(&id, Freshness::Aging, false).unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert_eq!(e.freshness, Freshness::Settled);
    }

    #[test]
    fn archive_copy_is_idempotent() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let id = store
            .log_decision(&decision("gate", "x", Outcome::Pass), 1_787_788_800)
            .unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert!(store.archive_copy(&e).unwrap());
        assert!(!store.archive_copy(&e).unwrap());
        assert!(store.is_archived(&id).unwrap());
        assert!(store.entry(&id).unwrap().is_some());
        assert_eq!(store.unarchived_entries().unwrap().len(), 0);
        assert_eq!(store.archived_entries().unwrap().len(), 1);
    }

    #[test]
    fn verify_is_idempotent_and_checks_existence() {
        let store = SqliteTrailStore::open_in_memory().unwrap();
        let id = store
            .log_decision(&decision("gate", "x", Outcome::Pass), 1_787_788_800)
            .unwrap();
        store.mark_verified(&id, "operator", 100).unwrap();
        store.mark_verified(&id, "later", 200).unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert_eq!(e.verified_by.as_deref(), Some("operator"));
        assert_eq!(e.verified_at, Some(100));

        let err = store.mark_verified("missing-id", "x", 1).unwrap_err();
        assert!(matches!(err, TrailError::NotFound(_)));
    }
}
