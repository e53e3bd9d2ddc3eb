use std::collections::HashMap;
use std::sync::Mutex;

use vigil_core::{Decision, Freshness, TrailEntry, TrailError, TrailFilter};

use crate::seq::{date_key, entry_id, rfc3339};
use crate::store::{filter_matches, TrailStore};

/// In-memory trail store for tests. Not durable, but it honors the same
/// append-only and counter invariants as the sqlite store.
#[derive(Default)]
pub struct InMemoryTrailStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Insertion-ordered journal. Entries are appended, never rewritten;
    /// lifecycle updates go through the maps below.
    order: Vec<String>,
    entries: HashMap<String, TrailEntry>,
    counters: HashMap<(String, String), u64>,
    archive: HashMap<String, TrailEntry>,
}

impl InMemoryTrailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrailStore for InMemoryTrailStore {
    fn log_decision(&self, decision: &Decision, now_unix: i64) -> Result<String, TrailError> {
        let date = date_key(now_unix)?;
        let created_at = rfc3339(now_unix)?;

        let mut inner = self.inner.lock().unwrap();
        let seq = {
            let c = inner
                .counters
                .entry((decision.kind.clone(), date.clone()))
                .or_insert(0);
            *c += 1;
            *c
        };
        let id = entry_id(&decision.kind, &date, seq, &decision.action);

        let entry = TrailEntry {
            id: id.clone(),
            kind: decision.kind.clone(),
            actor: decision.actor.clone(),
            description: decision.action.clone(),
            rationale: decision.rationale.clone(),
            outcome: decision.outcome,
            created_at,
            created_at_unix: now_unix,
            source_ref: decision.source_ref.clone(),
            freshness: Freshness::Fresh,
            bedrock_eligible: false,
            verified: false,
            verified_at: None,
            verified_by: None,
        };
        inner.order.push(id.clone());
        inner.entries.insert(id.clone(), entry);
        Ok(id)
    }

    fn next_seq(&self, kind: &str, date: &str) -> Result<u64, TrailError> {
        let mut inner = self.inner.lock().unwrap();
        let c = inner
            .counters
            .entry((kind.to_string(), date.to_string()))
            .or_insert(0);
        *c += 1;
        Ok(*c)
    }

    fn entry(&self, id: &str) -> Result<Option<TrailEntry>, TrailError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.entries.get(id).cloned())
    }

    fn query(&self, filter: &TrailFilter) -> Result<Vec<TrailEntry>, TrailError> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<TrailEntry> = inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .filter(|e| filter_matches(filter, e))
            .cloned()
            .collect();
        if filter.newest_first {
            out.reverse();
        }
        Ok(out)
    }

    fn unarchived_entries(&self) -> Result<Vec<TrailEntry>, TrailError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .order
            .iter()
            .filter(|id| !inner.archive.contains_key(*id))
            .filter_map(|id| inner.entries.get(id))
            .cloned()
            .collect())
    }

    fn advance_freshness(
        &self,
        id: &str,
        freshness: Freshness,
        bedrock_eligible: bool,
    ) -> Result<(), TrailError> {
        let mut inner = self.inner.lock().unwrap();
        let e = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| TrailError::NotFound(id.to_string()))?;
        // forward-only; regressions are ignored
        if freshness > e.freshness {
            e.freshness = freshness;
        }
        e.bedrock_eligible = e.bedrock_eligible || bedrock_eligible;
        Ok(())
    }

    fn mark_verified(&self, id: &str, by: &str, at_unix: i64) -> Result<(), TrailError> {
        let mut inner = self.inner.lock().unwrap();
        let e = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| TrailError::NotFound(id.to_string()))?;
        if e.verified {
            return Ok(());
        }
        e.verified = true;
        e.verified_at = Some(at_unix);
        e.verified_by = Some(by.to_string());
        Ok(())
    }

    fn archive_copy(&self, entry: &TrailEntry) -> Result<bool, TrailError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.archive.contains_key(&entry.id) {
            return Ok(false);
        }
        inner.archive.insert(entry.id.clone(), entry.clone());
        Ok(true)
    }

    fn is_archived(&self, id: &str) -> Result<bool, TrailError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.archive.contains_key(id))
    }

    fn archived_entries(&self) -> Result<Vec<TrailEntry>, TrailError> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<TrailEntry> = inner.archive.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vigil_core::Outcome;

    use super::*;

    fn decision(kind: &str, action: &str) -> Decision {
        Decision {
            kind: kind.to_string(),
            actor: "test".to_string(),
            action: action.to_string(),
            rationale: "because".to_string(),
            outcome: Outcome::Pass,
            source_ref: None,
        }
    }

    #[test]
    fn ids_are_unique_and_increasing_per_kind_and_date() {
        let store = InMemoryTrailStore::new();
        let now = 1_787_788_800; // 2026-08-27
        let a = store.log_decision(&decision("gate", "origin pass"), now).unwrap();
        let b = store.log_decision(&decision("gate", "intent pass"), now).unwrap();
        assert!(a.starts_with("GATE-20260827-0001-"));
        assert!(b.starts_with("GATE-20260827-0002-"));
        assert!(b > a);
    }

    #[test]
    fn counters_are_per_kind() {
        let store = InMemoryTrailStore::new();
        let now = 1_787_788_800;
        let a = store.log_decision(&decision("gate", "x"), now).unwrap();
        let b = store.log_decision(&decision("verify", "x"), now).unwrap();
        assert!(a.contains("-0001-"));
        assert!(b.contains("-0001-"));
    }

    #[test]
    fn concurrent_sequence_numbers_cover_one_to_n() {
        let store = Arc::new(InMemoryTrailStore::new());
        let n = 32;
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
    fn query_filters_and_preserves_insertion_order() {
        let store = InMemoryTrailStore::new();
        let now = 1_787_788_800;
        store.log_decision(&decision("gate", "first entry"), now).unwrap();
        store
            .log_decision(
                &Decision {
                    outcome: Outcome::Fail,
                    ..decision("gate", "second entry")
                },
                now + 10,
            )
            .unwrap();
        store.log_decision(&decision("verify", "third entry"), now + 20).unwrap();

        let all = store.query(&TrailFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].description.contains("first"));

        let fails = store
            .query(&TrailFilter {
                outcome: Some(Outcome::Fail),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(fails.len(), 1);

        let gates = store
            .query(&TrailFilter {
                kind: Some("gate".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(gates.len(), 2);

        let recent = store
            .query(&TrailFilter {
                created_after_unix: Some(now + 5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 2);

        let text = store
            .query(&TrailFilter {
                text: Some("THIRD".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(text.len(), 1);

        let newest = store
            .query(&TrailFilter {
                newest_first: true,
                ..Default::default()
            })
            .unwrap();
        assert!(newest[0].description.contains("third"));
    }

    #[test]
    fn freshness_never_regresses() {
        let store = InMemoryTrailStore::new();
        let id = store
            .log_decision(&decision("gate", "x"), 1_787_788_800)
            .unwrap();
        store.advance_freshness(&id, Freshness::Settled, false).unwrap();
        store.advance_freshness(&id, Freshness::Fresh, false).unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert_eq!(e.freshness, Freshness::Settled);
    }

    #[test]
    fn archive_copy_is_idempotent_and_keeps_original() {
        let store = InMemoryTrailStore::new();
        let id = store
            .log_decision(&decision("gate", "x"), 1_787_788_800)
            .unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert!(store.archive_copy(&e).unwrap());
        assert!(!store.archive_copy(&e).unwrap());
        assert!(store.is_archived(&id).unwrap());
        // original is still addressable
        assert!(store.entry(&id).unwrap().is_some());
        assert_eq!(store.archived_entries().unwrap().len(), 1);
    }

    #[test]
    fn mark_verified_is_idempotent() {
        let store = InMemoryTrailStore::new();
        let id = store
            .log_decision(&decision("gate", "x"), 1_787_788_800)
            .unwrap();
        store.mark_verified(&id, "operator", 100).unwrap();
        store.mark_verified(&id, "someone-else", 200).unwrap();
        let e = store.entry(&id).unwrap().unwrap();
        assert_eq!(e.verified_by.as_deref(), Some("operator"));
        assert_eq!(e.verified_at, Some(100));
    }
}
