use vigil_core::{Decision, Freshness, TrailEntry, TrailError, TrailFilter};

/// Append-only audit trail plus the sequence service that names its
/// entries. Historical content is never rewritten; the only permitted
/// updates are the freshness and verification fields, through the
/// dedicated operations below.
pub trait TrailStore: Send + Sync {
    /// Append one decision, generating its `{TYPE}-{DATE}-{SEQ}-{slug}` id.
    /// The underlying counter increment must be atomic under concurrent
    /// callers: for a fixed (kind, date), ids are unique and strictly
    /// increasing in creation order.
    fn log_decision(&self, decision: &Decision, now_unix: i64) -> Result<String, TrailError>;

    /// Next sequence number for (kind, date). Exposed for stress testing;
    /// `log_decision` goes through this same counter.
    fn next_seq(&self, kind: &str, date: &str) -> Result<u64, TrailError>;

    fn entry(&self, id: &str) -> Result<Option<TrailEntry>, TrailError>;

    /// Filtered read. Insertion order unless `filter.newest_first`.
    fn query(&self, filter: &TrailFilter) -> Result<Vec<TrailEntry>, TrailError>;

    /// Entries not yet promoted to the archive, for the lifecycle sweep.
    fn unarchived_entries(&self) -> Result<Vec<TrailEntry>, TrailError>;

    /// Write back a recomputed freshness level. Callers only invoke this
    /// when the level actually changed; the store enforces forward-only
    /// movement by ignoring regressions.
    fn advance_freshness(
        &self,
        id: &str,
        freshness: Freshness,
        bedrock_eligible: bool,
    ) -> Result<(), TrailError>;

    fn mark_verified(&self, id: &str, by: &str, at_unix: i64) -> Result<(), TrailError>;

    /// Copy an entry into the permanent archive. Idempotent insert-if-absent:
    /// returns true when a copy was made, false when one already existed.
    /// The original entry is never removed.
    fn archive_copy(&self, entry: &TrailEntry) -> Result<bool, TrailError>;

    fn is_archived(&self, id: &str) -> Result<bool, TrailError>;

    fn archived_entries(&self) -> Result<Vec<TrailEntry>, TrailError>;
}

/// Shared filter predicate so the in-memory and sqlite stores agree on
/// query semantics.
pub fn filter_matches(filter: &TrailFilter, entry: &TrailEntry) -> bool {
    if let Some(kind) = &filter.kind {
        if &entry.kind != kind {
            return false;
        }
    }
    if let Some(want) = filter.outcome {
        if entry.outcome != want {
            return false;
        }
    }
    if let Some(after) = filter.created_after_unix {
        if entry.created_at_unix < after {
            return false;
        }
    }
    if let Some(before) = filter.created_before_unix {
        if entry.created_at_unix > before {
            return false;
        }
    }
    if let Some(text) = &filter.text {
        if !entry
            .description
            .to_lowercase()
            .contains(&text.to_lowercase())
        {
            return false;
        }
    }
    true
}
