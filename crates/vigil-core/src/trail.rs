use serde::{Deserialize, Serialize};

use crate::types::{Freshness, Outcome};

/// One durable audit record. Created once by the trail store; only the
/// lifecycle manager (freshness fields) and the verification gate
/// (verified fields) may update it afterwards. Never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrailEntry {
    pub id: String,
    pub kind: String,
    pub actor: String,
    pub description: String,
    pub rationale: String,
    pub outcome: Outcome,
    /// RFC3339 wall-clock duplicate of `created_at_unix`.
    pub created_at: String,
    pub created_at_unix: i64,
    #[serde(default)]
    pub source_ref: Option<String>,
    pub freshness: Freshness,
    pub bedrock_eligible: bool,
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<i64>,
    #[serde(default)]
    pub verified_by: Option<String>,
}

impl TrailEntry {
    pub fn age_secs(&self, now_unix: i64) -> i64 {
        now_unix - self.created_at_unix
    }
}

/// Input to `TrailStore::log_decision`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    /// Entry type tag; uppercased into the id prefix.
    pub kind: String,
    /// Who made the decision (a gate name, "pipeline", an operator, ...).
    pub actor: String,
    /// What was decided, in one line. Feeds the id slug.
    pub action: String,
    pub rationale: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub source_ref: Option<String>,
}

/// Filter for `TrailStore::query`. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct TrailFilter {
    pub kind: Option<String>,
    pub outcome: Option<Outcome>,
    pub created_after_unix: Option<i64>,
    pub created_before_unix: Option<i64>,
    /// Case-insensitive substring match on description.
    pub text: Option<String>,
    /// Results come back in insertion order unless set.
    pub newest_first: bool,
}
