use serde::Serialize;
use tracing::warn;
use vigil_core::{Decision, Outcome, TrailError};
use vigil_trail::TrailStore;

use crate::freshness::{DAY_SECS, FRESH_MAX_DAYS};

/// Result of a verification call.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VerifyOutcome {
    pub verified: bool,
    /// The entry was younger than 30 days; verification is allowed but
    /// the operator should take a second look.
    pub warned_fresh: bool,
    /// The entry was already verified; this call was a no-op.
    pub already_verified: bool,
}

/// Mark a trail entry as verified, the prerequisite for archival. The
/// entry must exist and carry its required fields; verifying an
/// already-verified entry is a no-op success.
pub fn verify(
    store: &dyn TrailStore,
    entry_id: &str,
    by: Option<&str>,
    now_unix: i64,
) -> Result<VerifyOutcome, TrailError> {
    let entry = store
        .entry(entry_id)?
        .ok_or_else(|| TrailError::NotFound(entry_id.to_string()))?;

    if entry.kind.is_empty() || entry.description.is_empty() || entry.created_at_unix <= 0 {
        return Err(TrailError::Storage(anyhow::anyhow!(
            "entry {entry_id} is missing required fields"
        )));
    }

    if entry.verified {
        return Ok(VerifyOutcome {
            verified: true,
            warned_fresh: false,
            already_verified: true,
        });
    }

    let warned_fresh = entry.age_secs(now_unix) < FRESH_MAX_DAYS * DAY_SECS;
    if warned_fresh {
        warn!(id = %entry_id, "verifying an entry younger than 30 days");
    }

    let actor = by.unwrap_or("manual");
    store.mark_verified(entry_id, actor, now_unix)?;
    store.log_decision(
        &Decision {
            kind: "verify".into(),
            actor: actor.to_string(),
            action: format!("verified {entry_id}"),
            rationale: if warned_fresh {
                "verified while still fresh".into()
            } else {
                "verified".into()
            },
            outcome: Outcome::Pass,
            source_ref: Some(entry_id.to_string()),
        },
        now_unix,
    )?;

    Ok(VerifyOutcome {
        verified: true,
        warned_fresh,
        already_verified: false,
    })
}
