use serde::Serialize;
use tracing::{debug, info};
use vigil_core::{Freshness, TrailError};
use vigil_trail::TrailStore;

use crate::freshness::classify;

/// What one lifecycle sweep did. Safe to render or ship to a scheduler.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub freshness_updates: usize,
    pub archived: Vec<String>,
    pub needs_verification: Vec<String>,
}

/// Recompute freshness for every entry not yet archived and promote
/// verified, sufficiently old entries to the archive. Intended to run as
/// a single instance (scheduled job); re-running is a no-op thanks to the
/// change-only writes and the store's insert-if-absent archive.
pub fn sweep(store: &dyn TrailStore, now_unix: i64) -> Result<SweepReport, TrailError> {
    let mut report = SweepReport::default();

    for entry in store.unarchived_entries()? {
        report.examined += 1;
        let level = classify(entry.age_secs(now_unix));

        if level != entry.freshness {
            store.advance_freshness(&entry.id, level, level >= Freshness::BedrockEligible)?;
            report.freshness_updates += 1;
            debug!(id = %entry.id, level = level.as_str(), "freshness advanced");
        }

        if level == Freshness::BedrockEligible {
            if entry.verified {
                // re-read so the archived snapshot carries the current
                // freshness and verification fields
                let current = store
                    .entry(&entry.id)?
                    .ok_or_else(|| TrailError::NotFound(entry.id.clone()))?;
                if store.archive_copy(&current)? {
                    store.advance_freshness(&entry.id, Freshness::Bedrock, true)?;
                    report.archived.push(entry.id.clone());
                    info!(id = %entry.id, "entry promoted to bedrock");
                }
            } else {
                report.needs_verification.push(entry.id.clone());
            }
        }
    }

    Ok(report)
}
