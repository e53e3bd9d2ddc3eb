use vigil_core::{Artifact, EvidenceItem, GateContext, GateResult, PipelineError};

/// One independent check in the pipeline. Implementations must be pure
/// functions of their inputs (no hidden shared state) so gates can be
/// tested, replayed, and run out of order for diagnostics.
pub trait Gate: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, artifact: &Artifact, ctx: &GateContext) -> Result<GateResult, PipelineError>;
}

/// Accumulates evidence and rationale for one gate run, then freezes into
/// a `GateResult`.
pub struct GateReport {
    gate: String,
    evidence: Vec<EvidenceItem>,
    reasons: Vec<String>,
    failed: bool,
}

impl GateReport {
    pub fn new(gate: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            evidence: Vec::new(),
            reasons: Vec::new(),
            failed: false,
        }
    }

    /// Record evidence without affecting the verdict.
    pub fn note(&mut self, item: EvidenceItem) {
        self.evidence.push(item);
    }

    /// Record evidence that rejects the artifact.
    pub fn reject(&mut self, item: EvidenceItem, reason: impl Into<String>) {
        self.evidence.push(item);
        self.reasons.push(reason.into());
        self.failed = true;
    }

    pub fn reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Fail on gate policy alone, without a dedicated evidence item.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
        self.failed = true;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn finish(self, checked_at_unix: i64) -> GateResult {
        let reasoning = if self.reasons.is_empty() {
            format!("{}: all checks passed", self.gate)
        } else {
            self.reasons.join("; ")
        };
        GateResult {
            gate: self.gate,
            passed: !self.failed,
            evidence: self.evidence,
            reasoning,
            checked_at_unix,
        }
    }
}

pub(crate) fn now_unix() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vigil_core::Severity;

    use super::*;

    #[test]
    fn report_passes_when_nothing_rejected() {
        let mut r = GateReport::new("origin");
        r.note(EvidenceItem::info("source_present", "source set", json!("repo")));
        let result = r.finish(1);
        assert!(result.passed);
        assert_eq!(result.evidence.len(), 1);
        assert!(result.reasoning.contains("all checks passed"));
    }

    #[test]
    fn report_fails_and_joins_reasons() {
        let mut r = GateReport::new("intent");
        r.reject(
            EvidenceItem::critical("intent_missing", "no intent", json!(null)),
            "intent missing",
        );
        r.reason("second note");
        let result = r.finish(1);
        assert!(!result.passed);
        assert_eq!(result.evidence[0].severity, Severity::Critical);
        assert_eq!(result.reasoning, "intent missing; second note");
    }
}
