use serde_json::json;
use vigil_core::{Artifact, EvidenceItem, GateContext, GateResult, PipelineError, GATE_ORIGIN};

use crate::gate::{now_unix, Gate, GateReport};

/// Provenance check. Strict: unknown provenance is always rejected, so a
/// missing source reference fails the gate even though it is only
/// warning-severity evidence. A missing author is recorded but does not by
/// itself fail the gate.
pub struct OriginGate;

impl Gate for OriginGate {
    fn name(&self) -> &str {
        GATE_ORIGIN
    }

    fn check(&self, artifact: &Artifact, _ctx: &GateContext) -> Result<GateResult, PipelineError> {
        let mut report = GateReport::new(GATE_ORIGIN);

        match &artifact.source {
            Some(source) => {
                report.note(EvidenceItem::info(
                    "source_present",
                    "artifact carries a source reference",
                    json!(source),
                ));
            }
            None => {
                report.reject(
                    EvidenceItem::warning(
                        "source_missing",
                        "artifact has no source reference",
                        json!(null),
                    ),
                    "no source reference; provenance unknown",
                );
            }
        }

        match &artifact.author {
            Some(author) => report.note(EvidenceItem::info(
                "author_present",
                "artifact declares an author",
                json!(author),
            )),
            None => report.note(EvidenceItem::info(
                "author_missing",
                "artifact declares no author",
                json!(null),
            )),
        }

        if let Some(sig) = &artifact.signature {
            report.note(EvidenceItem::info(
                "signature_present",
                "artifact carries a signature",
                json!(sig.len()),
            ));
        }

        if let Some(back_ref) = artifact.metadata_str("trail_ref") {
            report.note(EvidenceItem::info(
                "trail_back_reference",
                "artifact references a prior trail entry",
                json!(back_ref),
            ));
        }

        Ok(report.finish(now_unix()))
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::Severity;

    use super::*;

    #[test]
    fn missing_source_fails_with_warning_evidence() {
        let a = Artifact::new("doc", "text");
        let r = OriginGate.check(&a, &GateContext::default()).unwrap();
        assert!(!r.passed);
        let item = r.evidence.iter().find(|e| e.kind == "source_missing").unwrap();
        assert_eq!(item.severity, Severity::Warning);
    }

    #[test]
    fn missing_author_alone_does_not_fail() {
        let mut a = Artifact::new("doc", "text");
        a.source = Some("repo://origin".into());
        let r = OriginGate.check(&a, &GateContext::default()).unwrap();
        assert!(r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "author_missing"));
    }

    #[test]
    fn signature_and_back_reference_are_recorded() {
        let mut a = Artifact::new("doc", "text");
        a.source = Some("repo://origin".into());
        a.author = Some("Ada <ada@example.org>".into());
        a.signature = Some("sig-bytes".into());
        a.metadata
            .insert("trail_ref".into(), serde_json::json!("GATE-20260101-0001-x"));
        let r = OriginGate.check(&a, &GateContext::default()).unwrap();
        assert!(r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "signature_present"));
        assert!(r.evidence.iter().any(|e| e.kind == "trail_back_reference"));
    }
}
