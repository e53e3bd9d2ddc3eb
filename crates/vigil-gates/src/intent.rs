use serde_json::json;
use vigil_core::{Artifact, EvidenceItem, GateContext, GateResult, PipelineError, GATE_INTENT};

use crate::gate::{now_unix, Gate, GateReport};

/// One class of sensitive operation the content scan looks for. If any of
/// `patterns` appears in the content, the declared intent must mention at
/// least one of `terms`.
struct SensitiveMarker {
    name: &'static str,
    patterns: &'static [&'static str],
    terms: &'static [&'static str],
}

const MARKERS: &[SensitiveMarker] = &[
    SensitiveMarker {
        name: "code_execution",
        patterns: &["exec(", "eval(", "system(", "subprocess", "spawn("],
        terms: &["exec", "execute", "run", "command", "spawn", "script"],
    },
    SensitiveMarker {
        name: "path_traversal",
        patterns: &["../", "..\\"],
        terms: &["path", "file", "directory", "folder", "traversal"],
    },
    SensitiveMarker {
        name: "credential_access",
        patterns: &["password", "passwd", "secret", "api_key", "apikey", "credential"],
        terms: &["password", "secret", "key", "credential", "auth", "login"],
    },
];

/// Declared-purpose check: the artifact must say what it intends to do,
/// and the declaration must cover what the content actually does.
pub struct IntentGate;

impl Gate for IntentGate {
    fn name(&self) -> &str {
        GATE_INTENT
    }

    fn check(&self, artifact: &Artifact, _ctx: &GateContext) -> Result<GateResult, PipelineError> {
        let mut report = GateReport::new(GATE_INTENT);

        let intent = match artifact.metadata_str("intent") {
            Some(s) if !s.trim().is_empty() => s.to_lowercase(),
            _ => {
                report.reject(
                    EvidenceItem::critical(
                        "intent_missing",
                        "artifact metadata declares no intent",
                        json!(null),
                    ),
                    "no declared intent",
                );
                return Ok(report.finish(now_unix()));
            }
        };

        report.note(EvidenceItem::info(
            "intent_declared",
            "artifact declares an intent",
            json!(intent),
        ));

        let content = artifact.content.to_lowercase();
        let mut undeclared: Vec<&'static str> = Vec::new();
        for marker in MARKERS {
            if !marker.patterns.iter().any(|p| content.contains(p)) {
                continue;
            }
            if marker.terms.iter().any(|t| intent.contains(t)) {
                report.note(EvidenceItem::info(
                    "declared_capability",
                    format!("content uses {} and the intent covers it", marker.name),
                    json!(marker.name),
                ));
            } else {
                undeclared.push(marker.name);
            }
        }

        if !undeclared.is_empty() {
            report.reject(
                EvidenceItem::critical(
                    "undeclared_capabilities",
                    format!(
                        "content performs sensitive operations not covered by the declared intent: {}",
                        undeclared.join(", ")
                    ),
                    json!(undeclared),
                ),
                "declared intent does not cover sensitive operations",
            );
        }

        Ok(report.finish(now_unix()))
    }
}
