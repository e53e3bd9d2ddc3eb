use serde_json::json;
use vigil_core::{
    Artifact, EvidenceItem, GateContext, GateResult, PipelineError, Severity, GATE_IDENTITY,
};

use crate::gate::{now_unix, Gate, GateReport};

/// One identity attribute check. Each check yields exactly one evidence
/// item; a critical item fails the gate.
pub trait IdentityCheck: Send + Sync {
    fn attribute(&self) -> &str;
    fn run(&self, artifact: &Artifact) -> EvidenceItem;
}

/// Artifact ids must be non-empty and free of whitespace.
pub struct IdShapeCheck;

impl IdentityCheck for IdShapeCheck {
    fn attribute(&self) -> &str {
        "id"
    }

    fn run(&self, artifact: &Artifact) -> EvidenceItem {
        let id = artifact.id.as_str();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            EvidenceItem::critical("id_malformed", "artifact id is empty or malformed", json!(id))
        } else {
            EvidenceItem::info("id_well_formed", "artifact id is well-formed", json!(id))
        }
    }
}

/// Declared kind must match the structural shape of the content: json
/// kinds must parse, textual kinds must not carry NUL bytes. Unknown
/// kinds are recorded without judgement.
pub struct KindShapeCheck;

impl IdentityCheck for KindShapeCheck {
    fn attribute(&self) -> &str {
        "kind"
    }

    fn run(&self, artifact: &Artifact) -> EvidenceItem {
        match artifact.kind.as_str() {
            "json" => match serde_json::from_str::<serde_json::Value>(&artifact.content) {
                Ok(_) => EvidenceItem::info(
                    "kind_matches_content",
                    "declared json kind parses as json",
                    json!("json"),
                ),
                Err(e) => EvidenceItem::critical(
                    "kind_mismatch",
                    format!("declared json kind but content does not parse: {e}"),
                    json!("json"),
                ),
            },
            "text" | "doc" | "markdown" | "commit" => {
                if artifact.content.contains('\0') {
                    EvidenceItem::critical(
                        "kind_mismatch",
                        "textual kind carries binary content",
                        json!(artifact.kind),
                    )
                } else {
                    EvidenceItem::info(
                        "kind_matches_content",
                        "textual kind holds textual content",
                        json!(artifact.kind),
                    )
                }
            }
            other => EvidenceItem::info(
                "kind_unchecked",
                format!("no structural check registered for kind '{other}'"),
                json!(other),
            ),
        }
    }
}

/// Author, when declared, must be either `Name <addr@host>` or a plain
/// printable name.
pub struct AuthorFormatCheck;

impl IdentityCheck for AuthorFormatCheck {
    fn attribute(&self) -> &str {
        "author"
    }

    fn run(&self, artifact: &Artifact) -> EvidenceItem {
        let Some(author) = &artifact.author else {
            return EvidenceItem::info("author_undeclared", "no author to check", json!(null));
        };
        let trimmed = author.trim();
        let well_formed = if let (Some(open), Some(close)) = (trimmed.find('<'), trimmed.rfind('>'))
        {
            open < close && trimmed[open + 1..close].contains('@')
        } else {
            !trimmed.is_empty() && !trimmed.chars().any(char::is_control)
        };
        if well_formed {
            EvidenceItem::info("author_well_formed", "author format is well-formed", json!(author))
        } else {
            EvidenceItem::critical(
                "author_malformed",
                "author identity is malformed",
                json!(author),
            )
        }
    }
}

/// Internal-consistency check over the artifact's claimed identity. The
/// individual checks are pluggable; the gate contract is one evidence item
/// per attribute checked, failing iff any critical check fails.
pub struct IdentityGate {
    checks: Vec<Box<dyn IdentityCheck>>,
}

impl Default for IdentityGate {
    fn default() -> Self {
        Self {
            checks: vec![
                Box::new(IdShapeCheck),
                Box::new(KindShapeCheck),
                Box::new(AuthorFormatCheck),
            ],
        }
    }
}

impl IdentityGate {
    pub fn with_checks(checks: Vec<Box<dyn IdentityCheck>>) -> Self {
        Self { checks }
    }

    pub fn add_check(&mut self, check: Box<dyn IdentityCheck>) {
        self.checks.push(check);
    }
}

impl Gate for IdentityGate {
    fn name(&self) -> &str {
        GATE_IDENTITY
    }

    fn check(&self, artifact: &Artifact, _ctx: &GateContext) -> Result<GateResult, PipelineError> {
        let mut report = GateReport::new(GATE_IDENTITY);
        for check in &self.checks {
            let item = check.run(artifact);
            if item.severity == Severity::Critical {
                let reason = format!("{} check failed: {}", check.attribute(), item.description);
                report.reject(item, reason);
            } else {
                report.note(item);
            }
        }
        Ok(report.finish(now_unix()))
    }
}
