use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ids::{ArtifactId, RunId},
    types::Severity,
};

/// The unit of content under review. Immutable once submitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: String,
    pub content: String,
    /// Open, caller-defined key-value context. Gates validate this
    /// defensively; nothing here is assumed structured.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Artifact {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            kind: kind.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
            source: None,
            author: None,
            signature: None,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// One observation made by a gate. Append-only within a result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: String,
    pub description: String,
    pub value: Value,
    pub severity: Severity,
}

impl EvidenceItem {
    pub fn new(
        kind: impl Into<String>,
        description: impl Into<String>,
        value: Value,
        severity: Severity,
    ) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            value,
            severity,
        }
    }

    pub fn info(kind: impl Into<String>, description: impl Into<String>, value: Value) -> Self {
        Self::new(kind, description, value, Severity::Info)
    }

    pub fn warning(kind: impl Into<String>, description: impl Into<String>, value: Value) -> Self {
        Self::new(kind, description, value, Severity::Warning)
    }

    pub fn critical(kind: impl Into<String>, description: impl Into<String>, value: Value) -> Self {
        Self::new(kind, description, value, Severity::Critical)
    }
}

/// Outcome of one validator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: String,
    pub passed: bool,
    pub evidence: Vec<EvidenceItem>,
    pub reasoning: String,
    pub checked_at_unix: i64,
}

impl GateResult {
    pub fn has_critical(&self) -> bool {
        self.evidence.iter().any(|e| e.severity == Severity::Critical)
    }
}

/// Aggregate of a pipeline run. Created at start, filled as gates execute,
/// frozen at pipeline end (success or short-circuit failure).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    pub artifact_id: ArtifactId,
    pub overall_passed: bool,
    pub failed_at: Option<String>,
    pub gates: Vec<GateResult>,
    /// Trail entry ids created during the run, in logging order.
    pub trail_refs: Vec<String>,
}

impl PipelineResult {
    pub fn started(artifact_id: ArtifactId) -> Self {
        Self {
            run_id: RunId::new(),
            artifact_id,
            overall_passed: false,
            failed_at: None,
            gates: Vec::new(),
            trail_refs: Vec::new(),
        }
    }

    pub fn gate_result(&self, name: &str) -> Option<&GateResult> {
        self.gates.iter().find(|g| g.gate == name)
    }
}

/// Per-call context handed to each gate. Prior results are keyed by gate
/// name; `values` carries loosely-typed policy inputs from the caller.
#[derive(Clone, Debug, Default)]
pub struct GateContext {
    pub prior: BTreeMap<String, GateResult>,
    pub values: BTreeMap<String, Value>,
    /// Set when a gate is run standalone for diagnostics; the passage gate
    /// relaxes its prior-gate dependency in this mode.
    pub standalone: bool,
}

impl GateContext {
    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn value_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_i64())
    }

    pub fn value_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.values.get(key).and_then(|v| v.as_array()).map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifact_metadata_lookup() {
        let mut a = Artifact::new("doc", "hello");
        a.metadata.insert("intent".into(), json!("read config"));
        assert_eq!(a.metadata_str("intent"), Some("read config"));
        assert_eq!(a.metadata_str("missing"), None);
    }

    #[test]
    fn gate_result_detects_critical_evidence() {
        let r = GateResult {
            gate: "intent".into(),
            passed: false,
            evidence: vec![EvidenceItem::critical("intent_missing", "no intent", json!(null))],
            reasoning: "no intent".into(),
            checked_at_unix: 0,
        };
        assert!(r.has_critical());
    }

    #[test]
    fn context_reads_loose_values_defensively() {
        let mut ctx = GateContext::default();
        ctx.values.insert("environment".into(), json!("prod"));
        ctx.values.insert("rate_limit".into(), json!(5));
        ctx.values.insert("granted_permissions".into(), json!(["read", 7]));
        assert_eq!(ctx.value_str("environment"), Some("prod"));
        assert_eq!(ctx.value_i64("rate_limit"), Some(5));
        // non-string array members are ignored, not errors
        assert_eq!(ctx.value_str_list("granted_permissions").unwrap(), vec!["read"]);
        assert_eq!(ctx.value_str("rate_limit"), None);
    }
}
