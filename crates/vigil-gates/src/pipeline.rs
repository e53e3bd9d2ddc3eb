use std::collections::BTreeMap;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use vigil_core::{
    Artifact, Decision, GateContext, GateResult, Outcome, PipelineError, PipelineResult,
    STANDARD_GATE_ORDER,
};
use vigil_trail::TrailStore;

use crate::coherence::DEFAULT_THRESHOLD;
use crate::gate::{now_unix, Gate};
use crate::registry::GateRegistry;

/// Per-call knobs. `context` feeds the gates' loosely-typed policy values;
/// `skip` exists for testing and diagnostics.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub threshold: f64,
    pub skip: Vec<String>,
    pub context: BTreeMap<String, Value>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            skip: Vec::new(),
            context: BTreeMap::new(),
        }
    }
}

/// Runs gates in fixed order, short-circuits on first failure, and logs a
/// trail entry after every gate. Validators stay stateless; the pipeline
/// owns sequencing and side effects.
pub struct Pipeline {
    registry: GateRegistry,
    order: Vec<String>,
}

impl Pipeline {
    pub fn standard() -> Self {
        Self {
            registry: GateRegistry::standard(),
            order: STANDARD_GATE_ORDER.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Register a custom gate. With `append_to_order` it also runs at the
    /// end of every pipeline call; otherwise it is only addressable via
    /// `validate_gate`.
    pub fn register(&mut self, gate: Box<dyn Gate>, append_to_order: bool) {
        let name = gate.name().to_string();
        self.registry.register(gate);
        if append_to_order && !self.order.contains(&name) {
            self.order.push(name);
        }
    }

    pub fn gate_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    fn base_context(opts: &PipelineOptions) -> Result<GateContext, PipelineError> {
        if !opts.threshold.is_finite() || !(0.0..=100.0).contains(&opts.threshold) {
            return Err(PipelineError::Configuration(format!(
                "coherence threshold {} outside [0, 100]",
                opts.threshold
            )));
        }
        let mut ctx = GateContext {
            values: opts.context.clone(),
            ..GateContext::default()
        };
        ctx.values.insert("threshold".into(), json!(opts.threshold));
        Ok(ctx)
    }

    fn content_digest(artifact: &Artifact) -> String {
        let mut hasher = Sha256::new();
        hasher.update(artifact.content.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Full pipeline run. Every executed gate is logged before the next
    /// one runs; a failing gate stops the run; gate-internal errors are
    /// logged and re-raised.
    pub fn validate(
        &self,
        store: &dyn TrailStore,
        artifact: &Artifact,
        opts: &PipelineOptions,
    ) -> Result<PipelineResult, PipelineError> {
        let mut ctx = Self::base_context(opts)?;
        let digest = Self::content_digest(artifact);
        let mut result = PipelineResult::started(artifact.id.clone());

        for name in &self.order {
            if opts.skip.iter().any(|s| s == name) {
                debug!(gate = %name, "gate skipped by options");
                continue;
            }
            let gate = self
                .registry
                .get(name)
                .ok_or_else(|| PipelineError::UnknownGate(name.clone()))?;

            let gate_result = match gate.check(artifact, &ctx) {
                Ok(r) => r,
                Err(e) => {
                    warn!(gate = %name, error = %e, "gate raised; logging and re-raising");
                    store.log_decision(
                        &Decision {
                            kind: "gate".into(),
                            actor: name.clone(),
                            action: format!("{name} gate error"),
                            rationale: e.to_string(),
                            outcome: Outcome::Fail,
                            source_ref: Some(digest.clone()),
                        },
                        now_unix(),
                    )?;
                    return Err(e);
                }
            };

            let entry_id = store.log_decision(
                &Decision {
                    kind: "gate".into(),
                    actor: name.clone(),
                    action: format!(
                        "{name} gate {}",
                        if gate_result.passed { "pass" } else { "fail" }
                    ),
                    rationale: gate_result.reasoning.clone(),
                    outcome: if gate_result.passed {
                        Outcome::Pass
                    } else {
                        Outcome::Fail
                    },
                    source_ref: Some(digest.clone()),
                },
                now_unix(),
            )?;
            result.trail_refs.push(entry_id);

            let passed = gate_result.passed;
            ctx.prior.insert(name.clone(), gate_result.clone());
            result.gates.push(gate_result);

            if !passed {
                result.failed_at = Some(name.clone());
                result.overall_passed = false;
                return Ok(result);
            }
        }

        let entry_id = store.log_decision(
            &Decision {
                kind: "pipeline".into(),
                actor: "pipeline".into(),
                action: "pipeline pass".into(),
                rationale: format!(
                    "all gates passed for artifact {}",
                    artifact.id.as_str()
                ),
                outcome: Outcome::Pass,
                source_ref: Some(digest),
            },
            now_unix(),
        )?;
        result.trail_refs.push(entry_id);
        result.overall_passed = true;
        Ok(result)
    }

    /// Run exactly one gate standalone, for diagnostics. No trail logging;
    /// the passage gate's prior-gate dependency is bypassed by the
    /// standalone marker.
    pub fn validate_gate(
        &self,
        name: &str,
        artifact: &Artifact,
        opts: &PipelineOptions,
    ) -> Result<GateResult, PipelineError> {
        let mut ctx = Self::base_context(opts)?;
        ctx.standalone = true;
        let gate = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::UnknownGate(name.to_string()))?;
        gate.check(artifact, &ctx)
    }
}
