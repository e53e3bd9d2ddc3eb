use serde_json::json;
use vigil_core::{
    Artifact, EvidenceItem, GateContext, GateResult, PipelineError, GATE_COHERENCE, GATE_IDENTITY,
    GATE_INTENT, GATE_ORIGIN, GATE_PASSAGE,
};

use crate::gate::{now_unix, Gate, GateReport};

const PRIOR_GATES: [&str; 4] = [GATE_ORIGIN, GATE_INTENT, GATE_COHERENCE, GATE_IDENTITY];

/// Final authorization decision. Requires the four prior gate results via
/// context, then evaluates caller-supplied policy: permissions,
/// environment allow-list, rate counter, and an optional explicit
/// authorized/denied flag that is the final word over the policy checks.
pub struct PassageGate;

impl PassageGate {
    /// Policy checks over the loosely-typed context values. Returns true
    /// when any check rejected.
    fn evaluate_policy(ctx: &GateContext, report: &mut GateReport) -> bool {
        let mut rejected = false;

        let required = ctx.value_str_list("required_permissions").unwrap_or_default();
        let granted = ctx.value_str_list("granted_permissions").unwrap_or_default();
        let missing: Vec<&String> = required.iter().filter(|p| !granted.contains(p)).collect();
        if !missing.is_empty() {
            report.reject(
                EvidenceItem::critical(
                    "permission_missing",
                    format!(
                        "required permissions not granted: {}",
                        missing
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    json!(missing),
                ),
                "missing required permissions",
            );
            rejected = true;
        }

        if let Some(allowed) = ctx.value_str_list("allowed_environments") {
            match ctx.value_str("environment") {
                Some(env) if allowed.iter().any(|a| a == env) => {
                    report.note(EvidenceItem::info(
                        "environment_allowed",
                        format!("environment '{env}' is on the allow-list"),
                        json!(env),
                    ));
                }
                Some(env) => {
                    report.reject(
                        EvidenceItem::critical(
                            "environment_denied",
                            format!("environment '{env}' is not on the allow-list"),
                            json!({ "environment": env, "allowed": allowed }),
                        ),
                        "environment not allowed",
                    );
                    rejected = true;
                }
                None => {
                    report.reject(
                        EvidenceItem::critical(
                            "environment_unknown",
                            "allow-list supplied but current environment is undeclared",
                            json!(allowed),
                        ),
                        "environment undeclared",
                    );
                    rejected = true;
                }
            }
        }

        if let (Some(count), Some(limit)) = (ctx.value_i64("rate_count"), ctx.value_i64("rate_limit"))
        {
            if count >= limit {
                report.reject(
                    EvidenceItem::critical(
                        "rate_limit_exceeded",
                        format!("rate counter {count} at or over limit {limit}"),
                        json!({ "count": count, "limit": limit }),
                    ),
                    "rate limit exceeded",
                );
                rejected = true;
            }
        }

        rejected
    }
}

impl Gate for PassageGate {
    fn name(&self) -> &str {
        GATE_PASSAGE
    }

    fn check(&self, _artifact: &Artifact, ctx: &GateContext) -> Result<GateResult, PipelineError> {
        let mut report = GateReport::new(GATE_PASSAGE);

        if ctx.standalone {
            report.note(EvidenceItem::info(
                "standalone_run",
                "prior gates not evaluated in standalone diagnostics",
                json!(null),
            ));
        } else {
            for name in PRIOR_GATES {
                match ctx.prior.get(name) {
                    Some(r) if r.passed => {}
                    Some(_) => {
                        report.reject(
                            EvidenceItem::critical(
                                "gate_sequence_incomplete",
                                format!("prior gate '{name}' did not pass"),
                                json!(name),
                            ),
                            format!("prior gate '{name}' failed"),
                        );
                    }
                    None => {
                        report.reject(
                            EvidenceItem::critical(
                                "gate_sequence_incomplete",
                                format!("prior gate '{name}' did not run"),
                                json!(name),
                            ),
                            format!("prior gate '{name}' missing"),
                        );
                    }
                }
            }
            // dependency failure is final; policy is not consulted
            if report.failed() {
                return Ok(report.finish(now_unix()));
            }
        }

        let policy_rejected = Self::evaluate_policy(ctx, &mut report);

        // explicit flag, when present, is the final word over policy
        match ctx.values.get("authorized").and_then(|v| v.as_bool()) {
            Some(false) => {
                report.reject(
                    EvidenceItem::critical(
                        "explicitly_denied",
                        "caller explicitly denied passage",
                        json!(false),
                    ),
                    "explicitly denied",
                );
                Ok(report.finish(now_unix()))
            }
            Some(true) => {
                report.note(EvidenceItem::info(
                    "explicitly_authorized",
                    "caller explicitly authorized passage",
                    json!(true),
                ));
                let mut result = report.finish(now_unix());
                if policy_rejected {
                    result.reasoning =
                        format!("{}; overridden by explicit authorization", result.reasoning);
                }
                result.passed = true;
                Ok(result)
            }
            None => Ok(report.finish(now_unix())),
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::GateResult;

    use super::*;

    fn passing(gate: &str) -> GateResult {
        GateResult {
            gate: gate.to_string(),
            passed: true,
            evidence: vec![],
            reasoning: String::new(),
            checked_at_unix: 0,
        }
    }

    fn ctx_with_priors() -> GateContext {
        let mut ctx = GateContext::default();
        for g in PRIOR_GATES {
            ctx.prior.insert(g.to_string(), passing(g));
        }
        ctx
    }

    #[test]
    fn fails_when_a_prior_gate_is_missing() {
        let mut ctx = ctx_with_priors();
        ctx.prior.remove(GATE_COHERENCE);
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "gate_sequence_incomplete"));
    }

    #[test]
    fn fails_when_a_prior_gate_failed() {
        let mut ctx = ctx_with_priors();
        ctx.prior.get_mut(GATE_ORIGIN).unwrap().passed = false;
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
    }

    #[test]
    fn passes_with_complete_priors_and_no_policy() {
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx_with_priors()).unwrap();
        assert!(r.passed);
    }

    #[test]
    fn missing_permission_rejects() {
        let mut ctx = ctx_with_priors();
        ctx.values
            .insert("required_permissions".into(), json!(["read", "write"]));
        ctx.values.insert("granted_permissions".into(), json!(["read"]));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "permission_missing"));
    }

    #[test]
    fn environment_allow_list_is_enforced() {
        let mut ctx = ctx_with_priors();
        ctx.values
            .insert("allowed_environments".into(), json!(["staging"]));
        ctx.values.insert("environment".into(), json!("prod"));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "environment_denied"));
    }

    #[test]
    fn rate_counter_at_limit_rejects() {
        let mut ctx = ctx_with_priors();
        ctx.values.insert("rate_count".into(), json!(10));
        ctx.values.insert("rate_limit".into(), json!(10));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
    }

    #[test]
    fn explicit_authorization_overrides_policy() {
        let mut ctx = ctx_with_priors();
        ctx.values
            .insert("required_permissions".into(), json!(["write"]));
        ctx.values.insert("granted_permissions".into(), json!([]));
        ctx.values.insert("authorized".into(), json!(true));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(r.passed);
        assert!(r.reasoning.contains("overridden"));
    }

    #[test]
    fn explicit_denial_is_final() {
        let mut ctx = ctx_with_priors();
        ctx.values.insert("authorized".into(), json!(false));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "explicitly_denied"));
    }

    #[test]
    fn explicit_flag_does_not_override_missing_priors() {
        let mut ctx = GateContext::default();
        ctx.values.insert("authorized".into(), json!(true));
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(!r.passed);
    }

    #[test]
    fn standalone_mode_relaxes_prior_dependency() {
        let mut ctx = GateContext::default();
        ctx.standalone = true;
        let a = Artifact::new("doc", "x");
        let r = PassageGate.check(&a, &ctx).unwrap();
        assert!(r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "standalone_run"));
    }
}
