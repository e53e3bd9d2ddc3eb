use serde_json::json;
use vigil_core::{
    Artifact, EvidenceItem, GateContext, GateResult, PipelineError, Severity, GATE_COHERENCE,
};

use crate::gate::{now_unix, Gate, GateReport};

pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// Scoring constants. These are empirically chosen defaults, not claims
/// about language; override them when tuning for a corpus.
#[derive(Clone, Debug)]
pub struct CoherenceWeights {
    pub repetition_weight: f64,
    pub divergence_weight: f64,
    pub complexity_weight: f64,
    pub warn_repetition: f64,
    pub warn_divergence: f64,
    pub warn_complexity: f64,
    pub crit_repetition: f64,
    pub crit_divergence: f64,
    pub crit_complexity: f64,
}

impl Default for CoherenceWeights {
    fn default() -> Self {
        Self {
            repetition_weight: 50.0,
            divergence_weight: 30.0,
            complexity_weight: 20.0,
            warn_repetition: 0.4,
            warn_divergence: 0.4,
            warn_complexity: 0.7,
            crit_repetition: 0.7,
            crit_divergence: 0.7,
            crit_complexity: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CoherenceScores {
    pub repetition: f64,
    pub divergence: f64,
    pub complexity: f64,
    pub overall: f64,
}

/// Crude suffix-stripping stem. Enough to fold "validated"/"validates"
/// onto "validat"; nothing deeper is intended.
fn stem(word: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if word.len() > suffix.len() + 2 {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

fn tokens(content: &str) -> Vec<String> {
    content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn sentences(content: &str) -> Vec<&str> {
    content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Fraction of word tokens whose stem occurs more than twice, in [0, 1].
pub fn repetition_score(content: &str) -> f64 {
    let toks = tokens(content);
    if toks.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for t in &toks {
        *counts.entry(stem(t)).or_insert(0usize) += 1;
    }
    let repeated: usize = counts.values().filter(|&&c| c > 2).sum();
    repeated as f64 / toks.len() as f64
}

const CONCLUSION_PHRASES: &[&str] = &[
    "in conclusion",
    "in summary",
    "to conclude",
    "therefore",
    "thus",
    "finally",
];

/// Weighted balance of open questions versus explicit concluding phrases,
/// per sentence, clamped to [-1, 1]. Positive means unresolved expansion;
/// negative means premature closure.
pub fn divergence_score(content: &str) -> f64 {
    let sentence_count = sentences(content).len().max(1) as f64;
    let questions = content.matches('?').count() as f64;
    let lower = content.to_lowercase();
    let conclusions: usize = CONCLUSION_PHRASES.iter().map(|p| lower.matches(p).count()).sum();
    let raw = 1.5 * (questions / sentence_count) - 1.0 * (conclusions as f64 / sentence_count);
    raw.clamp(-1.0, 1.0)
}

/// Average sentence length normalized against a 40-word ceiling.
pub fn complexity_score(content: &str) -> f64 {
    let sents = sentences(content);
    if sents.is_empty() {
        return 0.0;
    }
    let total_words: usize = sents.iter().map(|s| tokens(s).len()).sum();
    let avg = total_words as f64 / sents.len() as f64;
    (avg / 40.0).clamp(0.0, 1.0)
}

pub fn score(content: &str, weights: &CoherenceWeights) -> CoherenceScores {
    let repetition = repetition_score(content);
    let divergence = divergence_score(content);
    let complexity = complexity_score(content);
    let overall = (100.0
        - weights.repetition_weight * repetition
        - weights.divergence_weight * divergence.abs()
        - weights.complexity_weight * complexity)
        .clamp(0.0, 100.0);
    CoherenceScores {
        repetition,
        divergence,
        complexity,
        overall,
    }
}

/// Text-quality heuristic: repetition, question/conclusion balance, and
/// sentence length, combined into a 0-100 score checked against the
/// caller's threshold.
pub struct CoherenceGate {
    pub weights: CoherenceWeights,
}

impl Default for CoherenceGate {
    fn default() -> Self {
        Self {
            weights: CoherenceWeights::default(),
        }
    }
}

impl CoherenceGate {
    fn sub_score_evidence(report: &mut GateReport, name: &str, value: f64, warn: f64, crit: f64) {
        if value <= warn {
            return;
        }
        let severity = if value > crit {
            Severity::Critical
        } else {
            Severity::Warning
        };
        report.note(EvidenceItem::new(
            format!("{name}_high"),
            format!("{name} score {value:.2} exceeds bound {warn:.2}"),
            json!({ "score": value, "warn_bound": warn, "critical_bound": crit }),
            severity,
        ));
    }
}

impl Gate for CoherenceGate {
    fn name(&self) -> &str {
        GATE_COHERENCE
    }

    fn check(&self, artifact: &Artifact, ctx: &GateContext) -> Result<GateResult, PipelineError> {
        let threshold = ctx
            .values
            .get("threshold")
            .and_then(|v| v.as_f64())
            .unwrap_or(DEFAULT_THRESHOLD);

        let mut report = GateReport::new(GATE_COHERENCE);
        let scores = score(&artifact.content, &self.weights);

        report.note(EvidenceItem::info(
            "coherence_scores",
            format!("overall {:.1} against threshold {:.1}", scores.overall, threshold),
            json!({
                "repetition": scores.repetition,
                "divergence": scores.divergence,
                "complexity": scores.complexity,
                "overall": scores.overall,
                "threshold": threshold,
            }),
        ));

        let w = &self.weights;
        Self::sub_score_evidence(
            &mut report,
            "repetition",
            scores.repetition,
            w.warn_repetition,
            w.crit_repetition,
        );
        Self::sub_score_evidence(
            &mut report,
            "divergence",
            scores.divergence.abs(),
            w.warn_divergence,
            w.crit_divergence,
        );
        Self::sub_score_evidence(
            &mut report,
            "complexity",
            scores.complexity,
            w.warn_complexity,
            w.crit_complexity,
        );

        // policy of this gate: the combined score is the verdict
        if scores.overall < threshold {
            report.fail(format!(
                "coherence {:.1} below threshold {:.1}",
                scores.overall, threshold
            ));
        }

        Ok(report.finish(now_unix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_scores_near_one_hundred() {
        let content = "Short words work well. Each phrase stays brief. Nothing repeats here.";
        let s = score(content, &CoherenceWeights::default());
        assert_eq!(s.repetition, 0.0);
        assert_eq!(s.divergence, 0.0);
        assert!(s.overall > 90.0);
    }

    #[test]
    fn repeated_stem_drives_repetition_above_bound() {
        // 50 words; "gate" appears 10 times, and the connective words
        // "the" (6x) and "must" (4x) also repeat beyond twice.
        let content = "the gate checks the gate and the gate must hold because the gate must \
                       guard every gate while a gate watches a gate so the gate must stay and \
                       the gate must remain a gate forever; extra filler words pad this tally \
                       toward fifty distinct tokens overall now";
        let s = score(content, &CoherenceWeights::default());
        assert!(
            s.repetition > 0.4,
            "repetition {} should exceed 0.4",
            s.repetition
        );
    }

    #[test]
    fn questions_push_divergence_positive() {
        let content = "What happens next? Who decides? Where does it end?";
        assert!(divergence_score(content) > 0.0);
    }

    #[test]
    fn conclusions_push_divergence_negative() {
        let content = "Therefore it ends. In conclusion we stop. Thus nothing remains.";
        assert!(divergence_score(content) < 0.0);
    }

    #[test]
    fn long_sentences_raise_complexity() {
        let long = "word ".repeat(45);
        assert!(complexity_score(&long) > 0.7);
        assert!(complexity_score("Tiny phrase.") < 0.2);
    }

    #[test]
    fn gate_passes_clean_text_at_default_threshold() {
        let a = Artifact::new("doc", "Short words work well. Each phrase stays brief.");
        let r = CoherenceGate::default()
            .check(&a, &GateContext::default())
            .unwrap();
        assert!(r.passed);
    }

    #[test]
    fn gate_flags_repetitive_text() {
        let content = "the gate checks the gate and the gate must hold because the gate must \
                       guard every gate while a gate watches a gate so the gate must stay and \
                       the gate must remain a gate forever; extra filler words pad this tally \
                       toward fifty distinct tokens overall now";
        let a = Artifact::new("doc", content);
        let r = CoherenceGate::default()
            .check(&a, &GateContext::default())
            .unwrap();
        assert!(!r.passed);
        assert!(r.evidence.iter().any(|e| e.kind == "repetition_high"));
    }

    #[test]
    fn gate_honors_context_threshold() {
        let a = Artifact::new("doc", "Short words work well. Each phrase stays brief.");
        let mut ctx = GateContext::default();
        ctx.values.insert("threshold".into(), json!(99.9));
        let r = CoherenceGate::default().check(&a, &ctx).unwrap();
        assert!(!r.passed);
    }
}
