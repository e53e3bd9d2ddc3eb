use serde::{Deserialize, Serialize};

/// Weight of one evidence item. Critical evidence that contributed to a
/// rejection always comes with `passed == false`; info/warning evidence
/// alone never forces failure unless the gate's own policy says so.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Recorded outcome of a trail decision.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    Info,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Info => "info",
        }
    }
}

/// Age-derived lifecycle state of a trail entry. Transitions are forward
/// only: an entry never regresses to a younger level.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Aging,
    Settled,
    BedrockEligible,
    Bedrock,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Aging => "aging",
            Freshness::Settled => "settled",
            Freshness::BedrockEligible => "bedrock_eligible",
            Freshness::Bedrock => "bedrock",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "aging" => Freshness::Aging,
            "settled" => Freshness::Settled,
            "bedrock_eligible" => Freshness::BedrockEligible,
            "bedrock" => Freshness::Bedrock,
            _ => Freshness::Fresh,
        }
    }
}

/// Names of the five standard gates, in pipeline order.
pub const GATE_ORIGIN: &str = "origin";
pub const GATE_INTENT: &str = "intent";
pub const GATE_COHERENCE: &str = "coherence";
pub const GATE_IDENTITY: &str = "identity";
pub const GATE_PASSAGE: &str = "passage";

pub const STANDARD_GATE_ORDER: [&str; 5] = [
    GATE_ORIGIN,
    GATE_INTENT,
    GATE_COHERENCE,
    GATE_IDENTITY,
    GATE_PASSAGE,
];
