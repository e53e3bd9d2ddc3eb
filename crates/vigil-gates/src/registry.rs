use std::collections::BTreeMap;

use crate::coherence::CoherenceGate;
use crate::gate::Gate;
use crate::identity::IdentityGate;
use crate::intent::IntentGate;
use crate::origin::OriginGate;
use crate::passage::PassageGate;

/// Name → validator registry. The five standard gates are pre-registered;
/// custom gates register under arbitrary names and are addressable the
/// same way.
pub struct GateRegistry {
    gates: BTreeMap<String, Box<dyn Gate>>,
}

impl GateRegistry {
    pub fn empty() -> Self {
        Self {
            gates: BTreeMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut r = Self::empty();
        r.register(Box::new(OriginGate));
        r.register(Box::new(IntentGate));
        r.register(Box::new(CoherenceGate::default()));
        r.register(Box::new(IdentityGate::default()));
        r.register(Box::new(PassageGate));
        r
    }

    pub fn register(&mut self, gate: Box<dyn Gate>) {
        self.gates.insert(gate.name().to_string(), gate);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Gate> {
        self.gates.get(name).map(|g| g.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.gates.keys().map(String::as_str).collect()
    }
}
