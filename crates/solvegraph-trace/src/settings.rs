use serde::{Deserialize, Serialize};

use crate::state::State;

/// How numbers derived from arithmetic are rounded and compared.
///
/// Every value that enters a state from a computation is rounded to `decimals` places;
/// sub-operation traces keep full precision. A stated result counts as correct when it is
/// within `tolerance` of the computed one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericPolicy {
    pub decimals: u32,
    pub tolerance: f64,
}

impl Default for NumericPolicy {
    fn default() -> Self {
        Self {
            decimals: 2,
            tolerance: 0.01,
        }
    }
}

/// Per-trace settings supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// The state the solver is trying to reach.
    pub target: State,
    pub policy: NumericPolicy,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            target: State::from([24]),
            policy: NumericPolicy::default(),
        }
    }
}

impl TraceSettings {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_target(mut self, target: State) -> Self {
        self.target = target;
        self
    }
}
