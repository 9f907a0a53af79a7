use converge_core::{Attributes, ObservedState, Plan, ResourceSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured before/after for a single attribute that doesn't match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDrift {
    pub field: String,
    /// What we want
    pub expected: Value,
    /// What the provider has. `None` when the attribute is absent.
    pub actual: Option<Value>,
}

/// Desired keys whose observed value differs or is missing, with the
/// desired value. Observed keys the spec doesn't mention are ignored.
pub fn delta(desired: &Attributes, observed: &Attributes) -> Attributes {
    desired
        .iter()
        .filter(|(key, want)| observed.get(*key) != Some(*want))
        .map(|(key, want)| (key.clone(), want.clone()))
        .collect()
}

/// Field-level drift for display.
pub fn drift(desired: &Attributes, observed: &Attributes) -> Vec<FieldDrift> {
    desired
        .iter()
        .filter(|(key, want)| observed.get(*key) != Some(*want))
        .map(|(key, want)| FieldDrift {
            field: key.clone(),
            expected: want.clone(),
            actual: observed.get(key).cloned(),
        })
        .collect()
}

/// Compare a spec against what the provider reported.
pub fn plan(spec: &ResourceSpec, observed: &ObservedState) -> Plan {
    match observed {
        ObservedState::NotFound => Plan::Create,
        ObservedState::Found(resource) => {
            let delta = delta(&spec.desired, &resource.attributes);
            if delta.is_empty() {
                Plan::NoOp
            } else {
                Plan::Update(delta)
            }
        }
    }
}
