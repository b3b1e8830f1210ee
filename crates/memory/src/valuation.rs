//! Per-entity valuation profiles (spec.md §4.4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::EventType;

/// Per-entity mapping from event type (exact or category) to a signed
/// weight in `[-1,1]`. There is no process-wide valuation table — every
/// entity supplies its own (spec.md §9's most load-bearing decision).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationProfile {
    weights: HashMap<String, f64>,
}

impl ValuationProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, event_type: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(event_type.into(), weight);
        self
    }

    pub fn set(&mut self, event_type: impl Into<String>, weight: f64) {
        self.weights.insert(event_type.into(), weight);
    }

    /// Exact → category → default(0.0) lookup. Never raises — missing
    /// types are neutral by design.
    pub fn get(&self, event_type: &EventType) -> f64 {
        if let Some(&weight) = self.weights.get(event_type.as_str()) {
            return weight;
        }
        if let Some(&weight) = self.weights.get(event_type.category()) {
            return weight;
        }
        0.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (event_type, weight) in &self.weights {
            if !(-1.0..=1.0).contains(weight) {
                return Err(ValidationError::ProfileWeightOutOfRange(
                    event_type.clone(),
                    *weight,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ValuationProfile {
        ValuationProfile::new()
            .with("harm.fire", -0.8)
            .with("extract", -0.2)
            .with("offer.gift", 0.5)
    }

    #[test]
    fn exact_match_wins_over_category() {
        let profile = profile();
        assert_eq!(profile.get(&EventType::from("harm.fire")), -0.8);
    }

    #[test]
    fn falls_back_to_category() {
        let profile = profile();
        assert_eq!(profile.get(&EventType::from("extract.hunt")), -0.2);
    }

    #[test]
    fn unmatched_type_is_neutral() {
        let profile = profile();
        assert_eq!(profile.get(&EventType::from("social.greet")), 0.0);
    }

    #[test]
    fn out_of_range_weight_fails_validation() {
        let profile = ValuationProfile::new().with("harm.fire", 1.5);
        assert_eq!(
            profile.validate(),
            Err(ValidationError::ProfileWeightOutOfRange(
                "harm.fire".to_string(),
                1.5
            ))
        );
    }
}
