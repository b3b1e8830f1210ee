//! Institution aggregator (spec.md §4.10): a virtual entity whose stance
//! is a slow drift over its affiliated entities' group-channel memory.

use std::collections::HashMap;

use affinity_config::AffinityConfig;
use serde::{Deserialize, Serialize};

use crate::affinity::group_channel_affinity;
use crate::entity::MemoryEntity;
use crate::ids::Tag;
use crate::trace::exponential_decay;

/// An institution never owns its affiliated entities — it references
/// them by identity through an indexed registry the caller supplies, and
/// tolerates missing entries (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub name: String,
    pub affiliated_entity_tags: Vec<Tag>,
    pub cached_stance: HashMap<Tag, f64>,
    pub last_refreshed: f64,
}

impl Institution {
    pub fn new(name: impl Into<String>, affiliated_entity_tags: Vec<Tag>) -> Self {
        Self {
            name: name.into(),
            affiliated_entity_tags,
            cached_stance: HashMap::new(),
            last_refreshed: 0.0,
        }
    }

    /// Blend the current stance toward every already-tracked actor tag
    /// with the mean group-channel affinity over the supplied
    /// constituent entities, then decay the result with the
    /// institutional half-life. Constituents are queried on the group
    /// channel only, since an institution has no personal relationship
    /// with any one actor and no behavioral signal of its own (spec.md
    /// §4.10).
    pub fn refresh(&mut self, now: f64, constituents: &[&MemoryEntity], config: &AffinityConfig) {
        let tags: Vec<Tag> = self.cached_stance.keys().cloned().collect();
        for tag in tags {
            let samples: Vec<f64> = constituents
                .iter()
                .map(|entity| group_channel_affinity(entity, &tag, now, config))
                .collect();
            let mean = if samples.is_empty() {
                0.0
            } else {
                samples.iter().sum::<f64>() / samples.len() as f64
            };

            let old = self.cached_stance.get(&tag).copied().unwrap_or(0.0);
            let elapsed_days = (now - self.last_refreshed).max(0.0) / crate::clock::SECONDS_PER_DAY;
            let decayed_old = exponential_decay(old, elapsed_days, config.institutions.half_life_days);
            let inertia = config.institutions.inertia;
            let blended = inertia * decayed_old + (1.0 - inertia) * mean;
            self.cached_stance.insert(tag, blended);
        }
        self.last_refreshed = now;
    }

    /// Introduce a new actor tag to track, seeded at zero. Institutions
    /// never delete stance entries, even if their constituents vanish.
    pub fn track(&mut self, tag: Tag) {
        self.cached_stance.entry(tag).or_insert(0.0);
    }

    pub fn stance_toward(&self, tag: &Tag) -> f64 {
        self.cached_stance.get(tag).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::event::EventRecord;
    use crate::valuation::ValuationProfile;

    #[test]
    fn refresh_blends_toward_constituent_mean() {
        let profile = ValuationProfile::new().with("offer.gift", 0.8);
        let mut entity = MemoryEntity::new("hunters_lodge", EntityKind::Location, profile);
        let config = AffinityConfig::default();
        let event = EventRecord::new(
            "offer.gift",
            "player_0042",
            [Tag::from("hunter")],
            None,
            "hunters_lodge",
            1.0,
            0.0,
            [],
        );
        crate::affinity::record_event(&mut entity, &event, &config);

        let mut institution = Institution::new("hunters_guild", vec![Tag::from("hunter")]);
        institution.track(Tag::from("hunter"));
        institution.refresh(0.0, &[&entity], &config);

        assert!(institution.stance_toward(&Tag::from("hunter")) > 0.0);
    }

    #[test]
    fn stance_decays_before_blending_with_no_constituents() {
        let config = AffinityConfig::default();
        let mut institution = Institution::new("hunters_guild", vec![]);
        institution.cached_stance.insert(Tag::from("hunter"), 0.5);
        institution.last_refreshed = 0.0;
        let one_half_life = config.institutions.half_life_days * crate::clock::SECONDS_PER_DAY;
        institution.refresh(one_half_life, &[], &config);
        // decayed_old = 0.5 * 0.5 = 0.25, mean = 0 (no constituents),
        // blended = inertia * decayed_old + (1 - inertia) * 0.
        let expected = config.institutions.inertia * 0.25;
        assert!((institution.stance_toward(&Tag::from("hunter")) - expected).abs() < 1e-9);
    }
}
