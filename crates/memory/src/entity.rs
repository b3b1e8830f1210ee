//! Memory-bearing entities (spec.md §3).

use affinity_config::{AffinityConfig, ChannelHalfLives};
use serde::{Deserialize, Serialize};

use crate::cooldown::CooldownRegistry;
use crate::ids::{ActorId, EntityId, EventType, Tag};
use crate::trace::{SaturationState, TraceTable};
use crate::valuation::ValuationProfile;

/// Key for the personal channel: (actor identity, event type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonalKey(pub ActorId, pub EventType);

/// Key for the group channel: (actor tag, event type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub Tag, pub EventType);

/// Which half-life tier and bearer-channel shape an entity uses.
///
/// spec.md §3 names Location, Artifact, and the virtual Institution as
/// the entity kinds, but §4.1's configuration already carries a third
/// concrete half-life tier (`half_lives.npc`) alongside `location` and
/// `artifact`. This workspace resolves that by treating Npc as a third
/// full concrete kind — a mobile, memory-bearing creature with the same
/// three channels as a Location but no bearer channel (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Location,
    Artifact,
    Npc,
}

/// Opaque host-defined rule attached to an artifact's bearer channel. The
/// core carries these through untouched — their interpretation belongs
/// to the host's item-mechanics layer, not this engine (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureRule {
    pub event_category: String,
    pub threshold: f64,
    pub note: String,
}

/// A memory-bearing entity: a Location, Artifact, or Npc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub valuation_profile: ValuationProfile,
    pub personal: TraceTable<PersonalKey>,
    pub group: TraceTable<GroupKey>,
    pub behavior: TraceTable<EventType>,
    /// Only populated for `EntityKind::Artifact`. A bearer-less artifact
    /// (the location-style channels absent) is still representable —
    /// personal/group/behavior are simply left empty.
    pub bearer: Option<TraceTable<ActorId>>,
    pub pressure_rules: Vec<PressureRule>,
    pub saturation: SaturationState,
    pub last_tick: f64,
    pub cooldowns: CooldownRegistry,
    /// Disposable derived cache; [`crate::affinity::compute_affinity`]
    /// never reads it, only refreshes it (spec.md §4.5).
    pub mood_bands: std::collections::HashMap<Tag, f64>,
    /// Tags identifying this entity as a constituent of an institution's
    /// `affiliated_entity_tags` (spec.md §4.10). Empty by default — set
    /// via [`MemoryEntity::with_tags`] for entities meant to be counted
    /// toward an institution's stance.
    pub tags: Vec<Tag>,
}

impl MemoryEntity {
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, valuation_profile: ValuationProfile) -> Self {
        let bearer = matches!(kind, EntityKind::Artifact).then(TraceTable::new);
        Self {
            id: id.into(),
            kind,
            valuation_profile,
            personal: TraceTable::new(),
            group: TraceTable::new(),
            behavior: TraceTable::new(),
            bearer,
            pressure_rules: Vec::new(),
            saturation: SaturationState::default(),
            last_tick: 0.0,
            cooldowns: CooldownRegistry::default(),
            mood_bands: std::collections::HashMap::new(),
            tags: Vec::new(),
        }
    }

    /// Attach institution-affiliation tags. Chainable after `new`, mirrors
    /// `ValuationProfile::with`'s builder shape.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    fn half_lives<'a>(&self, config: &'a AffinityConfig) -> &'a ChannelHalfLives {
        match self.kind {
            EntityKind::Location => &config.half_lives.location,
            EntityKind::Artifact => &config.half_lives.artifact,
            EntityKind::Npc => &config.half_lives.npc,
        }
    }

    /// The scheduled world-tick housekeeping pass (spec.md §4.6): prune,
    /// refresh saturation, sweep cooldowns, stamp `last_tick`. Does
    /// *not* compact — that is the separate, explicitly-invoked
    /// [`crate::compaction::compact_traces`], so lifecycle tests can
    /// assert tick alone never folds a trace.
    pub fn tick(&mut self, now: f64, config: &AffinityConfig) -> TickReport {
        let half_lives = *self.half_lives(config);
        let scar_hl = config.compaction.scar_half_life_days;
        let threshold = config.compaction.prune_threshold;

        let pruned_personal = self.personal.prune(now, half_lives.personal, scar_hl, threshold);
        let pruned_group = self.group.prune(now, half_lives.group, scar_hl, threshold);
        let pruned_behavior = self.behavior.prune(now, half_lives.behavior, scar_hl, threshold);
        let pruned_bearer = self
            .bearer
            .as_mut()
            .map(|bearer| bearer.prune(now, half_lives.personal, scar_hl, threshold))
            .unwrap_or(0);

        let personal_total = self.personal.total_decayed(now, half_lives.personal, scar_hl);
        let group_total = self.group.total_decayed(now, half_lives.group, scar_hl);
        let behavior_total = self.behavior.total_decayed(now, half_lives.behavior, scar_hl);
        self.saturation.refresh(
            now,
            personal_total,
            group_total,
            behavior_total,
            config.saturation_capacity.personal,
            config.saturation_capacity.group,
            config.saturation_capacity.behavior,
        );

        let cooldowns_swept = self.cooldowns.sweep(now);
        self.last_tick = now;

        TickReport {
            pruned: pruned_personal + pruned_group + pruned_behavior + pruned_bearer,
            cooldowns_swept,
        }
    }
}

/// Summary of one [`MemoryEntity::tick`] pass, for host-side metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub pruned: usize,
    pub cooldowns_swept: usize,
}
