//! Snapshot & replay (spec.md §4.9).

use std::collections::HashMap;

use affinity_config::AffinityConfig;
use serde::{Deserialize, Serialize};

use crate::affordance::{
    evaluate_pure_with_bias, AffordanceContext, AffordanceRegistry, AffordanceTrigger,
    ThresholdLabel, TriggerSide,
};
use crate::entity::{EntityKind, GroupKey, MemoryEntity, PersonalKey};
use crate::error::ReplayError;
use crate::ids::{ActorId, EntityId, EventType, Tag};
use crate::trace::TraceTable;
use crate::valuation::ValuationProfile;

/// A frozen deep copy of everything an affordance trigger depended on,
/// sufficient to recompute the same outcome without touching live state
/// (spec.md §4.9). The deterministic pipeline records no seed by
/// default; `seed` exists for affordances that introduce randomness
/// (e.g. a misleading-navigation redirect roll) and is replayed as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceSnapshot {
    pub actor: ActorId,
    pub actor_tags: Vec<Tag>,
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub valuation_profile: ValuationProfile,
    pub personal: TraceTable<PersonalKey>,
    pub group: TraceTable<GroupKey>,
    pub behavior: TraceTable<EventType>,
    pub config: AffinityConfig,
    pub seed: Option<u64>,
    pub action_type: EventType,
    pub timestamp: f64,
    /// The institutional stance folded additively into `computed_affinity`
    /// at capture time (spec.md §4.10). `0.0` for evaluations with no
    /// institutional context — replay must reapply the same bias, since
    /// an institution's live stance may have drifted since capture.
    pub institutional_stance: f64,
    pub computed_affinity: f64,
    pub threshold_label: ThresholdLabel,
    pub affordance: String,
    pub side: TriggerSide,
    pub adjustments: HashMap<String, f64>,
    pub tells: Vec<String>,
    pub redirect_target: Option<EntityId>,
}

impl AffordanceSnapshot {
    pub fn capture(
        entity: &MemoryEntity,
        context: &AffordanceContext,
        config: &AffinityConfig,
        affinity: f64,
        threshold_label: ThresholdLabel,
        trigger: &AffordanceTrigger,
        seed: Option<u64>,
    ) -> Self {
        Self::capture_with_bias(entity, context, config, affinity, threshold_label, trigger, seed, 0.0)
    }

    /// As [`AffordanceSnapshot::capture`], additionally freezing the
    /// institutional stance that was folded into `affinity` so replay can
    /// reapply the same bias rather than re-query a since-drifted
    /// institution (spec.md §4.9, §4.10).
    #[allow(clippy::too_many_arguments)]
    pub fn capture_with_bias(
        entity: &MemoryEntity,
        context: &AffordanceContext,
        config: &AffinityConfig,
        affinity: f64,
        threshold_label: ThresholdLabel,
        trigger: &AffordanceTrigger,
        seed: Option<u64>,
        institutional_stance: f64,
    ) -> Self {
        Self {
            actor: context.actor.clone(),
            actor_tags: context.actor_tags.clone(),
            entity_id: entity.id.clone(),
            entity_kind: entity.kind,
            valuation_profile: entity.valuation_profile.clone(),
            personal: entity.personal.clone(),
            group: entity.group.clone(),
            behavior: entity.behavior.clone(),
            config: config.clone(),
            seed,
            action_type: context.action_type.clone(),
            timestamp: context.timestamp,
            institutional_stance,
            computed_affinity: affinity,
            threshold_label,
            affordance: trigger.affordance.clone(),
            side: trigger.side,
            adjustments: trigger.adjustments.clone(),
            tells: trigger.tells.clone(),
            // No registered affordance currently redirects; the field
            // exists so a future misleading-navigation affordance has
            // somewhere to record its roll (spec.md §4.9).
            redirect_target: None,
        }
    }

    /// Rebuild a frozen, standalone entity from the snapshot's trace
    /// tables alone — never from the live registry.
    fn frozen_entity(&self) -> MemoryEntity {
        MemoryEntity {
            id: self.entity_id.clone(),
            kind: self.entity_kind,
            valuation_profile: self.valuation_profile.clone(),
            personal: self.personal.clone(),
            group: self.group.clone(),
            behavior: self.behavior.clone(),
            bearer: None,
            pressure_rules: Vec::new(),
            saturation: Default::default(),
            last_tick: self.timestamp,
            cooldowns: Default::default(),
            mood_bands: Default::default(),
            tags: Vec::new(),
        }
    }
}

/// Recompute affinity and re-run the affordance pipeline from the
/// snapshot alone. Asserts bit-exact equality with the recorded outcome;
/// any mismatch is a fatal [`ReplayError`] (spec.md §4.9, §8).
pub fn replay(snapshot: &AffordanceSnapshot, registry: &AffordanceRegistry) -> Result<(), ReplayError> {
    let entity = snapshot.frozen_entity();
    let context = AffordanceContext {
        actor: snapshot.actor.clone(),
        actor_tags: snapshot.actor_tags.clone(),
        action_type: snapshot.action_type.clone(),
        action_target: None,
        timestamp: snapshot.timestamp,
    };
    let outcome = evaluate_pure_with_bias(&entity, registry, &context, &snapshot.config, snapshot.institutional_stance);

    if outcome.affinity != snapshot.computed_affinity {
        return Err(ReplayError::SnapshotMismatch {
            field: "computed_affinity",
            recorded: snapshot.computed_affinity.to_string(),
            recomputed: outcome.affinity.to_string(),
        });
    }

    let recomputed_trigger = outcome
        .triggers
        .iter()
        .find(|trigger| trigger.affordance == snapshot.affordance);
    let Some(recomputed_trigger) = recomputed_trigger else {
        return Err(ReplayError::SnapshotMismatch {
            field: "triggered",
            recorded: "true".to_string(),
            recomputed: "false".to_string(),
        });
    };

    if recomputed_trigger.adjustments != snapshot.adjustments {
        return Err(ReplayError::SnapshotMismatch {
            field: "adjustments",
            recorded: format!("{:?}", snapshot.adjustments),
            recomputed: format!("{:?}", recomputed_trigger.adjustments),
        });
    }
    if recomputed_trigger.tells != snapshot.tells {
        return Err(ReplayError::SnapshotMismatch {
            field: "tells",
            recorded: format!("{:?}", snapshot.tells),
            recomputed: format!("{:?}", recomputed_trigger.tells),
        });
    }

    Ok(())
}

/// Compute affinity against an entity's *current* live traces, for
/// tuning — never for regression testing (spec.md §4.9, §4.11).
pub fn reeval(entity: &MemoryEntity, actor: &ActorId, actor_tags: &[Tag], now: f64, config: &AffinityConfig) -> f64 {
    crate::affinity::compute_affinity(entity, actor, actor_tags, now, config)
}
