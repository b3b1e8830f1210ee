//! The affordance evaluation pipeline (spec.md §4.8).

use std::collections::HashMap;

use affinity_config::AffinityConfig;
use serde::{Deserialize, Serialize};

use crate::affinity::{apply_institutional_bias, compute_affinity};
use crate::cooldown;
use crate::entity::MemoryEntity;
use crate::error::ValidationError;
use crate::ids::{ActorId, EntityId, EventType, Tag};

/// The closed set of game variables this engine may modulate. An
/// affordance referencing anything else fails validation (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    RoomTravelTimeModifier,
    RoomRedirectTarget,
    RoomEncounterRateModifier,
    NpcAggroRadiusModifier,
    HarvestYieldModifier,
    SpellPowerModifier,
    SpellBackfireChance,
    RestHealingModifier,
    LootQualityModifier,
    ActorStaminaModifier,
    ActorLuckModifier,
    ActionSkillModifier,
}

impl Handle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::RoomTravelTimeModifier => "room.travel_time_modifier",
            Handle::RoomRedirectTarget => "room.redirect_target",
            Handle::RoomEncounterRateModifier => "room.encounter_rate_modifier",
            Handle::NpcAggroRadiusModifier => "npc.aggro_radius_modifier",
            Handle::HarvestYieldModifier => "harvest.yield_modifier",
            Handle::SpellPowerModifier => "spell.power_modifier",
            Handle::SpellBackfireChance => "spell.backfire_chance",
            Handle::RestHealingModifier => "rest.healing_modifier",
            Handle::LootQualityModifier => "loot.quality_modifier",
            Handle::ActorStaminaModifier => "actor.stamina_modifier",
            Handle::ActorLuckModifier => "actor.luck_modifier",
            Handle::ActionSkillModifier => "action.skill_modifier",
        }
    }

    /// Parse a handle name from a string, the shape config-driven
    /// affordance definitions arrive in. Unknown names are a load-time
    /// validation error, not a panic.
    pub fn parse(name: &str, affordance: &str) -> Result<Self, ValidationError> {
        let handle = match name {
            "room.travel_time_modifier" => Handle::RoomTravelTimeModifier,
            "room.redirect_target" => Handle::RoomRedirectTarget,
            "room.encounter_rate_modifier" => Handle::RoomEncounterRateModifier,
            "npc.aggro_radius_modifier" => Handle::NpcAggroRadiusModifier,
            "harvest.yield_modifier" => Handle::HarvestYieldModifier,
            "spell.power_modifier" => Handle::SpellPowerModifier,
            "spell.backfire_chance" => Handle::SpellBackfireChance,
            "rest.healing_modifier" => Handle::RestHealingModifier,
            "loot.quality_modifier" => Handle::LootQualityModifier,
            "actor.stamina_modifier" => Handle::ActorStaminaModifier,
            "actor.luck_modifier" => Handle::ActorLuckModifier,
            "action.skill_modifier" => Handle::ActionSkillModifier,
            other => {
                return Err(ValidationError::UnknownHandle(
                    affordance.to_string(),
                    other.to_string(),
                ));
            }
        };
        Ok(handle)
    }
}

/// Thresholds over computed affinity (spec.md §6). Purely descriptive —
/// never drives a trigger decision itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdLabel {
    Hostile,
    Unwelcoming,
    Neutral,
    Favorable,
    Aligned,
}

impl ThresholdLabel {
    pub fn classify(affinity: f64) -> Self {
        if affinity <= -0.7 {
            ThresholdLabel::Hostile
        } else if affinity <= -0.3 {
            ThresholdLabel::Unwelcoming
        } else if affinity < 0.3 {
            ThresholdLabel::Neutral
        } else if affinity < 0.7 {
            ThresholdLabel::Favorable
        } else {
            ThresholdLabel::Aligned
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSide {
    Hostile,
    Favorable,
}

/// One handle this affordance may move, signed so the clamp range can be
/// interpreted directly as the emitted value on that side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleEffect {
    pub handle: Handle,
    pub hostile_clamp: (f64, f64),
    pub favorable_clamp: (f64, f64),
}

/// Affordance-specific condition that stacks an extra delta onto the
/// base effect — grounds scenario 6 (fire-in-forest spell penalty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalModifier {
    pub condition_event_type: EventType,
    pub condition_valuation_below: f64,
    pub extra_deltas: Vec<(Handle, f64)>,
}

/// A registered affordance: a value, not a trait object (spec.md §9 —
/// tagged-variant registry over dynamic dispatch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceDef {
    pub name: String,
    /// The action event type this affordance is a candidate for. Movement
    /// affordances use the exact type `move.pass`; everything else may
    /// match by category (see [`AffordanceDef::matches_action`]).
    pub action_type: EventType,
    pub hostile_threshold: f64,
    pub favorable_threshold: f64,
    pub cooldown_seconds: f64,
    pub handles: Vec<HandleEffect>,
    pub hostile_tells: Vec<String>,
    pub favorable_tells: Vec<String>,
    pub additional_modifier: Option<AdditionalModifier>,
}

impl AffordanceDef {
    fn matches_action(&self, action_type: &EventType) -> bool {
        self.action_type == *action_type || self.action_type.as_str() == action_type.category()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.handles.len() > 2 {
            return Err(ValidationError::TooManyHandles(
                self.name.clone(),
                self.handles.len(),
            ));
        }
        if self.cooldown_seconds <= 0.0 {
            return Err(ValidationError::NonPositiveCooldown(self.name.clone()));
        }
        if self.hostile_threshold >= 0.0 {
            return Err(ValidationError::HostileThresholdNotNegative(self.name.clone()));
        }
        if self.favorable_threshold <= 0.0 {
            return Err(ValidationError::FavorableThresholdNotPositive(self.name.clone()));
        }
        for tell in self.hostile_tells.iter().chain(self.favorable_tells.iter()) {
            if let Err(reason) = validate_tell(tell) {
                return Err(ValidationError::ForbiddenTell(self.name.clone(), reason));
            }
        }
        Ok(())
    }
}

/// Rejects tells that leak numeric state or put words in an entity's
/// mouth (spec.md §6).
pub fn validate_tell(tell: &str) -> Result<(), String> {
    const SPEECH_VERBS: &[&str] = &["says", "whispers", "urges", "speaks"];
    if tell.contains('%') {
        return Err(format!("contains a percentage: {tell:?}"));
    }
    if tell.to_lowercase().contains("affinity:") || tell.to_lowercase().contains("reputation:") {
        return Err(format!("contains a meter label: {tell:?}"));
    }
    for word in tell.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '+');
        if trimmed.starts_with('+') && trimmed[1..].chars().all(|c| c.is_ascii_digit()) && trimmed.len() > 1 {
            return Err(format!("contains a `+N` meter pattern: {tell:?}"));
        }
        let lower = trimmed.to_lowercase();
        if SPEECH_VERBS.contains(&lower.as_str()) {
            return Err(format!("contains a speech verb `{trimmed}`: {tell:?}"));
        }
    }
    Ok(())
}

/// The closed set of registered affordances (spec.md §9). Validated as a
/// whole at load time: individual defs, plus the cross-cutting rule that
/// at most one affordance may be the primary effect for `move.pass`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffordanceRegistry {
    pub affordances: Vec<AffordanceDef>,
}

impl AffordanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: AffordanceDef) {
        self.affordances.push(def);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut movement_primary: Option<&str> = None;
        for def in &self.affordances {
            def.validate()?;
            if def.action_type.as_str() == "move.pass" {
                if let Some(existing) = movement_primary {
                    return Err(ValidationError::DuplicateMovementPrimary(
                        existing.to_string(),
                        def.name.clone(),
                    ));
                }
                movement_primary = Some(&def.name);
            }
        }
        Ok(())
    }

    /// Candidate affordances for an action type. For `move.pass` this is
    /// at most the single registered pathing affordance — the pipeline
    /// is single-primary-effect for movement (spec.md §4.8, §9).
    fn candidates(&self, action_type: &EventType) -> Vec<&AffordanceDef> {
        if action_type.as_str() == "move.pass" {
            return self
                .affordances
                .iter()
                .find(|def| def.action_type.as_str() == "move.pass")
                .into_iter()
                .collect();
        }
        self.affordances
            .iter()
            .filter(|def| def.matches_action(action_type))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&AffordanceDef> {
        self.affordances.iter().find(|def| def.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceContext {
    pub actor: ActorId,
    pub actor_tags: Vec<Tag>,
    pub action_type: EventType,
    pub action_target: Option<ActorId>,
    pub timestamp: f64,
}

/// Top-N trace contribution by absolute weighted magnitude, carried in
/// both the outcome's trace log and the `why` admin operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContribution {
    pub channel: &'static str,
    pub key_description: String,
    pub weighted_contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceTrigger {
    pub affordance: String,
    pub side: TriggerSide,
    pub adjustments: HashMap<String, f64>,
    pub tells: Vec<String>,
    pub cooldown_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceOutcome {
    pub affinity: f64,
    pub threshold_label: ThresholdLabel,
    pub adjustments: HashMap<String, f64>,
    pub tells: Vec<String>,
    pub trace_log: Vec<TraceContribution>,
    pub cooldowns_consumed: Vec<String>,
    pub triggered: bool,
    pub triggers: Vec<AffordanceTrigger>,
}

/// Stable, process-version-independent index into a tell table. A
/// hand-rolled FNV-1a rather than `std`'s default hasher — the latter is
/// not guaranteed stable across Rust releases, and replay must reproduce
/// the same tell forever (spec.md §5, §4.9).
fn deterministic_index(seed: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in seed.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % len as u64) as usize
}

fn clamp_value(fraction: f64, clamp: (f64, f64)) -> f64 {
    clamp.0 + fraction * (clamp.1 - clamp.0)
}

fn severity_fraction(affinity: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return 0.0;
    }
    ((affinity.abs() - threshold.abs()) / (1.0 - threshold.abs())).clamp(0.0, 1.0)
}

fn top_trace_contributions(entity: &MemoryEntity, actor: &ActorId, actor_tags: &[Tag], now: f64, config: &AffinityConfig, top_n: usize) -> Vec<TraceContribution> {
    let half_lives = match entity.kind {
        crate::entity::EntityKind::Location => &config.half_lives.location,
        crate::entity::EntityKind::Artifact => &config.half_lives.artifact,
        crate::entity::EntityKind::Npc => &config.half_lives.npc,
    };
    let scar_hl = config.compaction.scar_half_life_days;
    let mut contributions: Vec<TraceContribution> = Vec::new();

    for (key, record) in entity.personal.iter() {
        if &key.0 != actor {
            continue;
        }
        let decayed = record.decayed_value(now, half_lives.personal, scar_hl);
        let weighted = decayed * entity.valuation_profile.get(&key.1);
        contributions.push(TraceContribution {
            channel: "personal",
            key_description: format!("{}:{}", key.0, key.1),
            weighted_contribution: weighted,
        });
    }
    for (key, record) in entity.group.iter() {
        if !actor_tags.contains(&key.0) {
            continue;
        }
        let decayed = record.decayed_value(now, half_lives.group, scar_hl);
        let weighted = decayed * entity.valuation_profile.get(&key.1);
        contributions.push(TraceContribution {
            channel: "group",
            key_description: format!("{}:{}", key.0, key.1),
            weighted_contribution: weighted,
        });
    }
    for (event_type, record) in entity.behavior.iter() {
        let decayed = record.decayed_value(now, half_lives.behavior, scar_hl);
        let weighted = decayed * entity.valuation_profile.get(event_type);
        contributions.push(TraceContribution {
            channel: "behavior",
            key_description: event_type.to_string(),
            weighted_contribution: weighted,
        });
    }

    contributions.sort_by(|a, b| {
        b.weighted_contribution
            .abs()
            .partial_cmp(&a.weighted_contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    contributions.truncate(top_n);
    contributions
}

/// Evaluate one affordance against an already-computed affinity, with no
/// side effects. Returns `None` if the affordance does not trigger.
fn evaluate_one(def: &AffordanceDef, entity: &MemoryEntity, affinity: f64, actor: &ActorId, entity_id: &EntityId, now: f64) -> Option<AffordanceTrigger> {
    let (side, threshold, clamp_lookup): (TriggerSide, f64, fn(&HandleEffect) -> (f64, f64)) = if affinity < def.hostile_threshold {
        (TriggerSide::Hostile, def.hostile_threshold, |h| h.hostile_clamp)
    } else if affinity > def.favorable_threshold {
        (TriggerSide::Favorable, def.favorable_threshold, |h| h.favorable_clamp)
    } else {
        return None;
    };

    let fraction = severity_fraction(affinity, threshold);
    let mut adjustments = HashMap::new();
    for handle_effect in &def.handles {
        let clamp = clamp_lookup(handle_effect);
        adjustments.insert(handle_effect.handle.as_str().to_string(), clamp_value(fraction, clamp));
    }

    if let Some(modifier) = &def.additional_modifier {
        let condition_weight = entity.valuation_profile.get(&modifier.condition_event_type);
        if condition_weight < modifier.condition_valuation_below {
            for (handle, extra) in &modifier.extra_deltas {
                *adjustments.entry(handle.as_str().to_string()).or_insert(0.0) += extra;
            }
        }
    }

    let tells = match side {
        TriggerSide::Hostile => &def.hostile_tells,
        TriggerSide::Favorable => &def.favorable_tells,
    };
    let seed = format!("{}:{}:{}:{}", def.name, actor, entity_id, now);
    let chosen_tell = tells
        .get(deterministic_index(&seed, tells.len()))
        .cloned()
        .into_iter()
        .collect();

    let token = cooldown::token(&def.name, actor, entity_id);
    Some(AffordanceTrigger {
        affordance: def.name.clone(),
        side,
        adjustments,
        tells: chosen_tell,
        cooldown_token: token,
    })
}

/// Pure evaluation: no cooldown consultation, no mutation. Used by
/// `replay` and `reeval`, which must never touch live registry state.
pub fn evaluate_pure(entity: &MemoryEntity, registry: &AffordanceRegistry, context: &AffordanceContext, config: &AffinityConfig) -> AffordanceOutcome {
    evaluate_pure_with_bias(entity, registry, context, config, 0.0)
}

/// As [`evaluate_pure`], but blends in an institutional stance as an
/// additive bias on the computed affinity before thresholding (spec.md
/// §4.10). `institutional_stance` is whatever [`crate::institution::Institution::stance_toward`]
/// returned for this entity's affiliated institution(s); callers with no
/// institutional context pass `0.0`, which leaves the outcome identical
/// to [`evaluate_pure`] regardless of `config.channel_weights.institutional`.
pub fn evaluate_pure_with_bias(entity: &MemoryEntity, registry: &AffordanceRegistry, context: &AffordanceContext, config: &AffinityConfig, institutional_stance: f64) -> AffordanceOutcome {
    let local_affinity = compute_affinity(entity, &context.actor, &context.actor_tags, context.timestamp, config);
    let affinity = apply_institutional_bias(local_affinity, institutional_stance, config.channel_weights.institutional);
    let threshold_label = ThresholdLabel::classify(affinity);

    let mut triggers = Vec::new();
    for def in registry.candidates(&context.action_type) {
        if let Some(trigger) = evaluate_one(def, entity, affinity, &context.actor, &entity.id, context.timestamp) {
            triggers.push(trigger);
        }
    }

    finish_outcome(entity, &context.actor, &context.actor_tags, context.timestamp, config, affinity, threshold_label, triggers, Vec::new())
}

fn finish_outcome(entity: &MemoryEntity, actor: &ActorId, actor_tags: &[Tag], now: f64, config: &AffinityConfig, affinity: f64, threshold_label: ThresholdLabel, triggers: Vec<AffordanceTrigger>, cooldowns_consumed: Vec<String>) -> AffordanceOutcome {
    let mut adjustments = HashMap::new();
    let mut tells = Vec::new();
    for trigger in &triggers {
        for (handle, value) in &trigger.adjustments {
            adjustments.insert(handle.clone(), *value);
        }
        tells.extend(trigger.tells.iter().cloned());
    }
    let trace_log = top_trace_contributions(entity, actor, actor_tags, now, config, 5);

    AffordanceOutcome {
        affinity,
        threshold_label,
        triggered: !triggers.is_empty(),
        adjustments,
        tells,
        trace_log,
        cooldowns_consumed,
        triggers,
    }
}

/// The live pipeline: consults and writes cooldowns on the entity itself
/// (spec.md §4.8). The only entry point that mutates state.
pub fn evaluate_affordances(entity: &mut MemoryEntity, registry: &AffordanceRegistry, context: &AffordanceContext, config: &AffinityConfig) -> AffordanceOutcome {
    evaluate_affordances_with_bias(entity, registry, context, config, 0.0)
}

/// As [`evaluate_affordances`], with an institutional stance blended into
/// the computed affinity before thresholds, clamps, and tells are
/// resolved (spec.md §4.10). The bias never touches the entity's own
/// traces — it is folded in only at the point affinity is consumed.
pub fn evaluate_affordances_with_bias(entity: &mut MemoryEntity, registry: &AffordanceRegistry, context: &AffordanceContext, config: &AffinityConfig, institutional_stance: f64) -> AffordanceOutcome {
    let local_affinity = compute_affinity(entity, &context.actor, &context.actor_tags, context.timestamp, config);
    let affinity = apply_institutional_bias(local_affinity, institutional_stance, config.channel_weights.institutional);
    let threshold_label = ThresholdLabel::classify(affinity);

    let mut triggers = Vec::new();
    let mut cooldowns_consumed = Vec::new();
    for def in registry.candidates(&context.action_type) {
        let token = cooldown::token(&def.name, &context.actor, &entity.id);
        if entity.cooldowns.is_active(&token, context.timestamp) {
            continue;
        }
        if let Some(trigger) = evaluate_one(def, entity, affinity, &context.actor, &entity.id, context.timestamp) {
            entity.cooldowns.extend(token.clone(), context.timestamp + def.cooldown_seconds);
            cooldowns_consumed.push(token);
            triggers.push(trigger);
        }
    }

    finish_outcome(entity, &context.actor, &context.actor_tags, context.timestamp, config, affinity, threshold_label, triggers, cooldowns_consumed)
}

/// Admin `test(entity, affordance, side)`: force a trigger bypassing
/// threshold and cooldown checks, still writing the cooldown token so
/// the forced trigger behaves like a real one downstream (spec.md
/// §4.11). Does not bypass validation — the affordance must exist.
pub fn force_trigger(entity: &mut MemoryEntity, registry: &AffordanceRegistry, affordance: &str, side: TriggerSide, context: &AffordanceContext) -> Option<AffordanceTrigger> {
    let def = registry.get(affordance)?;
    // evaluate_one requires strictly crossing the threshold, so nudge past
    // it rather than landing exactly on it (spec.md §4.8 step 3a).
    let forced_affinity = match side {
        TriggerSide::Hostile => def.hostile_threshold - 1e-6,
        TriggerSide::Favorable => def.favorable_threshold + 1e-6,
    };
    let trigger = evaluate_one(def, entity, forced_affinity, &context.actor, &entity.id, context.timestamp)?;
    let token = cooldown::token(&def.name, &context.actor, &entity.id);
    entity.cooldowns.extend(token, context.timestamp + def.cooldown_seconds);
    Some(trigger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::event::EventRecord;
    use crate::valuation::ValuationProfile;

    fn pathing_def() -> AffordanceDef {
        AffordanceDef {
            name: "forest_pathing".to_string(),
            action_type: EventType::from("move.pass"),
            hostile_threshold: -0.3,
            favorable_threshold: 0.3,
            cooldown_seconds: 60.0,
            handles: vec![HandleEffect {
                handle: Handle::RoomTravelTimeModifier,
                hostile_clamp: (0.1, 0.6),
                favorable_clamp: (-0.3, -0.05),
            }],
            hostile_tells: vec!["The trees seem to lean away from your path.".to_string()],
            favorable_tells: vec!["The path opens easily before you.".to_string()],
            additional_modifier: None,
        }
    }

    fn forest_entity() -> MemoryEntity {
        let profile = ValuationProfile::new()
            .with("harm.fire", -0.8)
            .with("extract.hunt", -0.4)
            .with("offer.gift", 0.5);
        MemoryEntity::new("forest_clearing", EntityKind::Location, profile)
    }

    #[test]
    fn validate_rejects_too_many_handles() {
        let mut def = pathing_def();
        def.handles.push(HandleEffect {
            handle: Handle::RoomEncounterRateModifier,
            hostile_clamp: (0.0, 0.1),
            favorable_clamp: (0.0, -0.1),
        });
        def.handles.push(HandleEffect {
            handle: Handle::NpcAggroRadiusModifier,
            hostile_clamp: (0.0, 0.1),
            favorable_clamp: (0.0, -0.1),
        });
        assert_eq!(
            def.validate(),
            Err(ValidationError::TooManyHandles("forest_pathing".to_string(), 3))
        );
    }

    #[test]
    fn validate_rejects_forbidden_tell() {
        let mut def = pathing_def();
        def.hostile_tells = vec!["Affinity: -40 with this place".to_string()];
        assert!(def.validate().is_err());
    }

    #[test]
    fn registry_rejects_duplicate_movement_primary() {
        let mut registry = AffordanceRegistry::new();
        registry.register(pathing_def());
        let mut dup = pathing_def();
        dup.name = "other_pathing".to_string();
        registry.register(dup);
        assert!(matches!(
            registry.validate(),
            Err(ValidationError::DuplicateMovementPrimary(_, _))
        ));
    }

    #[test]
    fn fire_event_triggers_hostile_pathing() {
        let mut entity = forest_entity();
        let config = AffinityConfig::default();
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")],
            None,
            "forest_clearing",
            0.6,
            0.0,
            [],
        );
        crate::affinity::record_event(&mut entity, &event, &config);

        let mut registry = AffordanceRegistry::new();
        registry.register(pathing_def());

        let context = AffordanceContext {
            actor: ActorId::from("player_0042"),
            actor_tags: vec![Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")],
            action_type: EventType::from("move.pass"),
            action_target: None,
            timestamp: 0.0,
        };
        let outcome = evaluate_affordances(&mut entity, &registry, &context, &config);
        assert!(outcome.triggered);
        assert!(!outcome.tells.is_empty());
        assert!(outcome.adjustments.contains_key("room.travel_time_modifier"));
        assert!(outcome.adjustments["room.travel_time_modifier"] > 0.0);
    }

    #[test]
    fn cooldown_blocks_immediate_retrigger() {
        let mut entity = forest_entity();
        let config = AffinityConfig::default();
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [Tag::from("human")],
            None,
            "forest_clearing",
            0.6,
            0.0,
            [],
        );
        crate::affinity::record_event(&mut entity, &event, &config);

        let mut registry = AffordanceRegistry::new();
        registry.register(pathing_def());

        let context = AffordanceContext {
            actor: ActorId::from("player_0042"),
            actor_tags: vec![Tag::from("human")],
            action_type: EventType::from("move.pass"),
            action_target: None,
            timestamp: 0.0,
        };
        let first = evaluate_affordances(&mut entity, &registry, &context, &config);
        assert!(first.triggered);
        let mut second_context = context.clone();
        second_context.timestamp = 1.0;
        let second = evaluate_affordances(&mut entity, &registry, &second_context, &config);
        assert!(!second.triggered);
    }
}
