//! Affinity computation (spec.md §4.5).

use affinity_config::{AffinityConfig, ChannelHalfLives};

use crate::entity::{EntityKind, GroupKey, MemoryEntity, PersonalKey};
use crate::event::EventRecord;
use crate::ids::{ActorId, Tag};

fn half_lives_for<'a>(config: &'a AffinityConfig, kind: EntityKind) -> &'a ChannelHalfLives {
    match kind {
        EntityKind::Location => &config.half_lives.location,
        EntityKind::Artifact => &config.half_lives.artifact,
        EntityKind::Npc => &config.half_lives.npc,
    }
}

/// Decayed-value-weighted-by-valuation sum across a channel's current
/// entries, evaluated against the requesting actor's tags and identity.
fn personal_contribution(entity: &MemoryEntity, actor: &ActorId, now: f64, half_lives: &ChannelHalfLives, scar_hl: f64) -> f64 {
    entity
        .personal
        .iter()
        .filter(|(key, _)| &key.0 == actor)
        .map(|(key, record)| {
            let decayed = record.decayed_value(now, half_lives.personal, scar_hl);
            decayed * entity.valuation_profile.get(&key.1)
        })
        .sum()
}

fn group_contribution(entity: &MemoryEntity, actor_tags: &[Tag], now: f64, half_lives: &ChannelHalfLives, scar_hl: f64) -> f64 {
    entity
        .group
        .iter()
        .filter(|(key, _)| actor_tags.contains(&key.0))
        .map(|(key, record)| {
            let decayed = record.decayed_value(now, half_lives.group, scar_hl);
            decayed * entity.valuation_profile.get(&key.1)
        })
        .sum()
}

fn behavior_contribution(entity: &MemoryEntity, now: f64, half_lives: &ChannelHalfLives, scar_hl: f64) -> f64 {
    entity
        .behavior
        .iter()
        .map(|(event_type, record)| {
            let decayed = record.decayed_value(now, half_lives.behavior, scar_hl);
            decayed * entity.valuation_profile.get(event_type)
        })
        .sum()
}

/// Blend the three channels into a single affinity in `(-1,1)` via a
/// tanh normalizer. Pure — never reads or refreshes `mood_bands`, never
/// reads an institutional bias. See [`apply_institutional_bias`] for the
/// additive bias channel kept separate on purpose (spec.md §9).
pub fn compute_affinity(entity: &MemoryEntity, actor: &ActorId, actor_tags: &[Tag], now: f64, config: &AffinityConfig) -> f64 {
    let half_lives = half_lives_for(config, entity.kind);
    let scar_hl = config.compaction.scar_half_life_days;
    let weights = &config.channel_weights;

    let personal = personal_contribution(entity, actor, now, half_lives, scar_hl);
    let group = group_contribution(entity, actor_tags, now, half_lives, scar_hl);
    let behavior = behavior_contribution(entity, now, half_lives, scar_hl);

    let raw = weights.personal * personal + weights.group * group + weights.behavior * behavior;
    (raw * config.affinity_scale / 10.0).tanh()
}

/// The group channel alone, tanh-normalized the same way
/// [`compute_affinity`] normalizes its full blend, for a single actor tag
/// rather than a list — institutions query constituents this way since
/// they have no personal relationship with any one actor and no
/// behavioral signal of their own (spec.md §4.10 step 1: "using the group
/// channel only").
pub fn group_channel_affinity(entity: &MemoryEntity, tag: &Tag, now: f64, config: &AffinityConfig) -> f64 {
    let half_lives = half_lives_for(config, entity.kind);
    let scar_hl = config.compaction.scar_half_life_days;

    let raw: f64 = entity
        .group
        .iter()
        .filter(|(key, _)| &key.0 == tag)
        .map(|(key, record)| {
            let decayed = record.decayed_value(now, half_lives.group, scar_hl);
            decayed * entity.valuation_profile.get(&key.1)
        })
        .sum();

    (raw * config.channel_weights.group * config.affinity_scale / 10.0).tanh()
}

/// Additive bias from an institution's current stance, applied on top of
/// a previously computed affinity rather than folded into
/// [`compute_affinity`] itself — institutional membership is the caller's
/// business, not this function's (spec.md §4.10, §9).
pub fn apply_institutional_bias(affinity: f64, institutional_stance: f64, institutional_weight: f64) -> f64 {
    (affinity + institutional_weight * institutional_stance).clamp(-1.0, 1.0)
}

/// Record one event's contribution into an entity's traces, using the
/// entity's *current* saturation snapshot for the dampening factor. Does
/// not refresh saturation — that only happens authoritatively at world
/// tick (spec.md §4.6).
pub fn record_event(entity: &mut MemoryEntity, event: &EventRecord, config: &AffinityConfig) {
    let half_lives = half_lives_for(config, entity.kind);
    let scar_hl = config.compaction.scar_half_life_days;

    entity.personal.log(
        PersonalKey(event.actor.clone(), event.event_type.clone()),
        event.timestamp,
        event.intensity,
        entity.saturation.personal,
        half_lives.personal,
        scar_hl,
    );

    for tag in &event.actor_tags {
        entity.group.log(
            GroupKey(tag.clone(), event.event_type.clone()),
            event.timestamp,
            event.intensity,
            entity.saturation.group,
            half_lives.group,
            scar_hl,
        );
    }

    entity.behavior.log(
        event.event_type.clone(),
        event.timestamp,
        event.intensity,
        entity.saturation.behavior,
        half_lives.behavior,
        scar_hl,
    );

    if let Some(bearer) = entity.bearer.as_mut() {
        bearer.log(
            event.actor.clone(),
            event.timestamp,
            event.intensity,
            0.0,
            half_lives.personal,
            scar_hl,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::ValuationProfile;

    fn test_config() -> AffinityConfig {
        AffinityConfig::default()
    }

    #[test]
    fn hostile_event_drives_affinity_negative() {
        let profile = ValuationProfile::new().with("harm.fire", -0.8);
        let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, profile);
        let config = test_config();
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [Tag::from("human")],
            None,
            "forest_clearing",
            1.0,
            0.0,
            [],
        );
        record_event(&mut entity, &event, &config);
        let affinity = compute_affinity(
            &entity,
            &ActorId::from("player_0042"),
            &[Tag::from("human")],
            0.0,
            &config,
        );
        assert!(affinity < 0.0);
    }

    #[test]
    fn unobserved_actor_sees_no_personal_contribution() {
        let profile = ValuationProfile::new().with("harm.fire", -0.8);
        let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, profile);
        let config = test_config();
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [],
            None,
            "forest_clearing",
            1.0,
            0.0,
            [],
        );
        record_event(&mut entity, &event, &config);
        let affinity = compute_affinity(&entity, &ActorId::from("player_9999"), &[], 0.0, &config);
        assert_eq!(affinity, 0.0);
    }

    #[test]
    fn institutional_bias_is_additive_and_clamped() {
        assert!((apply_institutional_bias(0.5, 1.0, 1.0) - 1.0).abs() < 1e-9);
        assert!((apply_institutional_bias(-0.5, -1.0, 1.0) - (-1.0)).abs() < 1e-9);
        assert!((apply_institutional_bias(0.0, 0.4, 0.5) - 0.2).abs() < 1e-9);
    }
}
