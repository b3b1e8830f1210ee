//! End-to-end scenarios and universal invariants.

use affinity_config::AffinityConfig;
use affinity_memory::{
    compute_affinity, evaluate_affordances, evaluate_pure, record_event, replay,
    AdditionalModifier, AffordanceContext, AffordanceDef, AffordanceRegistry, AffordanceSnapshot,
    EntityKind, EventRecord, EventType, Handle, HandleEffect, MemoryEntity, Tag, ValuationProfile,
};

const DAY: f64 = 86_400.0;

fn forest_valuation() -> ValuationProfile {
    ValuationProfile::new()
        .with("harm.fire", -0.8)
        .with("extract.hunt", -0.4)
        .with("offer.gift", 0.5)
}

fn pathing_registry() -> AffordanceRegistry {
    let mut registry = AffordanceRegistry::new();
    registry.register(AffordanceDef {
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
        hostile_tells: vec!["The undergrowth seems to close in around you.".to_string()],
        favorable_tells: vec!["The path opens easily before you.".to_string()],
        additional_modifier: None,
    });
    registry
}

fn fire_spell_registry() -> AffordanceRegistry {
    let mut registry = AffordanceRegistry::new();
    registry.register(AffordanceDef {
        name: "hostile_ground_spellcasting".to_string(),
        action_type: EventType::from("magic.cast"),
        hostile_threshold: -0.3,
        favorable_threshold: 0.3,
        cooldown_seconds: 30.0,
        handles: vec![
            HandleEffect {
                handle: Handle::SpellPowerModifier,
                hostile_clamp: (-0.25, -0.25),
                favorable_clamp: (0.05, 0.2),
            },
            HandleEffect {
                handle: Handle::SpellBackfireChance,
                hostile_clamp: (0.1, 0.1),
                favorable_clamp: (-0.05, -0.01),
            },
        ],
        hostile_tells: vec!["The air around you resists your spellcraft.".to_string()],
        favorable_tells: vec!["Magic answers your call with unusual ease.".to_string()],
        additional_modifier: Some(AdditionalModifier {
            condition_event_type: EventType::from("harm.fire"),
            condition_valuation_below: -0.5,
            extra_deltas: vec![
                (Handle::SpellPowerModifier, -0.15),
                (Handle::SpellBackfireChance, 0.15),
            ],
        }),
    });
    registry
}

#[test]
fn fire_event_produces_hostile_affinity_and_slows_pathing() {
    let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, forest_valuation());
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
    record_event(&mut entity, &event, &config);

    let affinity = compute_affinity(
        &entity,
        &affinity_memory::ActorId::from("player_0042"),
        &[Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")],
        0.0,
        &config,
    );
    assert!(affinity <= -0.3, "expected a hostile affinity, got {affinity}");

    let registry = pathing_registry();
    let context = AffordanceContext {
        actor: affinity_memory::ActorId::from("player_0042"),
        actor_tags: vec![Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")],
        action_type: EventType::from("move.pass"),
        action_target: None,
        timestamp: 0.0,
    };
    let outcome = evaluate_affordances(&mut entity, &registry, &context, &config);
    assert!(outcome.triggered);
    assert!(outcome.adjustments["room.travel_time_modifier"] > 0.0);
    assert!(!outcome.tells.is_empty());
}

#[test]
fn neutral_location_never_triggers() {
    let profile = ValuationProfile::new().with("trade.fair", 0.3);
    let mut entity = MemoryEntity::new("market_square", EntityKind::Location, profile);
    let config = AffinityConfig::default();
    let event = EventRecord::new(
        "move.pass",
        "player_0042",
        [],
        None,
        "market_square",
        0.05,
        0.0,
        [],
    );
    record_event(&mut entity, &event, &config);

    let registry = pathing_registry();
    let context = AffordanceContext {
        actor: affinity_memory::ActorId::from("player_0042"),
        actor_tags: vec![],
        action_type: EventType::from("move.pass"),
        action_target: None,
        timestamp: 0.0,
    };
    let outcome = evaluate_affordances(&mut entity, &registry, &context, &config);
    assert!(!outcome.triggered);
    assert!(outcome.adjustments.is_empty());
    assert!(outcome.tells.is_empty());
    assert!(outcome.affinity > -0.3 && outcome.affinity < 0.3);
}

#[test]
fn gift_counterplay_cycle_returns_affinity_toward_neutral() {
    let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, forest_valuation());
    let config = AffinityConfig::default();
    let actor = affinity_memory::ActorId::from("player_0042");
    let tags = [Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")];

    let fire = EventRecord::new("harm.fire", "player_0042", tags.clone(), None, "forest_clearing", 0.6, 0.0, []);
    record_event(&mut entity, &fire, &config);
    let affinity_after_fire = compute_affinity(&entity, &actor, &tags, 0.0, &config);
    assert!(affinity_after_fire < 0.0);

    for day in 1..=3 {
        let gift = EventRecord::new(
            "offer.gift",
            "player_0042",
            tags.clone(),
            None,
            "forest_clearing",
            0.5,
            day as f64 * 3.0 * DAY,
            [],
        );
        record_event(&mut entity, &gift, &config);
    }

    let affinity_after_gifts = compute_affinity(&entity, &actor, &tags, 9.0 * DAY, &config);
    assert!(
        affinity_after_gifts.abs() < affinity_after_fire.abs(),
        "gifts should have pulled affinity back toward neutral: after_fire={affinity_after_fire} after_gifts={affinity_after_gifts}"
    );
}

#[test]
fn affinity_decays_across_a_personal_half_life() {
    let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, forest_valuation());
    // Isolate the personal channel so the decay ratio below is attributable
    // to exactly one half-life, rather than a blend of three different
    // channel half-lives.
    let mut config = AffinityConfig::default();
    config.channel_weights.personal = 1.0;
    config.channel_weights.group = 0.0;
    config.channel_weights.behavior = 0.0;
    let actor = affinity_memory::ActorId::from("player_0042");
    let tags = [Tag::from("human")];

    let fire = EventRecord::new("harm.fire", "player_0042", tags.clone(), None, "forest_clearing", 0.6, 0.0, []);
    record_event(&mut entity, &fire, &config);

    let initial = compute_affinity(&entity, &actor, &tags, 0.0, &config).abs();
    let half_life_seconds = config.half_lives.location.personal * DAY;
    let after_decay = compute_affinity(&entity, &actor, &tags, half_life_seconds, &config).abs();

    assert!(after_decay < 0.7 * initial, "after_decay={after_decay} initial={initial}");
}

#[test]
fn universal_invariant_affinity_is_bounded() {
    let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, forest_valuation());
    let config = AffinityConfig::default();
    let tags = [Tag::from("human")];
    for i in 0..50 {
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            tags.clone(),
            None,
            "forest_clearing",
            1.0,
            i as f64 * DAY,
            [],
        );
        record_event(&mut entity, &event, &config);
    }
    let affinity = compute_affinity(&entity, &affinity_memory::ActorId::from("player_0042"), &tags, 50.0 * DAY, &config);
    assert!(affinity.abs() <= 1.0);
}

#[test]
fn snapshot_round_trips_through_replay_despite_live_perturbation() {
    let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, forest_valuation());
    let config = AffinityConfig::default();
    let tags = vec![Tag::from("human"), Tag::from("hunter"), Tag::from("outsider")];
    let fire = EventRecord::new("harm.fire", "player_0042", tags.clone(), None, "forest_clearing", 0.6, 0.0, []);
    record_event(&mut entity, &fire, &config);

    let registry = pathing_registry();
    let context = AffordanceContext {
        actor: affinity_memory::ActorId::from("player_0042"),
        actor_tags: tags.clone(),
        action_type: EventType::from("move.pass"),
        action_target: None,
        timestamp: 0.0,
    };
    let outcome = evaluate_affordances(&mut entity, &registry, &context, &config);
    let trigger = outcome.triggers.first().expect("pathing should trigger");
    let snapshot = AffordanceSnapshot::capture(
        &entity,
        &context,
        &config,
        outcome.affinity,
        outcome.threshold_label,
        trigger,
        None,
    );

    let unrelated = EventRecord::new(
        "social.greet",
        "player_9999",
        [Tag::from("elf")],
        None,
        "forest_clearing",
        0.9,
        100.0,
        [],
    );
    record_event(&mut entity, &unrelated, &config);

    assert!(replay(&snapshot, &registry).is_ok());
}

#[test]
fn fire_in_forest_spell_penalty_stacks() {
    let profile = ValuationProfile::new().with("harm.fire", -0.8);
    let mut entity = MemoryEntity::new("burned_grove", EntityKind::Location, profile);
    let config = AffinityConfig::default();
    let tags = vec![Tag::from("human")];
    let fire = EventRecord::new("harm.fire", "player_0042", tags.clone(), None, "burned_grove", 0.5, 0.0, []);
    record_event(&mut entity, &fire, &config);

    let registry = fire_spell_registry();
    let context = AffordanceContext {
        actor: affinity_memory::ActorId::from("player_0042"),
        actor_tags: tags,
        action_type: EventType::from("magic.cast"),
        action_target: None,
        timestamp: 0.0,
    };
    let outcome = evaluate_pure(&entity, &registry, &context, &config);
    assert!(outcome.triggered);
    let power = outcome.adjustments["spell.power_modifier"];
    let backfire = outcome.adjustments["spell.backfire_chance"];
    assert!((power - (-0.40)).abs() < 1e-9, "power was {power}");
    assert!((backfire - 0.25).abs() < 1e-9, "backfire was {backfire}");

    // Replaying the same forced context reproduces the stacked penalty.
    let repeat = evaluate_pure(&entity, &registry, &context, &config);
    assert_eq!(repeat.adjustments["spell.power_modifier"], power);
    assert_eq!(repeat.adjustments["spell.backfire_chance"], backfire);
}
