//! The in-process demo world: one forest `Location`, one `player_0042`
//! actor, one `hunter's guild` institution (SPEC_FULL.md §6). Runs
//! entirely against a local [`World`] — no socket, no background
//! process — so its output is reproducible from a cold start every
//! time.

use anyhow::Result;

use affinity_config::AffinityConfig;
use affinity_memory::{
    AffordanceContext, AffordanceDef, AffordanceRegistry, EntityId, EntityKind, EventRecord,
    EventType, Handle, HandleEffect, Tag, TriggerSide, ValuationProfile,
};
use affinity_runtime::{AdminSurface, World};

fn demo_registry() -> AffordanceRegistry {
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
        hostile_tells: vec!["The undergrowth closes in around you.".to_string()],
        favorable_tells: vec!["The path opens easily underfoot.".to_string()],
        additional_modifier: None,
    });
    registry.register(AffordanceDef {
        name: "hunters_welcome".to_string(),
        action_type: EventType::from("trade.offer"),
        hostile_threshold: -0.4,
        favorable_threshold: 0.25,
        cooldown_seconds: 120.0,
        handles: vec![HandleEffect {
            handle: Handle::LootQualityModifier,
            hostile_clamp: (-0.6, -0.1),
            favorable_clamp: (0.1, 0.6),
        }],
        hostile_tells: vec!["A hunter spits at your feet.".to_string()],
        favorable_tells: vec!["A hunter nods and waves you toward the stalls.".to_string()],
        additional_modifier: None,
    });
    registry
}

pub async fn run() -> Result<()> {
    let mut config = AffinityConfig::default();
    // Give the institutional channel a small, nonzero weight so the
    // hunters' guild's stance actually shows up in this walkthrough
    // (default is 0.0 — opt-in per spec.md §9).
    config.channel_weights.institutional = 0.1;
    let world = World::new(config, demo_registry())?;
    let world = std::sync::Arc::new(world);
    let admin = AdminSurface::new(world.clone());

    let entity_id = EntityId::from("forest_clearing");
    let actor = affinity_memory::ActorId::from("player_0042");
    let actor_tags = vec![Tag::from("human"), Tag::from("hunter")];

    world
        .register_entity(
            affinity_memory::MemoryEntity::new(
                entity_id.clone(),
                EntityKind::Location,
                ValuationProfile::new()
                    .with("harm.fire", -0.8)
                    .with("offer.gift", 0.5),
            )
            .with_tags([Tag::from("hunter")]),
        )
        .await;
    println!("── demo world ───────────────────────────────────────");
    println!("- entity: {entity_id} (Location)");
    println!("- actor:  {actor} [{}]", actor_tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(", "));

    world.track_institution_tag("hunters_guild", Tag::from("hunter")).await;
    world.register_institution("hunters_guild", vec![Tag::from("hunter")]).await;

    println!();
    println!("── log_event: harm.fire ─────────────────────────────");
    let burn = EventRecord::new(
        "harm.fire",
        actor.clone(),
        actor_tags.clone(),
        None,
        entity_id.clone(),
        0.6,
        0.0,
        [],
    );
    world.log_event(burn).await?;
    println!("- recorded harm.fire at t=0.0 (intensity 0.6)");

    println!();
    println!("── evaluate: move.pass ──────────────────────────────");
    let move_context = AffordanceContext {
        actor: actor.clone(),
        actor_tags: actor_tags.clone(),
        action_type: EventType::from("move.pass"),
        action_target: None,
        timestamp: 0.0,
    };
    let outcome = world.evaluate(&entity_id, &move_context).await?;
    println!("- affinity: {:.3} ({:?})", outcome.affinity, outcome.threshold_label);
    println!("- triggered: {}", outcome.triggered);
    for trigger in &outcome.triggers {
        println!("  {} [{:?}]: {}", trigger.affordance, trigger.side, trigger.tells.join(" "));
    }

    println!();
    println!("── admin inspect ────────────────────────────────────");
    let inspect = admin.inspect(&entity_id, &actor, &actor_tags).await?;
    println!("- affinity: {:.3} ({:?})", inspect.affinity, inspect.threshold_label);
    for trace in &inspect.top_traces {
        println!("  {:<9} {:<24} {:+.3}", trace.channel, trace.key_description, trace.weighted_contribution);
    }

    println!();
    println!("── admin why ─────────────────────────────────────────");
    let why = admin.why(&entity_id, &actor, &actor_tags).await?;
    println!("- personal: {} traces", why.personal.len());
    println!("- group:    {} traces", why.group.len());
    println!("- behavior: {} traces", why.behavior.len());

    println!();
    println!("── gift and a favorable trade offer ─────────────────");
    let gift = EventRecord::new(
        "offer.gift",
        actor.clone(),
        actor_tags.clone(),
        None,
        entity_id.clone(),
        0.7,
        30.0,
        [],
    );
    world.log_event(gift).await?;
    let trade_context = AffordanceContext {
        actor: actor.clone(),
        actor_tags: actor_tags.clone(),
        action_type: EventType::from("trade.offer"),
        action_target: None,
        timestamp: 30.0,
    };
    let trade_outcome = world.evaluate(&entity_id, &trade_context).await?;
    println!("- affinity: {:.3} ({:?})", trade_outcome.affinity, trade_outcome.threshold_label);
    println!("- triggered: {}", trade_outcome.triggered);

    world.refresh_institutions().await;
    println!("- hunters_guild stance toward 'hunter': {:.3}", world.institution_stance("hunters_guild", &Tag::from("hunter")).await);

    println!();
    println!("── admin history (last hour) ────────────────────────");
    let history = admin.history(&entity_id, 1.0).await;
    for entry in &history {
        println!("  {} {} [{:?}] at t={:.1}", entry.trigger_id, entry.affordance, entry.side, entry.timestamp);
    }

    if let Some(entry) = history.first() {
        println!();
        println!("── admin replay ──────────────────────────────────────");
        match admin.replay(entry.trigger_id).await {
            Ok(()) => println!("- replay confirmed: recomputed affinity matches the stored snapshot"),
            Err(err) => println!("- replay mismatch: {err}"),
        }
    }

    println!();
    println!("── admin reeval ──────────────────────────────────────");
    let reevaled = admin.reeval(&entity_id, &actor, &actor_tags).await?;
    println!("- live affinity: {reevaled:.3}");

    println!();
    println!("── admin toggle + test ───────────────────────────────");
    admin.toggle("forest_pathing", false).await;
    let disabled_outcome = world.evaluate(&entity_id, &move_context).await?;
    println!("- forest_pathing disabled, evaluate(move.pass) triggered: {}", disabled_outcome.triggered);
    admin.toggle("forest_pathing", true).await;
    let forced = admin
        .test(&entity_id, &actor, &actor_tags, "forest_pathing", TriggerSide::Hostile)
        .await?;
    match forced {
        Some(trigger) => println!("- forced hostile trigger: {}", trigger.tells.join(" ")),
        None => println!("- forced trigger produced nothing (affordance missing)"),
    }

    println!();
    println!("── world tick + compaction ───────────────────────────");
    let ticks = world.tick_all(300.0).await;
    println!("- tick_all(300s): {} entities, now={:.1}", ticks.len(), world.now().await);
    let compacted = world.compact_all().await;
    for (id, report) in &compacted {
        println!(
            "  {id}: {} folded, {} promoted to scar, {} deleted",
            report.group_keys_folded, report.promoted_to_scar, report.deleted
        );
    }

    Ok(())
}
