//! End-to-end: start the daemon over a real Unix socket, drive it
//! through the client, and confirm a world tick plus a triggered
//! affordance round-trip through `history`/`replay`.

use std::time::Duration;

use affinity_config::AffinityConfig;
use affinity_memory::{
    ActorId, AffordanceDef, AffordanceRegistry, EntityKind, EntityId, EventRecord, Handle,
    HandleEffect, MemoryEntity, Tag, TriggerSide, ValuationProfile,
};
use affinity_runtime::{run_daemon, DaemonClient, World};

fn pathing_registry() -> AffordanceRegistry {
    let mut registry = AffordanceRegistry::new();
    registry.register(AffordanceDef {
        name: "forest_pathing".to_string(),
        action_type: affinity_memory::EventType::from("move.pass"),
        hostile_threshold: -0.3,
        favorable_threshold: 0.3,
        cooldown_seconds: 60.0,
        handles: vec![HandleEffect {
            handle: Handle::RoomTravelTimeModifier,
            hostile_clamp: (0.1, 0.6),
            favorable_clamp: (-0.3, -0.05),
        }],
        hostile_tells: vec!["The undergrowth closes in.".to_string()],
        favorable_tells: vec!["The path opens easily.".to_string()],
        additional_modifier: None,
    });
    registry
}

#[tokio::test]
async fn daemon_round_trips_log_evaluate_history_replay() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket_path = dir.path().join("affinity.sock");

    let mut config = AffinityConfig::default();
    config.world_tick_interval_seconds = 3600;

    let socket_for_server = socket_path.clone();
    let server = tokio::spawn(async move {
        run_daemon(config, pathing_registry(), socket_for_server).await
    });

    // Give the listener a moment to bind before the client connects.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = DaemonClient::new(&socket_path);
    client.connect_with_backoff(20).await.expect("daemon did not come up");
    client.ping().await.expect("ping failed");

    client
        .register_entity(
            EntityId::from("forest_clearing"),
            EntityKind::Location,
            ValuationProfile::new().with("harm.fire", -0.8),
        )
        .await
        .expect("register_entity failed");

    let event = EventRecord::new(
        "harm.fire",
        "player_0042",
        [Tag::from("human"), Tag::from("hunter")],
        None,
        "forest_clearing",
        0.6,
        0.0,
        [],
    );
    client.log_event(event).await.expect("log_event failed");

    let outcome = client
        .evaluate(
            EntityId::from("forest_clearing"),
            ActorId::from("player_0042"),
            vec![Tag::from("human"), Tag::from("hunter")],
            "move.pass",
            None,
        )
        .await
        .expect("evaluate failed");
    assert!(outcome.triggered);

    let history = client
        .history(EntityId::from("forest_clearing"), 1.0)
        .await
        .expect("history failed");
    assert_eq!(history.len(), 1);

    client.replay(history[0].trigger_id).await.expect("replay failed");

    let (now, ticked) = client.tick_now(300.0).await.expect("tick failed");
    assert_eq!(now, 300.0);
    assert_eq!(ticked, 1);

    client.shutdown().await.expect("shutdown failed");
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
}

#[tokio::test]
async fn world_tick_advances_simulated_time_directly() {
    let world = World::new(AffinityConfig::default(), AffordanceRegistry::new()).unwrap();
    world
        .register_entity(MemoryEntity::new(
            "forest_clearing",
            EntityKind::Location,
            ValuationProfile::new(),
        ))
        .await;
    let reports = world.tick_all(120.0).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(world.now().await, 120.0);
}
