//! Wire protocol for the Unix domain socket admin/ingest channel
//! (SPEC_FULL.md §4.11, §6): one JSON line per command, one JSON line per
//! response, following the teacher's `commands.rs` line-delimited
//! `serde_json` convention.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use affinity_config::AffinityConfig;
use affinity_memory::{
    ActorId, AffordanceOutcome, AffordanceTrigger, EntityId, EntityKind, EventRecord, Tag,
    TriggerSide, ValuationProfile,
};

use crate::admin::{InspectReport, WhyReport};
use crate::history::TriggerLogEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientCommand {
    Ping,
    /// Seed a new memory-bearing entity. Host-driven setup, not part of
    /// spec.md §4.11's read-only admin surface.
    RegisterEntity {
        entity_id: EntityId,
        kind: EntityKind,
        valuation_profile: ValuationProfile,
    },
    /// Record an event against an entity's traces.
    LogEvent { event: EventRecord },
    /// Run the affordance pipeline for one action.
    Evaluate {
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
        action_type: String,
        action_target: Option<ActorId>,
    },
    Inspect {
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
    },
    Why {
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
    },
    History {
        entity_id: EntityId,
        hours: f64,
    },
    Replay {
        trigger_id: Uuid,
    },
    Reeval {
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
    },
    Toggle {
        affordance: String,
        on: bool,
    },
    Test {
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
        affordance: String,
        side: TriggerSide,
    },
    /// Force an immediate world tick rather than waiting for the
    /// scheduler's interval (useful for demos and tests).
    Tick { delta_seconds: f64 },
    ReloadConfig { config: AffinityConfig },
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    Pong,
    Ack,
    Evaluated(AffordanceOutcome),
    Inspected(InspectReport),
    Whyed(WhyReport),
    History(Vec<TriggerLogEntry>),
    Replayed { ok: bool, detail: Option<String> },
    Reevaled(f64),
    Tested(Option<AffordanceTrigger>),
    Ticked { now: f64, entities_ticked: usize },
    Error { message: String },
}
