//! The read-only admin query surface (spec.md §4.11, SPEC_FULL.md §4.11):
//! `inspect`, `why`, `history`, `replay`, `reeval`, `toggle`, `test`.
//!
//! None of these operators mutate trace state — `toggle` is the one
//! exception, and it only ever flips a runtime-level enabled/disabled
//! flag, never the registry's validated affordance definitions.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use affinity_memory::{
    replay as replay_snapshot, ActorId, AffordanceContext, AffordanceOutcome, AffordanceTrigger,
    CoreError, EntityId, ReplayError, Tag, ThresholdLabel, TraceContribution, TriggerSide,
};

use crate::history::TriggerLogEntry;
use crate::world::World;

/// `inspect(entity)`: current affinity toward a caller plus its top
/// trace contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReport {
    pub entity_id: EntityId,
    pub affinity: f64,
    pub threshold_label: ThresholdLabel,
    pub top_traces: Vec<TraceContribution>,
}

/// `why(entity, actor)`: the same top traces as `inspect`, broken down
/// explicitly by channel for a human operator debugging a specific
/// relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhyReport {
    pub entity_id: EntityId,
    pub affinity: f64,
    pub personal: Vec<TraceContribution>,
    pub group: Vec<TraceContribution>,
    pub behavior: Vec<TraceContribution>,
}

/// Wraps a [`World`] with the read-mostly query operators spec.md §4.11
/// names. A thin facade: every method borrows the shared world rather
/// than owning state of its own.
#[derive(Clone)]
pub struct AdminSurface {
    world: Arc<World>,
}

impl AdminSurface {
    pub fn new(world: Arc<World>) -> Self {
        Self { world }
    }

    /// Direct access to the underlying world for operators spec.md §4.11
    /// doesn't name (`log_event`, `evaluate`, `tick`, `reload_config`) but
    /// the host still needs over the same socket.
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub async fn inspect(&self, entity_id: &EntityId, actor: &ActorId, actor_tags: &[Tag]) -> Result<InspectReport, CoreError> {
        let now = self.world.now().await;
        let context = AffordanceContext {
            actor: actor.clone(),
            actor_tags: actor_tags.to_vec(),
            action_type: affinity_memory::EventType::from("admin.inspect"),
            action_target: None,
            timestamp: now,
        };
        let outcome = self.world.evaluate(entity_id, &context).await?;
        Ok(InspectReport {
            entity_id: entity_id.clone(),
            affinity: outcome.affinity,
            threshold_label: outcome.threshold_label,
            top_traces: outcome.trace_log,
        })
    }

    pub async fn why(&self, entity_id: &EntityId, actor: &ActorId, actor_tags: &[Tag]) -> Result<WhyReport, CoreError> {
        let now = self.world.now().await;
        let context = AffordanceContext {
            actor: actor.clone(),
            actor_tags: actor_tags.to_vec(),
            action_type: affinity_memory::EventType::from("admin.why"),
            action_target: None,
            timestamp: now,
        };
        let outcome = self.world.evaluate(entity_id, &context).await?;
        let mut personal = Vec::new();
        let mut group = Vec::new();
        let mut behavior = Vec::new();
        for contribution in outcome.trace_log {
            match contribution.channel {
                "personal" => personal.push(contribution),
                "group" => group.push(contribution),
                "behavior" => behavior.push(contribution),
                _ => {}
            }
        }
        Ok(WhyReport {
            entity_id: entity_id.clone(),
            affinity: outcome.affinity,
            personal,
            group,
            behavior,
        })
    }

    /// `history(entity, hours)`: recent triggers within the trailing
    /// window, converted from hours to the world's simulated seconds.
    pub async fn history(&self, entity_id: &EntityId, hours: f64) -> Vec<TriggerLogEntry> {
        let now = self.world.now().await;
        let since = now - Duration::from_secs_f64(hours.max(0.0) * 3600.0).as_secs_f64();
        self.world.recent_history(entity_id, since).await
    }

    pub async fn replay(&self, trigger_id: Uuid) -> Result<(), ReplayError> {
        let Some(snapshot) = self.world.snapshot(trigger_id).await else {
            return Err(ReplayError::SnapshotMismatch {
                field: "trigger_id",
                recorded: trigger_id.to_string(),
                recomputed: "no snapshot stored for this trigger".to_string(),
            });
        };
        let registry = self.world.effective_registry().await;
        replay_snapshot(&snapshot, &registry)
    }

    /// `reeval(entity, actor)`: affinity against live (possibly changed
    /// since any snapshot) traces — never used for regression checks.
    pub async fn reeval(&self, entity_id: &EntityId, actor: &ActorId, actor_tags: &[Tag]) -> Result<f64, CoreError> {
        self.world.reeval_entity(entity_id, actor, actor_tags).await
    }

    pub async fn toggle(&self, affordance: &str, on: bool) {
        self.world.toggle(affordance, on).await;
    }

    pub async fn test(
        &self,
        entity_id: &EntityId,
        actor: &ActorId,
        actor_tags: &[Tag],
        affordance: &str,
        side: TriggerSide,
    ) -> Result<Option<AffordanceTrigger>, CoreError> {
        let now = self.world.now().await;
        let context = AffordanceContext {
            actor: actor.clone(),
            actor_tags: actor_tags.to_vec(),
            action_type: affinity_memory::EventType::from("admin.test"),
            action_target: None,
            timestamp: now,
        };
        self.world.force_trigger(entity_id, affordance, side, &context).await
    }
}

#[allow(dead_code)]
fn assert_outcome_never_mutates_traces(_outcome: &AffordanceOutcome) {}
