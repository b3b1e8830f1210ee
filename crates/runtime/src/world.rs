//! The entity registry, affordance registry, and institution set
//! (SPEC_FULL.md §5): the shared state every admin operator and the
//! scheduler loop in [`crate::server`] operate over.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use affinity_config::AffinityConfig;
use affinity_memory::{
    compact_traces, evaluate_affordances_with_bias, force_trigger, record_event, AffordanceContext,
    AffordanceOutcome, AffordanceRegistry, AffordanceSnapshot, AffordanceTrigger, CompactionReport,
    CoreError, EntityId, EventRecord, Institution, MemoryEntity, Tag, ThresholdLabel, TickReport,
    TriggerSide,
};

use crate::history::{AffordanceTriggerLog, TriggerLogEntry};

/// Shared, lockable registry of memory-bearing entities. Each entity
/// lives behind its own `tokio::sync::Mutex` — the world tick and every
/// admin operator acquire at most one entity lock at a time, never two
/// simultaneously (SPEC_FULL.md §5 forbids cross-entity lock nesting).
pub struct World {
    entities: RwLock<HashMap<EntityId, Arc<Mutex<MemoryEntity>>>>,
    registry: RwLock<AffordanceRegistry>,
    /// Affordances disabled by the `toggle` admin operator. Kept apart
    /// from `registry` so `toggle` never needs to re-validate the whole
    /// registry (the duplicate-movement-primary check already ran at
    /// load time and a disabled affordance is still a structurally valid
    /// one, merely excluded from evaluation).
    disabled: RwLock<HashSet<String>>,
    institutions: Mutex<HashMap<String, Institution>>,
    config: ArcSwap<AffinityConfig>,
    history: Mutex<AffordanceTriggerLog>,
    snapshots: Mutex<HashMap<Uuid, AffordanceSnapshot>>,
    sim_now: Mutex<f64>,
}

impl World {
    pub fn new(config: AffinityConfig, registry: AffordanceRegistry) -> Result<Self, affinity_memory::ValidationError> {
        registry.validate()?;
        Ok(Self {
            entities: RwLock::new(HashMap::new()),
            registry: RwLock::new(registry),
            disabled: RwLock::new(HashSet::new()),
            institutions: Mutex::new(HashMap::new()),
            config: ArcSwap::new(Arc::new(config)),
            history: Mutex::new(AffordanceTriggerLog::default()),
            snapshots: Mutex::new(HashMap::new()),
            sim_now: Mutex::new(0.0),
        })
    }

    pub fn config(&self) -> Arc<AffinityConfig> {
        self.config.load_full()
    }

    /// Hot-swap the live config. Re-validated before the swap so a
    /// malformed reload never reaches a running world (mirrors the
    /// teacher's `ReloadConfig` handler, which re-reads and replaces the
    /// whole config in place rather than patching fields).
    pub fn reload_config(&self, config: AffinityConfig) -> Result<(), affinity_config::ValidationError> {
        config.validate()?;
        self.config.store(Arc::new(config));
        info!("config reloaded");
        Ok(())
    }

    #[instrument(skip(self, entity))]
    pub async fn register_entity(&self, entity: MemoryEntity) {
        debug!(entity = %entity.id, "entity registered");
        self.entities
            .write()
            .await
            .insert(entity.id.clone(), Arc::new(Mutex::new(entity)));
    }

    async fn handle_for(&self, entity_id: &EntityId) -> Result<Arc<Mutex<MemoryEntity>>, CoreError> {
        self.entities
            .read()
            .await
            .get(entity_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownEntity(entity_id.clone()))
    }

    pub async fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.read().await.keys().cloned().collect()
    }

    pub async fn now(&self) -> f64 {
        *self.sim_now.lock().await
    }

    /// The effective registry for evaluation: the full registry with
    /// `toggle`-disabled affordances filtered out. Cheap to rebuild per
    /// call since registries are small (spec.md §9's "closed and
    /// inspectable" affordance set).
    pub(crate) async fn effective_registry(&self) -> AffordanceRegistry {
        let registry = self.registry.read().await;
        let disabled = self.disabled.read().await;
        if disabled.is_empty() {
            return registry.clone();
        }
        AffordanceRegistry {
            affordances: registry
                .affordances
                .iter()
                .filter(|def| !disabled.contains(&def.name))
                .cloned()
                .collect(),
        }
    }

    #[instrument(skip(self, event))]
    pub async fn log_event(&self, event: EventRecord) -> Result<(), CoreError> {
        let handle = self.handle_for(&event.location).await?;
        let config = self.config();
        let mut entity = handle.lock().await;
        record_event(&mut entity, &event, &config);
        debug!(entity = %entity.id, event_type = %event.event_type, "event recorded");
        Ok(())
    }

    /// The entity's institutional bias toward this action's actor: the
    /// mean stance, over every tracked institution the entity is
    /// affiliated with (by tag overlap with `affiliated_entity_tags`), of
    /// that institution toward any of the actor's tags. `0.0` if the
    /// entity belongs to no tracked institution, which leaves affinity
    /// untouched regardless of `channel_weights.institutional` (spec.md
    /// §4.10 — additive, never a replacement for local memory).
    async fn institutional_stance_for(&self, entity: &MemoryEntity, actor_tags: &[Tag]) -> f64 {
        if entity.tags.is_empty() || actor_tags.is_empty() {
            return 0.0;
        }
        let institutions = self.institutions.lock().await;
        let mut samples = Vec::new();
        for institution in institutions.values() {
            if !institution
                .affiliated_entity_tags
                .iter()
                .any(|tag| entity.tags.contains(tag))
            {
                continue;
            }
            for tag in actor_tags {
                samples.push(institution.stance_toward(tag));
            }
        }
        if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        }
    }

    /// Run the affordance pipeline for one action, recording a replayable
    /// snapshot and a history entry for every trigger produced.
    #[instrument(skip(self, context))]
    pub async fn evaluate(&self, entity_id: &EntityId, context: &AffordanceContext) -> Result<AffordanceOutcome, CoreError> {
        let handle = self.handle_for(entity_id).await?;
        let config = self.config();
        let registry = self.effective_registry().await;
        let mut entity = handle.lock().await;
        let institutional_stance = self.institutional_stance_for(&entity, &context.actor_tags).await;
        let outcome = evaluate_affordances_with_bias(&mut entity, &registry, context, &config, institutional_stance);

        if outcome.triggered {
            let mut history = self.history.lock().await;
            let mut snapshots = self.snapshots.lock().await;
            for trigger in &outcome.triggers {
                let trigger_id = Uuid::new_v4();
                let snapshot = AffordanceSnapshot::capture_with_bias(
                    &entity,
                    context,
                    &config,
                    outcome.affinity,
                    outcome.threshold_label,
                    trigger,
                    None,
                    institutional_stance,
                );
                info!(affordance = %trigger.affordance, side = ?trigger.side, "affordance triggered");
                history.push(TriggerLogEntry {
                    trigger_id,
                    entity_id: entity_id.clone(),
                    affordance: trigger.affordance.clone(),
                    side: trigger.side,
                    tells: trigger.tells.clone(),
                    timestamp: context.timestamp,
                });
                snapshots.insert(trigger_id, snapshot);
            }
        }

        Ok(outcome)
    }

    /// Force a trigger irrespective of threshold (the `test` admin
    /// operator), still recording a snapshot so forced triggers remain
    /// replayable and auditable.
    #[instrument(skip(self, context))]
    pub async fn force_trigger(
        &self,
        entity_id: &EntityId,
        affordance: &str,
        side: TriggerSide,
        context: &AffordanceContext,
    ) -> Result<Option<AffordanceTrigger>, CoreError> {
        let handle = self.handle_for(entity_id).await?;
        let config = self.config();
        let registry = self.effective_registry().await;
        let forced_affinity = registry.get(affordance).map(|def| match side {
            TriggerSide::Hostile => def.hostile_threshold,
            TriggerSide::Favorable => def.favorable_threshold,
        });
        let mut entity = handle.lock().await;
        let trigger = force_trigger(&mut entity, &registry, affordance, side, context);

        if let (Some(ref trigger), Some(forced_affinity)) = (&trigger, forced_affinity) {
            let threshold_label = ThresholdLabel::classify(forced_affinity);
            let trigger_id = Uuid::new_v4();
            let snapshot = AffordanceSnapshot::capture(
                &entity, context, &config, forced_affinity, threshold_label, trigger, None,
            );
            let mut history = self.history.lock().await;
            let mut snapshots = self.snapshots.lock().await;
            history.push(TriggerLogEntry {
                trigger_id,
                entity_id: entity_id.clone(),
                affordance: trigger.affordance.clone(),
                side: trigger.side,
                tells: trigger.tells.clone(),
                timestamp: context.timestamp,
            });
            snapshots.insert(trigger_id, snapshot);
        }

        Ok(trigger)
    }

    /// `reeval(entity, actor)`: affinity against live traces only, never
    /// touching cooldowns or the trigger log (spec.md §4.11).
    pub async fn reeval_entity(&self, entity_id: &EntityId, actor: &affinity_memory::ActorId, actor_tags: &[Tag]) -> Result<f64, CoreError> {
        let handle = self.handle_for(entity_id).await?;
        let config = self.config();
        let now = self.now().await;
        let entity = handle.lock().await;
        Ok(affinity_memory::reeval(&entity, actor, actor_tags, now, &config))
    }

    pub async fn recent_history(&self, entity_id: &EntityId, since: f64) -> Vec<TriggerLogEntry> {
        self.history.lock().await.recent_for(entity_id, since)
    }

    pub async fn snapshot(&self, trigger_id: Uuid) -> Option<AffordanceSnapshot> {
        self.snapshots.lock().await.get(&trigger_id).cloned()
    }

    pub async fn toggle(&self, affordance: &str, enabled: bool) {
        let mut disabled = self.disabled.write().await;
        if enabled {
            disabled.remove(affordance);
        } else {
            disabled.insert(affordance.to_string());
        }
        info!(affordance, enabled, "affordance toggled");
    }

    pub async fn track_institution_tag(&self, institution: &str, tag: Tag) {
        let mut institutions = self.institutions.lock().await;
        institutions
            .entry(institution.to_string())
            .or_insert_with(|| Institution::new(institution.to_string(), vec![]))
            .track(tag);
    }

    /// Declare (or replace) which entity tags count as constituents of an
    /// institution. Distinct from `track_institution_tag`, which tracks
    /// the *actor* tags the institution reports a stance toward; this
    /// sets the *entity* tags `refresh_institutions` filters on (spec.md
    /// §4.10).
    pub async fn register_institution(&self, institution: &str, affiliated_entity_tags: Vec<Tag>) {
        let mut institutions = self.institutions.lock().await;
        institutions
            .entry(institution.to_string())
            .and_modify(|inst| inst.affiliated_entity_tags = affiliated_entity_tags.clone())
            .or_insert_with(|| Institution::new(institution.to_string(), affiliated_entity_tags));
    }

    pub async fn institution_stance(&self, institution: &str, tag: &Tag) -> f64 {
        self.institutions
            .lock()
            .await
            .get(institution)
            .map(|inst| inst.stance_toward(tag))
            .unwrap_or(0.0)
    }

    /// Refresh every tracked institution's stance against its own
    /// affiliated constituents only (tag overlap with
    /// `affiliated_entity_tags`, spec.md §4.10), gathering entity
    /// references one entity lock at a time (SPEC_FULL.md §5).
    #[instrument(skip(self))]
    pub async fn refresh_institutions(&self) {
        let now = self.now().await;
        let config = self.config();
        let ids = self.entity_ids().await;
        let mut locked_entities = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Ok(handle) = self.handle_for(id).await {
                locked_entities.push(handle.lock_owned().await);
            }
        }
        let all: Vec<&MemoryEntity> = locked_entities.iter().map(|guard| &**guard).collect();

        let mut institutions = self.institutions.lock().await;
        for institution in institutions.values_mut() {
            let constituents: Vec<&MemoryEntity> = all
                .iter()
                .copied()
                .filter(|entity| {
                    institution
                        .affiliated_entity_tags
                        .iter()
                        .any(|tag| entity.tags.contains(tag))
                })
                .collect();
            institution.refresh(now, &constituents, &config);
        }
        debug!(institutions = institutions.len(), "institutions refreshed");
    }

    /// Advance the simulated clock and run the world-tick housekeeping
    /// pass (prune, refresh saturation, sweep cooldowns) over every
    /// entity, one lock at a time (SPEC_FULL.md §5).
    #[instrument(skip(self))]
    pub async fn tick_all(&self, delta_seconds: f64) -> HashMap<EntityId, TickReport> {
        let config = self.config();
        let now = {
            let mut sim_now = self.sim_now.lock().await;
            *sim_now += delta_seconds.max(0.0);
            *sim_now
        };
        let mut reports = HashMap::new();
        for id in self.entity_ids().await {
            if let Ok(handle) = self.handle_for(&id).await {
                let mut entity = handle.lock().await;
                let report = entity.tick(now, &config);
                reports.insert(id, report);
            }
        }
        debug!(ticked = reports.len(), now, "world tick complete");
        reports
    }

    /// Run age-tiered compaction over every entity (distinct from the
    /// world tick — a separate, host-invoked operation per spec.md §4.6).
    #[instrument(skip(self))]
    pub async fn compact_all(&self) -> HashMap<EntityId, CompactionReport> {
        let config = self.config();
        let now = self.now().await;
        let mut reports = HashMap::new();
        for id in self.entity_ids().await {
            if let Ok(handle) = self.handle_for(&id).await {
                let mut entity = handle.lock().await;
                let report = compact_traces(&mut entity, now, &config);
                reports.insert(id, report);
            }
        }
        reports
    }
}
