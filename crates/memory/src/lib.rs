//! Pure, synchronous affinity core: decaying per-entity memory, affinity
//! computation, and the affordance evaluation pipeline.
//!
//! This crate performs no I/O and holds no async runtime dependency —
//! persistence, scheduling, and cross-entity locking are the concern of
//! `affinity-runtime`. Every public function here is a plain call over
//! plain data.

pub mod affinity;
pub mod affordance;
pub mod clock;
pub mod compaction;
pub mod cooldown;
pub mod entity;
pub mod error;
pub mod event;
pub mod ids;
pub mod institution;
pub mod snapshot;
pub mod trace;
pub mod valuation;

pub use affinity::{apply_institutional_bias, compute_affinity, record_event};
pub use affordance::{
    evaluate_affordances, evaluate_affordances_with_bias, evaluate_pure, evaluate_pure_with_bias,
    force_trigger, AdditionalModifier, AffordanceContext, AffordanceDef, AffordanceOutcome,
    AffordanceRegistry, AffordanceTrigger, Handle, HandleEffect, ThresholdLabel,
    TraceContribution, TriggerSide,
};
pub use compaction::{compact_traces, CompactionReport};
pub use cooldown::CooldownRegistry;
pub use entity::{EntityKind, MemoryEntity, TickReport};
pub use error::{CoreError, ReplayError, ValidationError};
pub use event::EventRecord;
pub use ids::{ActorId, EntityId, EventType, Tag};
pub use institution::Institution;
pub use snapshot::{replay, reeval, AffordanceSnapshot};
pub use valuation::ValuationProfile;
