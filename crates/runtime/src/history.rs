//! Affordance trigger history (SPEC_FULL.md §4.11): a bounded log of
//! recent triggers, queried by the `history` admin operator and used to
//! locate a stored [`affinity_memory::AffordanceSnapshot`] for `replay`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use affinity_memory::{EntityId, TriggerSide};

/// One entry in the trigger history — enough to list recent activity
/// without touching the full replay snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerLogEntry {
    pub trigger_id: Uuid,
    pub entity_id: EntityId,
    pub affordance: String,
    pub side: TriggerSide,
    pub tells: Vec<String>,
    pub timestamp: f64,
}

/// Bounded ring buffer of trigger log entries. Oldest entries are
/// dropped once `capacity` is exceeded — an observability aid, not a
/// durability guarantee; the host owns long-term persistence (spec.md
/// §9).
#[derive(Debug)]
pub struct AffordanceTriggerLog {
    entries: VecDeque<TriggerLogEntry>,
    capacity: usize,
}

impl AffordanceTriggerLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: TriggerLogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries for `entity_id` with `timestamp >= since`, the shape
    /// `history(entity, hours)` needs (spec.md §4.11).
    pub fn recent_for(&self, entity_id: &EntityId, since: f64) -> Vec<TriggerLogEntry> {
        self.entries
            .iter()
            .filter(|e| &e.entity_id == entity_id && e.timestamp >= since)
            .cloned()
            .collect()
    }
}

impl Default for AffordanceTriggerLog {
    fn default() -> Self {
        Self::new(512)
    }
}
