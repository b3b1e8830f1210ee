//! Event records (spec.md §4.2).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, EntityId, EventType, Tag};

/// An immutable description of a single actor action in a location.
///
/// The core does not validate event semantics — it trusts the host — but
/// clamps `intensity` to `[0,1]` at construction (spec.md §7
/// `TransientClampedInput`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: EventType,
    pub actor: ActorId,
    pub actor_tags: BTreeSet<Tag>,
    pub target: Option<ActorId>,
    pub location: EntityId,
    pub intensity: f64,
    pub timestamp: f64,
    pub context_tags: BTreeSet<Tag>,
}

impl EventRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type: impl Into<EventType>,
        actor: impl Into<ActorId>,
        actor_tags: impl IntoIterator<Item = Tag>,
        target: Option<ActorId>,
        location: impl Into<EntityId>,
        intensity: f64,
        timestamp: f64,
        context_tags: impl IntoIterator<Item = Tag>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            actor: actor.into(),
            actor_tags: actor_tags.into_iter().collect(),
            target,
            location: location.into(),
            intensity: intensity.clamp(0.0, 1.0),
            timestamp,
            context_tags: context_tags.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_clamped_at_construction() {
        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [Tag::from("human")],
            None,
            "forest_clearing",
            1.6,
            100.0,
            [],
        );
        assert_eq!(event.intensity, 1.0);

        let event = EventRecord::new(
            "harm.fire",
            "player_0042",
            [],
            None,
            "forest_clearing",
            -0.4,
            100.0,
            [],
        );
        assert_eq!(event.intensity, 0.0);
    }
}
