//! Identity newtypes shared across the affinity core.
//!
//! Plain `String` wrappers rather than `uuid::Uuid` — entity and actor
//! identities in a MUD are host-assigned strings (room vnums, player
//! names, object tags), not values this core mints itself.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(EntityId);
string_id!(ActorId);
string_id!(Tag);

/// A dotted event type, e.g. `harm.fire`. The prefix before the first `.`
/// is its category (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventType(pub String);

impl EventType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The category prefix: everything before the first `.`, or the whole
    /// string if there is no `.`.
    pub fn category(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_splits_on_first_dot() {
        assert_eq!(EventType::from("harm.fire").category(), "harm");
        assert_eq!(EventType::from("harm.fire.severe").category(), "harm");
    }

    #[test]
    fn category_of_bare_type_is_itself() {
        assert_eq!(EventType::from("harm").category(), "harm");
    }
}
