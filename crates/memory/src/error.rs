//! Error taxonomy (spec.md §7). Kept as small `thiserror` enums close to
//! the core rather than `anyhow::Error` strings — `anyhow` is reserved for
//! the CLI edge and config I/O, matching the split the reference pack
//! draws between an application's outer edge and its core types.

use thiserror::Error;

use crate::ids::EntityId;

/// Load-time validation failures for the affordance registry. Fatal —
/// the caller should abort startup rather than run with an invalid
/// registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("affordance `{0}` declares {1} handles, at most 2 are allowed")]
    TooManyHandles(String, usize),
    #[error("affordance `{0}` references unknown handle `{1}`")]
    UnknownHandle(String, String),
    #[error("affordance `{0}` has a tell matching a forbidden meter/speech pattern: {1:?}")]
    ForbiddenTell(String, String),
    #[error("affordance `{0}` has a nonpositive cooldown")]
    NonPositiveCooldown(String),
    #[error("affordance `{0}` has hostile_threshold >= 0 (must be negative)")]
    HostileThresholdNotNegative(String),
    #[error("affordance `{0}` has favorable_threshold <= 0 (must be positive)")]
    FavorableThresholdNotPositive(String),
    #[error("more than one affordance is registered for action type `move.pass`: `{0}` and `{1}`")]
    DuplicateMovementPrimary(String, String),
    #[error("profile weight for `{0}` is out of range [-1,1]: {1}")]
    ProfileWeightOutOfRange(String, f64),
}

/// Runtime errors surfaced to the caller (spec.md §7). Not used for
/// anomalies the core silently absorbs (`TransientClampedInput`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(EntityId),
}

/// Raised by [`crate::snapshot::replay`] when recomputed results diverge
/// from the frozen snapshot. Fatal for tests; ordinary servers log and
/// alert rather than panic.
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("replay mismatch in `{field}`: recorded {recorded}, recomputed {recomputed}")]
    SnapshotMismatch {
        field: &'static str,
        recorded: String,
        recomputed: String,
    },
}
