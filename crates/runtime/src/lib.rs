//! Orchestration layer: owns the entity registry, the world-tick
//! scheduler, the affordance trigger history, and the admin query
//! surface (spec.md §5, SPEC_FULL.md §4.11).
//!
//! `affinity-memory` never sees a clock or a lock — every `now` here is
//! the registry's own simulated seconds counter, advanced by the
//! scheduler loop in [`server`].

pub mod admin;
mod client;
mod history;
pub mod protocol;
pub mod server;
pub mod world;

pub use admin::AdminSurface;
pub use client::DaemonClient;
pub use history::{AffordanceTriggerLog, TriggerLogEntry};
pub use protocol::{ClientCommand, ServerEvent};
pub use server::run_daemon;
pub use world::World;
