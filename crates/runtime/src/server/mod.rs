//! The world-tick scheduler, institution-refresh loop, and Unix domain
//! socket server — the host-facing edge of `affinity-runtime` (spec.md
//! §5, SPEC_FULL.md §4.11).

mod connection;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tracing::{info, warn};

use affinity_config::AffinityConfig;
use affinity_memory::AffordanceRegistry;

use crate::admin::AdminSurface;
use crate::world::World;

/// Run the daemon: bind the Unix socket, start the world-tick and
/// institution-refresh background loops, then accept connections until
/// told to shut down. Mirrors the teacher's `run_unified_daemon`
/// skeleton — background `tokio::spawn` tasks racing a `watch` shutdown
/// signal in `tokio::select!`, then a final accept loop doing the same.
pub async fn run_daemon(
    config: AffinityConfig,
    registry: AffordanceRegistry,
    socket_path: impl AsRef<Path>,
) -> Result<()> {
    let socket_path = socket_path.as_ref().to_path_buf();
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }

    let world_tick_interval = std::time::Duration::from_secs(config.world_tick_interval_seconds.max(1));
    let institution_refresh_interval =
        std::time::Duration::from_secs(config.institutions.refresh_interval_seconds.max(1));

    let world = Arc::new(World::new(config, registry)?);
    let admin = AdminSurface::new(world.clone());

    let listener = UnixListener::bind(&socket_path)?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    info!(path = %socket_path.display(), "affinity daemon listening");

    // World tick: advance simulated time and run prune/saturation/cooldown
    // housekeeping over every entity.
    {
        let tick_world = world.clone();
        let mut tick_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(world_tick_interval) => {
                        let reports = tick_world.tick_all(world_tick_interval.as_secs_f64()).await;
                        info!(entities = reports.len(), "world tick complete");
                    }
                    changed = tick_rx.changed() => {
                        if changed.is_ok() && *tick_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }

    // Institution refresh: blend cached stance toward the live constituent
    // mean on its own, slower cadence (spec.md §4.10).
    {
        let institution_world = world.clone();
        let mut institution_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(institution_refresh_interval) => {
                        institution_world.refresh_institutions().await;
                    }
                    changed = institution_rx.changed() => {
                        if changed.is_ok() && *institution_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_ok() && *shutdown_rx.borrow() {
                    break;
                }
            }
            accept = listener.accept() => {
                let (stream, _) = accept?;
                let admin = admin.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = connection::handle_connection(stream, admin, shutdown_tx).await {
                        warn!(?err, "daemon connection handler failed");
                    }
                });
            }
        }
    }

    info!("affinity daemon shutting down gracefully");
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}
