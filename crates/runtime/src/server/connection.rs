//! Unix domain socket connection handling and command dispatch.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tracing::warn;

use affinity_memory::{AffordanceContext, MemoryEntity};

use crate::admin::AdminSurface;
use crate::protocol::{ClientCommand, ServerEvent};

pub(super) async fn handle_connection(
    stream: UnixStream,
    admin: AdminSurface,
    shutdown_tx: watch::Sender<bool>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    let command: ClientCommand = serde_json::from_str(line.trim())?;

    let response = match command {
        ClientCommand::Ping => ServerEvent::Pong,

        ClientCommand::RegisterEntity { entity_id, kind, valuation_profile } => {
            admin.world().register_entity(MemoryEntity::new(entity_id, kind, valuation_profile)).await;
            ServerEvent::Ack
        }

        ClientCommand::LogEvent { event } => match admin.world().log_event(event).await {
            Ok(()) => ServerEvent::Ack,
            Err(err) => ServerEvent::Error { message: err.to_string() },
        },

        ClientCommand::Evaluate { entity_id, actor, actor_tags, action_type, action_target } => {
            let now = admin.world().now().await;
            let context = AffordanceContext {
                actor,
                actor_tags,
                action_type: affinity_memory::EventType::from(action_type.as_str()),
                action_target,
                timestamp: now,
            };
            match admin.world().evaluate(&entity_id, &context).await {
                Ok(outcome) => ServerEvent::Evaluated(outcome),
                Err(err) => ServerEvent::Error { message: err.to_string() },
            }
        }

        ClientCommand::Inspect { entity_id, actor, actor_tags } => {
            match admin.inspect(&entity_id, &actor, &actor_tags).await {
                Ok(report) => ServerEvent::Inspected(report),
                Err(err) => ServerEvent::Error { message: err.to_string() },
            }
        }

        ClientCommand::Why { entity_id, actor, actor_tags } => {
            match admin.why(&entity_id, &actor, &actor_tags).await {
                Ok(report) => ServerEvent::Whyed(report),
                Err(err) => ServerEvent::Error { message: err.to_string() },
            }
        }

        ClientCommand::History { entity_id, hours } => {
            ServerEvent::History(admin.history(&entity_id, hours).await)
        }

        ClientCommand::Replay { trigger_id } => match admin.replay(trigger_id).await {
            Ok(()) => ServerEvent::Replayed { ok: true, detail: None },
            Err(err) => ServerEvent::Replayed { ok: false, detail: Some(err.to_string()) },
        },

        ClientCommand::Reeval { entity_id, actor, actor_tags } => {
            match admin.reeval(&entity_id, &actor, &actor_tags).await {
                Ok(value) => ServerEvent::Reevaled(value),
                Err(err) => ServerEvent::Error { message: err.to_string() },
            }
        }

        ClientCommand::Toggle { affordance, on } => {
            admin.toggle(&affordance, on).await;
            ServerEvent::Ack
        }

        ClientCommand::Test { entity_id, actor, actor_tags, affordance, side } => {
            match admin.test(&entity_id, &actor, &actor_tags, &affordance, side).await {
                Ok(trigger) => ServerEvent::Tested(trigger),
                Err(err) => ServerEvent::Error { message: err.to_string() },
            }
        }

        ClientCommand::Tick { delta_seconds } => {
            let reports = admin.world().tick_all(delta_seconds).await;
            ServerEvent::Ticked { now: admin.world().now().await, entities_ticked: reports.len() }
        }

        ClientCommand::ReloadConfig { config } => match admin.world().reload_config(config) {
            Ok(()) => ServerEvent::Ack,
            Err(err) => ServerEvent::Error { message: err.to_string() },
        },

        ClientCommand::Shutdown => {
            let _ = shutdown_tx.send(true);
            ServerEvent::Ack
        }
    };

    send_event(&mut write_half, response).await
}

async fn send_event(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    event: ServerEvent,
) -> Result<()> {
    let mut payload = serde_json::to_string(&event)?;
    payload.push('\n');
    if let Err(err) = writer.write_all(payload.as_bytes()).await {
        warn!(?err, "failed to write response to client");
        return Err(err.into());
    }
    writer.flush().await?;
    Ok(())
}
