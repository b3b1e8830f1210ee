//! Client side of the Unix domain socket admin/ingest protocol: one
//! request line in, one response line out, mirroring the teacher's
//! `request_events` single-round-trip pattern.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::warn;
use uuid::Uuid;

use affinity_config::AffinityConfig;
use affinity_memory::{
    ActorId, AffordanceOutcome, AffordanceTrigger, EntityId, EntityKind, EventRecord, Tag,
    TriggerSide, ValuationProfile,
};

use crate::admin::{InspectReport, WhyReport};
use crate::history::TriggerLogEntry;
use crate::protocol::{ClientCommand, ServerEvent};

#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub async fn connect_with_backoff(&self, max_attempts: usize) -> Result<()> {
        let mut delay = Duration::from_millis(100);
        for attempt in 0..max_attempts.max(1) {
            match UnixStream::connect(&self.socket_path).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if attempt + 1 == max_attempts.max(1) {
                        return Err(err.into());
                    }
                    warn!(attempt, ?err, "daemon connect failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(2));
                }
            }
        }
        Ok(())
    }

    async fn request(&self, command: ClientCommand) -> Result<ServerEvent> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (read_half, mut write_half) = stream.into_split();

        let request = serde_json::to_string(&command)?;
        write_half.write_all(request.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        write_half.flush().await?;

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            bail!("daemon closed the connection before responding");
        }
        Ok(serde_json::from_str(line.trim())?)
    }

    pub async fn ping(&self) -> Result<()> {
        match self.request(ClientCommand::Ping).await? {
            ServerEvent::Pong => Ok(()),
            other => bail!("unexpected response to Ping: {other:?}"),
        }
    }

    pub async fn register_entity(&self, entity_id: EntityId, kind: EntityKind, valuation_profile: ValuationProfile) -> Result<()> {
        let command = ClientCommand::RegisterEntity { entity_id, kind, valuation_profile };
        match self.request(command).await? {
            ServerEvent::Ack => Ok(()),
            other => bail!("unexpected response to RegisterEntity: {other:?}"),
        }
    }

    pub async fn log_event(&self, event: EventRecord) -> Result<()> {
        match self.request(ClientCommand::LogEvent { event }).await? {
            ServerEvent::Ack => Ok(()),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to LogEvent: {other:?}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate(
        &self,
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
        action_type: impl Into<String>,
        action_target: Option<ActorId>,
    ) -> Result<AffordanceOutcome> {
        let command = ClientCommand::Evaluate {
            entity_id,
            actor,
            actor_tags,
            action_type: action_type.into(),
            action_target,
        };
        match self.request(command).await? {
            ServerEvent::Evaluated(outcome) => Ok(outcome),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to Evaluate: {other:?}"),
        }
    }

    pub async fn inspect(&self, entity_id: EntityId, actor: ActorId, actor_tags: Vec<Tag>) -> Result<InspectReport> {
        match self.request(ClientCommand::Inspect { entity_id, actor, actor_tags }).await? {
            ServerEvent::Inspected(report) => Ok(report),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to Inspect: {other:?}"),
        }
    }

    pub async fn why(&self, entity_id: EntityId, actor: ActorId, actor_tags: Vec<Tag>) -> Result<WhyReport> {
        match self.request(ClientCommand::Why { entity_id, actor, actor_tags }).await? {
            ServerEvent::Whyed(report) => Ok(report),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to Why: {other:?}"),
        }
    }

    pub async fn history(&self, entity_id: EntityId, hours: f64) -> Result<Vec<TriggerLogEntry>> {
        match self.request(ClientCommand::History { entity_id, hours }).await? {
            ServerEvent::History(entries) => Ok(entries),
            other => bail!("unexpected response to History: {other:?}"),
        }
    }

    pub async fn replay(&self, trigger_id: Uuid) -> Result<()> {
        match self.request(ClientCommand::Replay { trigger_id }).await? {
            ServerEvent::Replayed { ok: true, .. } => Ok(()),
            ServerEvent::Replayed { ok: false, detail } => {
                bail!(detail.unwrap_or_else(|| "replay mismatch".to_string()))
            }
            other => bail!("unexpected response to Replay: {other:?}"),
        }
    }

    pub async fn reeval(&self, entity_id: EntityId, actor: ActorId, actor_tags: Vec<Tag>) -> Result<f64> {
        match self.request(ClientCommand::Reeval { entity_id, actor, actor_tags }).await? {
            ServerEvent::Reevaled(value) => Ok(value),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to Reeval: {other:?}"),
        }
    }

    pub async fn toggle(&self, affordance: impl Into<String>, on: bool) -> Result<()> {
        match self.request(ClientCommand::Toggle { affordance: affordance.into(), on }).await? {
            ServerEvent::Ack => Ok(()),
            other => bail!("unexpected response to Toggle: {other:?}"),
        }
    }

    pub async fn test(
        &self,
        entity_id: EntityId,
        actor: ActorId,
        actor_tags: Vec<Tag>,
        affordance: impl Into<String>,
        side: TriggerSide,
    ) -> Result<Option<AffordanceTrigger>> {
        let command = ClientCommand::Test {
            entity_id,
            actor,
            actor_tags,
            affordance: affordance.into(),
            side,
        };
        match self.request(command).await? {
            ServerEvent::Tested(trigger) => Ok(trigger),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to Test: {other:?}"),
        }
    }

    pub async fn tick_now(&self, delta_seconds: f64) -> Result<(f64, usize)> {
        match self.request(ClientCommand::Tick { delta_seconds }).await? {
            ServerEvent::Ticked { now, entities_ticked } => Ok((now, entities_ticked)),
            other => bail!("unexpected response to Tick: {other:?}"),
        }
    }

    pub async fn reload_config(&self, config: AffinityConfig) -> Result<()> {
        match self.request(ClientCommand::ReloadConfig { config }).await? {
            ServerEvent::Ack => Ok(()),
            ServerEvent::Error { message } => bail!(message),
            other => bail!("unexpected response to ReloadConfig: {other:?}"),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        match self.request(ClientCommand::Shutdown).await? {
            ServerEvent::Ack => Ok(()),
            other => bail!("unexpected response to Shutdown: {other:?}"),
        }
    }
}
