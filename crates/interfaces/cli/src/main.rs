mod daemon;
mod demo;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use affinity_memory::{ActorId, EntityId, EntityKind, EventRecord, Tag, TriggerSide, ValuationProfile};
use affinity_runtime::DaemonClient;

#[derive(Debug, Parser)]
#[command(name = "affinity-cli", version, about = "Memory-driven affinity engine for MUD-style worlds")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the seeded in-process demo world and print every operator's output.
    Demo,
    /// Manage the background daemon process.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },
    /// Talk to a running daemon over its Unix socket.
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DaemonCommands {
    Start {
        #[arg(long)]
        force: bool,
    },
    Stop,
    Status,
    /// Run the daemon in the foreground (used internally by `daemon start`).
    #[command(hide = true)]
    Run,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEntityKind {
    Location,
    Artifact,
    Npc,
}

impl From<CliEntityKind> for EntityKind {
    fn from(kind: CliEntityKind) -> Self {
        match kind {
            CliEntityKind::Location => EntityKind::Location,
            CliEntityKind::Artifact => EntityKind::Artifact,
            CliEntityKind::Npc => EntityKind::Npc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTriggerSide {
    Hostile,
    Favorable,
}

impl From<CliTriggerSide> for TriggerSide {
    fn from(side: CliTriggerSide) -> Self {
        match side {
            CliTriggerSide::Hostile => TriggerSide::Hostile,
            CliTriggerSide::Favorable => TriggerSide::Favorable,
        }
    }
}

fn parse_tags(tags: &[String]) -> Vec<Tag> {
    tags.iter().map(|t| Tag::from(t.as_str())).collect()
}

#[derive(Debug, Subcommand)]
enum AdminCommands {
    Ping,
    RegisterEntity {
        entity_id: String,
        #[arg(long, value_enum, default_value = "location")]
        kind: CliEntityKind,
    },
    LogEvent {
        entity_id: String,
        event_type: String,
        actor: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 0.5)]
        intensity: f64,
        #[arg(long, default_value_t = 0.0)]
        timestamp: f64,
    },
    Evaluate {
        entity_id: String,
        actor: String,
        action_type: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Inspect {
        entity_id: String,
        actor: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Why {
        entity_id: String,
        actor: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    History {
        entity_id: String,
        #[arg(long, default_value_t = 24.0)]
        hours: f64,
    },
    Replay {
        trigger_id: Uuid,
    },
    Reeval {
        entity_id: String,
        actor: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Toggle {
        affordance: String,
        #[arg(long)]
        off: bool,
    },
    Test {
        entity_id: String,
        actor: String,
        affordance: String,
        #[arg(long, value_enum, default_value = "hostile")]
        side: CliTriggerSide,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Tick {
        #[arg(default_value_t = 300.0)]
        delta_seconds: f64,
    },
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if std::env::var("AFFINITY_DAEMON_PROCESS").ok().as_deref() == Some("1") {
        return daemon::run_process().await;
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => demo::run().await?,
        Commands::Daemon { command } => match command {
            DaemonCommands::Start { force } => daemon::start(force)?,
            DaemonCommands::Stop => daemon::stop().await?,
            DaemonCommands::Status => daemon::status()?,
            DaemonCommands::Run => daemon::run_process().await?,
        },
        Commands::Admin { command } => run_admin(command).await?,
    }

    Ok(())
}

async fn run_admin(command: AdminCommands) -> Result<()> {
    let client = DaemonClient::new(daemon::socket_path());

    match command {
        AdminCommands::Ping => {
            client.ping().await?;
            println!("pong");
        }
        AdminCommands::RegisterEntity { entity_id, kind } => {
            client
                .register_entity(EntityId::from(entity_id.as_str()), kind.into(), ValuationProfile::new())
                .await?;
            println!("registered {entity_id}");
        }
        AdminCommands::LogEvent { entity_id, event_type, actor, tags, intensity, timestamp } => {
            let event = EventRecord::new(
                event_type.as_str(),
                actor.as_str(),
                parse_tags(&tags),
                None,
                entity_id.as_str(),
                intensity,
                timestamp,
                [],
            );
            client.log_event(event).await?;
            println!("logged {event_type} against {entity_id}");
        }
        AdminCommands::Evaluate { entity_id, actor, action_type, tags } => {
            let outcome = client
                .evaluate(EntityId::from(entity_id.as_str()), ActorId::from(actor.as_str()), parse_tags(&tags), action_type, None)
                .await?;
            println!("affinity: {:.3} ({:?})", outcome.affinity, outcome.threshold_label);
            println!("triggered: {}", outcome.triggered);
            for trigger in &outcome.triggers {
                println!("  {} [{:?}]: {}", trigger.affordance, trigger.side, trigger.tells.join(" "));
            }
        }
        AdminCommands::Inspect { entity_id, actor, tags } => {
            let report = client
                .inspect(EntityId::from(entity_id.as_str()), ActorId::from(actor.as_str()), parse_tags(&tags))
                .await?;
            println!("affinity: {:.3} ({:?})", report.affinity, report.threshold_label);
            for trace in &report.top_traces {
                println!("  {:<9} {:<24} {:+.3}", trace.channel, trace.key_description, trace.weighted_contribution);
            }
        }
        AdminCommands::Why { entity_id, actor, tags } => {
            let report = client
                .why(EntityId::from(entity_id.as_str()), ActorId::from(actor.as_str()), parse_tags(&tags))
                .await?;
            println!("affinity: {:.3}", report.affinity);
            println!("personal: {}, group: {}, behavior: {}", report.personal.len(), report.group.len(), report.behavior.len());
        }
        AdminCommands::History { entity_id, hours } => {
            let entries = client.history(EntityId::from(entity_id.as_str()), hours).await?;
            for entry in &entries {
                println!("{} {} [{:?}] at t={:.1}", entry.trigger_id, entry.affordance, entry.side, entry.timestamp);
            }
        }
        AdminCommands::Replay { trigger_id } => {
            client.replay(trigger_id).await?;
            println!("replay confirmed");
        }
        AdminCommands::Reeval { entity_id, actor, tags } => {
            let affinity = client
                .reeval(EntityId::from(entity_id.as_str()), ActorId::from(actor.as_str()), parse_tags(&tags))
                .await?;
            println!("live affinity: {affinity:.3}");
        }
        AdminCommands::Toggle { affordance, off } => {
            client.toggle(affordance.clone(), !off).await?;
            println!("{affordance}: {}", if off { "disabled" } else { "enabled" });
        }
        AdminCommands::Test { entity_id, actor, affordance, side, tags } => {
            let trigger = client
                .test(EntityId::from(entity_id.as_str()), ActorId::from(actor.as_str()), parse_tags(&tags), affordance, side.into())
                .await?;
            match trigger {
                Some(trigger) => println!("{} [{:?}]: {}", trigger.affordance, trigger.side, trigger.tells.join(" ")),
                None => println!("no trigger produced (unknown affordance)"),
            }
        }
        AdminCommands::Tick { delta_seconds } => {
            let (now, ticked) = client.tick_now(delta_seconds).await?;
            println!("now: {now:.1}, entities ticked: {ticked}");
        }
        AdminCommands::Shutdown => {
            client.shutdown().await?;
            println!("shutdown requested");
        }
    }

    Ok(())
}
