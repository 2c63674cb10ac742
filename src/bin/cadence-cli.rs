//! Cadence CLI - run entry files through a timed queue
//!
//! Provides subcommands for writing a config, listing the bundled commands,
//! and running a JSON list of entries against a console actor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cadence::commands::register_builtin;
use cadence::runtime::actor::{Actor, ActorId, ActorRef, ActorResolver};
use cadence::runtime::entry::ScriptEntry;
use cadence::runtime::error::{ConfigError, RuntimeError};
use cadence::runtime::registry::CommandCatalog;
use cadence::runtime::scheduler::{ExecutionStatus, QueueId};
use cadence::{Runtime, RuntimeConfig};
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Run script entries through timed command queues", long_about = None)]
struct Cli {
    /// Runtime config file
    #[arg(short, long, default_value = cadence::runtime::config::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file
    Init {
        /// Delay between normal entries, in milliseconds
        #[arg(long, default_value = "500")]
        tick_interval_ms: u64,

        /// Disable debug reports
        #[arg(long)]
        quiet: bool,
    },

    /// List registered commands
    Commands,

    /// Run a JSON file of entries on one queue
    Run {
        /// File holding `[{"command": ..., "args": [...]}]`
        entries: PathBuf,

        /// Queue name
        #[arg(short, long, default_value = "main")]
        queue: String,
    },
}

/// One entry as written in an entry file
#[derive(Deserialize)]
struct EntryDef {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    /// Run as the console actor
    #[serde(default = "default_true")]
    console: bool,
}

fn default_true() -> bool {
    true
}

/// Prints narrated text to stdout
#[derive(Debug)]
struct Console {
    id: ActorId,
}

impl Actor for Console {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        "console"
    }

    fn send_message(&self, message: &str) {
        println!("{}", message);
    }
}

struct Directory {
    actors: HashMap<String, Arc<dyn Actor>>,
}

impl ActorResolver for Directory {
    fn resolve(&self, name: &str) -> Option<ActorRef> {
        let name = name.strip_prefix("a@").unwrap_or(name).to_lowercase();
        self.actors.get(&name).map(ActorRef::new)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let console: Arc<dyn Actor> = Arc::new(Console { id: ActorId::new() });
    let directory = Directory {
        actors: HashMap::from([("console".to_string(), Arc::clone(&console))]),
    };
    register_builtin(CommandCatalog::global(), Arc::new(directory));

    match cli.command {
        Commands::Init {
            tick_interval_ms,
            quiet,
        } => {
            let config = RuntimeConfig {
                tick_interval_ms,
                debug: !quiet,
                ..RuntimeConfig::default()
            };
            Runtime::init(&cli.config, &config)?;
            println!("Wrote cadence config to {:?}", cli.config);
        }

        Commands::Commands => {
            for name in CommandCatalog::global().snapshot().list_commands() {
                println!("{}", name);
            }
        }

        Commands::Run { entries, queue } => {
            let mut runtime = match Runtime::load(&cli.config) {
                Ok(runtime) => runtime,
                Err(RuntimeError::Config(ConfigError::NotFound(_))) => {
                    Runtime::new(RuntimeConfig::default())
                }
                Err(err) => return Err(err.into()),
            };

            let text = std::fs::read_to_string(&entries)
                .with_context(|| format!("reading {:?}", entries))?;
            let defs: Vec<EntryDef> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {:?}", entries))?;

            let id = QueueId::new(&queue);
            runtime.create_queue(id.clone())?;
            for def in defs {
                let mut entry = ScriptEntry::new(&def.command, def.args, None)?;
                if def.console {
                    entry.set_subject(Some(ActorRef::new(&console)));
                }
                runtime.enqueue(&id, entry)?;
            }

            let timed = runtime.timed_queue(&id)?.stop_when_drained(true);
            let dispatched = timed.clone().spawn().await?;

            let history = timed.queue().lock().history();
            let failed = history
                .iter()
                .filter(|record| matches!(record.status, ExecutionStatus::Failed(_)))
                .count();
            println!(
                "Queue {} dispatched {} entries ({} failed)",
                id, dispatched, failed
            );
        }
    }

    Ok(())
}
