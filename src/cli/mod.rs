//! Command-line interface for hookwire.
//!
//! The engine is the library; the CLI is thin plumbing. `run` reads
//! analysis events as JSONL on stdin and writes outbound events as
//! JSONL on stdout, so the engine can be driven by any local producer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{default_config_path, ConfigStore};
use crate::core::{Orchestrator, TriggerRule};
use crate::domain::AnalysisEvent;
use crate::runner::SubprocessRunner;
use crate::service::NullAnalysisService;

/// hookwire - Event-driven hook orchestration engine
#[derive(Parser, Debug)]
#[command(name = "hookwire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine (events in as JSONL on stdin, outbound events
    /// out as JSONL on stdout)
    Run {
        /// Config file (defaults to ~/.hookwire/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file (rules, conditions, handlers)
    Validate {
        /// Config file (defaults to ~/.hookwire/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config {
        /// Config file (defaults to ~/.hookwire/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { config } => run_engine(config).await,
            Commands::Validate { config } => validate_config(config),
            Commands::Config { config } => show_config(config),
        }
    }
}

fn load_store(path: Option<PathBuf>) -> Result<ConfigStore> {
    let path = match path {
        Some(path) => path,
        None => default_config_path().context("Cannot determine home directory")?,
    };
    Ok(ConfigStore::load(&path))
}

async fn run_engine(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_store(config_path)?;

    let runner = Arc::new(SubprocessRunner::new(config.handlers().clone()));
    info!(
        handlers = runner.handler_count(),
        rules = config.rules().len(),
        "Loaded configuration"
    );

    let service = Arc::new(NullAnalysisService);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel::<AnalysisEvent>(256);

    let orchestrator = Orchestrator::new(config, runner, service, outbound_tx);
    let engine = tokio::spawn(orchestrator.run(event_rx));

    // Outbound events to stdout, one JSON document per line
    let printer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize outbound event"),
            }
        }
    });

    // Events from stdin, one JSON document per line
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AnalysisEvent>(&line) {
            Ok(event) => {
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed event line"),
        }
    }

    // Stdin closed: drop the sender so the engine drains and stops
    drop(event_tx);
    engine.await.ok();
    printer.await.ok();
    Ok(())
}

fn validate_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_store(config_path)?;

    let mut problems = 0usize;
    for spec in config.rules() {
        if let Err(e) = crate::core::Condition::parse(&spec.condition) {
            println!("rule '{}': bad condition: {e}", spec.name);
            problems += 1;
        }
        for hook in &spec.hooks {
            if !config.handlers().contains_key(hook) {
                println!("rule '{}': unknown handler '{hook}'", spec.name);
                problems += 1;
            }
        }
        if spec.hooks.is_empty() {
            println!("rule '{}': no handlers", spec.name);
            problems += 1;
        }
    }

    // Parse the table the way the engine will, so warnings match
    let _ = config.rules().iter().map(TriggerRule::from_spec).count();

    if problems == 0 {
        println!(
            "ok: {} rule(s), {} handler(s)",
            config.rules().len(),
            config.handlers().len()
        );
        Ok(())
    } else {
        anyhow::bail!("{problems} problem(s) found");
    }
}

fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_store(config_path)?;
    let yaml = serde_yaml::to_string(config.file())?;
    println!("{yaml}");
    Ok(())
}
