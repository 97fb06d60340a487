//! Stagewatch - deployment log interpretation CLI
//!
//! The `stagewatch` command reconstructs pipeline-stage timelines from
//! free-text deployment logs.
//!
//! ## Commands
//!
//! - `classify`: Print the stage timeline for a finished log
//! - `watch`: Stream a log through a live session and print stage transitions
//! - `rules`: Print the active stage rule table as JSON

mod input;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use stagewatch_core::{
    FsPreferenceStore, LevelFilter, LogBuffer, LogEntry, MemoryPreferenceStore, PreferenceStore,
    ViewerConfig,
};
use stagewatch_pipeline::{classify, LogSession, Stage, StageRuleSet, ViewerEvent};
use tokio::sync::mpsc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "stagewatch")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deployment log interpretation and live viewing", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Stage rule table (JSON); the builtin table is used when omitted
    #[arg(long, global = true, env = "STAGEWATCH_RULES")]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stage timeline for a log file
    Classify {
        /// Log file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Number of most recent lines to classify
        #[arg(long, default_value_t = stagewatch_core::DEFAULT_CAPACITY)]
        capacity: usize,

        /// Print the timeline as JSON
        #[arg(long)]
        output_json: bool,
    },

    /// Stream a log through a live session and print stage transitions
    Watch {
        /// Log file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Stream key used for the persisted autoscroll preference
        #[arg(long, default_value = "default")]
        stream_key: String,

        /// Buffer capacity
        #[arg(long, env = "STAGEWATCH_CAPACITY", default_value_t = stagewatch_core::DEFAULT_CAPACITY)]
        capacity: usize,

        /// Distance from the bottom that still counts as following
        #[arg(long, env = "STAGEWATCH_THRESHOLD", default_value_t = stagewatch_core::DEFAULT_SCROLL_THRESHOLD)]
        threshold: f64,

        /// Preference file; preferences are kept in memory when omitted
        #[arg(long, env = "STAGEWATCH_PREFS")]
        prefs: Option<PathBuf>,

        /// Lines per content batch
        #[arg(long, default_value_t = 20)]
        batch: usize,

        /// Level filter for the final log view (all, info, warn, error, debug)
        #[arg(long, default_value = "all")]
        level: LevelFilter,

        /// Substring filter for the final log view
        #[arg(long, default_value = "")]
        query: String,
    },

    /// Print the active stage rule table
    Rules,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    fingerprint: String,
    lines: usize,
    stages: &'a [Stage],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    stagewatch_core::init_tracing(cli.json, level);

    let rules = load_rules(cli.rules.as_deref())?;

    match cli.command {
        Commands::Classify {
            input,
            capacity,
            output_json,
        } => cmd_classify(&rules, &input, capacity, output_json).await,
        Commands::Watch {
            input,
            stream_key,
            capacity,
            threshold,
            prefs,
            batch,
            level,
            query,
        } => {
            let config = ViewerConfig {
                capacity,
                scroll_threshold: threshold,
            };
            config.validate().context("Invalid viewer configuration")?;
            cmd_watch(
                rules,
                &input,
                &stream_key,
                &config,
                prefs.as_deref(),
                batch,
                level,
                &query,
            )
            .await
        }
        Commands::Rules => cmd_rules(&rules),
    }
}

fn load_rules(path: Option<&Path>) -> Result<StageRuleSet> {
    let (rules, source) = match path {
        Some(path) => (
            StageRuleSet::load(path)
                .context(format!("Failed to load stage rules from {:?}", path))?,
            path.display().to_string(),
        ),
        None => (StageRuleSet::builtin(), "builtin".to_string()),
    };
    stagewatch_core::emit_rule_set_loaded(&rules.fingerprint(), &source);
    Ok(rules)
}

/// Classify a finished log and print its timeline
async fn cmd_classify(
    rules: &StageRuleSet,
    input: &Path,
    capacity: usize,
    output_json: bool,
) -> Result<()> {
    let records = input::read_all(input).await?;

    let mut buffer = LogBuffer::new(capacity);
    let delta = buffer.append(records.into_iter().map(LogEntry::from_record));
    if delta.evicted > 0 {
        info!(evicted = delta.evicted, "Classifying most recent lines only");
    }

    let stages = classify(rules, buffer.entries());

    if output_json {
        let output = ClassifyOutput {
            fingerprint: rules.fingerprint(),
            lines: buffer.len(),
            stages: &stages,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render::timeline(&stages));
    }

    Ok(())
}

/// Feed a log through a live session
#[allow(clippy::too_many_arguments)]
async fn cmd_watch(
    rules: StageRuleSet,
    input: &Path,
    stream_key: &str,
    config: &ViewerConfig,
    prefs: Option<&Path>,
    batch: usize,
    level: LevelFilter,
    query: &str,
) -> Result<()> {
    let store: Arc<dyn PreferenceStore> = match prefs {
        Some(path) => Arc::new(
            FsPreferenceStore::new(path)
                .context(format!("Failed to open preference file {:?}", path))?,
        ),
        None => Arc::new(MemoryPreferenceStore::new()),
    };

    let mut session = LogSession::new(stream_key, config, rules, store);
    info!(
        stream_key = %stream_key,
        session_id = %session.session_id(),
        following = session.autoscroll().is_following(),
        "Watching deployment log"
    );

    let (tx, mut rx) = mpsc::channel::<ViewerEvent>(64);
    let source = input.to_path_buf();
    let feeder = tokio::spawn(async move { input::feed(&source, batch, tx).await });

    while let Some(event) = rx.recv().await {
        let update = session.apply(event);
        for transition in &update.transitions {
            println!("{}", render::transition(transition));
        }
    }

    let total = feeder.await.context("Input task panicked")??;
    info!(lines = total, "Input exhausted");

    println!();
    for entry in session.filtered(level, query) {
        println!("{}", render::entry(entry));
    }
    println!();
    print!("{}", render::timeline(session.stages()));

    if !session.autoscroll().is_following() {
        println!(
            "{} new line(s) arrived while detached",
            session.autoscroll().pending_count()
        );
    }

    Ok(())
}

/// Print the active rule table and its fingerprint
fn cmd_rules(rules: &StageRuleSet) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&rules.to_config())?);
    println!("fingerprint: {}", rules.fingerprint());
    Ok(())
}
