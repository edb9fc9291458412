//! vaultctl - terminal client for ProgressVault
//!
//! Drives the simulated database from the command line and prints the
//! learner's progress card and the operation log after every action.

mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vault_common::config::{self, VaultConfig};

#[derive(Parser)]
#[command(name = "vaultctl")]
#[command(about = "ProgressVault - see how a database stores your progress", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: <config_dir>/progressvault/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the simulated tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Store passwords with the reversible demo encoding
    #[arg(long, global = true)]
    demo: bool,

    /// Skip the simulated network delays
    #[arg(long, global = true)]
    no_latency: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in
    Signup { email: String, password: String },

    /// Sign in to an existing account
    Signin { email: String, password: String },

    /// End the current session
    Signout,

    /// Show session and progress
    Status,

    /// Earn experience points
    Xp {
        /// Amount to add (default from config, usually 10)
        amount: Option<u32>,
    },

    /// Complete the next lesson (+25 XP)
    Lesson,

    /// Reset level, XP and lessons
    Reset,

    /// Interactive session keeping one operation log across commands
    Repl,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> VaultConfig {
    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut config = VaultConfig::load_from(&path);
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if cli.demo {
        config.auth.demo_mode = true;
    }
    if cli.no_latency {
        config.latency.enabled = false;
    }
    if config.oplog.capacity_was_clamped() {
        tracing::warn!(
            requested = config.oplog.capacity,
            used = config.oplog.effective_capacity(),
            "oplog.capacity out of range"
        );
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli);
    tracing::debug!(
        data_dir = %config.storage.data_dir.display(),
        backend = config.storage.backend.as_str(),
        "configuration loaded"
    );

    commands::run(cli.command, &config).await
}
