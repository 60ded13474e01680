//! CLI argument parsing for mediasync

use crate::config::Config;
use crate::error::Result;
use crate::source::SourceKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// mediasync - Back up a media library to S3-compatible storage
#[derive(Parser, Debug)]
#[command(name = "mediasync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload local items missing from the bucket
    Sync(SyncArgs),

    /// Download bucket objects missing from a local directory
    Restore(RestoreArgs),

    /// Print the backup plan without transferring anything
    Diff(CommonArgs),

    /// Create the configured bucket
    CreateBucket(CommonArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Options shared by every command that talks to a bucket
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Configuration file path
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the config file named by `-c`, or the default one
    pub fn load_config(&self) -> Result<Config> {
        match self.config {
            Some(ref path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source root directory [default: from config]
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Source kind [default: from config]
    #[arg(long, value_enum)]
    pub kind: Option<SourceKind>,

    /// Perform a trial run with no changes made
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of items transferred at once [default: from config]
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Collection to back up (can be specified multiple times)
    #[arg(long = "collection", action = clap::ArgAction::Append)]
    pub collections: Vec<String>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl SyncArgs {
    /// Convert CLI args to Config, merging with file config
    pub fn to_config(&self) -> Result<Config> {
        let mut config = self.common.load_config()?;

        // CLI args override config file
        if let Some(ref root) = self.root {
            config.source.root = root.clone();
        }
        if let Some(kind) = self.kind {
            config.source.kind = kind;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if !self.collections.is_empty() {
            config.source.collections = self.collections.clone();
        }
        config.dry_run |= self.dry_run;
        if self.no_progress {
            config.progress = false;
        }

        Ok(config)
    }
}

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Directory to restore into
    pub dest: PathBuf,

    /// Perform a trial run with no changes made
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of items transferred at once [default: from config]
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl RestoreArgs {
    pub fn to_config(&self) -> Result<Config> {
        let mut config = self.common.load_config()?;
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        config.dry_run |= self.dry_run;
        Ok(config)
    }
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the configuration file path
    #[arg(long)]
    pub path: bool,

    /// Create default configuration file
    #[arg(long)]
    pub init: bool,
}
