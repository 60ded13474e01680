//! mediasync - Back up a media library to S3-compatible storage

use clap::Parser;
use mediasync::cli::{Cli, Commands, ConfigArgs};
use mediasync::config::Config;
use mediasync::progress;
use mediasync::storage::ObjectStore;
use mediasync::sync::BackupEngine;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json);

    match cli.command {
        Commands::Sync(args) => {
            let config = args.to_config()?;
            tracing::info!(
                root = %config.source.root.display(),
                bucket = %config.bucket.bucket,
                dry_run = config.dry_run,
                jobs = config.effective_jobs(),
                "Starting backup"
            );

            let dry_run = config.dry_run;
            let engine = BackupEngine::from_config(config).await?;
            let shutdown = setup_shutdown_handler(engine.cancellation_token());
            let stats = engine.sync().await;
            drop(shutdown);

            let stats = stats?;
            if !dry_run {
                progress::print_summary(&stats);
            }
        }

        Commands::Restore(args) => {
            let config = args.to_config()?;
            tracing::info!(dest = %args.dest.display(), "Starting restore");

            let dry_run = config.dry_run;
            let engine = BackupEngine::from_config(config).await?;
            let shutdown = setup_shutdown_handler(engine.cancellation_token());
            let stats = engine.restore(&args.dest).await;
            drop(shutdown);

            let stats = stats?;
            if !dry_run {
                progress::print_summary(&stats);
            }
        }

        Commands::Diff(args) => {
            let config = args.load_config()?;
            let engine = BackupEngine::from_config(config).await?;
            let diff = engine.plan().await?;
            progress::print_plan(&diff);
        }

        Commands::CreateBucket(args) => {
            let mut config = args.load_config()?;
            config.validate()?;
            config.bucket.apply_env();
            let store = ObjectStore::from_config(&config.bucket).await?;
            store.create_bucket(&config.bucket.bucket).await?;
            tracing::info!(bucket = %config.bucket.bucket, "Bucket ready");
        }

        Commands::Config(args) => {
            handle_config_command(args)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("mediasync=info"),
        1 => EnvFilter::new("mediasync=debug"),
        2 => EnvFilter::new("mediasync=trace"),
        _ => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

/// Cancel the running transfer on Ctrl+C
fn setup_shutdown_handler(cancel: CancellationToken) -> tokio::sync::oneshot::Sender<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Received Ctrl+C, stopping after the current item...");
                cancel.cancel();
            }
            _ = rx => {
                // Normal shutdown
            }
        }
    });

    tx
}

fn handle_config_command(args: ConfigArgs) -> anyhow::Result<()> {
    if args.path {
        match Config::default_config_path() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else if args.init {
        let config = Config::default();
        config.save()?;
        println!(
            "Created default configuration at {}",
            Config::default_config_path()?.display()
        );
    } else {
        // Show current config
        let config = Config::load().unwrap_or_default();
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
