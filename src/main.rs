//! Prompto - prompt enhancement controls for third-party chat surfaces
//!
//! Main entry point for the Prompto CLI.

mod cli;
mod cmd_account;
mod cmd_attach;
mod cmd_profiles;
mod context;

use std::path::Path;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use prompto_config::{ConfigLoader, LoggingConfig};
use prompto_protocols::TransformKind;

use crate::cli::{Cli, Commands};
use crate::context::{Context, check_config, load_config};

/// Initialize tracing with console and file output.
///
/// Log files are written to `[logging].directory` with daily rotation.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let log_dir = ConfigLoader::expand_path(&logging.directory);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("prompto")
        .filename_suffix("log")
        .max_log_files(14)
        .build(Path::new(&log_dir))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard would stop the file writer.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = if logging.json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console output goes to stderr so command results stay pipeable.
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging)?;
    check_config(&config)?;

    let ctx = Context::new(config);

    match cli.command {
        Commands::Attach { endpoint, target } => {
            cmd_attach::handle_attach(&ctx, &endpoint, target).await
        }
        Commands::Enhance { text } => {
            cmd_account::transform(&ctx, TransformKind::Enhance, text).await
        }
        Commands::Optimize { text } => {
            cmd_account::transform(&ctx, TransformKind::Optimize, text).await
        }
        Commands::Login { username, password } => {
            cmd_account::login(&ctx, username, password).await
        }
        Commands::Logout => cmd_account::logout(&ctx).await,
        Commands::Whoami => cmd_account::whoami(&ctx).await,
        Commands::Stats => cmd_account::stats(&ctx).await,
        Commands::Profiles { host } => cmd_profiles::handle_profiles(host),
    }
}
