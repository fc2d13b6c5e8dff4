// mcdex/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use mcdex_common::config::Config;
use mcdex_common::error::{McdexError, Result as McdexResult};
use mcdex_core::PackController;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{CliArgs, Command};

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("MCDEX_LOG")
        .from_env_lossy();

    let log_dir = config.logs_dir();
    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Error:".red().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "mcdex.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    Box::leak(Box::new(guard)); // Keep guard alive

    debug!(
        "Verbose logging enabled. Writing logs to: {}/mcdex.log",
        log_dir.display()
    );
}

fn report_error(e: &McdexError) {
    eprintln!("{} [{}]: {}", "Error".red().bold(), e.kind(), e);
    if let McdexError::PartialInstall { failed, .. } = e {
        for (name, reason) in failed {
            eprintln!("  {} {}: {}", "✗".red(), name.cyan(), reason);
        }
        eprintln!("Re-run the command to retry the failed mods.");
    }
}

#[tokio::main]
async fn main() -> McdexResult<()> {
    let cli_args = CliArgs::parse();

    let config = Config::load().map_err(|e| {
        eprintln!("{}: {}", "Error".red().bold(), e);
        e
    })?;
    init_logging(&config, cli_args.verbose);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling...".yellow());
            ctrl_c_token.cancel();
        }
    });

    let controller = match PackController::from_config(config, cancel) {
        Ok(controller) => controller,
        Err(e) => {
            report_error(&e);
            process::exit(1);
        }
    };

    let printer = if cli_args.command.is_quiet() {
        None
    } else {
        Some(tokio::spawn(cli::status::handle_events(controller.subscribe())))
    };

    let result = cli_args.command.run(&controller).await;
    // Dropping the controller closes the event channel so the printer drains and exits.
    drop(controller);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        report_error(&e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
    Ok(())
}
