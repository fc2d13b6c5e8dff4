// mcdex/src/cli/status.rs
use colored::*;
use mcdex_common::pipeline::PipelineEvent;
use tokio::sync::broadcast;
use tracing::debug;

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit_idx = 0;

    while value >= 1000.0 && unit_idx < UNITS.len() - 1 {
        value /= 1000.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{bytes}B")
    } else {
        format!("{:.1}{}", value, UNITS[unit_idx])
    }
}

fn render(event: PipelineEvent) -> String {
    match event {
        PipelineEvent::ResolutionStarted {
            pack,
            reference_count,
        } => format!(
            "{} {} ({} references)",
            "Resolving".cyan().bold(),
            pack.cyan(),
            reference_count
        ),
        PipelineEvent::ReferenceResolved {
            name,
            file_id,
            dependency,
            ..
        } => {
            let file = file_id.map_or_else(|| "url".to_string(), |id| id.to_string());
            let kind = if dependency { " (dependency)".dimmed().to_string() } else { String::new() };
            format!("  {} {} [{}]{}", "✓".green(), name.cyan(), file, kind)
        }
        PipelineEvent::ResolutionFinished {
            reference_count, ..
        } => format!("{} {} references", "Resolved".cyan(), reference_count),
        PipelineEvent::DownloadStarted { name, .. } => {
            format!("  {} {}", "↓".yellow(), name.cyan())
        }
        PipelineEvent::DownloadCached { name, .. } => {
            format!("  {} {} {}", "·".dimmed(), name.cyan(), "(cached)".dimmed())
        }
        PipelineEvent::DownloadFinished {
            name, size_bytes, ..
        } => format!(
            "  {} {} {}",
            "✓".green(),
            name.cyan(),
            format_bytes(size_bytes).dimmed()
        ),
        PipelineEvent::DownloadFailed { name, error, .. } => {
            format!("  {} {}: {}", "✗".red().bold(), name.cyan(), error.red())
        }
        PipelineEvent::ModInstalled { file_name, .. } => {
            format!("  {} {}", "⚙".magenta(), file_name)
        }
        PipelineEvent::ModRemoved { file_name } => {
            format!("  {} {}", "−".yellow(), file_name.dimmed())
        }
        PipelineEvent::OverridesApplied { count } => {
            format!("{} {} override files", "Applied".cyan(), count)
        }
        PipelineEvent::InstallFinished {
            pack,
            installed,
            unchanged,
            failed,
        } => {
            let failed = if failed > 0 {
                failed.to_string().red().bold()
            } else {
                failed.to_string().normal()
            };
            format!(
                "{} {}: {} new, {} unchanged, {} failed",
                "Installed".green().bold(),
                pack.cyan(),
                installed,
                unchanged,
                failed
            )
        }
        PipelineEvent::StageFailed { pack, stage, error } => format!(
            "{} {} during {}: {}",
            "✗".red().bold(),
            pack.cyan(),
            stage,
            error.red()
        ),
        PipelineEvent::LogInfo { message } => message,
        PipelineEvent::LogWarn { message } => format!("{} {}", "Warning:".yellow(), message),
    }
}

/// Prints controller events until every sender is gone.
pub async fn handle_events(mut event_rx: broadcast::Receiver<PipelineEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => println!("{}", render(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Status printer lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
