use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use colored::Colorize;
use ragsheet_client::{RagClient, SystemStatus};
use tokio_util::sync::CancellationToken;

use crate::cli::HealthArgs;
use crate::config::CliConfig;
use crate::output::{OutputFormat, json::print_json};

pub async fn run(
    client: &RagClient,
    config: &CliConfig,
    args: HealthArgs,
    format: OutputFormat,
) -> Result<()> {
    if args.watch {
        let interval = args
            .interval
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.poll_interval());
        return watch(client, interval, format).await;
    }

    let probe = client.check_health().await;
    if format.is_json() {
        return match probe {
            Ok(health) => print_json(&health),
            Err(e) => bail!("{e}"),
        };
    }

    match probe {
        Ok(health) => {
            let status = SystemStatus::default().apply(Ok(health.clone()));
            println!("Server: {} ({})", health.status, client.config().base_url);
            print_status(&status);
            Ok(())
        }
        Err(e) => bail!("Server unreachable at {}: {e}", client.config().base_url),
    }
}

async fn watch(client: &RagClient, interval: Duration, format: OutputFormat) -> Result<()> {
    let cancel = CancellationToken::new();
    let monitor = client.spawn_health_monitor(interval, cancel.clone());
    let mut updates = monitor.subscribe();
    // The first probe may already have been published.
    updates.mark_changed();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                if status.checked_at.is_none() {
                    continue;
                }
                if format.is_json() {
                    println!("{}", serde_json::to_string(&status)?);
                } else {
                    println!("[{}] {}", Local::now().format("%H:%M:%S"), status_line(&status));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown().await;
    Ok(())
}

/// One-line summary used by `health --watch` and the chat `/status` command
pub fn status_line(status: &SystemStatus) -> String {
    let server = if status.online {
        "online".green()
    } else {
        "offline".red()
    };
    let knowledge_base = if status.vector_store_ready {
        "ready".green()
    } else {
        "not ready".yellow()
    };
    format!(
        "server {server}, knowledge base {knowledge_base}, {} file(s), last update {}",
        status.file_count,
        status.last_update.as_deref().unwrap_or("-")
    )
}

pub fn print_status(status: &SystemStatus) {
    let online = if status.online { "online" } else { "offline" };
    let ready = if status.vector_store_ready {
        "ready"
    } else {
        "not ready"
    };
    println!("Connection: {online}");
    println!("Knowledge base: {ready}");
    println!("Files: {}", status.file_count);
    println!(
        "Last update: {}",
        status.last_update.as_deref().unwrap_or("-")
    );
}
