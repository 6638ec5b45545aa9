//! `judged` — the alert judging engine's scheduler binary.

mod cli;
mod config;
mod error;
mod event_emitter;
mod query_client;
mod scheduler;
mod strategy_store;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use judge_core::LastEventStore;

use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::event_emitter::{EventEmitter, RedisQueueSink};
use crate::query_client::HttpGraphQueryClient;
use crate::scheduler::SchedulerDeps;
use crate::strategy_store::StrategyStore;
use crate::telemetry::{init_logging, Telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::CheckConfig => match Settings::load(&cli.config) {
            Ok(settings) => {
                println!("{settings:#?}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("config error: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Run => match run(&cli.config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("fatal: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(config_path: &std::path::Path) -> Result<(), error::CliError> {
    let settings = Settings::load(config_path)?;
    init_logging(&settings.telemetry.log_level);

    info!(
        graph_endpoint = %settings.graph.endpoint,
        concurrency = settings.judge.concurrency,
        "starting judged"
    );

    let strategy_store = Arc::new(StrategyStore::new(settings.strategy.source_url.clone()));
    strategy_store.refresh().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "initial strategy snapshot fetch failed, starting empty");
    });

    let query_client = Arc::new(HttpGraphQueryClient::new(settings.graph.endpoint.clone()));
    let last_event_store = Arc::new(LastEventStore::new());
    let sink = RedisQueueSink::new(&settings.alarm.queue_backend_url)
        .map_err(|e| error::CliError::ConfigInvalid(format!("queue backend: {e}")))?;
    let emitter = Arc::new(EventEmitter::new(sink, settings.alarm.queue_pattern.clone()));
    let telemetry = Arc::new(Telemetry::new());

    let deps = Arc::new(SchedulerDeps {
        strategy_store: strategy_store.clone(),
        query_client,
        last_event_store,
        emitter,
        telemetry: telemetry.clone(),
        min_interval_secs: settings.alarm.min_interval_secs as i64,
        query_timeout: Duration::from_secs(settings.graph.timeout_secs),
        concurrency: settings.judge.concurrency,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh_interval = Duration::from_secs(settings.strategy.refresh_interval_secs);
    let refresh_task = tokio::spawn({
        let strategy_store = strategy_store.clone();
        async move { strategy_store.run_refresh_loop(refresh_interval).await }
    });

    let telemetry_addr = settings.telemetry.metrics_addr.clone();
    let telemetry_task = tokio::spawn({
        let telemetry = telemetry.clone();
        async move {
            if let Err(e) = crate::telemetry::serve(telemetry, &telemetry_addr).await {
                tracing::error!(error = %e, "telemetry server exited");
            }
        }
    });

    let scheduler_task = tokio::spawn(scheduler::run(deps, shutdown_rx));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = scheduler_task.await;
    refresh_task.abort();
    telemetry_task.abort();

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
