use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use solana_client::nonblocking::rpc_client::RpcClient;

mod config;
mod dev_activity;
mod enricher;
mod holders;
mod launch;
mod ports;
mod recorder;
mod rugcheck;
mod telemetry;
mod watcher;

use crate::dev_activity::RpcDevScreen;
use crate::enricher::{AnalysisSettings, Enricher};
use crate::holders::RpcHolderSource;
use crate::launch::RpcLaunchResolver;
use crate::recorder::JsonlRecorder;
use crate::rugcheck::RugCheckClient;
use crate::watcher::LaunchSignal;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Logging: console plus a daily rolling file
    let file_appender = tracing_appender::rolling::daily("logs", "launchwatch.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(file_writer.and(std::io::stdout))
        .init();

    info!("🚀 LaunchWatch Bootstrapping [Composition Root]...");

    // 2. Unified Configuration Layer (Fail Fast)
    let config = match config::MonitorConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ CRITICAL: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    info!("✅ Config Loaded & Validated: RPC={}, WS={}", config.rpc_url, config.ws_url);

    // 3. Telemetry
    telemetry::init_metrics();
    if let Some(addr) = config.metrics_addr.clone() {
        tokio::spawn(telemetry::serve_metrics(addr));
    }

    // 4. Infrastructure Adapters
    let rpc = Arc::new(RpcClient::new(config.rpc_url.clone()));

    let sink = match JsonlRecorder::new(&config.data_dir).await {
        Ok(recorder) => Arc::new(recorder),
        Err(e) => {
            error!("❌ CRITICAL: Failed to open data dir {}: {}", config.data_dir, e);
            std::process::exit(1);
        }
    };

    let enricher = Arc::new(Enricher::new(
        Arc::new(RpcLaunchResolver::new(Arc::clone(&rpc))),
        Arc::new(RpcHolderSource::new(Arc::clone(&rpc))),
        Arc::new(RugCheckClient::new(&config.rugcheck_url)),
        Arc::new(RpcDevScreen::new(Arc::clone(&rpc), config.dev_tx_scan_limit)),
        sink,
        AnalysisSettings::from(&config),
    ));

    // 5. Launch Subscription
    let (signal_tx, mut signal_rx) = mpsc::channel::<LaunchSignal>(1024);
    let ws_url = config.ws_url.clone();
    let _watcher_handle = tokio::spawn(async move {
        watcher::start_launch_watcher(ws_url, signal_tx).await;
    });

    // 6. Shutdown Watcher (Coordinated Exit)
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown signal received (Ctrl+C). Cleaning up...");
            let _ = shutdown_tx.send(()).await;
        }
    });

    info!("🔥 LaunchWatch ONLINE. Waiting for new pools...");

    // 7. The Core Loop: fan each signal out without serializing
    //    against in-flight events.
    loop {
        tokio::select! {
            Some(signal) = signal_rx.recv() => {
                enricher.spawn_analysis(signal);
            }

            _ = shutdown_rx.recv() => {
                info!("👋 LaunchWatch shutting down gracefully. Goodbye!");
                break;
            }

            else => {
                info!("⚠️ Signal channel closed. Exiting.");
                break;
            }
        }
    }
}
