use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use launch_core::constants::RAYDIUM_FEE_COLLECTOR;

/// A successfully-delivered, error-free log notification that may be
/// a pool launch. Hydration decides whether it actually is one.
#[derive(Debug, Clone)]
pub struct LaunchSignal {
    pub signature: String,
}

/// Subscribe to the fee-collector logs and push launch signals into
/// the channel. Never blocks on analysis; the orchestrator owns the
/// per-event work.
pub async fn start_launch_watcher(ws_url: String, signal_tx: Sender<LaunchSignal>) {
    tracing::info!("📡 Starting LaunchWatcher: {}", ws_url);

    let mut retry_delay = 2; // Start with 2s
    let mut seen_signatures = std::collections::HashSet::new();
    let mut last_cleanup = std::time::Instant::now();

    loop {
        let (ws_stream, _) = match connect_async(&ws_url).await {
            Ok(s) => {
                retry_delay = 2; // Reset on success
                s
            }
            Err(e) => {
                let jitter = rand::random::<u64>() % 1000;
                tracing::error!("❌ Watcher WebSocket Failed: {}. Retrying in {}s...", e, retry_delay);
                tokio::time::sleep(tokio::time::Duration::from_millis(retry_delay * 1000 + jitter)).await;
                retry_delay = (retry_delay * 2).min(60); // Max 60s
                crate::telemetry::WEBSOCKET_RECONNECTS_TOTAL.inc();
                continue;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let sub_msg = json!({
            "jsonrpc": "2.0", "id": 1, "method": "logsSubscribe",
            "params": [
                { "mentions": [RAYDIUM_FEE_COLLECTOR.to_string()] },
                { "commitment": "confirmed" }
            ]
        });
        if let Err(e) = write.send(Message::Text(sub_msg.to_string().into())).await {
            tracing::error!("❌ Launch Log Sub Failed: {}", e);
            continue;
        }

        tracing::info!("👂 LaunchWatcher ONLINE. Watching for new pools...");

        while let Some(msg) = read.next().await {
            // Periodic cleanup of seen signatures (every 5 minutes).
            // Duplicates past the window flow through; the sink is
            // append-only so a doubled record is harmless.
            if last_cleanup.elapsed() > std::time::Duration::from_secs(300) {
                seen_signatures.clear();
                last_cleanup = std::time::Instant::now();
            }

            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(json) = serde_json::from_str::<Value>(&text) {
                        match parse_log_notification(&json) {
                            Some(signal) => {
                                if seen_signatures.insert(signal.signature.clone()) {
                                    tracing::info!("✨ New launch signature: {}", signal.signature);
                                    crate::telemetry::LAUNCHES_DETECTED_TOTAL.inc();
                                    if signal_tx.send(signal).await.is_err() {
                                        tracing::warn!("📡 Signal channel closed. Watcher exiting.");
                                        return;
                                    }
                                }
                            }
                            None => {
                                if json.get("params").is_some() {
                                    crate::telemetry::LAUNCHES_SKIPPED_TOTAL.inc();
                                }
                            }
                        }
                    }
                }
                Ok(Message::Ping(payload)) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(_)) | Err(_) => {
                    tracing::warn!("📡 LaunchWatcher DISRUPTED. Reconnecting...");
                    crate::telemetry::WEBSOCKET_RECONNECTS_TOTAL.inc();
                    break;
                }
                _ => {}
            }
        }
    }
}

/// Extract a launch signal from a logsNotification frame. Errored
/// transactions (`err != null`) are skipped, not failed.
pub fn parse_log_notification(json: &Value) -> Option<LaunchSignal> {
    let params = json.get("params")?;
    let value = params.get("result")?.get("value")?;

    if !value.get("err").map(|e| e.is_null()).unwrap_or(false) {
        return None;
    }

    let signature = value.get("signature").and_then(|s| s.as_str())?;
    if signature.is_empty() {
        return None;
    }

    Some(LaunchSignal {
        signature: signature.to_string(),
    })
}
