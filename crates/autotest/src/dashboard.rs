// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web dashboard (§4.O, ambient). A thin `axum` server, in the host
//! crate's WS-fan-out idiom (`transport/ws_mux.rs`), that subscribes to
//! the shared [`EventBus`] and streams live run progress to connected
//! browsers plus a static summary page. Not a new orchestration path —
//! it observes the same bus the scheduler already emits to.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::events::EventBus;

#[derive(Clone)]
struct DashboardState {
    bus: Arc<EventBus>,
    reports_dir: std::path::PathBuf,
}

/// Start the dashboard server and run until the process is terminated.
pub async fn serve(host: &str, port: u16, reports_dir: std::path::PathBuf, bus: Arc<EventBus>) -> anyhow::Result<()> {
    let state = DashboardState { bus, reports_dir };
    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<DashboardState>) -> impl IntoResponse {
    let report_path = state.reports_dir.join("report.json");
    let summary_html = match std::fs::read_to_string(&report_path) {
        Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(doc) => format!(
                "<p>Last run: {} total, {} passed, {} failed, {} error, {} skipped.</p>",
                doc["summary"]["total"], doc["summary"]["passed"], doc["summary"]["failed"],
                doc["summary"]["error"], doc["summary"]["skipped"],
            ),
            Err(_) => "<p>No parsable report.json yet.</p>".to_owned(),
        },
        Err(_) => "<p>No report.json yet — run a test batch first.</p>".to_owned(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Autotest dashboard</title></head>
<body>
<h1>Autotest dashboard</h1>
{summary_html}
<pre id="log"></pre>
<script>
const log = document.getElementById('log');
const ws = new WebSocket(`ws://${{location.host}}/ws`);
ws.onmessage = (msg) => {{ log.textContent += msg.data + "\n"; }};
</script>
</body></html>
"#
    ))
}

async fn ws_handler(State(state): State<DashboardState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: DashboardState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(256);

    let sub_id = state
        .bus
        .subscribe_all(move |event| {
            let tx = tx.clone();
            async move {
                if let Ok(json) = serde_json::to_string(&event) {
                    let _ = tx.send(json).await;
                }
            }
        })
        .await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(json) => {
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.bus.unsubscribe(sub_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn index_without_a_report_renders_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let state = DashboardState { bus: Arc::new(EventBus::new()), reports_dir: dir.path().to_path_buf() };
        let Html(body) = index(State(state)).await;
        assert!(body.contains("No report.json yet"));
    }

    #[tokio::test]
    async fn index_with_a_report_renders_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("report.json"),
            json!({"summary": {"total": 3, "passed": 2, "failed": 1, "error": 0, "skipped": 0}}).to_string(),
        )
        .unwrap();
        let state = DashboardState { bus: Arc::new(EventBus::new()), reports_dir: dir.path().to_path_buf() };
        let Html(body) = index(State(state)).await;
        assert!(body.contains("3 total"));
    }
}
