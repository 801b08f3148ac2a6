// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-device dual-channel transport with a pending-request table
//! (§4.D). Opens a control connection (request/response) and an event
//! connection (agent-pushed, client never writes) and runs exactly one
//! reader task per socket.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::error::{AutotestError, ErrorCode};
use crate::protocol::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

type EventHandler = Arc<dyn Fn(Message) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Dual-channel client for a single device, reachable at `host:control_port`
/// (path `/control`) and `host:event_port` (path `/events`).
pub struct DeviceClient {
    host: String,
    control_port: u16,
    event_port: u16,
    state: Mutex<ConnectionState>,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>,
    control_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    event_subscribers: Arc<RwLock<Vec<EventHandler>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl DeviceClient {
    pub fn new(host: impl Into<String>, control_port: u16, event_port: u16) -> Self {
        Self {
            host: host.into(),
            control_port,
            event_port,
            state: Mutex::new(ConnectionState::Disconnected),
            pending: Arc::new(Mutex::new(HashMap::new())),
            control_tx: Mutex::new(None),
            event_subscribers: Arc::new(RwLock::new(Vec::new())),
            tasks: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// Idempotent per instance only across a connect→disconnect cycle:
    /// calling twice without an intervening `disconnect` fails fast.
    pub async fn connect(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != ConnectionState::Disconnected {
                anyhow::bail!(AutotestError::new(
                    ErrorCode::Connection,
                    anyhow::anyhow!("device client already connected or connecting")
                ));
            }
            *state = ConnectionState::Connecting;
        }

        let control_url = format!("ws://{}:{}/control", self.host, self.control_port);
        let event_url = format!("ws://{}:{}/events", self.host, self.event_port);

        let connect_result: anyhow::Result<()> = async {
            let (control_ws, _) = tokio_tungstenite::connect_async(&control_url).await.map_err(|e| {
                AutotestError::new(ErrorCode::Connection, anyhow::anyhow!("control connect failed: {e}"))
            })?;
            let (event_ws, _) = tokio_tungstenite::connect_async(&event_url).await.map_err(|e| {
                AutotestError::new(ErrorCode::Connection, anyhow::anyhow!("event connect failed: {e}"))
            })?;

            self.closed.store(false, Ordering::SeqCst);

            let (control_sink, control_stream) = control_ws.split();
            let (event_sink, event_stream) = event_ws.split();
            drop(event_sink); // the client never writes to the event channel

            let (tx, rx) = mpsc::unbounded_channel::<Message>();
            *self.control_tx.lock().await = Some(tx);

            let writer = spawn_writer(control_sink, rx);
            let reader = spawn_control_reader(control_stream, self.pending.clone(), self.closed.clone());
            let events = spawn_event_reader(event_stream, self.event_subscribers.clone());

            *self.tasks.lock().await = vec![writer, reader, events];
            Ok(())
        }
        .await;

        // Any socket error on connect leaves the client Disconnected,
        // matching the state machine in §4.D: `connecting` never sticks.
        match connect_result {
            Ok(()) => {
                *self.state.lock().await = ConnectionState::Connected;
                Ok(())
            }
            Err(err) => {
                *self.state.lock().await = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Send a request and await its matching response, or a timeout.
    pub async fn send(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Message> {
        if self.state().await != ConnectionState::Connected {
            anyhow::bail!(AutotestError::new(
                ErrorCode::Connection,
                anyhow::anyhow!("device client is not connected")
            ));
        }

        let request = Message::request(method, params, timeout);
        let id = request.id.clone();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let control_tx = self.control_tx.lock().await.clone();
        let Some(control_tx) = control_tx else {
            self.pending.lock().await.remove(&id);
            anyhow::bail!(AutotestError::new(ErrorCode::Connection, anyhow::anyhow!("no control channel")));
        };
        if control_tx.send(request).is_err() {
            self.pending.lock().await.remove(&id);
            anyhow::bail!(AutotestError::new(ErrorCode::Connection, anyhow::anyhow!("control channel closed")));
        }

        let wait = rx;
        let result = match timeout {
            Some(d) => tokio::time::timeout(d, wait).await,
            None => Ok(wait.await),
        };

        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                // Sender was dropped without resolving: connection closed
                // underneath us. The slot is already gone from the table.
                Err(AutotestError::new(ErrorCode::Connection, anyhow::anyhow!("connection closed while pending"))
                    .into())
            }
            Err(_) => {
                // Local timeout: remove the slot. No cancel frame is sent
                // (per the decision recorded for open question (a)); a
                // late reply finds no slot and is discarded.
                self.pending.lock().await.remove(&id);
                Err(AutotestError::new(ErrorCode::Timeout, anyhow::anyhow!("request '{id}' timed out")).into())
            }
        }
    }

    /// Register an event-channel subscriber. Each event is dispatched to
    /// every subscriber concurrently; handler errors are swallowed.
    pub async fn on_event<F, Fut>(&self, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wrapped: EventHandler = Arc::new(move |msg| Box::pin(handler(msg)));
        self.event_subscribers.write().await.push(wrapped);
    }

    /// Close both channels, abort reader/writer tasks, and fail every
    /// pending slot with a connection-closed error.
    pub async fn disconnect(&self) {
        *self.state.lock().await = ConnectionState::Disconnecting;
        self.closed.store(true, Ordering::SeqCst);

        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        *self.control_tx.lock().await = None;

        // Dropping the senders resolves every awaiting `send` with a
        // closed-channel error; `.drain()` takes ownership so dropping
        // the map's values happens here.
        self.pending.lock().await.clear();

        *self.state.lock().await = ConnectionState::Disconnected;
    }
}

fn spawn_writer(
    mut sink: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        WsMessage,
    >,
    mut rx: mpsc::UnboundedReceiver<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = msg.encode() else { continue };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_control_reader(
    mut stream: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>,
    closed: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(WsMessage::Text(text)) => text.to_string(),
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            let Ok(message) = Message::decode(&frame) else {
                warn!("dropping malformed control frame");
                continue;
            };
            if let Some(slot) = pending.lock().await.remove(&message.id) {
                let _ = slot.send(message);
            } else {
                debug!(id = %message.id, "discarding response with no matching pending slot");
            }
        }
        // Socket closed: fail every remaining slot by dropping the senders.
        closed.store(true, Ordering::SeqCst);
        pending.lock().await.clear();
    })
}

fn spawn_event_reader(
    mut stream: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
    subscribers: Arc<RwLock<Vec<EventHandler>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(WsMessage::Text(text)) => text.to_string(),
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            let Ok(message) = Message::decode(&frame) else { continue };
            let handlers = subscribers.read().await.clone();
            for handler in handlers {
                let message = message.clone();
                tokio::spawn(async move {
                    handler(message).await;
                });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_before_connect_fails() {
        let client = DeviceClient::new("127.0.0.1", 1, 2);
        let result = client.send("device.info", None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_connect_resets_to_disconnected() {
        let client = DeviceClient::new("127.0.0.1", 1, 2);
        // No listener is running on these ports, so the connect attempt
        // fails with a connection error; state must fall back to
        // Disconnected rather than sticking at Connecting, so a caller
        // can retry.
        let result = client.connect().await;
        assert!(result.is_err());
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn second_connect_after_failure_also_attempts() {
        let client = DeviceClient::new("127.0.0.1", 1, 2);
        assert!(client.connect().await.is_err());
        // Disconnected after the first failure, so a second attempt is
        // not rejected as "already connected".
        assert!(client.connect().await.is_err());
    }
}
