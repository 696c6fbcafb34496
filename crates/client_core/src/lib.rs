use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use shared::{
    domain::RequestId,
    protocol::{AssistantEvent, ChatRequest},
};
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod markup;
pub mod search;
pub mod transcript;
pub mod transport;

pub use transcript::{Transcript, TranscriptEntry};
pub use transport::{ChatTransport, MissingTransport};

use transport::WsTransport;

/// Change notifications for the presentation layer.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transcript changed; the payload is the full display-ready state.
    TranscriptUpdated(Vec<TranscriptEntry>),
    /// No further events are possible until a fresh `connect`.
    ConnectionClosed,
}

/// Client side of one chat session: owns the transcript, the pending flag,
/// and the send capability of the connection.
///
/// All state sits behind one mutex, so the two mutation paths (a submission
/// and an inbound event) each run to completion before the other starts.
pub struct ChatClient {
    inner: Mutex<ClientInner>,
    events: broadcast::Sender<ClientEvent>,
}

struct ClientInner {
    transport: Arc<dyn ChatTransport>,
    transcript: Transcript,
    pending: bool,
    user_id: String,
    session_id: String,
    last_request_id: RequestId,
}

impl ClientInner {
    // Clock-derived and strictly increasing, so rapid submissions within the
    // same millisecond still get distinct request ids.
    fn allocate_request_id(&mut self) -> RequestId {
        let clock = RequestId(Utc::now().timestamp_millis());
        self.last_request_id = clock.max(RequestId(self.last_request_id.0 + 1));
        self.last_request_id
    }
}

impl ChatClient {
    pub fn new(user_id: impl Into<String>) -> Arc<Self> {
        Self::new_with_transport(user_id, Arc::new(MissingTransport))
    }

    pub fn new_with_transport(
        user_id: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            inner: Mutex::new(ClientInner {
                transport,
                transcript: Transcript::new(),
                pending: false,
                user_id: user_id.into(),
                session_id: Uuid::new_v4().to_string(),
                last_request_id: RequestId(0),
            }),
            events,
        })
    }

    /// Opens the websocket for `server_url` (an `http(s)://` base) and starts
    /// folding inbound events into the transcript. Fails if a connection is
    /// already open; after a closure, calling this again resumes the session
    /// with the transcript intact.
    pub async fn connect(self: &Arc<Self>, server_url: &str) -> Result<()> {
        {
            let guard = self.inner.lock().await;
            if guard.transport.is_open() {
                return Err(anyhow!("chat connection already open"));
            }
        }

        let ws_url = chat_ws_url(server_url)?;
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (writer, mut reader) = ws_stream.split();

        let open = Arc::new(AtomicBool::new(true));
        let transport: Arc<dyn ChatTransport> =
            Arc::new(WsTransport::new(writer, Arc::clone(&open)));

        {
            let mut guard = self.inner.lock().await;
            // Re-check under the lock: a racing connect may have won.
            if guard.transport.is_open() {
                return Err(anyhow!("chat connection already open"));
            }
            guard.transport = Arc::clone(&transport);
        }
        info!(url = %ws_url, "chat: websocket connected");

        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => match AssistantEvent::from_frame(&text) {
                        Ok(event) => client.on_event(event).await,
                        Err(err) => warn!("chat: skipping frame: {err}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("chat: websocket receive failed: {err}");
                        break;
                    }
                }
            }
            open.store(false, Ordering::SeqCst);
            client.on_connection_closed(&transport).await;
        });

        Ok(())
    }

    /// Appends the user's message to the transcript and fires the request.
    /// Blank input or a closed connection makes this a no-op.
    pub async fn submit(&self, text: &str, search: bool) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("chat: ignoring blank submission");
            return Ok(());
        }

        let (transport, request) = {
            let mut guard = self.inner.lock().await;
            if !guard.transport.is_open() {
                debug!("chat: ignoring submission while disconnected");
                return Ok(());
            }

            let request = ChatRequest {
                id: guard.allocate_request_id(),
                user_id: guard.user_id.clone(),
                session_id: guard.session_id.clone(),
                user_message: trimmed.to_string(),
                search,
            };
            guard.transcript.push_user(trimmed);
            guard.pending = true;
            // Emitted under the lock so snapshots reach observers in order.
            let _ = self.events.send(ClientEvent::TranscriptUpdated(
                guard.transcript.entries().to_vec(),
            ));
            (Arc::clone(&guard.transport), request)
        };

        transport.send_request(&request).await
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcript.entries().to_vec()
    }

    /// True between a submission and the final event that answers it.
    pub async fn is_pending(&self) -> bool {
        self.inner.lock().await.pending
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn on_event(&self, event: AssistantEvent) {
        let mut guard = self.inner.lock().await;
        if !event.chain_of_thought {
            guard.pending = false;
        }
        guard.transcript.apply(event);
        let _ = self.events.send(ClientEvent::TranscriptUpdated(
            guard.transcript.entries().to_vec(),
        ));
    }

    async fn on_connection_closed(&self, closed: &Arc<dyn ChatTransport>) {
        {
            let mut guard = self.inner.lock().await;
            // A reader outliving a replaced transport must not tear down the
            // current one.
            if !Arc::ptr_eq(&guard.transport, closed) {
                return;
            }
            guard.transport = Arc::new(MissingTransport);
            guard.pending = false;
        }
        info!("chat: connection closed");
        let _ = self.events.send(ClientEvent::ConnectionClosed);
    }
}

fn chat_ws_url(server_url: &str) -> Result<String> {
    let ws_base = if server_url.starts_with("https://") {
        server_url.replacen("https://", "wss://", 1)
    } else if server_url.starts_with("http://") {
        server_url.replacen("http://", "ws://", 1)
    } else {
        return Err(anyhow!("server_url must start with http:// or https://"));
    };
    Ok(format!("{}/chat", ws_base.trim_end_matches('/')))
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Probes `GET /health` on the chat server.
pub async fn check_health(server_url: &str) -> Result<()> {
    let response: HealthResponse = reqwest::Client::new()
        .get(format!("{server_url}/health"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if response.status != "ok" {
        return Err(anyhow!("unexpected health status: {}", response.status));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
