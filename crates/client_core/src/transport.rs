//! Connection capability: the narrow send surface the chat client holds.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{stream::SplitSink, SinkExt};
use shared::protocol::ChatRequest;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Send half of the chat connection. The client owns this capability rather
/// than the socket itself; the receive half drives the client from a reader
/// task.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_request(&self, request: &ChatRequest) -> Result<()>;
    fn is_open(&self) -> bool;
}

/// Placeholder used before a connection exists and after one closes.
pub struct MissingTransport;

#[async_trait]
impl ChatTransport for MissingTransport {
    async fn send_request(&self, _request: &ChatRequest) -> Result<()> {
        Err(anyhow!("chat transport is unavailable"))
    }

    fn is_open(&self) -> bool {
        false
    }
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub(crate) struct WsTransport {
    writer: Mutex<WsSink>,
    open: Arc<AtomicBool>,
}

impl WsTransport {
    pub(crate) fn new(writer: WsSink, open: Arc<AtomicBool>) -> Self {
        Self {
            writer: Mutex::new(writer),
            open,
        }
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn send_request(&self, request: &ChatRequest) -> Result<()> {
        let frame = serde_json::to_string(request)?;
        self.writer
            .lock()
            .await
            .send(Message::Text(frame))
            .await
            .map_err(|err| anyhow!("websocket send failed: {err}"))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
