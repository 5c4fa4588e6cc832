//! Session state and the per-session task loops.
//!
//! Every accepted session runs one frame-reading loop (receive or
//! close-wait, depending on its class) plus, for non-`api` sessions, a
//! heartbeat loop. The loops share a cancellation token linked to the
//! service root: whichever loop exits first fires the token and takes its
//! siblings down with it.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::model::{BotStatus, HeartbeatMeta, LifecycleMeta};

use super::{ServiceInner, truncate_payload};

/// Unique identifier of one accepted session.
pub type SessionId = Uuid;

/// Session class derived from the upgrade request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// `/api`: request/response only, no server-initiated frames.
    Api,
    /// `/event`: server-to-client events and heartbeats only.
    Event,
    /// Any other path: both directions.
    Universal,
}

impl PathClass {
    /// Classifies an upgrade path. A trailing slash is tolerated; any
    /// unrecognized path is served as `universal`.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/api" => Self::Api,
            "/event" => Self::Event,
            _ => Self::Universal,
        }
    }

    /// Whether sessions of this class receive server-initiated frames
    /// (lifecycle, heartbeats, broadcasts).
    pub fn receives_push(self) -> bool {
        self != Self::Api
    }
}

impl std::fmt::Display for PathClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Api => "api",
            Self::Event => "event",
            Self::Universal => "universal",
        };
        f.write_str(name)
    }
}

/// One accepted, authenticated, upgraded WebSocket.
///
/// Registered in the service registry from just after the upgrade until the
/// first [`disconnect`] for its id.
pub(crate) struct Session {
    pub(crate) id: SessionId,
    pub(crate) path_class: PathClass,
    /// Linked child of the service root token; firing it terminates every
    /// loop bound to this session.
    pub(crate) cancel: CancellationToken,
    pub(crate) connected_at: Instant,
    sink: tokio::sync::Mutex<SplitSink<WebSocket, Message>>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        path_class: PathClass,
        sink: SplitSink<WebSocket, Message>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            path_class,
            cancel,
            connected_at: Instant::now(),
            sink: tokio::sync::Mutex::new(sink),
        }
    }

    /// Writes one complete text frame.
    pub(crate) async fn send_text(&self, payload: &str) -> Result<(), axum::Error> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(Utf8Bytes::from(payload))).await
    }

    /// Writes a close frame with the given status code.
    async fn send_close(&self, code: u16) -> Result<(), axum::Error> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Close(Some(CloseFrame {
            code,
            reason: Utf8Bytes::from_static(""),
        })))
        .await
    }
}

/// Removes `id` from the registry and issues a close frame to the peer.
///
/// Removal is atomic, so concurrent disconnects for the same id coalesce:
/// only the first caller sees the entry and acts. The entry comes out of the
/// registry before the close frame goes out, so the sender already treats
/// the session as gone while the close is in flight. The caller's own loop
/// is responsible for firing the session token afterwards.
pub(crate) async fn disconnect(inner: &ServiceInner, id: SessionId, code: u16) {
    let Some((_, session)) = inner.registry.remove(&id) else {
        return;
    };

    if let Err(e) = session.send_close(code).await {
        debug!(session_id = %id, error = %e, "close frame not delivered");
    }

    info!(
        session_id = %id,
        code,
        uptime_ms = session.connected_at.elapsed().as_millis() as u64,
        "session disconnected"
    );
}

/// Frame-reading loop for `api` and `universal` sessions.
///
/// Complete text messages are published to the bound inbound handler in
/// per-session FIFO order. A peer close or cancellation disconnects with
/// `1000`; a read error disconnects with `1011`.
pub(crate) async fn run_receive_loop(
    inner: Arc<ServiceInner>,
    session: Arc<Session>,
    mut stream: SplitStream<WebSocket>,
) {
    loop {
        tokio::select! {
            () = session.cancel.cancelled() => {
                disconnect(&inner, session.id, close_code::NORMAL).await;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(
                        session_id = %session.id,
                        payload = %truncate_payload(text.as_str()),
                        "message received"
                    );
                    let handler = inner.handler.read().clone();
                    if let Some(handler) = handler {
                        handler.on_message(session.id, text.as_str()).await;
                    } else {
                        debug!(session_id = %session.id, "no inbound handler bound, dropping message");
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    disconnect(&inner, session.id, close_code::NORMAL).await;
                    break;
                }
                // pings and pongs are answered by the protocol layer;
                // binary frames have no meaning on this surface
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %session.id, error = %e, "receive failed");
                    disconnect(&inner, session.id, close_code::ERROR).await;
                    break;
                }
            }
        }
    }

    session.cancel.cancel();
}

/// Frame-draining loop for `event`-only sessions.
///
/// The peer is not expected to send anything; frames are read solely to
/// detect the close frame. Everything else is discarded.
pub(crate) async fn run_close_wait_loop(
    inner: Arc<ServiceInner>,
    session: Arc<Session>,
    mut stream: SplitStream<WebSocket>,
) {
    loop {
        tokio::select! {
            () = session.cancel.cancelled() => {
                disconnect(&inner, session.id, close_code::NORMAL).await;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) | None => {
                    disconnect(&inner, session.id, close_code::NORMAL).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %session.id, error = %e, "receive failed");
                    disconnect(&inner, session.id, close_code::ERROR).await;
                    break;
                }
            }
        }
    }

    session.cancel.cancel();
}

/// Heartbeat loop for every session class that receives pushes.
///
/// Emits lifecycle-connect once, then a heartbeat every
/// `heartbeat_interval_ms`. The period runs start-of-send to start-of-send:
/// each sleep is shortened by the previous send's serialize-and-write cost,
/// clamped at zero, so the phase stays aligned with real time. A failed send
/// kills the session; the loop never restarts itself.
pub(crate) async fn run_heartbeat_loop(inner: Arc<ServiceInner>, session: Arc<Session>) {
    let interval = Duration::from_millis(inner.config.heartbeat_interval_ms);

    let connect = LifecycleMeta::connect(inner.bot.uin());
    if let Err(e) = inner.send_json(&connect, Some(session.id)).await {
        warn!(session_id = %session.id, error = %e, "lifecycle send failed");
        disconnect(&inner, session.id, close_code::ERROR).await;
        session.cancel.cancel();
        return;
    }
    debug!(
        session_id = %session.id,
        interval_ms = interval.as_millis() as u64,
        "heartbeat loop started"
    );

    let mut send_cost = Duration::ZERO;
    loop {
        let delay = interval.saturating_sub(send_cost);
        tokio::select! {
            () = session.cancel.cancelled() => {
                disconnect(&inner, session.id, close_code::NORMAL).await;
                break;
            }
            () = tokio::time::sleep(delay) => {}
        }

        let started = Instant::now();
        let beat = HeartbeatMeta::new(
            inner.bot.uin(),
            BotStatus::new(inner.bot.is_online()),
            interval.as_millis() as i64,
        );
        if let Err(e) = inner.send_json(&beat, Some(session.id)).await {
            warn!(session_id = %session.id, error = %e, "heartbeat send failed");
            disconnect(&inner, session.id, close_code::ERROR).await;
            break;
        }
        send_cost = started.elapsed();
    }

    session.cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_classification() {
        assert_eq!(PathClass::from_path("/api"), PathClass::Api);
        assert_eq!(PathClass::from_path("/api/"), PathClass::Api);
        assert_eq!(PathClass::from_path("/event"), PathClass::Event);
        assert_eq!(PathClass::from_path("/event/"), PathClass::Event);
        assert_eq!(PathClass::from_path("/"), PathClass::Universal);
        assert_eq!(PathClass::from_path("/universal"), PathClass::Universal);
        assert_eq!(PathClass::from_path("/api/v2"), PathClass::Universal);
        assert_eq!(PathClass::from_path("/anything/else"), PathClass::Universal);
    }

    #[test]
    fn only_api_is_excluded_from_pushes() {
        assert!(!PathClass::Api.receives_push());
        assert!(PathClass::Event.receives_push());
        assert!(PathClass::Universal.receives_push());
    }

    #[test]
    fn path_class_display() {
        assert_eq!(PathClass::Api.to_string(), "api");
        assert_eq!(PathClass::Event.to_string(), "event");
        assert_eq!(PathClass::Universal.to_string(), "universal");
    }
}
