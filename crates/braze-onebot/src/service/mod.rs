//! Forward WebSocket service.
//!
//! A long-running server exposing the OneBot v11 interface to external bot
//! clients. Every accepted connection becomes a session with its own
//! cancellation scope linked to the service root; the service brokers JSON
//! traffic between those sessions and the shared [`BotContext`].
//!
//! ## Lifecycle
//!
//! [`ForwardWsService::start`] binds the listener and spawns the accept
//! loop; [`ForwardWsService::stop`] cancels the root token, which pulls down
//! the accept loop and every session's loops through the linked tokens.
//! An accept-loop failure that is not a shutdown is logged and terminates
//! the loop; the service does not self-heal from listener death.
//!
//! ## Send path
//!
//! All outbound writes across all sessions go through one service-wide
//! mutex, held for the duration of a single frame's serialize-and-write.
//! WebSocket writes may not interleave on one socket; one permit over all
//! of them also gives broadcasts a total order.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
};
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use braze_core::{BotContext, ServiceError};

use crate::config::ForwardConfig;
use crate::dispatch::InboundHandler;

mod auth;
mod session;

pub use session::{PathClass, SessionId};

use auth::validate_access_token;
use session::{Session, run_close_wait_loop, run_heartbeat_loop, run_receive_loop};

/// Trace logs cut payloads beyond this many bytes.
const TRACE_PAYLOAD_LIMIT: usize = 1024;

/// State shared between the accept loop, the session loops, and senders.
pub(crate) struct ServiceInner {
    pub(crate) config: ForwardConfig,
    pub(crate) bot: Arc<BotContext>,
    /// Active sessions. A session is present here iff its socket has not yet
    /// been closed from the server side.
    pub(crate) registry: DashMap<SessionId, Arc<Session>>,
    /// Single permit serializing every outbound write across all sessions.
    send_lock: tokio::sync::Mutex<()>,
    /// Service root token; each session holds a linked child.
    pub(crate) shutdown: CancellationToken,
    /// Receiver for inbound text messages, bound by the downstream router.
    pub(crate) handler: RwLock<Option<Arc<dyn InboundHandler>>>,
}

impl ServiceInner {
    /// Sends a pre-serialized payload to one session.
    ///
    /// Targets no longer in the registry are silently skipped; the write
    /// itself completing (or failing) is what the returned result reports.
    pub(crate) async fn send_payload(&self, payload: &str, id: SessionId) -> anyhow::Result<()> {
        let _permit = self.send_lock.lock().await;

        let Some(target) = self.registry.get(&id).map(|entry| Arc::clone(entry.value())) else {
            debug!(session_id = %id, "send target no longer registered");
            return Ok(());
        };

        target
            .send_text(payload)
            .await
            .with_context(|| format!("send to session {id}"))?;

        trace!(session_id = %id, payload = %truncate_payload(payload), "message sent");
        Ok(())
    }

    /// Serializes `value` once and sends it to `target`, or fans it out to
    /// every push-receiving session when `target` is `None`.
    pub(crate) async fn send_json<T: Serialize>(
        &self,
        value: &T,
        target: Option<SessionId>,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(value)?;

        match target {
            Some(id) => self.send_payload(&payload, id).await,
            None => {
                let targets: Vec<SessionId> = self
                    .registry
                    .iter()
                    .filter(|entry| entry.value().path_class.receives_push())
                    .map(|entry| *entry.key())
                    .collect();

                let sends = targets
                    .into_iter()
                    .map(|id| self.send_payload(&payload, id));
                futures::future::join_all(sends)
                    .await
                    .into_iter()
                    .collect()
            }
        }
    }
}

/// The forward WebSocket service.
///
/// See the [module docs](self) for lifecycle and send-path semantics.
pub struct ForwardWsService {
    inner: Arc<ServiceInner>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl ForwardWsService {
    /// Creates a stopped service over `bot`.
    pub fn new(config: ForwardConfig, bot: Arc<BotContext>) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                config,
                bot,
                registry: DashMap::new(),
                send_lock: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
                handler: RwLock::new(None),
            }),
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Binds the receiver for inbound text messages.
    ///
    /// Messages arriving while no handler is bound are logged and dropped.
    pub fn bind_handler(&self, handler: Arc<dyn InboundHandler>) {
        *self.inner.handler.write() = Some(handler);
    }

    /// Returns a cheap cloneable handle for sending to sessions.
    pub fn sender(&self) -> ForwardSender {
        ForwardSender {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Binds the listener and spawns the accept loop.
    ///
    /// Returns the actual bound address (port 0 resolves to an ephemeral
    /// port).
    pub async fn start(&self) -> Result<SocketAddr, ServiceError> {
        if self.inner.config.heartbeat_interval_ms == 0 {
            return Err(ServiceError::InvalidConfig(
                "heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if self.accept_task.lock().is_some() {
            return Err(ServiceError::AlreadyStarted);
        }

        let addr = self.inner.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| ServiceError::Bind { addr, source })?;

        info!(addr = %local, "forward websocket service listening");

        let inner = Arc::clone(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let handle = tokio::spawn(async move {
            let router = build_router(inner);
            let server = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            );

            tokio::select! {
                result = server => {
                    // the service does not self-heal from listener death;
                    // the supervisor restarts it
                    if let Err(e) = result {
                        error!(error = %e, "accept loop terminated");
                    }
                }
                () = shutdown.cancelled() => {
                    info!("forward websocket service shutting down");
                }
            }
        });

        *self.accept_task.lock() = Some(handle);
        *self.local_addr.lock() = Some(local);
        Ok(local)
    }

    /// Stops the service.
    ///
    /// Signals the root token, awaits the accept loop's orderly exit, then
    /// drops the listener. Sessions tear themselves down through their
    /// linked tokens, each closing with `1000 NormalClosure`.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();

        let task = self.accept_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                debug!(error = %e, "accept loop join failed");
            }
        }

        info!("forward websocket service stopped");
    }
}

/// Cloneable sending handle, detached from the service's lifecycle methods.
#[derive(Clone)]
pub struct ForwardSender {
    inner: Arc<ServiceInner>,
}

impl ForwardSender {
    /// Serializes `value` once and sends it to `target`, or broadcasts it to
    /// every non-`api` session when `target` is `None`.
    ///
    /// Returns after the underlying write(s) complete; a send to an id that
    /// is no longer registered is not an error.
    pub async fn send_json<T: Serialize>(
        &self,
        value: &T,
        target: Option<SessionId>,
    ) -> anyhow::Result<()> {
        self.inner.send_json(value, target).await
    }

    /// Sends a pre-serialized payload to one session.
    pub async fn send_text(&self, payload: &str, id: SessionId) -> anyhow::Result<()> {
        self.inner.send_payload(payload, id).await
    }
}

fn build_router(inner: Arc<ServiceInner>) -> Router {
    // every path is served: /api and /event by class, anything else as
    // universal
    Router::new()
        .route("/", any(accept_connection))
        .route("/{*path}", any(accept_connection))
        .with_state(inner)
}

/// Axum handler for one incoming HTTP exchange.
///
/// Allocates the session id, authenticates, verifies the upgrade, classifies
/// the path, and hands the socket to [`handle_session`]. Failures before the
/// upgrade leave no partial state behind.
async fn accept_connection(
    State(inner): State<Arc<ServiceInner>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, axum::extract::ws::rejection::WebSocketUpgradeRejection>,
) -> Response {
    let id: SessionId = Uuid::new_v4();

    if !validate_access_token(inner.config.access_token.as_deref(), &headers, uri.query()) {
        warn!(session_id = %id, remote_addr = %remote, "access token rejected");
        return StatusCode::FORBIDDEN.into_response();
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            warn!(
                session_id = %id,
                remote_addr = %remote,
                error = %rejection,
                "not a websocket upgrade"
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let path_class = PathClass::from_path(uri.path());
    debug!(
        session_id = %id,
        remote_addr = %remote,
        path = %uri.path(),
        class = %path_class,
        "upgrading connection"
    );

    upgrade.on_upgrade(move |socket| handle_session(inner, socket, id, path_class))
}

/// Registers the session and runs its task set until teardown.
async fn handle_session(
    inner: Arc<ServiceInner>,
    socket: WebSocket,
    id: SessionId,
    path_class: PathClass,
) {
    let cancel = inner.shutdown.child_token();
    let (sink, stream) = socket.split();
    let session = Arc::new(Session::new(id, path_class, sink, cancel));

    inner.registry.insert(id, Arc::clone(&session));
    info!(session_id = %id, class = %path_class, "session connected");

    if path_class.receives_push() {
        tokio::spawn(run_heartbeat_loop(Arc::clone(&inner), Arc::clone(&session)));
    }

    match path_class {
        PathClass::Event => run_close_wait_loop(inner, session, stream).await,
        _ => run_receive_loop(inner, session, stream).await,
    }
}

/// Caps a payload for trace logging, appending the full byte length when
/// cut.
pub(crate) fn truncate_payload(payload: &str) -> Cow<'_, str> {
    if payload.len() <= TRACE_PAYLOAD_LIMIT {
        return Cow::Borrowed(payload);
    }

    let mut cut = TRACE_PAYLOAD_LIMIT;
    while !payload.is_char_boundary(cut) {
        cut -= 1;
    }
    Cow::Owned(format!("{}...{} bytes", &payload[..cut], payload.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service(heartbeat_interval_ms: u64) -> ForwardWsService {
        let config = ForwardConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            access_token: None,
            heartbeat_interval_ms,
        };
        ForwardWsService::new(config, Arc::new(BotContext::new(42)))
    }

    #[test]
    fn short_payloads_pass_through() {
        assert_eq!(truncate_payload("hello"), "hello");
        let exactly = "x".repeat(TRACE_PAYLOAD_LIMIT);
        assert_eq!(truncate_payload(&exactly), exactly.as_str());
    }

    #[test]
    fn long_payloads_are_cut_with_byte_count() {
        let payload = "y".repeat(TRACE_PAYLOAD_LIMIT + 500);
        let truncated = truncate_payload(&payload);
        assert!(truncated.starts_with(&"y".repeat(TRACE_PAYLOAD_LIMIT)));
        assert!(truncated.ends_with("...1524 bytes"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 3-byte characters put the limit mid-character
        let payload = "日".repeat(500);
        assert!(!payload.is_char_boundary(TRACE_PAYLOAD_LIMIT));
        let truncated = truncate_payload(&payload);
        assert!(truncated.ends_with("...1500 bytes"));
    }

    #[tokio::test]
    async fn zero_heartbeat_interval_is_rejected() {
        let service = test_service(0);
        let result = service.start().await;
        assert!(matches!(result, Err(ServiceError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let service = test_service(5000);
        service.start().await.unwrap();
        assert!(matches!(
            service.start().await,
            Err(ServiceError::AlreadyStarted)
        ));
        service.stop().await;
    }

    #[tokio::test]
    async fn start_reports_ephemeral_port() {
        let service = test_service(5000);
        let addr = service.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(service.local_addr(), Some(addr));
        assert_eq!(service.session_count(), 0);
        service.stop().await;
    }

    #[tokio::test]
    async fn send_to_unknown_session_is_silent() {
        let service = test_service(5000);
        service.start().await.unwrap();
        let sender = service.sender();
        sender
            .send_text("{}", Uuid::new_v4())
            .await
            .expect("missing target must not be an error");
        service.stop().await;
    }
}
