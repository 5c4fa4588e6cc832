//! Inbound message dispatch.
//!
//! The forward service treats inbound text as opaque and hands it to an
//! [`InboundHandler`]. [`ActionRouter`] is the downstream binding: it peels
//! the OneBot action envelope off each frame and answers on the session the
//! request arrived on. Individual action implementations mount here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{ApiResponse, RETCODE_UNSUPPORTED_ACTION};
use crate::service::{ForwardSender, SessionId};

/// Receiver for inbound text messages published by the forward service.
///
/// Called in per-session FIFO order; implementations should not block for
/// long, as delivery for that session waits on them.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn on_message(&self, session_id: SessionId, text: &str);
}

/// The OneBot action envelope: `{"action": ..., "params": ..., "echo": ...}`.
#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    action: String,
    #[serde(default)]
    #[allow(dead_code)]
    params: Value,
    #[serde(default)]
    echo: Option<Value>,
}

/// Routes inbound action frames and answers them over the sender.
///
/// No actions are mounted yet, so every well-formed request is answered with
/// a `failed` response carrying [`RETCODE_UNSUPPORTED_ACTION`]; malformed
/// frames are logged and dropped.
pub struct ActionRouter {
    sender: ForwardSender,
}

impl ActionRouter {
    pub fn new(sender: ForwardSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl InboundHandler for ActionRouter {
    async fn on_message(&self, session_id: SessionId, text: &str) {
        let envelope: ActionEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "malformed action frame");
                return;
            }
        };

        info!(session_id = %session_id, action = %envelope.action, "action requested");

        let response = ApiResponse::failed(RETCODE_UNSUPPORTED_ACTION, envelope.echo);
        if let Err(e) = self.sender.send_json(&response, Some(session_id)).await {
            warn!(session_id = %session_id, error = %e, "failed to answer action");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_with_and_without_echo() {
        let envelope: ActionEnvelope =
            serde_json::from_str(r#"{"action":"get_login_info","echo":"e7"}"#).unwrap();
        assert_eq!(envelope.action, "get_login_info");
        assert_eq!(envelope.echo, Some(Value::String("e7".to_string())));

        let envelope: ActionEnvelope =
            serde_json::from_str(r#"{"action":"get_login_info","params":{}}"#).unwrap();
        assert!(envelope.echo.is_none());
    }

    #[test]
    fn envelope_requires_action() {
        let result: Result<ActionEnvelope, _> = serde_json::from_str(r#"{"echo":1}"#);
        assert!(result.is_err());
    }
}
