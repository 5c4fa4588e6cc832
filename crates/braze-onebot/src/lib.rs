//! # Braze OneBot
//!
//! The OneBot v11 surface of the braze connector.
//!
//! This crate bridges the in-memory bot model of [`braze_core`] to the JSON
//! interface consumed by third-party bot frameworks. Its centrepiece is the
//! [forward WebSocket service](service::ForwardWsService): a long-running
//! server that multiplexes authenticated WebSocket sessions, pushes meta
//! events and broadcasts to them, and feeds inbound action frames to a
//! pluggable [`InboundHandler`].
//!
//! ## Endpoints
//!
//! | Path        | Class       | Traffic                                  |
//! |-------------|-------------|------------------------------------------|
//! | `/api`      | `api`       | request/response only                    |
//! | `/event`    | `event`     | events + heartbeats, server-to-client    |
//! | anything else | `universal` | both directions, events and heartbeats |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use braze_core::BotContext;
//! use braze_onebot::{ActionRouter, ForwardConfig, ForwardWsService};
//!
//! let bot = Arc::new(BotContext::new(123456789));
//! let service = ForwardWsService::new(ForwardConfig::default(), bot);
//! service.bind_handler(Arc::new(ActionRouter::new(service.sender())));
//! let addr = service.start().await?;
//! ```

pub mod config;
pub mod dispatch;
pub mod model;
pub mod service;

pub use config::ForwardConfig;
pub use dispatch::{ActionRouter, InboundHandler};
pub use model::{ApiResponse, BotStatus, HeartbeatMeta, LifecycleMeta};
pub use service::{ForwardSender, ForwardWsService, PathClass, SessionId};
