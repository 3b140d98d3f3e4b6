//! # QuayDB Sync Server
//!
//! Server side of the QuayDB sync core: a message dispatcher that
//! routes typed control messages to injected content/meta stores.
//!
//! This crate provides:
//! - Typed request dispatch with a total reply guarantee (every
//!   request gets exactly one answer; handler failures become error
//!   replies, never a wedged connection)
//! - Two-phase content transfer (control messages negotiate locations;
//!   bytes move in plain octet exchanges)
//! - A connection room for the optional push channel (`open-session`,
//!   `bind-get-meta`, `meta-event` frames)
//! - Bearer token authentication (HMAC-SHA256, optional)
//!
//! # Architecture
//!
//! Stores are passed in at construction, so independent server
//! instances with independent storage can coexist (and tests get a
//! fresh world each). The dispatcher itself is synchronous: one
//! request is handled to completion per call, matching the protocol's
//! cooperative scheduling model. Subscription delivery runs on
//! bounded per-subscriber queues off the dispatch path.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod dispatcher;
mod error;
mod room;
mod server;

pub use auth::{AuthConfig, SimpleTokenValidator, TokenValidator};
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use error::{ServerError, ServerResult};
pub use room::Room;
pub use server::SyncServer;
