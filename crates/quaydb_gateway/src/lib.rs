//! # QuayDB Gateway
//!
//! Client side of the QuayDB sync core: a uniform store interface
//! (put/get/delete/subscribe) over a remote endpoint.
//!
//! This crate provides:
//! - [`Gateway`], the sync adapter that speaks typed JSON control
//!   messages and moves content bytes in separate octet exchanges
//! - The [`HttpClient`] transport seam, with [`LoopbackClient`] for
//!   in-process testing against a real server
//! - Reserved URL parameter handling (`store`, `key`, `meta`, `v`,
//!   `self_reflect`) and the strip-for-stable-key rule
//! - A [`SubscriptionFeed`] for push-capable transports, with bounded
//!   per-subscriber queues
//!
//! # Architecture
//!
//! The gateway is transport-agnostic: anything implementing
//! [`HttpClient`] can carry it. Every operation returns a
//! [`GatewayResult`]; transport exceptions are converted at the
//! boundary so callers never see them raw. The gateway never retries
//! on its own.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod gateway;
mod http;
mod params;
mod subscribe;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{Envelope, Fetched, Gateway, MetaHead};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer};
pub use params::{strip_reserved, StoreKind, SyncParams, RESERVED_PARAMS};
pub use subscribe::{MetaChange, Subscription, SubscriptionFeed};
