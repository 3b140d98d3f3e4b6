//! # QuayDB Sync Protocol
//!
//! Wire types for the QuayDB sync core: a closed tagged union of JSON
//! control messages (`{type, tid, ...}`), the `{cid, data, parents}`
//! meta record shape, and the health probe body.
//!
//! Control and content channels are separate by design: control bodies
//! stay small because content moves via negotiated locations in plain
//! octet exchanges (two-phase transfer).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod health;
mod messages;

/// The wire shape of one meta entry is identical to the store's.
pub use quaydb_store::MetaEntry as MetaRecord;

pub use error::{ProtocolError, ProtocolResult};
pub use health::Health;
pub use messages::{ErrorCode, Message, SessionId, PROTOCOL_VERSION};
