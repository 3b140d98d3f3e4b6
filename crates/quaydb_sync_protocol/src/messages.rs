//! Control messages for the sync wire.
//!
//! Every message is a JSON object `{type, tid, ...}`; a response echoes
//! the request `tid` for correlation. The set of shapes is closed: an
//! unrecognized `type` decodes to [`ProtocolError::UnknownType`], which
//! the dispatcher answers with a client error.
//!
//! Control messages never embed large binary payloads. Content moves in
//! a separate plain octet exchange; `put-content`/`get-content` only
//! negotiate a location (or inline a small payload, base64-encoded).

use crate::error::{ProtocolError, ProtocolResult};
use crate::MetaRecord;
use serde::{Deserialize, Serialize};

/// Current protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// A connection identifier pair allocated by `open-session`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    /// Request-channel identifier.
    pub req_id: String,
    /// Response-channel identifier.
    pub res_id: String,
}

/// Error classes carried by [`Message::ErrorReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Malformed or unknown request (HTTP 400 class).
    BadRequest,
    /// Missing or invalid credential (HTTP 401 class).
    Unauthorized,
    /// Requested key or pointer has no entry (HTTP 404 class).
    NotFound,
    /// Unexpected failure during handling (HTTP 500 class).
    Internal,
}

impl ErrorCode {
    /// The HTTP status this class maps to.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::Internal => 500,
        }
    }
}

/// A typed control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Asks the server to describe its capabilities.
    CapabilityQuery {
        /// Transaction id.
        tid: String,
    },
    /// Describes supported store kinds, endpoints, and auth rules.
    CapabilityDescriptor {
        /// Echoed transaction id.
        tid: String,
        /// Protocol version the server speaks.
        version: u16,
        /// Store kinds the server accepts ("content", "meta").
        store_kinds: Vec<String>,
        /// Path of the raw content endpoint.
        content_endpoint: String,
        /// Body encodings in use.
        encodings: Vec<String>,
        /// Whether requests must carry a bearer credential.
        auth_required: bool,
    },
    /// Opens a push-capable session.
    OpenSession {
        /// Transaction id.
        tid: String,
    },
    /// Carries the allocated connection id pair.
    SessionDescriptor {
        /// Echoed transaction id.
        tid: String,
        /// Allocated session.
        session: SessionId,
    },
    /// Persists meta entries for a pointer, pruning their parents.
    PutMeta {
        /// Transaction id.
        tid: String,
        /// Pointer name (e.g. "main").
        pointer: String,
        /// Entries to persist.
        records: Vec<MetaRecord>,
        /// Writer's session, for self-reflect suppression.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionId>,
    },
    /// Requests all live heads for a pointer.
    GetMeta {
        /// Transaction id.
        tid: String,
        /// Pointer name.
        pointer: String,
    },
    /// The live heads for a pointer.
    MetaCollection {
        /// Echoed transaction id.
        tid: String,
        /// Pointer name.
        pointer: String,
        /// Live heads; order carries no causal meaning.
        records: Vec<MetaRecord>,
    },
    /// Removes meta entries, by explicit cids or whole pointer.
    DeleteMeta {
        /// Transaction id.
        tid: String,
        /// Pointer name.
        pointer: String,
        /// Specific entries to remove; `None` removes all heads.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cids: Option<Vec<String>>,
    },
    /// First phase of a content upload: requests a push location.
    PutContent {
        /// Transaction id.
        tid: String,
        /// Content key.
        key: String,
    },
    /// Location the caller pushes bytes to in a plain octet exchange.
    UploadLocation {
        /// Echoed transaction id.
        tid: String,
        /// Content key.
        key: String,
        /// Upload URL.
        location: String,
    },
    /// Requests content by key.
    GetContent {
        /// Transaction id.
        tid: String,
        /// Content key.
        key: String,
    },
    /// Bytes-or-location reply for a content key.
    ContentReply {
        /// Echoed transaction id.
        tid: String,
        /// Content key.
        key: String,
        /// Download URL when the payload is not inlined.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        /// Base64 payload when small enough to inline.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<String>,
    },
    /// Removes a content entry; idempotent.
    DeleteContent {
        /// Transaction id.
        tid: String,
        /// Content key.
        key: String,
    },
    /// Streaming variant of `get-meta`: registers pointer interest on a
    /// push-capable session; results arrive as `meta-event` frames.
    BindGetMeta {
        /// Transaction id.
        tid: String,
        /// Pointer name.
        pointer: String,
        /// Session to deliver events on.
        session: SessionId,
        /// Whether the session wants to see its own writes echoed.
        #[serde(default)]
        self_reflect: bool,
    },
    /// Asynchronous meta head notification.
    MetaEvent {
        /// Transaction id of the originating bind.
        tid: String,
        /// Pointer name.
        pointer: String,
        /// New live heads.
        records: Vec<MetaRecord>,
    },
    /// Positive acknowledgement with no payload.
    Ack {
        /// Echoed transaction id.
        tid: String,
    },
    /// Error reply; the dispatcher stays usable afterwards.
    #[serde(rename = "error")]
    ErrorReply {
        /// Echoed transaction id ("-" when the request had none).
        tid: String,
        /// Error class.
        code: ErrorCode,
        /// Human-readable description; never internal state.
        message: String,
    },
}

impl Message {
    /// The transaction id carried by this message.
    pub fn tid(&self) -> &str {
        match self {
            Message::CapabilityQuery { tid }
            | Message::CapabilityDescriptor { tid, .. }
            | Message::OpenSession { tid }
            | Message::SessionDescriptor { tid, .. }
            | Message::PutMeta { tid, .. }
            | Message::GetMeta { tid, .. }
            | Message::MetaCollection { tid, .. }
            | Message::DeleteMeta { tid, .. }
            | Message::PutContent { tid, .. }
            | Message::UploadLocation { tid, .. }
            | Message::GetContent { tid, .. }
            | Message::ContentReply { tid, .. }
            | Message::DeleteContent { tid, .. }
            | Message::BindGetMeta { tid, .. }
            | Message::MetaEvent { tid, .. }
            | Message::Ack { tid }
            | Message::ErrorReply { tid, .. } => tid,
        }
    }

    /// The wire name of this message's type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::CapabilityQuery { .. } => "capability-query",
            Message::CapabilityDescriptor { .. } => "capability-descriptor",
            Message::OpenSession { .. } => "open-session",
            Message::SessionDescriptor { .. } => "session-descriptor",
            Message::PutMeta { .. } => "put-meta",
            Message::GetMeta { .. } => "get-meta",
            Message::MetaCollection { .. } => "meta-collection",
            Message::DeleteMeta { .. } => "delete-meta",
            Message::PutContent { .. } => "put-content",
            Message::UploadLocation { .. } => "upload-location",
            Message::GetContent { .. } => "get-content",
            Message::ContentReply { .. } => "content-reply",
            Message::DeleteContent { .. } => "delete-content",
            Message::BindGetMeta { .. } => "bind-get-meta",
            Message::MetaEvent { .. } => "meta-event",
            Message::Ack { .. } => "ack",
            Message::ErrorReply { .. } => "error",
        }
    }

    /// Encodes the message as a JSON body.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Decodes a JSON body into a message.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownType`] when `type` names no known shape;
    /// [`ProtocolError::Malformed`] for anything else.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ProtocolError::Malformed("missing type tag".into()))?
            .to_string();
        serde_json::from_value(value).map_err(|e| {
            if e.to_string().contains("unknown variant") {
                ProtocolError::UnknownType(tag)
            } else {
                ProtocolError::Malformed(e.to_string())
            }
        })
    }

    /// Builds an error reply echoing `tid`.
    pub fn error(tid: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Message::ErrorReply {
            tid: tid.into(),
            code,
            message: message.into(),
        }
    }
}
