//! Main sync server facade.

use crate::auth::{AuthConfig, TokenValidator};
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::room::Room;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quaydb_store::{ContentStore, MemoryContentStore, MemoryMetaStore, MetaStore};
use quaydb_sync_protocol::{ErrorCode, Health, Message, ProtocolError};
use std::sync::Arc;
use tracing::warn;

/// The sync server.
///
/// Bundles the dispatcher, the connection room, and the raw byte
/// endpoints that sit beside the control channel. Process wiring
/// (HTTP framework, routing, CORS) stays outside; an embedding layer
/// maps request bodies onto [`SyncServer::handle_body`] and the raw
/// content/health handlers.
///
/// # Example
///
/// ```
/// use quaydb_sync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let reply = server.handle_body(br#"{"type": "capability-query", "tid": "t1"}"#, None);
/// assert!(!reply.is_empty());
/// ```
pub struct SyncServer {
    config: ServerConfig,
    dispatcher: Dispatcher,
    content: Arc<dyn ContentStore>,
    validator: Option<TokenValidator>,
}

impl SyncServer {
    /// Creates a server over fresh in-memory stores.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryMetaStore::new()),
        )
    }

    /// Creates a server over existing stores (dependency injection).
    pub fn with_stores(
        config: ServerConfig,
        content: Arc<dyn ContentStore>,
        meta: Arc<dyn MetaStore>,
    ) -> Self {
        let validator = config
            .auth_secret
            .clone()
            .map(|secret| TokenValidator::new(AuthConfig::new(secret)));
        let room = Arc::new(Room::new());
        let dispatcher = Dispatcher::new(
            config.clone(),
            Arc::clone(&content),
            meta,
            Arc::clone(&room),
        );
        Self {
            config,
            dispatcher,
            content,
            validator,
        }
    }

    /// The connection registry, for transports that attach push channels.
    pub fn room(&self) -> &Arc<Room> {
        self.dispatcher.room()
    }

    /// Handles one typed control message.
    pub fn handle_message(&self, request: Message) -> Message {
        self.dispatcher.handle(request)
    }

    /// Handles a raw control body: decode, dispatch, encode.
    ///
    /// Never fails: malformed bodies yield an encoded error reply, and
    /// an unauthorized request is answered before any decoding of the
    /// payload semantics.
    pub fn handle_body(&self, body: &[u8], bearer: Option<&str>) -> Vec<u8> {
        let reply = match self.check_auth(bearer) {
            Ok(()) => match Message::decode(body) {
                Ok(request) => self.dispatcher.handle(request),
                Err(ProtocolError::UnknownType(tag)) => {
                    warn!(tag, "unknown message type");
                    Message::error("-", ErrorCode::BadRequest, format!("unknown type: {tag}"))
                }
                Err(e) => Message::error("-", ErrorCode::BadRequest, e.to_string()),
            },
            Err(e) => Message::error("-", e.error_code(), e.wire_message()),
        };
        reply.encode().unwrap_or_else(|_| {
            // A reply we built ourselves always encodes; this is the
            // last-resort body if that ever changes.
            br#"{"type":"error","tid":"-","code":"internal","message":"internal error"}"#.to_vec()
        })
    }

    /// Checks the bearer credential against the configured policy.
    pub fn check_auth(&self, bearer: Option<&str>) -> ServerResult<()> {
        if !self.config.require_auth {
            return Ok(());
        }
        let Some(validator) = &self.validator else {
            return Err(ServerError::Internal("auth enabled without secret".into()));
        };
        let bearer =
            bearer.ok_or_else(|| ServerError::AuthenticationFailed("missing token".into()))?;
        let token = BASE64
            .decode(bearer)
            .map_err(|_| ServerError::AuthenticationFailed("undecodable token".into()))?;
        validator.validate_token(&token, &self.config.default_pointer)
    }

    /// Issues a bearer credential for the configured subject. Only
    /// available when auth is enabled.
    pub fn issue_token(&self) -> ServerResult<String> {
        let validator = self
            .validator
            .as_ref()
            .ok_or_else(|| ServerError::Internal("auth not enabled".into()))?;
        let token = validator.create_token(&self.config.default_pointer)?;
        Ok(BASE64.encode(token))
    }

    /// Raw content upload (second phase of `put-content`).
    pub fn handle_content_upload(&self, key: &str, bytes: &[u8]) -> ServerResult<()> {
        self.content.put(key, bytes)?;
        Ok(())
    }

    /// Raw content download. 404-equivalent if the key is absent.
    pub fn handle_content_download(&self, key: &str) -> ServerResult<Vec<u8>> {
        Ok(self.content.get(key)?)
    }

    /// Raw content delete; idempotent.
    pub fn handle_content_delete(&self, key: &str) -> ServerResult<()> {
        self.content.delete(key)?;
        Ok(())
    }

    /// Health probe body.
    pub fn handle_health(&self) -> Health {
        Health::ok()
    }
}
