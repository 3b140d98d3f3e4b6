//! Request dispatcher: routes typed messages to store operations.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::room::Room;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quaydb_store::{escape_key, ContentStore, MetaStore};
use quaydb_sync_protocol::{Message, SessionId, PROTOCOL_VERSION};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Routes control messages to the injected stores.
///
/// The stores are passed in at construction (no global state), so
/// multiple independent dispatcher instances can coexist, each with its
/// own storage. `handle` is total: every request produces exactly one
/// reply, and a failing handler yields an error reply instead of
/// tearing down the dispatcher.
pub struct Dispatcher {
    config: ServerConfig,
    content: Arc<dyn ContentStore>,
    meta: Arc<dyn MetaStore>,
    room: Arc<Room>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given stores.
    pub fn new(
        config: ServerConfig,
        content: Arc<dyn ContentStore>,
        meta: Arc<dyn MetaStore>,
        room: Arc<Room>,
    ) -> Self {
        Self {
            config,
            content,
            meta,
            room,
        }
    }

    /// The connection registry backing the push channel.
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Handles one request and always produces a reply.
    pub fn handle(&self, request: Message) -> Message {
        let tid = request.tid().to_string();
        match self.route(request) {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_client_error() {
                    warn!(tid, "request rejected: {e}");
                } else {
                    error!(tid, "request failed: {e}");
                }
                Message::error(tid, e.error_code(), e.wire_message())
            }
        }
    }

    fn route(&self, request: Message) -> ServerResult<Message> {
        match request {
            Message::CapabilityQuery { tid } => Ok(Message::CapabilityDescriptor {
                tid,
                version: PROTOCOL_VERSION,
                store_kinds: vec!["content".into(), "meta".into()],
                content_endpoint: self.config.content_endpoint.clone(),
                encodings: vec!["json".into(), "octet-stream".into()],
                auth_required: self.config.require_auth,
            }),

            Message::OpenSession { tid } => Ok(Message::SessionDescriptor {
                tid,
                session: self.room.open_session(),
            }),

            Message::PutMeta {
                tid,
                pointer,
                records,
                session,
            } => self.put_meta(tid, &pointer, records, session),

            Message::GetMeta { tid, pointer } => Ok(Message::MetaCollection {
                tid,
                records: self.meta.list_heads(&pointer)?,
                pointer,
            }),

            Message::DeleteMeta { tid, pointer, cids } => {
                match cids {
                    Some(cids) => self.meta.delete_entries(&pointer, &cids)?,
                    None => self.meta.delete_heads(&pointer)?,
                }
                Ok(Message::Ack { tid })
            }

            Message::PutContent { tid, key } => Ok(Message::UploadLocation {
                tid,
                location: self.content_location(&key),
                key,
            }),

            Message::GetContent { tid, key } => self.get_content(tid, key),

            Message::DeleteContent { tid, key } => {
                self.content.delete(&key)?;
                Ok(Message::Ack { tid })
            }

            Message::BindGetMeta {
                tid,
                pointer,
                session,
                self_reflect,
            } => self.bind_get_meta(tid, pointer, session, self_reflect),

            // Response-type frames are never valid requests
            other => Err(ServerError::InvalidRequest(format!(
                "unexpected message in request position: {}",
                other.type_name()
            ))),
        }
    }

    fn put_meta(
        &self,
        tid: String,
        pointer: &str,
        records: Vec<quaydb_sync_protocol::MetaRecord>,
        session: Option<SessionId>,
    ) -> ServerResult<Message> {
        if records.is_empty() {
            return Err(ServerError::InvalidRequest("no records".into()));
        }
        if records.len() > self.config.max_meta_batch {
            return Err(ServerError::InvalidRequest(format!(
                "too many records: {} > {}",
                records.len(),
                self.config.max_meta_batch
            )));
        }
        debug!(pointer, count = records.len(), "put-meta");
        self.meta.put_heads(pointer, records.clone())?;
        self.room.publish(pointer, &records, session.as_ref());
        Ok(Message::Ack { tid })
    }

    fn get_content(&self, tid: String, key: String) -> ServerResult<Message> {
        if !self.content.contains(&key)? {
            return Err(ServerError::NotFound(key));
        }
        let bytes = self.content.get(&key)?;
        if bytes.len() <= self.config.inline_content_max {
            Ok(Message::ContentReply {
                tid,
                key,
                location: None,
                bytes: Some(BASE64.encode(bytes)),
            })
        } else {
            Ok(Message::ContentReply {
                tid,
                location: Some(self.content_location(&key)),
                key,
                bytes: None,
            })
        }
    }

    fn bind_get_meta(
        &self,
        tid: String,
        pointer: String,
        session: SessionId,
        self_reflect: bool,
    ) -> ServerResult<Message> {
        if !self.room.bind(&session, &pointer, &tid, self_reflect) {
            return Err(ServerError::UnknownSession(session.req_id));
        }
        // Current frontier arrives as the first event frame
        let records = self.meta.list_heads(&pointer)?;
        if !records.is_empty() {
            self.room.deliver(
                &session,
                Message::MetaEvent {
                    tid: tid.clone(),
                    pointer,
                    records,
                },
            );
        }
        Ok(Message::Ack { tid })
    }

    fn content_location(&self, key: &str) -> String {
        format!("{}?key={}", self.config.content_endpoint, escape_key(key))
    }
}
