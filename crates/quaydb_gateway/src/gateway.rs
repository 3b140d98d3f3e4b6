//! The gateway: a uniform remote store interface.
//!
//! Presents put/get/delete/subscribe over both store kinds, backed by
//! a remote endpoint. Control messages travel as JSON POSTs; content
//! bytes move in separate plain octet exchanges negotiated through the
//! two-phase transfer (`put-content`/`get-content` return locations).

use crate::error::{GatewayError, GatewayResult};
use crate::http::{HttpClient, HttpMethod, HttpRequest};
use crate::params::{strip_reserved, StoreKind, SyncParams};
use crate::subscribe::{MetaChange, Subscription, SubscriptionFeed};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quaydb_store::content_id;
use quaydb_sync_protocol::{ErrorCode, Message, MetaRecord};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Path of the control message endpoint, relative to the base URL.
const MESSAGE_ENDPOINT: &str = "/message";

/// What a caller hands to `put`.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The payload to store. For content, its serialized bytes are
    /// uploaded; for meta, it becomes the entry's `data`.
    pub payload: serde_json::Value,
    /// Entry id; derived from the serialized payload when absent.
    pub cid: Option<String>,
    /// Heads this write supersedes (meta only).
    pub parents: Vec<String>,
}

impl Envelope {
    /// Wraps a payload with no explicit id or parents.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            cid: None,
            parents: Vec::new(),
        }
    }

    /// Sets the entry id.
    pub fn with_cid(mut self, cid: impl Into<String>) -> Self {
        self.cid = Some(cid.into());
        self
    }

    /// Sets the superseded parents.
    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }
}

/// A meta entry as callers consume it: the causal metadata wrapped
/// around the content description.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaHead {
    /// Event identifier (the entry's cid).
    pub event_id: String,
    /// Heads this entry superseded.
    pub parents: Vec<String>,
    /// Description of the referenced content.
    pub content: serde_json::Value,
}

impl From<MetaRecord> for MetaHead {
    fn from(record: MetaRecord) -> Self {
        Self {
            event_id: record.cid,
            parents: record.parents,
            content: record.data,
        }
    }
}

/// Result of a `get` across both store kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Content bytes.
    Content(Vec<u8>),
    /// Live meta heads.
    Meta(Vec<MetaHead>),
}

/// Client-side sync adapter over a remote endpoint.
pub struct Gateway<C: HttpClient> {
    base_url: String,
    token: Option<String>,
    client: C,
    feed: Arc<SubscriptionFeed>,
}

impl<C: HttpClient> Gateway<C> {
    /// Creates a gateway against `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            client,
            feed: Arc::new(SubscriptionFeed::new()),
        }
    }

    /// Attaches a bearer credential sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The remote base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stores an envelope remotely.
    ///
    /// Content: two-phase upload - a control message negotiates the
    /// location, then the serialized payload moves as plain octets.
    /// Meta: a `{cid, data, parents}` record is posted for the URL's
    /// pointer name; the cid defaults to the content id of the
    /// serialized payload.
    pub fn put(&self, kind: StoreKind, url: &str, envelope: Envelope) -> GatewayResult<()> {
        match kind {
            StoreKind::Content => self.put_content(url, &envelope),
            StoreKind::Meta => self.put_meta(url, envelope),
        }
    }

    /// Fetches content bytes or live meta heads for a URL.
    pub fn get(&self, kind: StoreKind, url: &str) -> GatewayResult<Fetched> {
        match kind {
            StoreKind::Content => self.get_content(url).map(Fetched::Content),
            StoreKind::Meta => self.get_meta(url).map(Fetched::Meta),
        }
    }

    /// Deletes the entry a URL addresses. Best effort: a remote 404 is
    /// already the desired state and reports success.
    pub fn delete(&self, kind: StoreKind, url: &str) -> GatewayResult<()> {
        let tid = new_tid();
        let request = match kind {
            StoreKind::Content => Message::DeleteContent {
                tid,
                key: self.content_key(url),
            },
            StoreKind::Meta => Message::DeleteMeta {
                tid,
                pointer: self.pointer_name(url),
                cids: None,
            },
        };
        match self.send_control(&request) {
            Ok(Message::Ack { .. }) => Ok(()),
            Ok(other) => Err(unexpected_reply(&other)),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Registers for asynchronous notification of new heads on the
    /// URL's pointer. Returns the unsubscribe handle and the event
    /// queue. On a transport without push capability the queue simply
    /// never fires; callers must tolerate that and poll via `get`.
    pub fn subscribe(&self, url: &str) -> (Subscription, Receiver<MetaChange>) {
        let pointer = self.pointer_name(url);
        self.feed.subscribe(&pointer)
    }

    /// Feeds an inbound push frame into the subscription feed.
    ///
    /// Transports with push capability (a socket pump, a loopback
    /// test) call this for each `meta-event` frame they receive.
    /// Other frames are ignored.
    pub fn deliver_event(&self, event: Message) {
        if let Message::MetaEvent {
            pointer, records, ..
        } = event
        {
            self.feed.deliver(MetaChange { pointer, records });
        }
    }

    /// Asks the remote for its capability descriptor.
    pub fn capabilities(&self) -> GatewayResult<Message> {
        let reply = self.send_control(&Message::CapabilityQuery { tid: new_tid() })?;
        match reply {
            Message::CapabilityDescriptor { .. } => Ok(reply),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Opens a push-capable session on the remote.
    pub fn open_session(&self) -> GatewayResult<quaydb_sync_protocol::SessionId> {
        let reply = self.send_control(&Message::OpenSession { tid: new_tid() })?;
        match reply {
            Message::SessionDescriptor { session, .. } => Ok(session),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Binds a pointer to a session for push delivery.
    pub fn bind(
        &self,
        url: &str,
        session: quaydb_sync_protocol::SessionId,
    ) -> GatewayResult<()> {
        let params = SyncParams::parse(url);
        let reply = self.send_control(&Message::BindGetMeta {
            tid: new_tid(),
            pointer: self.pointer_name(url),
            session,
            self_reflect: params.self_reflect,
        })?;
        match reply {
            Message::Ack { .. } => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    fn put_content(&self, url: &str, envelope: &Envelope) -> GatewayResult<()> {
        let key = self.content_key(url);
        let bytes = serde_json::to_vec(&envelope.payload)
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        let reply = self.send_control(&Message::PutContent {
            tid: new_tid(),
            key: key.clone(),
        })?;
        let location = match reply {
            Message::UploadLocation { location, .. } => location,
            other => return Err(unexpected_reply(&other)),
        };

        debug!(key, location, "content upload");
        let request = HttpRequest::new(HttpMethod::Put, self.absolute(&location))
            .header("content-type", "application/octet-stream")
            .body(bytes);
        let response = self
            .send_raw(request)
            .map_err(|e| GatewayError::transport(e))?;
        if response.is_success() {
            Ok(())
        } else {
            Err(GatewayError::status(response.status, "content upload rejected"))
        }
    }

    fn put_meta(&self, url: &str, envelope: Envelope) -> GatewayResult<()> {
        let pointer = self.pointer_name(url);
        let cid = match envelope.cid {
            Some(cid) => cid,
            None => {
                let bytes = serde_json::to_vec(&envelope.payload)
                    .map_err(|e| GatewayError::Protocol(e.to_string()))?;
                content_id(&bytes)
            }
        };
        let record = MetaRecord {
            cid,
            data: envelope.payload,
            parents: envelope.parents,
        };

        let reply = self.send_control(&Message::PutMeta {
            tid: new_tid(),
            pointer,
            records: vec![record],
            session: None,
        })?;
        match reply {
            Message::Ack { .. } => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    fn get_content(&self, url: &str) -> GatewayResult<Vec<u8>> {
        let key = self.content_key(url);
        let reply = self.send_control(&Message::GetContent {
            tid: new_tid(),
            key,
        })?;
        match reply {
            Message::ContentReply {
                bytes: Some(b64), ..
            } => BASE64
                .decode(b64)
                .map_err(|e| GatewayError::Protocol(format!("inline bytes: {e}"))),
            Message::ContentReply {
                location: Some(location),
                ..
            } => {
                let request = HttpRequest::new(HttpMethod::Get, self.absolute(&location));
                let response = self
                    .send_raw(request)
                    .map_err(|e| GatewayError::transport(e))?;
                match response.status {
                    404 => Err(GatewayError::NotFound(location)),
                    s if (200..300).contains(&s) => Ok(response.body),
                    s => Err(GatewayError::status(s, "content download failed")),
                }
            }
            Message::ContentReply { key, .. } => {
                Err(GatewayError::Protocol(format!("empty content reply for {key}")))
            }
            other => Err(unexpected_reply(&other)),
        }
    }

    fn get_meta(&self, url: &str) -> GatewayResult<Vec<MetaHead>> {
        let reply = self.send_control(&Message::GetMeta {
            tid: new_tid(),
            pointer: self.pointer_name(url),
        })?;
        match reply {
            Message::MetaCollection { records, .. } => {
                Ok(records.into_iter().map(MetaHead::from).collect())
            }
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Sends one control message and decodes the typed reply.
    ///
    /// Transport exceptions and non-success statuses are converted
    /// here; an `error` reply is mapped onto the error taxonomy.
    fn send_control(&self, message: &Message) -> GatewayResult<Message> {
        let body = message.encode()?;
        let request = HttpRequest::new(HttpMethod::Post, format!("{}{MESSAGE_ENDPOINT}", self.base_url))
            .header("content-type", "application/json")
            .body(body);
        let response = self
            .send_raw(request)
            .map_err(|e| GatewayError::transport(e))?;

        match response.status {
            404 => return Err(GatewayError::NotFound(message.type_name().to_string())),
            s if !(200..300).contains(&s) => {
                return Err(GatewayError::status(s, "control request failed"))
            }
            _ => {}
        }

        let reply = Message::decode(&response.body)?;
        if let Message::ErrorReply { code, message, .. } = reply {
            return Err(match code {
                ErrorCode::NotFound => GatewayError::NotFound(message),
                code => GatewayError::status(code.status(), message),
            });
        }
        Ok(reply)
    }

    fn send_raw(&self, mut request: HttpRequest) -> Result<crate::http::HttpResponse, String> {
        if let Some(token) = &self.token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        self.client.request(request)
    }

    /// The content key a URL addresses: the explicit `key` parameter,
    /// or the URL itself with reserved parameters stripped.
    fn content_key(&self, url: &str) -> String {
        SyncParams::parse(url)
            .key
            .unwrap_or_else(|| strip_reserved(url))
    }

    /// The pointer name a URL addresses; "main" when unnamed.
    fn pointer_name(&self, url: &str) -> String {
        SyncParams::parse(url)
            .pointer
            .unwrap_or_else(|| "main".to_string())
    }

    fn absolute(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}{location}", self.base_url)
        }
    }
}

fn new_tid() -> String {
    Uuid::new_v4().to_string()
}

fn unexpected_reply(reply: &Message) -> GatewayError {
    GatewayError::Protocol(format!("unexpected reply: {}", reply.type_name()))
}
