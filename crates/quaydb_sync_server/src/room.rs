//! Connection registry for the optional push channel.
//!
//! A connection exists from `open-session` until its transport closes.
//! `bind-get-meta` attaches pointer interests; new meta heads are then
//! delivered as `meta-event` frames. Delivery is fire-and-forget: a
//! full or disconnected subscriber queue never blocks the dispatch
//! path, it only prunes the subscriber.

use parking_lot::RwLock;
use quaydb_sync_protocol::{Message, MetaRecord, SessionId};
use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-subscriber event queue depth.
const EVENT_QUEUE_DEPTH: usize = 64;

/// One registered pointer interest.
#[derive(Debug, Clone)]
struct Interest {
    /// Transaction id of the originating bind, echoed on events.
    tid: String,
    /// Whether this session wants its own writes echoed back.
    self_reflect: bool,
}

/// State of one open connection.
struct ConnectionState {
    sender: Option<SyncSender<Message>>,
    interests: HashMap<String, Interest>,
}

/// Registry of open connections and their pointer interests.
#[derive(Default)]
pub struct Room {
    connections: RwLock<HashMap<SessionId, ConnectionState>>,
}

impl Room {
    /// Creates an empty room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new connection id pair and registers it.
    pub fn open_session(&self) -> SessionId {
        let session = SessionId {
            req_id: Uuid::new_v4().to_string(),
            res_id: Uuid::new_v4().to_string(),
        };
        self.connections.write().insert(
            session.clone(),
            ConnectionState {
                sender: None,
                interests: HashMap::new(),
            },
        );
        debug!(req_id = %session.req_id, "session opened");
        session
    }

    /// Attaches an outbound event channel to a session, returning the
    /// receiving end. Replaces any previous channel.
    ///
    /// Returns `None` if the session is unknown.
    pub fn attach(&self, session: &SessionId) -> Option<Receiver<Message>> {
        let mut connections = self.connections.write();
        let state = connections.get_mut(session)?;
        let (tx, rx) = sync_channel(EVENT_QUEUE_DEPTH);
        state.sender = Some(tx);
        Some(rx)
    }

    /// Registers a pointer interest for a session.
    ///
    /// Returns false if the session is unknown.
    pub fn bind(&self, session: &SessionId, pointer: &str, tid: &str, self_reflect: bool) -> bool {
        let mut connections = self.connections.write();
        let Some(state) = connections.get_mut(session) else {
            return false;
        };
        state.interests.insert(
            pointer.to_string(),
            Interest {
                tid: tid.to_string(),
                self_reflect,
            },
        );
        true
    }

    /// Returns true if the session is registered.
    pub fn contains(&self, session: &SessionId) -> bool {
        self.connections.read().contains_key(session)
    }

    /// Deregisters a session (transport closed). Idempotent.
    pub fn close(&self, session: &SessionId) {
        if self.connections.write().remove(session).is_some() {
            debug!(req_id = %session.req_id, "session closed");
        }
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns true if no connections are open.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Delivers new heads for `pointer` to every interested session.
    ///
    /// `source` is the writing session, if known; it is skipped unless
    /// it bound with `self_reflect`. Disconnected subscribers are
    /// pruned; a full queue drops the event rather than blocking.
    pub fn publish(&self, pointer: &str, records: &[MetaRecord], source: Option<&SessionId>) {
        let mut connections = self.connections.write();
        let mut dead = Vec::new();

        for (session, state) in connections.iter() {
            let Some(interest) = state.interests.get(pointer) else {
                continue;
            };
            if let Some(source) = source {
                if source == session && !interest.self_reflect {
                    continue;
                }
            }
            let Some(sender) = &state.sender else {
                continue;
            };
            let event = Message::MetaEvent {
                tid: interest.tid.clone(),
                pointer: pointer.to_string(),
                records: records.to_vec(),
            };
            match sender.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(req_id = %session.req_id, pointer, "subscriber queue full, event dropped");
                }
                Err(TrySendError::Disconnected(_)) => dead.push(session.clone()),
            }
        }

        for session in dead {
            connections.remove(&session);
        }
    }

    /// Delivers an event to a single session, if attached.
    pub fn deliver(&self, session: &SessionId, event: Message) {
        let mut connections = self.connections.write();
        let Some(state) = connections.get_mut(session) else {
            return;
        };
        let Some(sender) = &state.sender else { return };
        match sender.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                connections.remove(session);
            }
        }
    }
}
