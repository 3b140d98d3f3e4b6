//! End-to-end exercises of the gateway against a real server over the
//! loopback transport. No network: requests are routed in-process.

use quaydb_gateway::{
    Envelope, Fetched, Gateway, GatewayError, HttpMethod, HttpRequest, HttpResponse,
    LoopbackClient, LoopbackServer, StoreKind,
};
use quaydb_store::unescape_key;
use quaydb_sync_protocol::Message;
use quaydb_sync_server::{ServerConfig, SyncServer};
use serde_json::json;
use std::sync::Arc;

/// Maps loopback requests onto the server's handlers the way an HTTP
/// embedding layer would: control messages to `/message`, raw octets
/// to the content endpoint, probes to `/health`.
struct Embedding {
    server: Arc<SyncServer>,
}

impl Embedding {
    fn bearer<'a>(&self, request: &'a HttpRequest) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .and_then(|(_, value)| value.strip_prefix("Bearer "))
    }

    fn content_key(url: &str) -> Option<String> {
        let query = url.splitn(2, '?').nth(1)?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("key="))
            .and_then(unescape_key)
    }
}

impl LoopbackServer for Embedding {
    fn handle(&self, request: HttpRequest) -> HttpResponse {
        // Strip scheme and host, keep path + query
        let path = request
            .url
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|i| &rest[i..]))
            .unwrap_or(&request.url);

        if path.starts_with("/message") {
            let body = self
                .server
                .handle_body(&request.body, self.bearer(&request));
            return HttpResponse::new(200, body);
        }

        if path.starts_with("/content") {
            let Some(key) = Self::content_key(path) else {
                return HttpResponse::new(400, b"missing key".to_vec());
            };
            return match request.method {
                HttpMethod::Put => match self.server.handle_content_upload(&key, &request.body) {
                    Ok(()) => HttpResponse::new(200, vec![]),
                    Err(_) => HttpResponse::new(500, vec![]),
                },
                HttpMethod::Get => match self.server.handle_content_download(&key) {
                    Ok(bytes) => HttpResponse::new(200, bytes),
                    Err(e) if e.is_not_found() => HttpResponse::new(404, vec![]),
                    Err(_) => HttpResponse::new(500, vec![]),
                },
                HttpMethod::Delete => match self.server.handle_content_delete(&key) {
                    Ok(()) => HttpResponse::new(200, vec![]),
                    Err(_) => HttpResponse::new(500, vec![]),
                },
                HttpMethod::Post => HttpResponse::new(405, vec![]),
            };
        }

        if path.starts_with("/health") {
            let body = serde_json::to_vec(&self.server.handle_health()).unwrap_or_default();
            return HttpResponse::new(200, body);
        }

        HttpResponse::new(404, vec![])
    }
}

fn world_with(config: ServerConfig) -> (Gateway<LoopbackClient<Embedding>>, Arc<SyncServer>) {
    let server = Arc::new(SyncServer::new(config));
    let client = LoopbackClient::new(Embedding {
        server: Arc::clone(&server),
    });
    (Gateway::new("http://loopback", client), server)
}

fn world() -> (Gateway<LoopbackClient<Embedding>>, Arc<SyncServer>) {
    world_with(ServerConfig::default())
}

fn meta_heads(fetched: Fetched) -> Vec<quaydb_gateway::MetaHead> {
    match fetched {
        Fetched::Meta(heads) => heads,
        other => panic!("expected meta heads, got {other:?}"),
    }
}

#[test]
fn meta_round_trip() {
    let (gateway, _server) = world();

    gateway
        .put(
            StoreKind::Meta,
            "notes?store=meta&meta=main",
            Envelope::new(json!({ "blocks": ["b1", "b2"] })).with_cid("e1"),
        )
        .unwrap();

    let heads = meta_heads(gateway.get(StoreKind::Meta, "notes?store=meta&meta=main").unwrap());
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].event_id, "e1");
    assert!(heads[0].parents.is_empty());
    assert_eq!(heads[0].content, json!({ "blocks": ["b1", "b2"] }));
}

#[test]
fn content_round_trip_inline() {
    let (gateway, _server) = world();
    let payload = json!({ "text": "hello" });

    gateway
        .put(
            StoreKind::Content,
            "notes?store=content&key=k1",
            Envelope::new(payload.clone()),
        )
        .unwrap();

    match gateway.get(StoreKind::Content, "notes?store=content&key=k1").unwrap() {
        Fetched::Content(bytes) => {
            assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), payload);
        }
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn content_round_trip_via_location() {
    // Force the location leg: nothing fits inline
    let (gateway, _server) = world_with(ServerConfig::new().with_inline_content_max(0));
    let payload = json!({ "text": "big enough" });

    gateway
        .put(
            StoreKind::Content,
            "notes?store=content&key=k2",
            Envelope::new(payload.clone()),
        )
        .unwrap();

    match gateway.get(StoreKind::Content, "notes?store=content&key=k2").unwrap() {
        Fetched::Content(bytes) => {
            assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), payload);
        }
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn missing_content_is_not_found() {
    let (gateway, _server) = world();
    let err = gateway
        .get(StoreKind::Content, "notes?store=content&key=absent")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn content_key_falls_back_to_stripped_url() {
    let (gateway, _server) = world();
    let payload = json!(1);

    // No explicit key: the URL minus reserved parameters is the key,
    // so reordering reserved parameters addresses the same entry.
    gateway
        .put(
            StoreKind::Content,
            "notes.json?app=7&store=content",
            Envelope::new(payload.clone()),
        )
        .unwrap();

    match gateway
        .get(StoreKind::Content, "notes.json?store=content&app=7")
        .unwrap()
    {
        Fetched::Content(bytes) => {
            assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), payload);
        }
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn delete_is_idempotent_across_both_kinds() {
    let (gateway, _server) = world();

    gateway
        .put(
            StoreKind::Content,
            "n?key=k1",
            Envelope::new(json!("x")),
        )
        .unwrap();

    gateway.delete(StoreKind::Content, "n?key=k1").unwrap();
    gateway.delete(StoreKind::Content, "n?key=k1").unwrap();
    assert!(gateway.get(StoreKind::Content, "n?key=k1").unwrap_err().is_not_found());

    // Never-written pointer: still success
    gateway.delete(StoreKind::Meta, "n?meta=ghost").unwrap();
}

#[test]
fn concurrent_heads_are_both_preserved() {
    let (gateway, _server) = world();
    let url = "doc?meta=main";

    gateway
        .put(StoreKind::Meta, url, Envelope::new(json!({"v": 0})).with_cid("e1"))
        .unwrap();

    // Two writers each extend e1 without seeing each other
    gateway
        .put(
            StoreKind::Meta,
            url,
            Envelope::new(json!({"v": 1}))
                .with_cid("e2")
                .with_parents(vec!["e1".into()]),
        )
        .unwrap();
    gateway
        .put(
            StoreKind::Meta,
            url,
            Envelope::new(json!({"v": 2}))
                .with_cid("e3")
                .with_parents(vec!["e1".into()]),
        )
        .unwrap();

    let heads = meta_heads(gateway.get(StoreKind::Meta, url).unwrap());
    let mut ids: Vec<&str> = heads.iter().map(|h| h.event_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["e2", "e3"]);

    // A merge naming both collapses the frontier
    gateway
        .put(
            StoreKind::Meta,
            url,
            Envelope::new(json!({"v": 3}))
                .with_cid("e4")
                .with_parents(vec!["e2".into(), "e3".into()]),
        )
        .unwrap();

    let heads = meta_heads(gateway.get(StoreKind::Meta, url).unwrap());
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].event_id, "e4");
    assert_eq!(heads[0].parents.len(), 2);
}

#[test]
fn push_events_reach_gateway_subscribers() {
    let (gateway, server) = world();
    let url = "doc?meta=main";

    let (sub, changes) = gateway.subscribe(url);

    // Open and bind a push session; keep the server-side queue
    let session = gateway.open_session().unwrap();
    let events = server.room().attach(&session).unwrap();
    gateway.bind(url, session).unwrap();

    gateway
        .put(StoreKind::Meta, url, Envelope::new(json!({"v": 1})).with_cid("e1"))
        .unwrap();

    // Pump the server-side frames into the gateway, as a socket
    // transport would
    while let Ok(event) = events.try_recv() {
        gateway.deliver_event(event);
    }

    let change = changes.try_recv().unwrap();
    assert_eq!(change.pointer, "main");
    assert_eq!(change.records[0].cid, "e1");

    sub.unsubscribe();
}

#[test]
fn auth_gates_control_but_token_passes() {
    let (bad_gateway, server) =
        world_with(ServerConfig::new().with_auth(b"loopback-secret".to_vec()));

    let err = bad_gateway.get(StoreKind::Meta, "doc?meta=main").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Transport {
            status: Some(401),
            ..
        }
    ));

    let token = server.issue_token().unwrap();
    let client = LoopbackClient::new(Embedding {
        server: Arc::clone(&server),
    });
    let gateway = Gateway::new("http://loopback", client).with_token(token);

    gateway
        .put(StoreKind::Meta, "doc?meta=main", Envelope::new(json!(1)).with_cid("e1"))
        .unwrap();
    let heads = meta_heads(gateway.get(StoreKind::Meta, "doc?meta=main").unwrap());
    assert_eq!(heads.len(), 1);
}

#[test]
fn capabilities_describe_the_remote() {
    let (gateway, _server) = world();
    match gateway.capabilities().unwrap() {
        Message::CapabilityDescriptor {
            store_kinds,
            auth_required,
            ..
        } => {
            assert!(store_kinds.contains(&"content".to_string()));
            assert!(store_kinds.contains(&"meta".to_string()));
            assert!(!auth_required);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}
