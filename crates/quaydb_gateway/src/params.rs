//! Reserved URL parameters and key stability rules.
//!
//! Store operations are parameterized by a small set of named query
//! parameters reserved by the protocol. Application data must never
//! collide with them, and they must be stripped before a URL is used
//! as a raw identifier - otherwise reordering `?a=1&store=content`
//! versus `?store=content&a=1` would produce two different keys.

/// The store kind a URL addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Immutable content blocks.
    Content,
    /// Mutable meta pointers.
    Meta,
}

impl StoreKind {
    /// The wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Content => "content",
            StoreKind::Meta => "meta",
        }
    }

    /// Parses a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "content" => Some(StoreKind::Content),
            "meta" => Some(StoreKind::Meta),
            _ => None,
        }
    }
}

/// Query parameter names reserved by the protocol.
pub const RESERVED_PARAMS: [&str; 5] = ["store", "key", "meta", "v", "self_reflect"];

/// The reserved parameters parsed out of a URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncParams {
    /// `store`: which store kind the URL addresses.
    pub store: Option<StoreKind>,
    /// `key`: explicit logical key for content operations.
    pub key: Option<String>,
    /// `meta`: pointer name for meta operations.
    pub pointer: Option<String>,
    /// `v`: protocol version the caller speaks.
    pub version: Option<u16>,
    /// `self_reflect`: echo my own writes back to me.
    pub self_reflect: bool,
}

impl SyncParams {
    /// Parses the reserved parameters from a URL's query string.
    /// Unknown parameters are ignored here (and preserved by
    /// [`strip_reserved`]).
    pub fn parse(url: &str) -> Self {
        let mut params = SyncParams::default();
        let Some(query) = url.splitn(2, '?').nth(1) else {
            return params;
        };
        for pair in query.split('&') {
            let mut kv = pair.splitn(2, '=');
            let name = kv.next().unwrap_or("");
            let value = kv.next().unwrap_or("");
            match name {
                "store" => params.store = StoreKind::parse(value),
                "key" => params.key = Some(value.to_string()),
                "meta" => params.pointer = Some(value.to_string()),
                "v" => params.version = value.parse().ok(),
                "self_reflect" => params.self_reflect = value == "true" || value == "1",
                _ => {}
            }
        }
        params
    }
}

/// Removes the reserved parameters from a URL, preserving everything
/// else in its original order. The result is stable under reserved
/// parameter reordering and safe to use as a raw identifier.
pub fn strip_reserved(url: &str) -> String {
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("");
    let Some(query) = parts.next() else {
        return path.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let name = pair.splitn(2, '=').next().unwrap_or("");
            !RESERVED_PARAMS.contains(&name)
        })
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}
