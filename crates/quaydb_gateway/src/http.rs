//! HTTP transport abstraction.
//!
//! The actual HTTP client is behind a trait so different libraries
//! (reqwest, ureq, a WASM fetch shim) or non-network transports can
//! back the gateway. [`LoopbackClient`] routes requests straight into
//! an in-process server for testing.

/// HTTP methods the gateway uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// PUT.
    Put,
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs (names lowercase).
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Builds a request with no headers or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

/// One response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Network-level failures are reported as the `Err` string; HTTP-level
/// failures come back as a response with a non-2xx status.
pub trait HttpClient: Send + Sync {
    /// Sends one request and waits for its response.
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// A server that can answer loopback requests in-process.
pub trait LoopbackServer {
    /// Handles one request.
    fn handle(&self, request: HttpRequest) -> HttpResponse;
}

/// Routes requests directly to a [`LoopbackServer`], no network.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a loopback client over the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// The wrapped server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        Ok(self.server.handle(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl LoopbackServer for Echo {
        fn handle(&self, request: HttpRequest) -> HttpResponse {
            HttpResponse::new(200, request.body)
        }
    }

    #[test]
    fn request_builder() {
        let req = HttpRequest::new(HttpMethod::Post, "http://example/message")
            .header("content-type", "application/json")
            .body(b"{}".to_vec());
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.body, b"{}");
    }

    #[test]
    fn success_statuses() {
        assert!(HttpResponse::new(200, vec![]).is_success());
        assert!(HttpResponse::new(204, vec![]).is_success());
        assert!(!HttpResponse::new(404, vec![]).is_success());
        assert!(!HttpResponse::new(500, vec![]).is_success());
    }

    #[test]
    fn loopback_round_trip() {
        let client = LoopbackClient::new(Echo);
        let response = client
            .request(HttpRequest::new(HttpMethod::Post, "x").body(b"ping".to_vec()))
            .unwrap();
        assert_eq!(response.body, b"ping");
    }
}
