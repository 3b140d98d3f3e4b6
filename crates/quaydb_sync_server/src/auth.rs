//! Bearer token authentication.
//!
//! Tokens are HMAC-SHA256 signed and carry their subject and issue
//! time, so the server can check both identity and expiry without any
//! token storage.
//!
//! ## Token layout
//!
//! - 2 bytes: subject length (big-endian)
//! - N bytes: subject (UTF-8, e.g. a database or account name)
//! - 8 bytes: timestamp (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature over everything before it
//!
//! Tokens travel base64-encoded in the `Authorization: Bearer` header.

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration window.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates an auth configuration with a 24 hour expiry.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the token expiration window.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Issues and validates bearer tokens.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issues a token for `subject`.
    ///
    /// # Errors
    ///
    /// Fails if the subject is longer than a token can carry.
    pub fn create_token(&self, subject: &str) -> ServerResult<Vec<u8>> {
        let subject = subject.as_bytes();
        let len = u16::try_from(subject.len())
            .map_err(|_| ServerError::InvalidRequest("subject too long".into()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut data = Vec::with_capacity(2 + subject.len() + 8 + SIGNATURE_LEN);
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(subject);
        data.extend_from_slice(&timestamp.to_be_bytes());

        let signature = self.sign(&data)?;
        data.extend_from_slice(&signature);
        Ok(data)
    }

    /// Validates a token and checks its subject and expiry.
    pub fn validate_token(&self, token: &[u8], expected_subject: &str) -> ServerResult<()> {
        let too_short = || ServerError::AuthenticationFailed("token too short".into());

        let len_bytes: [u8; 2] = token.get(0..2).and_then(|b| b.try_into().ok()).ok_or_else(too_short)?;
        let subject_len = u16::from_be_bytes(len_bytes) as usize;
        let signed_len = 2 + subject_len + 8;
        if token.len() != signed_len + SIGNATURE_LEN {
            return Err(ServerError::AuthenticationFailed(
                "invalid token length".into(),
            ));
        }

        let subject = &token[2..2 + subject_len];
        if subject != expected_subject.as_bytes() {
            return Err(ServerError::AuthenticationFailed(
                "subject mismatch".into(),
            ));
        }

        let expected_signature = self.sign(&token[..signed_len])?;
        if token[signed_len..] != expected_signature {
            return Err(ServerError::AuthenticationFailed(
                "invalid signature".into(),
            ));
        }

        let ts_bytes: [u8; 8] = token[2 + subject_len..signed_len]
            .try_into()
            .map_err(|_| too_short())?;
        let timestamp = u64::from_be_bytes(ts_bytes);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let expiry_millis = self.config.token_expiry.as_millis() as u64;
        if now > timestamp.saturating_add(expiry_millis) {
            return Err(ServerError::AuthenticationFailed("token expired".into()));
        }

        Ok(())
    }

    fn sign(&self, data: &[u8]) -> ServerResult<[u8; SIGNATURE_LEN]> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::Internal(format!("hmac init: {e}")))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }
}

/// Shared-secret validator without expiry checking. For tests.
#[derive(Clone)]
pub struct SimpleTokenValidator {
    secret: Vec<u8>,
}

impl SimpleTokenValidator {
    /// Creates a validator with a shared secret.
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Accepts only the exact shared secret.
    pub fn validate(&self, token: &[u8]) -> ServerResult<()> {
        if token == self.secret.as_slice() {
            Ok(())
        } else {
            Err(ServerError::AuthenticationFailed("invalid token".into()))
        }
    }
}
