//! Request signing for private REST endpoints.
//!
//! The signature is `HMAC-SHA256(secret, timestamp + api_key + recv_window + query)`
//! hex-encoded, sent along with the timestamp, key and receive window as headers.
//! The exchange rejects requests whose timestamp is outside the receive window,
//! so the host clock must be roughly synchronized.

use crate::error::{ExchangeError, ExchangeResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Default receive window in milliseconds.
pub const RECV_WINDOW_MS: u64 = 5000;

pub const HEADER_API_KEY: &str = "X-BAPI-API-KEY";
pub const HEADER_TIMESTAMP: &str = "X-BAPI-TIMESTAMP";
pub const HEADER_RECV_WINDOW: &str = "X-BAPI-RECV-WINDOW";
pub const HEADER_SIGN: &str = "X-BAPI-SIGN";

/// API key pair of one user. The secret is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Headers for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub recv_window: String,
    pub signature: String,
}

/// Signs canonical query strings with a fixed receive window.
#[derive(Debug, Clone, Copy)]
pub struct RequestSigner {
    recv_window_ms: u64,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new(RECV_WINDOW_MS)
    }
}

impl RequestSigner {
    pub fn new(recv_window_ms: u64) -> Self {
        Self { recv_window_ms }
    }

    /// Sign `query` at the current wall-clock time.
    pub fn sign_now(
        &self,
        credentials: &ApiCredentials,
        query: &str,
    ) -> ExchangeResult<SignedHeaders> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ExchangeError::Signing("system time before unix epoch".to_string()))?
            .as_millis();
        self.sign_at(credentials, query, timestamp_ms as u64)
    }

    /// Sign `query` for an explicit millisecond timestamp.
    pub fn sign_at(
        &self,
        credentials: &ApiCredentials,
        query: &str,
        timestamp_ms: u64,
    ) -> ExchangeResult<SignedHeaders> {
        let timestamp = timestamp_ms.to_string();
        let recv_window = self.recv_window_ms.to_string();
        let payload = format!(
            "{}{}{}{}",
            timestamp,
            credentials.api_key(),
            recv_window,
            query
        );

        let mut mac = HmacSha256::new_from_slice(credentials.api_secret().as_bytes())
            .map_err(|e| ExchangeError::Signing(format!("invalid key: {e}")))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SignedHeaders {
            api_key: credentials.api_key().to_string(),
            timestamp,
            recv_window,
            signature,
        })
    }
}
