use thiserror::Error;

/// Unified error type for the entire fund-dashboard-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Credentials / Environment ───────────────────────────────────
    #[error("Credential file not found: {0}")]
    MissingCredential(String),

    #[error("Missing required environment variables: {0}")]
    MissingEnvVar(String),

    // ── Broker API / Network ────────────────────────────────────────
    #[error("Broker handshake failed: {0}")]
    Handshake(String),

    /// The access token was rejected or has expired. Signalled as a
    /// distinct case by the broker client so callers never have to
    /// pattern-match on error text.
    #[error("Broker session expired: {0}")]
    AuthExpired(String),

    #[error("API error ({broker}): {message}")]
    Api {
        broker: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── File I/O ────────────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// True when the upstream session needs to be re-established.
    /// Drives the cache's reconnect-on-expiry path.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, CoreError::AuthExpired(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs to prevent
        // app-key leakage. reqwest errors often contain full URLs with secrets.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
