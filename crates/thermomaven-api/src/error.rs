use thiserror::Error;

/// Top-level error type for the `thermomaven-api` crate.
///
/// Covers every failure mode across all transport surfaces:
/// authentication, signed REST calls, certificate provisioning, and the
/// MQTT push channel. `thermomaven-core` maps these into user-facing
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A call that needs a session token was made before `login()`.
    #[error("Not logged in -- call login() first")]
    NotLoggedIn,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-200 HTTP response from the vendor cloud.
    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    // ── Vendor API ──────────────────────────────────────────────────
    /// Structured error from the vendor API (parsed from the
    /// `{code, msg, data}` envelope; any `code != "0"`).
    #[error("API error (code {code}): {message}")]
    Api { code: String, message: String },

    // ── Certificates / TLS ──────────────────────────────────────────
    /// The PKCS#12 bundle (or root CA) could not be downloaded.
    #[error("Certificate download failed (HTTP {status}): {url}")]
    CertificateDownload { status: u16, url: String },

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── MQTT push channel ───────────────────────────────────────────
    /// The MQTT client rejected a subscribe/publish request.
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// Publish attempted while the push transport is down.
    #[error("Push transport not connected")]
    NotConnected,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Mqtt(_) | Self::NotConnected => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates the session token is no
    /// longer valid and a fresh `login()` might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotLoggedIn)
    }
}
