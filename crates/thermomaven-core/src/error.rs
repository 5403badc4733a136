// ── Core error types ──
//
// User-facing errors from thermomaven-core. Consumers never see HTTP
// status codes or JSON parse failures directly; the
// `From<thermomaven_api::Error>` impl translates transport-layer
// errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cloud unreachable: {reason}")]
    CloudUnreachable { reason: String },

    #[error("Not connected")]
    Disconnected,

    #[error("Push channel is down")]
    PushChannelDown,

    #[error("Timed out after {timeout_secs}s waiting for {waiting_for}")]
    Timeout {
        timeout_secs: u64,
        waiting_for: String,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device {identifier} has no usable id")]
    DeviceUnaddressable { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Invalid probe index {probe_index} for {model} ({probes} probes)")]
    InvalidProbe {
        probe_index: u8,
        model: String,
        probes: u8,
    },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Cloud API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<thermomaven_api::Error> for CoreError {
    fn from(err: thermomaven_api::Error) -> Self {
        use thermomaven_api::Error as Api;
        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::NotLoggedIn => CoreError::AuthenticationFailed {
                message: "not logged in".into(),
            },
            Api::Transport(ref e) => CoreError::CloudUnreachable {
                reason: e.to_string(),
            },
            Api::Http { status, endpoint } => CoreError::Api {
                message: format!("HTTP {status} from {endpoint}"),
                code: None,
                status: Some(status),
            },
            Api::Api { code, message } => CoreError::Api {
                message,
                code: Some(code),
                status: None,
            },
            Api::CertificateDownload { status, url } => CoreError::CloudUnreachable {
                reason: format!("certificate download failed (HTTP {status}) from {url}"),
            },
            Api::Tls(msg) => CoreError::CloudUnreachable {
                reason: format!("TLS error: {msg}"),
            },
            Api::Mqtt(msg) => CoreError::OperationFailed {
                message: format!("push channel error: {msg}"),
            },
            Api::NotConnected => CoreError::PushChannelDown,
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("deserialization error: {message}"))
            }
        }
    }
}
