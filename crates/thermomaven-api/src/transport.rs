// Shared transport configuration for building reqwest::Client instances.
//
// The signed REST client and the certificate provisioner share timeout
// and user-agent settings through this module.

use std::time::Duration;

/// The User-Agent the vendor cloud expects. Part of the signing
/// contract observed on the wire, not a branding choice.
pub const USER_AGENT: &str = "okhttp/4.12.0";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
