// ── Runtime account configuration ──
//
// Describes *how* to reach the ThermoMaven cloud for one account.
// Carries credential data and tuning, but never touches disk. The CLI
// constructs an `AccountConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;

/// App credentials shipped with the vendor's mobile app. Shared by all
/// accounts; overridable for self-hosted or staging backends.
pub const DEFAULT_APP_ID: &str = "ap4060eff28137181bd";
pub const DEFAULT_APP_KEY: &str = "bcd4596f1bb8419a92669c8017bf25e8";

/// Configuration for one cloud account session.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Account email.
    pub email: String,
    /// Account password (hashed before transmission).
    pub password: SecretString,
    /// Cloud base URL.
    pub base_url: String,
    /// App id used for request signing.
    pub app_id: String,
    /// App key used for request signing.
    pub app_key: String,
    /// Account region, `US` or `EU`.
    pub region: String,
    /// Minimum age before a cached REST roster is refetched.
    pub rest_poll_interval: Duration,
    /// How often the background refresh cycle runs. Zero disables it.
    pub refresh_interval: Duration,
    /// How long `connect()` waits for the first push envelope before
    /// reporting ready anyway.
    pub initial_push_timeout: Duration,
    /// Cap on consecutive server-side sync requests issued when the
    /// roster keeps coming back empty.
    pub max_auto_sync_attempts: u32,
    /// Bound on the device identity cache.
    pub identity_cache_capacity: usize,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: SecretString::from(String::new()),
            base_url: thermomaven_api::client::DEFAULT_BASE_URL.to_owned(),
            app_id: DEFAULT_APP_ID.to_owned(),
            app_key: DEFAULT_APP_KEY.to_owned(),
            region: "US".to_owned(),
            rest_poll_interval: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(300),
            initial_push_timeout: Duration::from_secs(10),
            max_auto_sync_attempts: 3,
            identity_cache_capacity: 64,
        }
    }
}

impl AccountConfig {
    /// Minimal config from credentials, everything else defaulted.
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
            ..Self::default()
        }
    }
}
