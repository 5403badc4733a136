// Signed REST client
//
// Wraps `reqwest::Client` with the vendor's header-signing scheme and
// `{code, msg, data}` envelope unwrapping. All endpoint methods return
// unwrapped `data` payloads; the envelope is stripped before the caller
// sees it.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Error;
use crate::sign::{Signer, md5_hex};
use crate::transport::TransportConfig;
use crate::wire::{ApiEnvelope, LoginData, MqttBootstrap, RawDevice};

/// Default base URL of the vendor cloud.
pub const DEFAULT_BASE_URL: &str = "https://api.iot.thermomaven.com";

/// The device-info string the mobile app reports at login.
const DEVICE_INFO: &str = "google sdk_gphone_x86_64 11";

#[derive(Debug, Default)]
struct Session {
    token: Option<String>,
    user_id: Option<String>,
}

/// Signed HTTP client for the ThermoMaven cloud.
///
/// Cheap to clone; all clones share one session. Every request carries
/// the full signed header set, with `x-token: none` until `login()`
/// succeeds.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    signer: Signer,
    session: Arc<RwLock<Session>>,
}

impl ApiClient {
    /// Create a client from a signing identity and transport config.
    pub fn new(
        base_url: impl Into<String>,
        signer: Signer,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            signer,
            session: Arc::new(RwLock::new(Session::default())),
        })
    }

    /// The signing identity in use.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The session user id, once logged in.
    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.user_id.clone()
    }

    /// Whether a session token is held.
    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.token.is_some()
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Authenticate and store the session token.
    ///
    /// The password is MD5-hashed before transmission, matching the
    /// mobile app. A vendor-level failure surfaces as
    /// `Error::Authentication` rather than the generic `Error::Api`.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        let body = json!({
            "accountName": email,
            "accountPassword": md5_hex(password.expose_secret().as_bytes()),
            "deviceInfo": DEVICE_INFO,
        });

        let data: LoginData = self
            .post("/app/account/login", &body)
            .await
            .map_err(|e| match e {
                Error::Api { message, .. } => Error::Authentication { message },
                other => other,
            })?
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no session data".to_owned(),
            })?;

        let mut session = self.session.write().await;
        session.user_id = data.user_id.clone();
        session.token = Some(data.token);
        info!(user_id = ?data.user_id, "logged in");
        Ok(())
    }

    /// Drop the session token.
    pub async fn logout(&self) {
        let mut session = self.session.write().await;
        session.token = None;
        session.user_id = None;
    }

    /// Fetch the full device roster: owned devices followed by devices
    /// shared with this account, concatenated in that order.
    pub async fn fetch_devices(&self) -> Result<Vec<RawDevice>, Error> {
        self.require_login().await?;

        let mut devices: Vec<RawDevice> = self
            .post("/app/device/share/my/device/list", &json!({}))
            .await?
            .unwrap_or_default();
        let shared: Vec<RawDevice> = self
            .post("/app/device/share/shared/device/list", &json!({}))
            .await?
            .unwrap_or_default();
        devices.extend(shared);

        debug!(count = devices.len(), "fetched device roster");
        Ok(devices)
    }

    /// Fetch the account profile as a raw JSON object.
    pub async fn fetch_user_info(&self) -> Result<serde_json::Map<String, Value>, Error> {
        self.require_login().await?;
        Ok(self
            .post("/app/user/get", &json!({}))
            .await?
            .unwrap_or_default())
    }

    /// Request an MQTT certificate bundle for this session.
    pub async fn apply_mqtt_certificate(&self) -> Result<MqttBootstrap, Error> {
        self.require_login().await?;
        self.post("/app/mqtt/cert/apply", &json!({}))
            .await?
            .ok_or_else(|| Error::Deserialization {
                message: "certificate apply response carried no data".to_owned(),
                body: String::new(),
            })
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn require_login(&self) -> Result<(), Error> {
        if self.session.read().await.token.is_some() {
            Ok(())
        } else {
            Err(Error::NotLoggedIn)
        }
    }

    /// Send a signed POST and unwrap the `{code, msg, data}` envelope.
    ///
    /// The body is serialized exactly once and that string both feeds
    /// the signature and goes on the wire; signing a re-serialization
    /// would break on key-order differences.
    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<Option<T>, Error> {
        let body_str = serde_json::to_string(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        let token = self.session.read().await.token.clone();
        let headers = self
            .signer
            .signed_headers(token.as_deref(), Some(&body_str));

        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {url}");

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body_str).send().await.map_err(Error::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_owned(),
            });
        }

        let text = response.text().await.map_err(Error::Transport)?;
        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        match envelope.code.as_deref() {
            Some("0") => Ok(envelope.data),
            code => Err(Error::Api {
                code: code.unwrap_or("<missing>").to_owned(),
                message: envelope.msg.unwrap_or_default(),
            }),
        }
    }
}
