// Request signing for the ThermoMaven cloud.
//
// Every REST call carries `x-*` headers plus an `x-sign` MD5 digest over
// `app_key | sorted-params | compact-json-body`. The algorithm is fixed
// by the vendor's mobile app; MD5 here is a protocol constant, not a
// security choice.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};
use rand::Rng;
use uuid::Uuid;

/// Static signing identity: the app credentials shipped with the vendor
/// app plus a per-process synthetic device serial.
#[derive(Debug, Clone)]
pub struct Signer {
    pub app_id: String,
    pub app_key: String,
    pub region: String,
    pub device_sn: String,
}

impl Signer {
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            region: region.into(),
            device_sn: synthetic_device_sn(),
        }
    }

    /// Build the full signed header set for one request.
    ///
    /// `token` is the session token from `login()` (the literal string
    /// `"none"` is sent before login, per the wire contract). `body` is
    /// the exact compact JSON string that will be sent -- the signature
    /// covers the bytes on the wire, so callers must not re-serialize.
    pub fn signed_headers(&self, token: Option<&str>, body: Option<&str>) -> Vec<(String, String)> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            .to_string();
        let nonce = Uuid::new_v4().simple().to_string();

        let mut params = BTreeMap::new();
        params.insert("x-appId", self.app_id.as_str());
        params.insert("x-appVersion", "1804");
        params.insert("x-deviceSn", self.device_sn.as_str());
        params.insert("x-lang", "en_US");
        params.insert("x-nonce", nonce.as_str());
        params.insert("x-region", self.region.as_str());
        params.insert("x-timestamp", timestamp.as_str());
        params.insert("x-token", token.unwrap_or("none"));

        // BTreeMap iteration is already the sorted order the signature requires.
        let params_str = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";");

        let sign = sign(&self.app_key, &params_str, body.unwrap_or(""));

        let mut headers: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        headers.push(("x-sign".to_owned(), sign));
        headers
    }
}

/// Compute the `x-sign` digest: `md5hex(app_key | params [| body])`
/// with newlines stripped.
pub fn sign(app_key: &str, params_str: &str, body_str: &str) -> String {
    let mut sign_str = format!("{app_key}|{params_str}");
    if !body_str.is_empty() {
        sign_str.push('|');
        sign_str.push_str(body_str);
    }
    let sign_str = sign_str.replace('\n', "");
    md5_hex(sign_str.as_bytes())
}

/// Lowercase hex MD5. Also used for the login password digest.
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// 16 lowercase hex chars, generated once per `Signer`. The vendor app
/// does the same on first launch.
fn synthetic_device_sn() -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_without_body() {
        assert_eq!(
            sign("testkey", "a=1;b=2", ""),
            "23d10294bdf680aaff42d3f53f984bf7"
        );
    }

    #[test]
    fn sign_with_body() {
        assert_eq!(
            sign("testkey", "a=1;b=2", r#"{"k":"v"}"#),
            "db83318145a25e447711c5faa4f0b042"
        );
    }

    #[test]
    fn sign_strips_newlines() {
        // A body containing a newline must hash identically to one without.
        assert_eq!(
            sign("testkey", "a=1;b=2", "{\"k\":\"v\"}\n"),
            sign("testkey", "a=1;b=2", r#"{"k":"v"}"#)
        );
    }

    #[test]
    fn md5_hex_known_vector() {
        assert_eq!(md5_hex(b"secret"), "5ebe2294ecd0e0f08eab7690d2a6ee69");
    }

    #[test]
    fn signed_headers_include_all_params_and_sign() {
        let signer = Signer::new("app-id", "app-key", "US");
        let headers = signer.signed_headers(Some("tok"), None);

        let keys: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        for expected in [
            "x-appId",
            "x-appVersion",
            "x-deviceSn",
            "x-lang",
            "x-nonce",
            "x-region",
            "x-timestamp",
            "x-token",
            "x-sign",
        ] {
            assert!(keys.contains(&expected), "missing header {expected}");
        }

        let token = headers.iter().find(|(k, _)| k == "x-token").map(|(_, v)| v);
        assert_eq!(token.map(String::as_str), Some("tok"));
    }

    #[test]
    fn token_defaults_to_none_literal() {
        let signer = Signer::new("app-id", "app-key", "US");
        let headers = signer.signed_headers(None, None);
        let token = headers.iter().find(|(k, _)| k == "x-token").map(|(_, v)| v);
        assert_eq!(token.map(String::as_str), Some("none"));
    }

    #[test]
    fn device_sn_is_16_hex_chars() {
        let signer = Signer::new("a", "b", "US");
        assert_eq!(signer.device_sn.len(), 16);
        assert!(signer.device_sn.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
