// MQTT certificate provisioning.
//
// Turns an `/app/mqtt/cert/apply` response into everything the push
// transport needs: the PKCS#12 client identity, the broker for the
// session's region, and the topics to subscribe. The root of trust for
// the AWS IoT brokers is Amazon Root CA 1, fetched from Amazon Trust
// Services at provision time.

use tracing::{debug, info};

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::wire::MqttBootstrap;

/// AWS IoT broker endpoints per region.
pub const BROKER_US: &str = "a2ubmaqm3a642j-ats.iot.us-west-2.amazonaws.com";
pub const BROKER_EU: &str = "a2ubmaqm3a642j-ats.iot.eu-central-1.amazonaws.com";

/// TLS port used by both brokers.
pub const BROKER_PORT: u16 = 8883;

/// Where Amazon publishes its root CA.
pub const AMAZON_ROOT_CA_URL: &str = "https://www.amazontrust.com/repository/AmazonRootCA1.pem";

/// Everything needed to open the mutual-TLS push connection.
#[derive(Clone)]
pub struct MqttCredentials {
    /// PKCS#12 bundle holding the client certificate and key.
    pub pkcs12_der: Vec<u8>,
    /// Passphrase protecting the bundle.
    pub password: String,
    /// Root CA, PEM.
    pub ca: Vec<u8>,
    pub broker_host: String,
    pub broker_port: u16,
    /// Client id issued by the cloud; also encodes the region.
    pub client_id: String,
    /// Account-level topics to subscribe on connect.
    pub sub_topics: Vec<String>,
}

impl std::fmt::Debug for MqttCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep the key material out of logs.
        f.debug_struct("MqttCredentials")
            .field("broker_host", &self.broker_host)
            .field("broker_port", &self.broker_port)
            .field("client_id", &self.client_id)
            .field("sub_topics", &self.sub_topics)
            .field("pkcs12_len", &self.pkcs12_der.len())
            .finish()
    }
}

/// Extract the region from an issued client id.
///
/// Client ids look like `android-{userId}-{region}-{deviceSn}`; the
/// region sits at split index 2. Anything malformed falls back to US,
/// matching the mobile app.
pub fn region_from_client_id(client_id: &str) -> &str {
    match client_id.split('-').nth(2) {
        Some(region) if !region.is_empty() => region,
        _ => "US",
    }
}

/// Broker host for a region. Unknown regions route to the US broker.
pub fn broker_for_region(region: &str) -> &'static str {
    match region {
        "EU" => BROKER_EU,
        _ => BROKER_US,
    }
}

/// Download the PKCS#12 bundle and root CA named by a bootstrap
/// response and assemble connection credentials.
pub async fn provision(
    bootstrap: &MqttBootstrap,
    transport: &TransportConfig,
) -> Result<MqttCredentials, Error> {
    let http = transport.build_client()?;

    debug!(url = %bootstrap.p12_url, "downloading PKCS#12 bundle");
    let pkcs12_der = download(&http, &bootstrap.p12_url).await?;

    debug!(url = AMAZON_ROOT_CA_URL, "downloading root CA");
    let ca = download(&http, AMAZON_ROOT_CA_URL).await?;

    let region = region_from_client_id(&bootstrap.client_id);
    let broker_host = broker_for_region(region).to_owned();
    info!(region, broker = %broker_host, client_id = %bootstrap.client_id, "provisioned MQTT credentials");

    Ok(MqttCredentials {
        pkcs12_der,
        password: bootstrap.p12_password.clone(),
        ca,
        broker_host,
        broker_port: BROKER_PORT,
        client_id: bootstrap.client_id.clone(),
        sub_topics: bootstrap.sub_topics.clone(),
    })
}

async fn download(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, Error> {
    let response = http.get(url).send().await.map_err(Error::Transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::CertificateDownload {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    Ok(response.bytes().await.map_err(Error::Transport)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parses_from_client_id() {
        assert_eq!(region_from_client_id("android-123-EU-abcd"), "EU");
        assert_eq!(region_from_client_id("android-123-US-abcd"), "US");
    }

    #[test]
    fn malformed_client_id_falls_back_to_us() {
        assert_eq!(region_from_client_id("android-123"), "US");
        assert_eq!(region_from_client_id(""), "US");
        assert_eq!(region_from_client_id("android-123--abcd"), "US");
    }

    #[test]
    fn broker_selection() {
        assert_eq!(broker_for_region("EU"), BROKER_EU);
        assert_eq!(broker_for_region("US"), BROKER_US);
        assert_eq!(broker_for_region("MARS"), BROKER_US);
    }
}
