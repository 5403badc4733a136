// Integration tests for `ApiClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thermomaven_api::client::ApiClient;
use thermomaven_api::sign::Signer;
use thermomaven_api::transport::TransportConfig;
use thermomaven_api::Error;

// ── Helpers ─────────────────────────────────────────────────────────

fn client_for(server: &MockServer) -> ApiClient {
    let signer = Signer::new("test-app-id", "test-app-key", "US");
    ApiClient::new(server.uri(), signer, &TransportConfig::default()).unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/app/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "success",
            "data": { "token": "session-token", "userId": 4242 }
        })))
        .mount(server)
        .await;
}

async fn login(client: &ApiClient) {
    client
        .login("pit@example.com", &SecretString::from("hunter2"))
        .await
        .unwrap();
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_session_and_hashes_password() {
    let server = MockServer::start().await;

    // md5("hunter2")
    Mock::given(method("POST"))
        .and(path("/app/account/login"))
        .and(body_partial_json(json!({
            "accountName": "pit@example.com",
            "accountPassword": "2ab96390c7dbe3439de74d0c9b0b1767"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "msg": "success",
            "data": { "token": "session-token", "userId": "4242" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    assert!(client.is_logged_in().await);
    assert_eq!(client.user_id().await.as_deref(), Some("4242"));
}

#[tokio::test]
async fn login_failure_surfaces_as_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "10003",
            "msg": "account or password incorrect"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .login("pit@example.com", &SecretString::from("wrong"))
        .await
        .unwrap_err();

    match err {
        Error::Authentication { message } => {
            assert_eq!(message, "account or password incorrect");
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
    assert!(!client.is_logged_in().await);
}

#[tokio::test]
async fn requests_before_login_are_rejected_locally() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let err = client.fetch_devices().await.unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn));
}

// ── Signed headers ──────────────────────────────────────────────────

#[tokio::test]
async fn requests_carry_signed_headers() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/user/get"))
        .and(header("x-appId", "test-app-id"))
        .and(header("x-region", "US"))
        .and(header("x-token", "session-token"))
        .and(header_exists("x-sign"))
        .and(header_exists("x-nonce"))
        .and(header_exists("x-timestamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": { "nickname": "Pitmaster" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    let info = client.fetch_user_info().await.unwrap();
    assert_eq!(info["nickname"], "Pitmaster");
}

// ── Device roster ───────────────────────────────────────────────────

#[tokio::test]
async fn fetch_devices_concatenates_owned_then_shared() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/device/share/my/device/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": [
                { "deviceId": 1, "deviceName": "Smoker", "deviceModel": "WT10" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/app/device/share/shared/device/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": [
                {
                    "deviceId": "2",
                    "deviceName": "Neighbor grill",
                    "deviceShareId": 77,
                    "fromUserName": "Alex",
                    "shareStatus": 1
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    let devices = client.fetch_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id.as_deref(), Some("1"));
    assert_eq!(devices[1].device_id.as_deref(), Some("2"));
    assert_eq!(devices[1].device_share_id.as_deref(), Some("77"));
    assert_eq!(devices[1].from_user_name.as_deref(), Some("Alex"));
}

#[tokio::test]
async fn vendor_error_code_maps_to_api_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/device/share/my/device/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "50001",
            "msg": "server busy"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    let err = client.fetch_devices().await.unwrap_err();
    match err {
        Error::Api { code, message } => {
            assert_eq!(code, "50001");
            assert_eq!(message, "server busy");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn http_failure_maps_to_http_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/mqtt/cert/apply"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    let err = client.apply_mqtt_certificate().await.unwrap_err();
    match err {
        Error::Http { status, endpoint } => {
            assert_eq!(status, 502);
            assert_eq!(endpoint, "/app/mqtt/cert/apply");
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

// ── Certificate bootstrap ───────────────────────────────────────────

#[tokio::test]
async fn apply_mqtt_certificate_parses_bootstrap() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/app/mqtt/cert/apply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "0",
            "data": {
                "clientId": "android-4242-US-abcdef0123456789",
                "p12Url": "https://certs.example/bundle.p12",
                "p12Password": "p12-secret",
                "subTopics": ["app/user/4242/sub"]
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    login(&client).await;

    let bootstrap = client.apply_mqtt_certificate().await.unwrap();
    assert_eq!(bootstrap.client_id, "android-4242-US-abcdef0123456789");
    assert_eq!(bootstrap.p12_password, "p12-secret");
    assert_eq!(bootstrap.sub_topics, vec!["app/user/4242/sub"]);
}
