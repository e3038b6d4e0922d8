//! Integration tests for the HTTP transport and the filesystem image store,
//! the two pieces the scripted-transport tests never touch.

use std::sync::Arc;

use easycars_sync::config::EasyCarsConfig;
use easycars_sync::easycars::{
    ApiClient, DealerApiCredentials, EasyCarsError, Environment, HttpTransport, TokenCache,
    Transport, TransportRequest,
};
use easycars_sync::sync::images::{FilesystemImageStore, ImageStore};
use reqwest::Method;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(dealership_id: Uuid) -> DealerApiCredentials {
    DealerApiCredentials {
        dealership_id,
        account_number: "ACC-1001".to_string(),
        account_secret: "s3cret".to_string(),
        client_id: None,
        client_secret: None,
        environment: Environment::Test,
        yard_code: None,
    }
}

fn client_against(server: &MockServer) -> ApiClient {
    let config = EasyCarsConfig {
        test_api_url: server.uri(),
        retry_attempts: 3,
        retry_base_ms: 1,
        ..EasyCarsConfig::default()
    };
    let transport = HttpTransport::new(config.request_timeout_ms).unwrap();
    ApiClient::new(Arc::new(transport), Arc::new(TokenCache::new()), config)
}

#[tokio::test]
async fn http_transport_sends_json_body_and_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("authorization", "Bearer tok-1"))
        .and(body_json(json!({ "ping": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pong": true })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(5_000).unwrap();
    let response = transport
        .send(TransportRequest {
            method: Method::POST,
            url: format!("{}/echo", server.uri()),
            bearer_token: Some("tok-1".to_string()),
            body: Some(json!({ "ping": true })),
        })
        .await
        .unwrap();
    assert_eq!(response["pong"], true);
}

#[tokio::test]
async fn http_transport_surfaces_non_json_bodies_as_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(5_000).unwrap();
    let result = transport
        .send(TransportRequest {
            method: Method::GET,
            url: format!("{}/broken", server.uri()),
            bearer_token: None,
            body: None,
        })
        .await;
    assert!(matches!(result, Err(EasyCarsError::Transport(_))));
}

#[tokio::test]
async fn client_authenticates_then_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 0,
            "token": "tok-live",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Stock/GetAdvertisementStocks"))
        .and(header("authorization", "Bearer tok-live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 0,
            "stocks": [{ "vin": "WAUZZZ4G7DN000001", "make": "Audi" }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_against(&server);
    let stocks = client
        .get_stocks(&credentials(Uuid::new_v4()), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].vin.as_deref(), Some("WAUZZZ4G7DN000001"));
}

#[tokio::test]
async fn client_retries_temporary_failures_over_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 0,
            "token": "tok-live",
        })))
        .mount(&server)
        .await;
    // First attempt hits the temporary failure, the retry lands on success.
    Mock::given(method("GET"))
        .and(path("/Stock/GetAdvertisementStocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 5,
            "message": "busy",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Stock/GetAdvertisementStocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 0,
            "stocks": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_against(&server);
    let stocks = client
        .get_stocks(&credentials(Uuid::new_v4()), &CancellationToken::new())
        .await
        .unwrap();
    assert!(stocks.is_empty());
}

#[tokio::test]
async fn filesystem_store_writes_content_addressed_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemImageStore::new(dir.path(), "https://cdn.example.com/media/");
    let vehicle_id = Uuid::new_v4();

    let url = store
        .store(&vehicle_id, "0f343b0931126a20f133d67c2b018a3b", b"jpeg-bytes")
        .await
        .unwrap();
    assert_eq!(
        url,
        format!(
            "https://cdn.example.com/media/{}/0f343b0931126a20f133d67c2b018a3b.jpg",
            vehicle_id
        )
    );

    let written = dir
        .path()
        .join(vehicle_id.to_string())
        .join("0f343b0931126a20f133d67c2b018a3b.jpg");
    assert_eq!(std::fs::read(written).unwrap(), b"jpeg-bytes");
}
