//! Retrying EasyCars API client
//!
//! The client owns the retry/backoff loop, token acquisition, and the
//! response-code check applied to every call. Actual I/O goes through the
//! [`Transport`] trait so tests can count attempts without a network.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::EasyCarsConfig;

use super::error::EasyCarsError;
use super::token::TokenCache;
use super::types::{
    Environment, LeadDetailResponse, LeadStatusRequest, LeadUpsertRequest, LeadUpsertResponse,
    StockItem, StocksResponse, TokenRequest, TokenResponse, paths,
};

/// Decrypted credentials for one dealership, assembled per sync run.
#[derive(Debug, Clone)]
pub struct DealerApiCredentials {
    pub dealership_id: Uuid,
    pub account_number: String,
    pub account_secret: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub environment: Environment,
    pub yard_code: Option<String>,
}

/// One outbound request as handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Seam between the client and the wire.
///
/// Returns the parsed JSON body; transport-level failures (connect,
/// timeout, non-JSON body) surface as [`EasyCarsError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, EasyCarsError>;
}

/// Production transport backed by a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64) -> Result<Self, EasyCarsError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_millis(timeout_ms))
            .build()
            .map_err(|e| EasyCarsError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, EasyCarsError> {
        let mut builder = self.client.request(request.method, &request.url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let body = response.json::<serde_json::Value>().await?;
        Ok(body)
    }
}

/// Retrying client over the EasyCars API.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenCache>,
    config: EasyCarsConfig,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenCache>,
        config: EasyCarsConfig,
    ) -> Self {
        Self {
            transport,
            tokens,
            config,
        }
    }

    fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Test => &self.config.test_api_url,
            Environment::Production => &self.config.production_api_url,
        }
    }

    fn url(&self, environment: Environment, path: &str) -> String {
        format!("{}{}", self.base_url(environment).trim_end_matches('/'), path)
    }

    /// Fetch the full advertisement stock list for a dealership.
    #[instrument(skip_all, fields(dealership_id = %credentials.dealership_id))]
    pub async fn get_stocks(
        &self,
        credentials: &DealerApiCredentials,
        cancel: &CancellationToken,
    ) -> Result<Vec<StockItem>, EasyCarsError> {
        let response: StocksResponse = self
            .call(credentials, Method::GET, paths::GET_STOCKS, None, cancel)
            .await?;
        Ok(response.stocks)
    }

    /// Create a lead on the remote system.
    #[instrument(skip_all, fields(dealership_id = %credentials.dealership_id))]
    pub async fn create_lead(
        &self,
        credentials: &DealerApiCredentials,
        request: &LeadUpsertRequest,
        cancel: &CancellationToken,
    ) -> Result<LeadUpsertResponse, EasyCarsError> {
        let body = serde_json::to_value(request)
            .map_err(|e| EasyCarsError::Transport(e.to_string()))?;
        self.call(credentials, Method::POST, paths::CREATE_LEAD, Some(body), cancel)
            .await
    }

    /// Update an existing remote lead's details.
    #[instrument(skip_all, fields(dealership_id = %credentials.dealership_id))]
    pub async fn update_lead(
        &self,
        credentials: &DealerApiCredentials,
        request: &LeadUpsertRequest,
        cancel: &CancellationToken,
    ) -> Result<LeadUpsertResponse, EasyCarsError> {
        let body = serde_json::to_value(request)
            .map_err(|e| EasyCarsError::Transport(e.to_string()))?;
        self.call(credentials, Method::POST, paths::UPDATE_LEAD, Some(body), cancel)
            .await
    }

    /// Push a status-only change for a remote lead.
    #[instrument(skip_all, fields(dealership_id = %credentials.dealership_id))]
    pub async fn update_lead_status(
        &self,
        credentials: &DealerApiCredentials,
        request: &LeadStatusRequest,
        cancel: &CancellationToken,
    ) -> Result<(), EasyCarsError> {
        let body = serde_json::to_value(request)
            .map_err(|e| EasyCarsError::Transport(e.to_string()))?;
        let _: serde_json::Value = self
            .call_raw(
                credentials,
                Method::POST,
                paths::UPDATE_LEAD_STATUS,
                Some(body),
                cancel,
            )
            .await?;
        Ok(())
    }

    /// Fetch the current remote state of one lead.
    #[instrument(skip_all, fields(dealership_id = %credentials.dealership_id))]
    pub async fn get_lead_detail(
        &self,
        credentials: &DealerApiCredentials,
        lead_number: &str,
        cancel: &CancellationToken,
    ) -> Result<LeadDetailResponse, EasyCarsError> {
        let body = serde_json::json!({ "leadNumber": lead_number });
        self.call(
            credentials,
            Method::GET,
            paths::GET_LEAD_DETAIL,
            Some(body),
            cancel,
        )
        .await
    }

    /// Typed call wrapper: runs the retry loop, then deserializes the
    /// response body into the caller's type.
    async fn call<T: DeserializeOwned>(
        &self,
        credentials: &DealerApiCredentials,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<T, EasyCarsError> {
        let value = self.call_raw(credentials, method, path, body, cancel).await?;
        serde_json::from_value(value)
            .map_err(|e| EasyCarsError::Transport(format!("unexpected response shape: {}", e)))
    }

    /// Retry loop around one authenticated call.
    ///
    /// Attempts up to `retry_attempts` times in total; only temporary and
    /// transport failures are retried, with exponential backoff between
    /// attempts. Token acquisition runs inside the loop, so a flaky token
    /// endpoint is retried exactly like a flaky data endpoint. An
    /// authentication failure invalidates the cached token so the next run
    /// re-authenticates from scratch.
    async fn call_raw(
        &self,
        credentials: &DealerApiCredentials,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, EasyCarsError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = EasyCarsError::Transport("no attempt made".to_string());

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(EasyCarsError::Cancelled);
            }

            let started = std::time::Instant::now();
            let result = match self.get_or_refresh_token(credentials, cancel).await {
                Ok(token) => {
                    let request = TransportRequest {
                        method: method.clone(),
                        url: self.url(credentials.environment, path),
                        bearer_token: Some(token),
                        body: body.clone(),
                    };
                    tokio::select! {
                        r = self.transport.send(request) => r,
                        _ = cancel.cancelled() => return Err(EasyCarsError::Cancelled),
                    }
                    .and_then(check_envelope)
                }
                // Token failures flow through the same retry classification
                // as the data call.
                Err(e) => Err(e),
            };
            histogram!("easycars_api_request_duration_ms", "path" => path.to_string())
                .record(started.elapsed().as_millis() as f64);

            let error = match result {
                Ok(value) => {
                    counter!("easycars_api_requests_total", "path" => path.to_string(), "outcome" => "success")
                        .increment(1);
                    return Ok(value);
                }
                Err(e) => e,
            };

            counter!("easycars_api_requests_total", "path" => path.to_string(), "outcome" => "error")
                .increment(1);

            if matches!(error, EasyCarsError::Authentication(_)) {
                self.tokens.invalidate(&credentials.dealership_id);
            }

            if !error.is_retryable() || attempt == attempts {
                return Err(error);
            }

            let delay = self.config.retry_base_ms.saturating_mul(1 << (attempt - 1));
            debug!(
                attempt,
                delay_ms = delay,
                error = %error,
                "retrying EasyCars call"
            );
            last_error = error;

            tokio::select! {
                _ = tokio::time::sleep(StdDuration::from_millis(delay)) => {}
                _ = cancel.cancelled() => return Err(EasyCarsError::Cancelled),
            }
        }

        Err(last_error)
    }

    /// Return a usable bearer token, authenticating if the cache has none.
    ///
    /// A failed authentication is never cached; callers see the error and
    /// the cache stays empty for that dealership.
    async fn get_or_refresh_token(
        &self,
        credentials: &DealerApiCredentials,
        cancel: &CancellationToken,
    ) -> Result<String, EasyCarsError> {
        if let Some(token) = self
            .tokens
            .get(&credentials.dealership_id, self.config.token_safety_margin())
        {
            return Ok(token);
        }

        let body = serde_json::to_value(TokenRequest {
            account_number: credentials.account_number.clone(),
            account_secret: credentials.account_secret.clone(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            environment: credentials.environment.as_str().to_string(),
        })
        .map_err(|e| EasyCarsError::Transport(e.to_string()))?;

        let request = TransportRequest {
            method: Method::POST,
            url: self.url(credentials.environment, paths::TOKEN),
            bearer_token: None,
            body: Some(body),
        };

        let value = tokio::select! {
            r = self.transport.send(request) => r?,
            _ = cancel.cancelled() => return Err(EasyCarsError::Cancelled),
        };

        let response: TokenResponse = serde_json::from_value(check_envelope(value)?)
            .map_err(|e| EasyCarsError::Transport(format!("bad token response: {}", e)))?;

        let token = response.token.ok_or_else(|| {
            EasyCarsError::Transport("token response carried no token".to_string())
        })?;

        self.tokens.insert(
            credentials.dealership_id,
            token.clone(),
            response.expires_at,
            self.config.token_max_lifetime(),
        );

        debug!(dealership_id = %credentials.dealership_id, "acquired EasyCars token");
        Ok(token)
    }
}

/// Apply the vendor response-code check to a parsed body.
fn check_envelope(value: serde_json::Value) -> Result<serde_json::Value, EasyCarsError> {
    let code = value
        .get("responseCode")
        .and_then(|c| c.as_i64())
        .ok_or_else(|| EasyCarsError::Transport("response carried no responseCode".to_string()))?;
    let message = value.get("message").and_then(|m| m.as_str());
    if let Err(e) = EasyCarsError::from_response_code(code, message) {
        if !matches!(e, EasyCarsError::Temporary(_) | EasyCarsError::Transport(_)) {
            warn!(code, "EasyCars call failed: {}", e);
        }
        return Err(e);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration;

    use super::*;

    /// Transport that replays a scripted list of responses and records
    /// every request it sees.
    struct ScriptedTransport {
        responses: Mutex<Vec<Result<serde_json::Value, EasyCarsError>>>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<serde_json::Value, EasyCarsError>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<serde_json::Value, EasyCarsError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(EasyCarsError::Transport("script exhausted".to_string())))
        }
    }

    fn test_config() -> EasyCarsConfig {
        EasyCarsConfig {
            test_api_url: "http://test.invalid".to_string(),
            production_api_url: "http://prod.invalid".to_string(),
            retry_attempts: 3,
            retry_base_ms: 1,
            request_timeout_ms: 1_000,
            token_safety_margin_secs: 60,
            token_max_lifetime_secs: 3_600,
        }
    }

    fn test_credentials() -> DealerApiCredentials {
        DealerApiCredentials {
            dealership_id: Uuid::new_v4(),
            account_number: "EC-1001".to_string(),
            account_secret: "secret".to_string(),
            client_id: None,
            client_secret: None,
            environment: Environment::Test,
            yard_code: None,
        }
    }

    fn token_ok() -> Result<serde_json::Value, EasyCarsError> {
        Ok(serde_json::json!({
            "responseCode": 0,
            "token": "tok-1",
            "expiresAt": (chrono::Utc::now() + Duration::hours(1)).to_rfc3339(),
        }))
    }

    fn stocks_ok() -> Result<serde_json::Value, EasyCarsError> {
        Ok(serde_json::json!({
            "responseCode": 0,
            "stocks": [{"vin": "VIN1", "make": "Audi"}],
        }))
    }

    fn client_with(
        responses: Vec<Result<serde_json::Value, EasyCarsError>>,
    ) -> (ApiClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let client = ApiClient::new(
            transport.clone(),
            Arc::new(TokenCache::new()),
            test_config(),
        );
        (client, transport)
    }

    #[tokio::test]
    async fn test_successful_stock_fetch_authenticates_once() {
        let (client, transport) = client_with(vec![token_ok(), stocks_ok()]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(stocks[0].vin.as_deref(), Some("VIN1"));
        // One token request plus one stock request.
        assert_eq!(transport.request_count(), 2);

        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].url.ends_with("/token"));
        assert!(requests[0].bearer_token.is_none());
        assert_eq!(requests[1].bearer_token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_cached_token_reused_across_calls() {
        let (client, transport) = client_with(vec![token_ok(), stocks_ok(), stocks_ok()]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        client.get_stocks(&credentials, &cancel).await.unwrap();
        client.get_stocks(&credentials, &cancel).await.unwrap();
        // Second call must not re-authenticate.
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_temporary_error_retried_to_exhaustion() {
        let temporary = || {
            Ok(serde_json::json!({
                "responseCode": 5,
                "message": "busy",
            }))
        };
        let (client, transport) =
            client_with(vec![token_ok(), temporary(), temporary(), temporary()]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Temporary(_)));
        // Token once, then three data attempts.
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_temporary_error_recovers_mid_retry() {
        let temporary = Ok(serde_json::json!({"responseCode": 5}));
        let (client, transport) = client_with(vec![token_ok(), temporary, stocks_ok()]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_validation_error_not_retried() {
        let validation = Ok(serde_json::json!({
            "responseCode": 7,
            "message": "missing field",
        }));
        let (client, transport) = client_with(vec![token_ok(), validation]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Validation(_)));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let fatal = Ok(serde_json::json!({"responseCode": 9}));
        let (client, transport) = client_with(vec![token_ok(), fatal]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Fatal(_)));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_retried() {
        let (client, transport) = client_with(vec![
            token_ok(),
            Err(EasyCarsError::Transport("connect refused".to_string())),
            stocks_ok(),
        ]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_on_token_endpoint_retried() {
        let (client, transport) = client_with(vec![
            Err(EasyCarsError::Transport("timeout".to_string())),
            token_ok(),
            stocks_ok(),
        ]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        // Failed token attempt, then token and data on the retry.
        assert_eq!(transport.request_count(), 3);
        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].url.ends_with("/token"));
        assert!(requests[1].url.ends_with("/token"));
    }

    #[tokio::test]
    async fn test_auth_failure_invalidates_cached_token() {
        let auth_failure = Ok(serde_json::json!({
            "responseCode": 1,
            "message": "token expired",
        }));
        let (client, transport) = client_with(vec![
            token_ok(),
            auth_failure,
            // next call re-authenticates because the cache was cleared
            token_ok(),
            stocks_ok(),
        ]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Authentication(_)));

        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_token_acquisition_not_cached() {
        let token_rejected = Ok(serde_json::json!({
            "responseCode": 1,
            "message": "bad account",
        }));
        let (client, transport) = client_with(vec![token_rejected, token_ok(), stocks_ok()]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Authentication(_)));

        // A later call must try the token endpoint again.
        let stocks = client.get_stocks(&credentials, &cancel).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let (client, transport) = client_with(vec![token_ok(), stocks_ok()]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Cancelled));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_environment_selects_base_url() {
        let (client, transport) = client_with(vec![token_ok(), stocks_ok()]);
        let cancel = CancellationToken::new();
        let mut credentials = test_credentials();
        credentials.environment = Environment::Production;

        client.get_stocks(&credentials, &cancel).await.unwrap();
        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].url.starts_with("http://prod.invalid"));
        assert!(requests[1].url.starts_with("http://prod.invalid"));
    }

    #[tokio::test]
    async fn test_missing_response_code_is_transport_error() {
        let (client, _transport) = client_with(vec![
            token_ok(),
            Ok(serde_json::json!({"unexpected": true})),
            Ok(serde_json::json!({"unexpected": true})),
            Ok(serde_json::json!({"unexpected": true})),
        ]);
        let cancel = CancellationToken::new();
        let credentials = test_credentials();

        let err = client.get_stocks(&credentials, &cancel).await.unwrap_err();
        assert!(matches!(err, EasyCarsError::Transport(_)));
    }
}
