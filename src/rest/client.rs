//! Orderly REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::{CredentialsProvider, RequestSigner, SystemTimestamp, TimestampProvider};
use crate::error::{ApiError, OrderlyError};
use crate::rest::endpoints::{API_VERSION, ORDERLY_MAINNET_URL, ORDERLY_TESTNET_URL, private, public};

/// Envelope wrapping every Orderly REST response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiResponse {
    /// Whether the request was accepted.
    pub success: bool,
    /// Server timestamp in milliseconds, when present.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Endpoint-specific payload.
    #[serde(default)]
    pub data: Value,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    code: i64,
    message: String,
}

/// The Orderly REST API client.
///
/// Public endpoints work without credentials; private endpoints sign every
/// request with the account's Ed25519 key.
///
/// # Example
///
/// ```rust,no_run
/// use orderly_api_client::rest::RestClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Public endpoints only.
///     let client = RestClient::new();
///
///     let info = client.get_maintenance_info().await?;
///     println!("status: {}", info.data);
///
///     Ok(())
/// }
/// ```
///
/// For private endpoints, provide credentials:
///
/// ```rust,no_run
/// use orderly_api_client::auth::StaticCredentials;
/// use orderly_api_client::rest::RestClient;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(StaticCredentials::new(
///         "<account id>",
///         "<orderly key>",
///         "<orderly secret>",
///     ));
///     let client = RestClient::builder().credentials(credentials).build();
///
///     let holdings = client.get_current_holding().await?;
///     println!("holdings: {}", holdings.data);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RestClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    timestamps: Arc<dyn TimestampProvider>,
}

impl RestClient {
    /// Create a new client with default settings.
    ///
    /// This client can only access public endpoints. Use
    /// [`RestClient::builder()`] to configure credentials for private ones.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    async fn request_api(
        &self,
        method: Method,
        endpoint: &str,
        signed: bool,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse, OrderlyError> {
        let query = if params.is_empty() {
            None
        } else {
            Some(
                serde_urlencoded::to_string(params)
                    .map_err(|e| OrderlyError::InvalidResponse(e.to_string()))?,
            )
        };

        let mut url = format!("{}/{}/{}", self.base_url, API_VERSION, endpoint);
        if let Some(query) = &query {
            url = format!("{url}?{query}");
        }
        debug!(method = %method, url = %url, "sending request");

        // Serialized once: the exact string that is signed is also sent.
        let body_json = body.map(serde_json::to_string).transpose()?;

        let mut request = self.http_client.request(method.clone(), &url);

        if signed {
            let credentials = self
                .credentials
                .as_ref()
                .ok_or(OrderlyError::MissingCredentials)?;
            let creds = credentials.get_credentials();
            let signer = RequestSigner::from_base58_secret(creds.expose_secret())?;
            let timestamp = self.timestamps.timestamp_ms();

            let mut path = Url::parse(&url)?.path().to_string();
            if let Some(query) = &query {
                path = format!("{path}?{query}");
            }
            let payload = signing_payload(timestamp, &method, &path, body_json.as_deref());
            debug!(payload = %payload, "signing request");
            let signature = signer.sign_base64(payload.as_bytes());

            request = request
                .header("orderly-timestamp", timestamp.to_string())
                .header("orderly-account-id", &creds.account_id)
                .header("orderly-key", format!("ed25519:{}", creds.orderly_key))
                .header("orderly-signature", signature)
                .header(CACHE_CONTROL, "no-cache")
                .header(
                    CONTENT_TYPE,
                    if body_json.is_some() {
                        "application/json"
                    } else {
                        "application/x-www-form-urlencoded"
                    },
                );
        }

        if let Some(body_json) = body_json {
            if !signed {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body_json);
        }

        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn get(
        &self,
        endpoint: &str,
        signed: bool,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.request_api(Method::GET, endpoint, signed, params, None).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<ApiResponse, OrderlyError> {
        self.request_api(Method::POST, endpoint, true, &[], Some(body)).await
    }

    async fn delete(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.request_api(Method::DELETE, endpoint, true, params, None).await
    }

    /// Parse a response from the Orderly API.
    async fn parse_response(&self, response: reqwest::Response) -> Result<ApiResponse, OrderlyError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => Err(OrderlyError::Api(ApiError::new(
                    status.as_u16(),
                    error.code,
                    error.message,
                ))),
                Err(_) => Err(OrderlyError::InvalidResponse(format!(
                    "HTTP {status}: {body}"
                ))),
            };
        }

        serde_json::from_str(&body).map_err(|e| {
            OrderlyError::InvalidResponse(format!("Failed to parse response: {e}. Body: {body}"))
        })
    }

    // ========== Public Endpoints ==========

    /// Get system maintenance status (public).
    pub async fn get_maintenance_info(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(public::SYSTEM_INFO, false, &[]).await
    }

    /// Get positions under liquidation (public).
    pub async fn get_liquidation(
        &self,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(public::LIQUIDATION, false, params).await
    }

    /// Get liquidated positions info (public).
    pub async fn get_liquidated_positions(
        &self,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(public::LIQUIDATED_POSITIONS, false, params).await
    }

    /// Get insurance fund info (public).
    pub async fn get_insurance_fund(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(public::INSURANCE_FUND, false, &[]).await
    }

    /// Get available trading symbols (public).
    pub async fn get_available_symbols(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(public::SYMBOLS, false, &[]).await
    }

    /// Get futures info for a single market (public).
    pub async fn get_futures_for_one_market(
        &self,
        symbol: &str,
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(&format!("{}/{symbol}", public::FUTURES), false, &[]).await
    }

    /// Get funding rates, for one market or all of them (public).
    pub async fn get_funding_rates(
        &self,
        symbol: Option<&str>,
    ) -> Result<ApiResponse, OrderlyError> {
        match symbol {
            Some(symbol) => {
                self.get(&format!("{}/{symbol}", public::FUNDING_RATE), false, &[]).await
            }
            None => self.get(public::FUNDING_RATES, false, &[]).await,
        }
    }

    /// Get the orderbook snapshot for a market (public).
    pub async fn get_orderbook(
        &self,
        symbol: &str,
        max_level: Option<u32>,
    ) -> Result<ApiResponse, OrderlyError> {
        let mut params = Vec::new();
        if let Some(level) = max_level {
            params.push(("max_level", level.to_string()));
        }
        self.get(&format!("{}/{symbol}", public::ORDERBOOK), false, &params).await
    }

    /// Get kline data for a market and interval, e.g. `1m`, `1h` (public).
    pub async fn get_kline(
        &self,
        symbol: &str,
        kline_type: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(&format!("{}/{symbol}/{kline_type}", public::KLINE), false, params)
            .await
    }

    /// Get recent market trades (public).
    pub async fn get_market_trades(
        &self,
        symbol: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(&format!("{}/{symbol}", public::MARKET_TRADES), false, params)
            .await
    }

    // ========== Private Endpoints ==========

    /// Get user statistics (private).
    pub async fn get_user_statistics(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(private::USER_STATISTICS, true, &[]).await
    }

    /// Create a new order (private).
    pub async fn create_order(&self, order: &Value) -> Result<ApiResponse, OrderlyError> {
        self.post(private::ORDER, order).await
    }

    /// Claim liquidated positions (private).
    pub async fn claim_liquidated_positions(
        &self,
        claim: &Value,
    ) -> Result<ApiResponse, OrderlyError> {
        self.post(private::CLAIM_LIQUIDATION, claim).await
    }

    /// Claim from the insurance fund (private).
    pub async fn claim_insurance_fund(&self, claim: &Value) -> Result<ApiResponse, OrderlyError> {
        self.post(private::CLAIM_INSURANCE_FUND, claim).await
    }

    /// Get all positions info (private).
    pub async fn get_all_positions(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(private::POSITIONS, true, &[]).await
    }

    /// Get current holdings (private).
    pub async fn get_current_holding(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(private::HOLDING, true, &[]).await
    }

    /// Get account information (private).
    pub async fn get_account_info(&self) -> Result<ApiResponse, OrderlyError> {
        self.get(private::ACCOUNT_INFO, true, &[]).await
    }

    /// Get order details by order id (private).
    pub async fn get_order(&self, order_id: &str) -> Result<ApiResponse, OrderlyError> {
        self.get(&format!("{}/{order_id}", private::ORDER), true, &[]).await
    }

    /// Cancel a single order (private).
    pub async fn cancel_order(&self, order_id: &str) -> Result<ApiResponse, OrderlyError> {
        self.delete(&format!("{}/{order_id}", private::ORDER), &[]).await
    }

    /// Cancel a batch of orders by id (private).
    pub async fn batch_cancel_orders(
        &self,
        order_ids: &[&str],
    ) -> Result<ApiResponse, OrderlyError> {
        let params = [("order_ids", order_ids.join(","))];
        self.delete(private::BATCH_ORDER, &params).await
    }

    /// Get the orders list (private).
    pub async fn get_orders(&self, params: &[(&str, String)]) -> Result<ApiResponse, OrderlyError> {
        self.get(private::ORDERS, true, params).await
    }

    /// Get trade history (private).
    pub async fn get_trades(&self, params: &[(&str, String)]) -> Result<ApiResponse, OrderlyError> {
        self.get(private::TRADES, true, params).await
    }

    /// Get funding fee history (private).
    pub async fn get_funding_fee_history(
        &self,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, OrderlyError> {
        self.get(private::FUNDING_FEE_HISTORY, true, params).await
    }
}

/// Build the string that gets signed: `{timestamp}{METHOD}{path}{body}`.
///
/// The path includes the version prefix and, when present, the encoded query
/// string exactly as sent.
fn signing_payload(timestamp: i64, method: &Method, path: &str, body: Option<&str>) -> String {
    format!(
        "{timestamp}{}{path}{}",
        method.as_str(),
        body.unwrap_or_default()
    )
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

/// Builder for [`RestClient`].
pub struct RestClientBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    timestamps: Option<Arc<dyn TimestampProvider>>,
    user_agent: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl RestClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: ORDERLY_MAINNET_URL.to_string(),
            credentials: None,
            timestamps: None,
            user_agent: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Target the testnet API.
    pub fn testnet(mut self) -> Self {
        self.base_url = ORDERLY_TESTNET_URL.to_string();
        self
    }

    /// Set the credentials provider for authenticated requests.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the timestamp source used for signing (useful for testing).
    pub fn timestamp_provider(mut self, timestamps: Arc<dyn TimestampProvider>) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the client.
    pub fn build(self) -> RestClient {
        // Build default headers.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("orderly-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("orderly-api-client"));
        headers.insert(USER_AGENT, header_value);

        // Build the HTTP client with middleware.
        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.max_retries);

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let timestamps = self.timestamps.unwrap_or_else(|| Arc::new(SystemTimestamp));

        RestClient {
            http_client: client,
            base_url: self.base_url,
            credentials: self.credentials,
            timestamps,
        }
    }
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
