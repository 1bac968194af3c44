use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use url::Url;

use super::common::{ApiErrorResponse, ApiQueryParams, Page};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, RequestStats};

/// Core services API version, shared by compute, networking and identity
pub const API_VERSION: &str = "20160918";

const NEXT_PAGE_HEADER: &str = "opc-next-page";
const RETRY_TOKEN_HEADER: &str = "opc-retry-token";
const REQUEST_ID_HEADER: &str = "opc-request-id";

/// The OCI service a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Core,
    Identity,
}

impl Service {
    fn host_prefix(&self) -> &'static str {
        match self {
            Service::Core => "iaas",
            Service::Identity => "identity",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), doubling from the
    /// initial backoff and never exceeding `max_backoff_ms`
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Overrides the per-service regional hosts when set
    pub endpoint: Option<String>,
    pub security_token: String,
    pub retry: RetryConfig,
    pub pool: ConnectionPoolConfig,
}

impl ClientConfig {
    pub fn new(region: &str, security_token: &str) -> Self {
        Self {
            region: region.to_string(),
            endpoint: None,
            security_token: security_token.to_string(),
            retry: RetryConfig::default(),
            pool: ConnectionPoolConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// OCI REST API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    region: String,
    core_url: String,
    identity_url: String,
    auth_header: String,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if config.region.trim().is_empty() {
            return Err(ApiError::InvalidUrl("region must not be empty".to_string()));
        }

        let (core_url, identity_url) = match &config.endpoint {
            Some(endpoint) => {
                let base = normalize_base_url(endpoint)?;
                (base.clone(), base)
            }
            None => (
                regional_url(Service::Core, &config.region)?,
                regional_url(Service::Identity, &config.region)?,
            ),
        };

        let pool_manager = ConnectionPoolManager::new(config.pool.clone());
        let http_client = pool_manager.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                region: config.region,
                core_url,
                identity_url,
                auth_header: format!("Bearer {}", config.security_token),
                retry_config: config.retry,
                pool_manager,
            }),
        })
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn base_url(&self, service: Service) -> &str {
        match service {
            Service::Core => &self.inner.core_url,
            Service::Identity => &self.inner.identity_url,
        }
    }

    fn url(&self, service: Service, path: &str, params: &ApiQueryParams) -> String {
        format!(
            "{}/{}{}{}",
            self.base_url(service),
            API_VERSION,
            path,
            params.to_query_string()
        )
    }

    pub async fn get_stats(&self) -> RequestStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Core services: networking and compute
    pub fn core(&self) -> crate::api::core::CoreApi<'_> {
        crate::api::core::CoreApi::new(self)
    }

    /// Identity service: availability domains
    pub fn identity(&self) -> crate::api::identity::IdentityApi<'_> {
        crate::api::identity::IdentityApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let url = self.url(service, path, params);
        let response = self
            .execute_with_retry(
                || {
                    tracing::debug!("GET {}", url);
                    self.inner
                        .http_client
                        .get(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .send()
                },
                path,
            )
            .await?;
        parse_body(response).await
    }

    /// Execute a GET for one page of a list call
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<Page<T>, ApiError> {
        let url = self.url(service, path, params);
        let response = self
            .execute_with_retry(
                || {
                    tracing::debug!("GET {}", url);
                    self.inner
                        .http_client
                        .get(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .send()
                },
                path,
            )
            .await?;

        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let items = parse_body(response).await?;

        Ok(Page { items, next_page })
    }

    /// Follows `opc-next-page` until the service stops returning one
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;

        loop {
            let page_params = params.clone().add_optional("page", page.as_deref());
            let result: Page<T> = self.get_page(service, path, &page_params).await?;
            items.extend(result.items);

            match result.next_page {
                Some(next) if page.as_deref() == Some(next.as_str()) => {
                    return Err(ApiError::ParseError(format!(
                        "{} returned the same page token twice",
                        path
                    )));
                }
                Some(next) => page = Some(next),
                None => break,
            }
        }

        tracing::debug!("Listed {} items from {}", items.len(), path);
        Ok(items)
    }

    /// Execute a POST request. A fresh retry token makes the retried
    /// attempts idempotent on the service side.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(service, path, &ApiQueryParams::new());
        let retry_token = uuid::Uuid::new_v4().simple().to_string();
        let response = self
            .execute_with_retry(
                || {
                    tracing::debug!("POST {}", url);
                    self.inner
                        .http_client
                        .post(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .header(RETRY_TOKEN_HEADER, &retry_token)
                        .json(body)
                        .send()
                },
                path,
            )
            .await?;
        parse_body(response).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(service, path, &ApiQueryParams::new());
        let response = self
            .execute_with_retry(
                || {
                    tracing::debug!("PUT {}", url);
                    self.inner
                        .http_client
                        .put(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(body)
                        .send()
                },
                path,
            )
            .await?;
        parse_body(response).await
    }

    /// Execute a DELETE request; OCI answers with an empty body
    pub async fn delete(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<(), ApiError> {
        let url = self.url(service, path, params);
        self.execute_with_retry(
            || {
                tracing::debug!("DELETE {}", url);
                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
            },
            path,
        )
        .await
        .map(|_| ())
    }

    /// Sends the request, retrying throttling, server errors and
    /// connection failures with exponential backoff
    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let retry = &self.inner.retry_config;
        let pool = &self.inner.pool_manager;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = retry.backoff_ms(attempt);
                tracing::warn!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                pool.record_retry().await;
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        pool.record_request(true).await;
                        return Ok(response);
                    }

                    pool.record_request(false).await;

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(error_from_response(response).await);
                    }
                }
                Err(e) => {
                    pool.record_request(false).await;

                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(pool.request_timeout().as_secs()));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn regional_url(service: Service, region: &str) -> Result<String, ApiError> {
    normalize_base_url(&format!(
        "https://{}.{}.oraclecloud.com",
        service.host_prefix(),
        region
    ))
}

fn normalize_base_url(endpoint: &str) -> Result<String, ApiError> {
    let url = Url::parse(endpoint).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ApiError::InvalidUrl(format!(
            "{}: expected an http(s) URL",
            endpoint
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

async fn parse_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    tracing::trace!("API response body: {}", text);

    serde_json::from_str::<T>(&text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let (code, message) = match serde_json::from_str::<ApiErrorResponse>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) => (status.as_str().to_string(), text),
    };

    tracing::error!(
        "API error: status={} code={} opc-request-id={} message={}",
        status,
        code,
        request_id,
        message
    );

    match status {
        StatusCode::UNAUTHORIZED => ApiError::AuthError,
        StatusCode::NOT_FOUND => ApiError::NotFound(format!("{}: {}", code, message)),
        _ => ApiError::ApiError {
            status: status.as_u16(),
            code,
            message,
        },
    }
}
