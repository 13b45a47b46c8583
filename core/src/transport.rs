//! The single configured HTTP client and its interceptor chain.
//!
//! # Design
//! `Transport` owns the `reqwest::Client`, the `ClientConfig` and an
//! injected `TokenStore`. `execute` runs three steps in order:
//!
//! 1. `authorize` (request interceptor) reads the token at dispatch time and
//!    appends `authorization: Bearer <token>` when one is present.
//! 2. The request is sent with the configured timeout.
//! 3. `normalize_response` (response interceptor) passes 2xx through and
//!    turns everything else into an `ApiError`.
//!
//! Failures are logged with status and message only.

use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{normalize_response, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::token::TokenStore;

#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
}

impl Transport {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::transport(e.to_string()))?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Absolute URL for an API path such as `/categories`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Request interceptor. A token-store failure aborts the request.
    pub fn authorize(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        if let Some(token) = self.tokens.get()? {
            request
                .headers
                .push(("authorization".to_string(), token.bearer()));
        }
        Ok(())
    }

    /// Send `request` and return the normalized response.
    pub async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.authorize(&mut request)?;

        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(
            method = method.as_str(),
            url = %url,
            authenticated = request.header("authorization").is_some(),
            "dispatching request"
        );

        let result = match self.send(request).await {
            Ok(response) => normalize_response(response),
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            tracing::warn!(
                method = method.as_str(),
                url = %url,
                status = err.status(),
                message = %err.message(),
                "request failed"
            );
        }
        result
    }

    /// Like `execute`, but gives up with a transport error once `cancel`
    /// fires. The in-flight request is dropped.
    pub async fn execute_cancellable(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        let url = request.url.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(url = %url, "request cancelled");
                Err(ApiError::transport("request cancelled"))
            }
            result = self.execute(request) => result,
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Serialization(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Serialization(e.to_string()))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
