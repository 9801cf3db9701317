//! JSON-over-HTTP request execution with retry.

use log::{debug, warn};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::auth::AuthSource;
use crate::error::{AgoraLinkError, Result};
use crate::models::ErrorDetail;

/// Step added to the wait before each retry.
const RETRY_STEP: Duration = Duration::from_millis(100);

/// Sends REST requests under `{base}/api`.
#[derive(Debug, Clone)]
pub(crate) struct RestExecutor {
    api_url: String,
    http_client: reqwest::Client,
    auth: AuthSource,
    max_retries: u32,
}

impl RestExecutor {
    pub(crate) fn new(base_url: &str, http_client: reqwest::Client, auth: AuthSource, max_retries: u32) -> Self {
        Self {
            api_url: format!("{}/api", base_url.trim_end_matches('/')),
            http_client,
            auth,
            max_retries,
        }
    }

    pub(crate) fn auth(&self) -> &AuthSource {
        &self.auth
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&'static str, String)]) -> Result<R> {
        let response = self.send(Method::GET, path, query, None).await?;
        Ok(response.json::<R>().await?)
    }

    pub(crate) async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, &[], Some(&body)).await?;
        Ok(response.json::<R>().await?)
    }

    /// Body-less request whose response body is JSON.
    pub(crate) async fn call<R: DeserializeOwned>(&self, method: Method, path: &str) -> Result<R> {
        let response = self.send(method, path, &[], None).await?;
        Ok(response.json::<R>().await?)
    }

    /// Body-less request whose response body is ignored.
    pub(crate) async fn call_empty(&self, method: Method, path: &str) -> Result<()> {
        self.send(method, path, &[], None).await?;
        Ok(())
    }

    /// Send with retry; only a success response is returned.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.api_url, path);
        let overall_start = Instant::now();
        let mut retries: u32 = 0;

        loop {
            // Requests with bodies can't be cloned, so rebuild each attempt.
            let mut request = self.http_client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request = self.auth.resolve().apply_to_request(request);

            let attempt_start = Instant::now();
            debug!(
                "[agora-link] {} {} (attempt {}/{})",
                method,
                url,
                retries + 1,
                self.max_retries + 1
            );

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        "[agora-link] {} {} -> {} in {}ms",
                        method,
                        url,
                        status,
                        attempt_start.elapsed().as_millis()
                    );
                    if status.is_success() {
                        return Ok(response);
                    }
                    let error = error_from_response(status, response).await;
                    if retries < self.max_retries && method.is_idempotent() && error.is_retriable() {
                        retries += 1;
                        warn!(
                            "[agora-link] {} {} returned {}, retrying (attempt {}/{})",
                            method,
                            url,
                            status,
                            retries + 1,
                            self.max_retries + 1
                        );
                        tokio::time::sleep(RETRY_STEP * retries).await;
                        continue;
                    }
                    warn!("[agora-link] {} {} failed: {}", method, url, error);
                    return Err(error);
                },
                Err(e) => {
                    // A connect failure means the server never saw the request.
                    let never_sent = e.is_connect();
                    let error = AgoraLinkError::from(e);
                    if retries < self.max_retries && (never_sent || (method.is_idempotent() && error.is_retriable())) {
                        retries += 1;
                        warn!(
                            "[agora-link] Retriable error on {} {} (attempt {}/{}): {}",
                            method,
                            url,
                            retries + 1,
                            self.max_retries + 1,
                            error
                        );
                        tokio::time::sleep(RETRY_STEP * retries).await;
                        continue;
                    }
                    warn!(
                        "[agora-link] {} {} failed after {}ms: {}",
                        method,
                        url,
                        overall_start.elapsed().as_millis(),
                        error
                    );
                    return Err(error);
                },
            }
        }
    }
}

async fn error_from_response(status: StatusCode, response: Response) -> AgoraLinkError {
    let body = response.text().await.unwrap_or_default();
    error_from_body(status, &body)
}

/// Map a non-success status and body to an error, preferring the JSON `message`.
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> AgoraLinkError {
    let message = match serde_json::from_str::<ErrorDetail>(body) {
        Ok(detail) if !detail.message.is_empty() => detail.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };

    if status == StatusCode::UNAUTHORIZED {
        AgoraLinkError::AuthenticationError(message)
    } else {
        AgoraLinkError::ServerError {
            status_code: status.as_u16(),
            message,
        }
    }
}
