//! Live transport over hyper's pooled HTTP client

use std::io;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{StreamExt, TryStreamExt};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::body::{Body, ResponseType};
use crate::client::Transport;
use crate::message::{LiveResponse, Request};
use crate::{Result, TapedeckError};

use super::{POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST};

/// Transport that performs real HTTP calls
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Create a transport with a fresh connection pool
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build_http();

        Self { client }
    }

    /// Perform a request and decode the body as asked
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the request has no URL, `Transport` if the call
    /// or the body read fails
    pub async fn dispatch(
        &self,
        request: &Request,
        response_type: ResponseType,
    ) -> Result<LiveResponse> {
        let uri = request.url.clone().ok_or_else(|| TapedeckError::InvalidUrl {
            url: String::new(),
            reason: "request has no URL".to_string(),
        })?;

        debug!("Dispatching {} {}", request.method, uri);

        let mut http_request = hyper::Request::builder()
            .method(request.method.clone())
            .uri(uri)
            .body(Full::new(request.body.clone()))
            .map_err(|e| TapedeckError::Transport(format!("Failed to build request: {e}")))?;
        *http_request.headers_mut() = request.headers.clone();

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            TapedeckError::Transport(format!("Request failed: {e}"))
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, Vec<u8>)> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
            .collect();

        let body = if response_type == ResponseType::Stream {
            Body::Stream(
                response
                    .into_body()
                    .into_data_stream()
                    .map_err(io::Error::other)
                    .boxed(),
            )
        } else {
            let payload = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TapedeckError::Transport(format!("Failed to read response body: {e}")))?
                .to_bytes();
            Body::decode(payload, response_type)
        };

        Ok(LiveResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn send<'a>(
        &'a self,
        request: &'a Request,
        response_type: ResponseType,
    ) -> BoxFuture<'a, Result<LiveResponse>> {
        self.dispatch(request, response_type).boxed()
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[tokio::test]
    async fn test_missing_url_is_invalid() {
        let transport = HyperTransport::new();
        let mut request = Request::new(Method::GET, "http://localhost/".parse().unwrap());
        request.url = None;

        let result = transport.dispatch(&request, ResponseType::Text).await;
        assert!(matches!(result, Err(TapedeckError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = HyperTransport::default();
        // Port 9 (discard) on loopback is closed in test environments.
        let request = Request::new(Method::GET, "http://127.0.0.1:9/".parse().unwrap());

        let result = transport.dispatch(&request, ResponseType::Text).await;
        assert!(matches!(result, Err(TapedeckError::Transport(_))));
    }
}
