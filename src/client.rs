//! HTTP client wiring the recorder's hooks around a transport

use bytes::Bytes;
use futures_util::future::BoxFuture;
use hyper::Method;
use tracing::debug;

use crate::body::{Body, ResponseType};
use crate::config::ClientConfig;
use crate::message::{LiveResponse, Request, Response};
use crate::network;
use crate::recording::{Decision, Recorder};
use crate::{replay, Result};

/// Performs live HTTP calls for a [`Client`]
pub trait Transport: Send + Sync {
    /// Send a request and decode the body in the requested representation
    fn send<'a>(
        &'a self,
        request: &'a Request,
        response_type: ResponseType,
    ) -> BoxFuture<'a, Result<LiveResponse>>;
}

/// Client that records the first live response per key and replays it after
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    recorder: Recorder,
    base_url: Option<String>,
}

impl<T: Transport> Client<T> {
    /// Create a client with its own recorder
    #[must_use]
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            recorder: Recorder::new(config),
            base_url: None,
        }
    }

    /// Create a client, rejecting invalid settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the settings do not validate
    pub fn try_new(transport: T, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport,
            recorder: Recorder::try_new(config)?,
            base_url: None,
        })
    }

    /// Resolve relative URLs against `base_url`
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The recorder behind this client
    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// The live transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute a request: bypass, replay, or dispatch live and record.
    ///
    /// # Errors
    ///
    /// Returns error if a key function fails, a recording is malformed or
    /// cannot be written, or the live call fails
    pub async fn execute(&self, request: &Request, response_type: ResponseType) -> Result<Response> {
        match self.recorder.pre_dispatch(request).await? {
            Decision::Bypass => {
                let live = self.transport.send(request, response_type).await?;
                Ok(Response::from(live))
            }
            Decision::Replay(entry) => {
                let mut response = replay::replay(&entry, response_type).await?;
                response.body = redecode(response.body, response_type);
                Ok(response)
            }
            Decision::RecordAfter(ticket) => {
                // On failure the ticket drops here and waiters take over.
                let live = self.transport.send(request, response_type).await?;
                debug!("Live response {} for {}", live.status, ticket.digest().short());
                self.recorder.post_dispatch(ticket, live).await
            }
        }
    }

    /// Build and execute a body-less request for `url`, relative to the base URL
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the URL cannot be resolved, or any error from
    /// [`Client::execute`]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        response_type: ResponseType,
    ) -> Result<Response> {
        let uri = network::resolve_url(self.base_url.as_deref(), Some(url), &[])?;
        self.execute(&Request::new(method, uri), response_type)
            .await
    }

    /// `GET` with the default JSON representation
    ///
    /// # Errors
    ///
    /// See [`Client::request`]
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(Method::GET, url, ResponseType::default()).await
    }
}

/// Apply the live path's JSON decoding to a body replayed as text
fn redecode(body: Body, response_type: ResponseType) -> Body {
    match body {
        Body::Text(text) if response_type == ResponseType::Json => {
            Body::decode(Bytes::from(text), response_type)
        }
        other => other,
    }
}
