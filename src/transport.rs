//! HTTP exchange used by the client.
//!
//! The client issues exactly one request per single-key operation through a
//! [`Transport`]. Status codes come back untouched; what counts as success is
//! decided by the operation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;

use crate::error::{Error, Result};

/// A single request/response exchange with the store
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the full response, whatever its status
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>>;
}

/// Plain HTTP/1.1 transport built on the hyper-util legacy client
#[derive(Clone)]
pub struct HyperTransport {
    http_client: HttpClient<HttpConnector, Full<Bytes>>,
    timeout: Option<Duration>,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Transport with a fresh connection pool and no timeout
    pub fn new() -> Self {
        let http_client = HttpClient::builder(TokioExecutor::new()).build_http();
        Self {
            http_client,
            timeout: None,
        }
    }

    /// Fail exchanges that take longer than `timeout` with [`Error::Timeout`]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>> {
        let response = self
            .http_client
            .request(request)
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?
            .to_bytes();

        Ok(Response::from_parts(parts, body))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let request = request.map(Full::new);

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(request))
                .await
                .map_err(|_| Error::Timeout(timeout.as_millis() as u64))?,
            None => self.exchange(request).await,
        }
    }
}
