//! HTTP transport seam: request/response types and the default `reqwest` implementation.

use crate::error::HttpError;
use crate::helpers::Params;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Request timeout: a single overall limit, or separate connect/read limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Total(Duration),
    Split { connect: Duration, read: Duration },
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Total(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Total(d)
    }
}

impl From<(Duration, Duration)> for Timeout {
    fn from((connect, read): (Duration, Duration)) -> Self {
        Timeout::Split { connect, read }
    }
}

/// A fully built request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Form payload; `None` means an empty body.
    pub form: Option<Params>,
    pub timeout: Timeout,
}

impl HttpRequest {
    /// Encoded request body (empty when there is no form payload).
    pub fn body(&self) -> String {
        self.form.as_ref().map(Params::encode).unwrap_or_default()
    }
}

/// A fully materialized response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status; `0` when the transport produced no usable status line.
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends one request and returns the response; never retries.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Default transport over a persistent `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Timeout) -> Result<Self, HttpError> {
        let builder = reqwest::Client::builder();
        let builder = match timeout {
            Timeout::Total(d) => builder.timeout(d),
            Timeout::Split { connect, read } => builder.connect_timeout(connect).read_timeout(read),
        };
        let http = builder
            .build()
            .map_err(|e| HttpError::with_source("failed to build HTTP client", e))?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let body = request.body();
        let mut req = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        if !body.is_empty() {
            req = req.body(body);
        }
        if let Timeout::Total(d) = request.timeout {
            req = req.timeout(d);
        }
        let res = req.send().await?;
        let status_code = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.bytes().await?.to_vec();
        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}
