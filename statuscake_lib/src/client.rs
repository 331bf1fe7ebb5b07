//! HTTP client for the StatusCake REST API.
//!
//! One request per call, no retries. A [`Client`] owns its transport; share it across
//! tasks only if the caller serializes calls that must be ordered.

use crate::config::ConfigurationManager;
use crate::error::{ApiError, ConfigError, Error, InvalidResponse, NetworkError};
use crate::helpers::{append_query, Params};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Timeout, Transport};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Method;
use serde_json::Value;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Base URL prefixed to relative request paths.
pub const BASE_URL: &str = "https://api.statuscake.com/v1";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Status codes treated as success (or redirect) by [`Client::call`].
const SUCCESS_STATUS: RangeInclusive<u16> = 100..=305;

/// StatusCake API client.
#[derive(Clone)]
pub struct Client<T = HttpTransport> {
    endpoint: String,
    api_key: String,
    timeout: Timeout,
    base_url: String,
    headers: HeaderMap,
    transport: T,
}

/// Builder for [`Client`]; values left unset are resolved from configuration.
///
/// Priority chain (highest first):
/// 1. Values set on the builder
/// 2. `STATUSCAKE_ENDPOINT` / `STATUSCAKE_API_KEY`
/// 3. Config files (the custom file if given, else the default search path)
#[derive(Debug, Default)]
pub struct ClientBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout: Option<Timeout>,
    config_file: Option<PathBuf>,
    base_url: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overall timeout, or a `(connect, read)` pair.
    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Read configuration from this file only instead of the default search path.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override the API base URL (e.g. for a local mock server).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build a client over the default `reqwest` transport.
    pub fn build(self) -> Result<Client<HttpTransport>, Error> {
        let transport = HttpTransport::new(self.timeout.unwrap_or_default())?;
        self.build_with_transport(transport)
    }

    /// Build a client over a custom transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Client<T>, Error> {
        let (endpoint, api_key) = self.resolve_credentials()?;
        let headers = default_headers(&api_key)?;
        Ok(Client {
            endpoint,
            api_key,
            timeout: self.timeout.unwrap_or_default(),
            base_url: self
                .base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| BASE_URL.to_string()),
            headers,
            transport,
        })
    }

    /// Explicit values win; configuration is only consulted for what is missing.
    fn resolve_credentials(&self) -> Result<(String, String), ConfigError> {
        if let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) {
            return Ok((endpoint.clone(), api_key.clone()));
        }
        let config = match &self.config_file {
            Some(path) => ConfigurationManager::with_config_file(path)?,
            None => ConfigurationManager::new()?,
        };
        let endpoint = match &self.endpoint {
            Some(e) => e.clone(),
            None => config
                .get("default", "endpoint")
                .ok_or_else(|| ConfigError::MissingValue {
                    section: "default".to_string(),
                    key: "endpoint".to_string(),
                })?,
        };
        let api_key = match &self.api_key {
            Some(k) => k.clone(),
            None => config
                .get(&endpoint, "api_key")
                .ok_or_else(|| ConfigError::MissingValue {
                    section: endpoint.clone(),
                    key: "api_key".to_string(),
                })?,
        };
        debug!(endpoint = %endpoint, "resolved credentials from configuration");
        Ok((endpoint, api_key))
    }
}

fn default_headers(api_key: &str) -> Result<HeaderMap, ConfigError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
        ConfigError::InvalidValue {
            key: "api_key".to_string(),
            message: "contains characters not allowed in an HTTP header".to_string(),
        }
    })?;
    auth.set_sensitive(true);
    let user_agent = format!("statuscake-rs/{}", crate::VERSION);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent).map_err(|_| ConfigError::InvalidValue {
            key: "user_agent".to_string(),
            message: "invalid header value".to_string(),
        })?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

impl Client<HttpTransport> {
    /// Create a client from an explicit endpoint and API key; no configuration is read.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        Self::builder().endpoint(endpoint).api_key(api_key).build()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Transport> Client<T> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` with `params` appended to its query string.
    pub async fn get(&self, url: &str, params: Params) -> Result<Value, Error> {
        let url = append_query(url, &params.canonicalize());
        self.call(Method::GET, &url, None).await
    }

    pub async fn delete(&self, url: &str) -> Result<Value, Error> {
        self.call(Method::DELETE, url, None).await
    }

    /// POST `payload` as a form body.
    pub async fn post(&self, url: &str, payload: Params) -> Result<Value, Error> {
        self.call(Method::POST, url, Some(payload.canonicalize()))
            .await
    }

    /// PUT `payload` as a form body.
    pub async fn put(&self, url: &str, payload: Params) -> Result<Value, Error> {
        self.call(Method::PUT, url, Some(payload.canonicalize()))
            .await
    }

    /// Dispatch a request and decode the JSON response.
    ///
    /// `path` is resolved against the base URL unless it is already absolute.
    /// Status `0` is a [`NetworkError`]; any status outside 100..=305 is an [`ApiError`]
    /// carrying the decoded body.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        data: Option<Params>,
    ) -> Result<Value, Error> {
        let url = self.absolute_url(path);
        let res = self.dispatch(method, url.clone(), data).await?;
        let body: Value = res.json().map_err(|source| InvalidResponse {
            status_code: res.status_code,
            source,
        })?;
        classify(&url, res.status_code, body)
    }

    /// Dispatch a request and return the response untouched: no decoding, no status check.
    pub async fn raw_call(
        &self,
        method: Method,
        path: &str,
        data: Option<Params>,
    ) -> Result<HttpResponse, Error> {
        let url = self.absolute_url(path);
        self.dispatch(method, url, data).await
    }

    fn absolute_url(&self, path: &str) -> String {
        if Url::parse(path).is_ok() {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: String,
        data: Option<Params>,
    ) -> Result<HttpResponse, Error> {
        let mut headers = self.headers.clone();
        let form = data.filter(|d| !d.is_empty());
        if form.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }
        debug!(method = %method, url = %url, "dispatching request");
        let res = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                form,
                timeout: self.timeout,
            })
            .await?;
        debug!(status = res.status_code, "received response");
        Ok(res)
    }
}

fn classify(url: &str, status_code: u16, body: Value) -> Result<Value, Error> {
    if status_code == 0 {
        return Err(NetworkError {
            url: url.to_string(),
        }
        .into());
    }
    if !SUCCESS_STATUS.contains(&status_code) {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("API request failed")
            .to_string();
        return Err(ApiError::new(message, status_code, Some(body)).into());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{API_KEY_ENV, ENDPOINT_ENV};
    use crate::error::HttpError;
    use serial_test::serial;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    const API_KEY: &str = "fake api key";
    const ENDPOINT: &str = "statuscake-eu";
    const FAKE_URL: &str = "http://gopher.statuscake.net/";
    const FAKE_PATH: &str = "/unit/test";

    /// Records requests and replays queued replies (default: 200 with `{}`).
    #[derive(Default)]
    struct MockTransport {
        requests: Mutex<Vec<HttpRequest>>,
        replies: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    }

    impl MockTransport {
        fn reply(self, reply: Result<HttpResponse, HttpError>) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn last(&self) -> HttpRequest {
            self.requests().pop().expect("no request recorded")
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "{}")))
        }
    }

    fn client(transport: MockTransport) -> Client<MockTransport> {
        Client::builder()
            .endpoint(ENDPOINT)
            .api_key(API_KEY)
            .build_with_transport(transport)
            .unwrap()
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_init() {
        let api = Client::new(ENDPOINT, API_KEY).unwrap();
        assert_eq!(api.endpoint(), ENDPOINT);
        assert_eq!(api.api_key(), API_KEY);
        assert_eq!(api.timeout(), Timeout::Total(Duration::from_secs(180)));
        assert_eq!(api.base_url(), BASE_URL);

        let pair = (Duration::from_secs(1), Duration::from_secs(1));
        let api = Client::builder()
            .endpoint(ENDPOINT)
            .api_key(API_KEY)
            .timeout(pair)
            .build()
            .unwrap();
        assert_eq!(api.timeout(), Timeout::from(pair));
    }

    #[test]
    #[serial]
    fn test_explicit_values_skip_configuration() {
        // A missing custom file would fail if configuration were read.
        temp_env::with_vars(
            [(ENDPOINT_ENV, Some("env")), (API_KEY_ENV, Some("env key"))],
            || {
                let api = Client::builder()
                    .endpoint(ENDPOINT)
                    .api_key(API_KEY)
                    .config_file("/nonexistent/statuscake.conf")
                    .build_with_transport(MockTransport::default())
                    .unwrap();
                assert_eq!(api.endpoint(), ENDPOINT);
                assert_eq!(api.api_key(), API_KEY);
            },
        );
    }

    #[test]
    #[serial]
    fn test_init_from_environment() {
        temp_env::with_vars(
            [
                (ENDPOINT_ENV, Some("statuscake_env")),
                (API_KEY_ENV, Some("api key from environ")),
            ],
            || {
                let api = Client::builder()
                    .build_with_transport(MockTransport::default())
                    .unwrap();
                assert_eq!(api.endpoint(), "statuscake_env");
                assert_eq!(api.api_key(), "api key from environ");
            },
        );
    }

    #[test]
    #[serial]
    fn test_init_from_custom_config() {
        temp_env::with_vars_unset([ENDPOINT_ENV, API_KEY_ENV], || {
            let api = Client::builder()
                .config_file(fixture("custom_statuscake.conf"))
                .build_with_transport(MockTransport::default())
                .unwrap();
            assert_eq!(api.endpoint(), "statuscake_custom");
            assert_eq!(api.api_key(), "This is a fake custom application key");

            // explicit endpoint selects another section of the same file
            let err = Client::builder()
                .endpoint("statuscake-laponie")
                .config_file(fixture("custom_statuscake.conf"))
                .build_with_transport(MockTransport::default())
                .err()
                .expect("missing api key must fail");
            assert!(matches!(
                err,
                Error::Config(ConfigError::MissingValue { ref section, .. }) if section == "statuscake-laponie"
            ));
        });
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let err = Client::builder()
            .api_key(API_KEY)
            .config_file("/nonexistent/statuscake.conf")
            .build_with_transport(MockTransport::default())
            .err()
            .expect("missing config file must fail");
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_invalid_api_key_header() {
        let err = Client::builder()
            .endpoint(ENDPOINT)
            .api_key("bad\nkey")
            .build_with_transport(MockTransport::default())
            .err()
            .expect("newline in key must fail");
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn test_get() {
        let api = client(MockTransport::default());
        assert_eq!(api.get(FAKE_URL, Params::new()).await.unwrap(), serde_json::json!({}));
        let req = api.transport().last();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, FAKE_URL);
        assert!(req.form.is_none());

        api.get(FAKE_URL, Params::from([("param", "test")]))
            .await
            .unwrap();
        assert_eq!(api.transport().last().url, format!("{}?param=test", FAKE_URL));

        api.get(
            &format!("{}?query=string", FAKE_URL),
            Params::from([("param", "test")]),
        )
        .await
        .unwrap();
        assert_eq!(
            api.transport().last().url,
            format!("{}?query=string&param=test", FAKE_URL)
        );

        api.get(
            &format!("{}?query=string", FAKE_URL),
            Params::new().with("checkbox", true),
        )
        .await
        .unwrap();
        assert_eq!(
            api.transport().last().url,
            format!("{}?query=string&checkbox=true", FAKE_URL)
        );

        api.get(FAKE_URL, Params::new().with("checkbox", true))
            .await
            .unwrap();
        assert_eq!(api.transport().last().url, format!("{}?checkbox=true", FAKE_URL));

        api.get(FAKE_URL, Params::from([("_from", "start"), ("to", "end")]))
            .await
            .unwrap();
        let url = api.transport().last().url;
        assert!(url.starts_with(&format!("{}?", FAKE_URL)));
        assert!(url.contains("from=start"));
        assert!(url.contains("to=end"));
        assert!(!url.contains("_from"));
    }

    #[tokio::test]
    async fn test_delete() {
        let api = client(MockTransport::default());
        api.delete(FAKE_URL).await.unwrap();
        let req = api.transport().last();
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.url, FAKE_URL);
        assert!(req.form.is_none());
        assert!(req.headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_post_and_put() {
        let payload = Params::new()
            .with("arg1", "one")
            .with("arg2", 2)
            .with("_from", "now")
            .with("arg4", false);
        let api = client(MockTransport::default());

        api.post(FAKE_URL, payload.clone()).await.unwrap();
        api.put(FAKE_URL, payload.clone()).await.unwrap();

        let requests = api.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[1].method, Method::PUT);
        for req in &requests {
            assert_eq!(req.url, FAKE_URL);
            assert_eq!(req.form.as_ref(), Some(&payload.clone().canonicalize()));
            assert_eq!(req.body(), "arg1=one&arg2=2&from=now&arg4=false");
        }
    }

    #[tokio::test]
    async fn test_call_builds_request() {
        let api = client(MockTransport::default());

        let method = Method::from_bytes(b"MeThOd").unwrap();
        api.call(method.clone(), FAKE_PATH, None).await.unwrap();
        let req = api.transport().last();
        assert_eq!(req.method, method);
        assert_eq!(req.url, format!("{}/unit/test", BASE_URL));
        assert!(req.headers.get(CONTENT_TYPE).is_none());
        assert_eq!(req.body(), "");
        assert_eq!(req.timeout, Timeout::default());
        assert_eq!(
            req.headers.get(AUTHORIZATION).unwrap(),
            &format!("Bearer {}", API_KEY)
        );

        api.call(method, FAKE_PATH, Some(Params::from([("key", "value")])))
            .await
            .unwrap();
        let req = api.transport().last();
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), FORM_CONTENT_TYPE);
        assert_eq!(req.body(), "key=value");

        // empty payload sends no body
        api.call(Method::POST, FAKE_PATH, Some(Params::new()))
            .await
            .unwrap();
        let req = api.transport().last();
        assert!(req.form.is_none());
        assert!(req.headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_call_outcomes() {
        let ok = serde_json::json!({"data": [{"id": "1", "name": "site"}]});
        let transport = MockTransport::default()
            .reply(Ok(HttpResponse::new(200, ok.to_string())))
            .reply(Err(HttpError::new("connection refused")))
            .reply(Ok(HttpResponse::new(200, "not json")))
            .reply(Ok(HttpResponse::new(0, "{}")))
            .reply(Ok(HttpResponse::new(99, "{}")))
            .reply(Ok(HttpResponse::new(306, "{}")))
            .reply(Ok(HttpResponse::new(
                404,
                r#"{"message": "No results found", "errors": {}}"#,
            )));
        let api = client(transport);
        let call = || api.call(Method::GET, FAKE_PATH, None);

        assert_eq!(call().await.unwrap(), ok);
        assert!(matches!(call().await, Err(Error::Http(_))));
        assert!(matches!(call().await, Err(Error::InvalidResponse(_))));
        assert!(matches!(call().await, Err(Error::Network(_))));
        assert!(matches!(
            call().await,
            Err(Error::Api(ApiError { status_code: 99, .. }))
        ));
        assert!(matches!(
            call().await,
            Err(Error::Api(ApiError { status_code: 306, .. }))
        ));
        match call().await {
            Err(Error::Api(e)) => {
                assert_eq!(e.status_code, 404);
                assert_eq!(e.message, "No results found");
                assert!(e.response_data.is_some());
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_band_edges() {
        let transport = MockTransport::default()
            .reply(Ok(HttpResponse::new(100, "[]")))
            .reply(Ok(HttpResponse::new(305, "[]")));
        let api = client(transport);
        assert!(api.call(Method::GET, FAKE_PATH, None).await.is_ok());
        assert!(api.call(Method::GET, FAKE_PATH, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_call_times_out_as_http_error() {
        use wiremock::matchers::method as http_method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let api = Client::builder()
            .endpoint(ENDPOINT)
            .api_key(API_KEY)
            .base_url(server.uri())
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();
        match api.call(Method::GET, "/uptime", None).await {
            Err(Error::Http(e)) => assert_eq!(e.message, "request timed out"),
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_call() {
        let transport =
            MockTransport::default().reply(Ok(HttpResponse::new(0, "Let's assume this comes back")));
        let api = client(transport);
        let res = api
            .raw_call(Method::GET, FAKE_PATH, None)
            .await
            .unwrap();
        assert_eq!(res.status_code, 0);
        assert_eq!(res.text(), "Let's assume this comes back");
    }
}
