//! Request dispatcher
//!
//! Issues one HTTP request against the configured base URL and normalizes the
//! response. Every body is read as text first; non-2xx statuses fail before
//! any parsing, an empty body becomes [`ResponseBody::Empty`], and text that
//! is not JSON is returned unchanged instead of failing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{ClientConfig, normalize_base_url};
use crate::credentials::AuthSession;
use crate::error::{Error, Result};

use super::body::{MultipartBody, RequestBody, encode_form};

/// HTTP verbs the server API uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::Config(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-call options. Defaults: GET, no body, no header overrides, auth required.
#[derive(Debug, Clone)]
pub struct ApiCallOptions {
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    /// Overrides applied on top of the encoding's default headers
    pub headers: Vec<(String, String)>,
    /// Attach the stored bearer token when one exists
    pub requires_auth: bool,
}

impl Default for ApiCallOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            requires_auth: true,
        }
    }
}

impl ApiCallOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::default().with_method(HttpMethod::Post)
    }

    pub fn put() -> Self {
        Self::default().with_method(HttpMethod::Put)
    }

    pub fn patch() -> Self {
        Self::default().with_method(HttpMethod::Patch)
    }

    pub fn delete() -> Self {
        Self::default().with_method(HttpMethod::Delete)
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.with_body(RequestBody::json(value)?))
    }

    pub fn form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.with_body(RequestBody::form(pairs))
    }

    pub fn multipart(self, body: MultipartBody) -> Self {
        self.with_body(RequestBody::Multipart(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Compute the final header set for a request.
///
/// Precedence, lowest first: the encoding's content type, the caller's
/// overrides (same name only), then the bearer token. A multipart body never
/// gets an explicit content type because the transport must add the boundary.
pub fn resolve_headers(options: &ApiCallOptions, token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(content_type) = options
        .body
        .as_ref()
        .and_then(RequestBody::default_content_type)
    {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    let multipart = options.body.as_ref().is_some_and(RequestBody::is_multipart);

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        if multipart && header_name == CONTENT_TYPE {
            debug!("Ignoring content-type override on multipart request");
            continue;
        }
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(header_name, header_value);
    }

    if options.requires_auth
        && let Some(token) = token
    {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::InvalidHeader(format!("authorization: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// A successful response body after classification
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The server sent no bytes
    Empty,
    Json(Value),
    /// Non-empty text that is not valid JSON, unchanged
    Text(String),
}

impl ResponseBody {
    pub fn classify(text: String) -> Self {
        if text.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// JSON view: `Empty` is `null`, raw text is a JSON string
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Decode into the caller's expected type
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}

/// Apply the status check, then classify the body
pub fn classify_response(status: u16, text: String) -> Result<ResponseBody> {
    if !(200..300).contains(&status) {
        return Err(Error::Http { status, body: text });
    }
    Ok(ResponseBody::classify(text))
}

/// HTTP client for the Brick server API.
///
/// Cloning is cheap; clones share the connection pool, the base URL and the
/// credential store.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Arc<RwLock<String>>,
    session: AuthSession,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: AuthSession) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: Arc::new(RwLock::new(config.base_url)),
            session,
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    /// Point subsequent calls at a different server
    pub fn set_base_url(&self, base_url: &str) -> Result<()> {
        let normalized = normalize_base_url(base_url)?;
        debug!("API base URL set to {}", normalized);
        *self.base_url.write() = normalized;
        Ok(())
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for an endpoint path such as `/collections`
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.read(), endpoint)
    }

    /// Issue one request and return the classified body
    pub async fn send(&self, endpoint: &str, options: ApiCallOptions) -> Result<ResponseBody> {
        let token = if options.requires_auth {
            self.session.token().await
        } else {
            None
        };
        let headers = resolve_headers(&options, token.as_deref())?;
        let url = self.url_for(endpoint);

        debug!("{} {}", options.method, endpoint);

        let mut request = self
            .http
            .request(options.method.into(), &url)
            .headers(headers);

        request = match options.body {
            None => request,
            Some(RequestBody::Json(value)) => request.body(serde_json::to_string(&value)?),
            Some(RequestBody::Form(pairs)) => request.body(encode_form(&pairs)),
            Some(RequestBody::Multipart(parts)) => request.multipart(parts.to_form().await?),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            error!("API error on {} {}: {} - {}", options.method, endpoint, status, text);
        }

        classify_response(status, text)
    }

    /// Issue one request and decode the body as `T`.
    ///
    /// An empty body decodes as JSON `null` (use `Option<T>`), and non-JSON
    /// text decodes as a JSON string.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: ApiCallOptions,
    ) -> Result<T> {
        self.send(endpoint, options).await?.into_typed()
    }
}
