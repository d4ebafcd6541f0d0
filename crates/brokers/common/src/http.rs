use propacct_core::BrokerError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

/// Desktop Chrome user agent; the platforms reject obvious script clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Header set sent on every request, login included.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
    headers
}

/// Build a header value, naming the header if the value is not valid.
pub fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, BrokerError> {
    HeaderValue::from_str(value).map_err(|_| BrokerError::InvalidHeader(name.to_string()))
}

/// Map a reqwest failure (connect, TLS, timeout, decode) into the transport channel.
pub fn transport_error(err: reqwest::Error) -> BrokerError {
    BrokerError::Transport(err.to_string())
}

/// Value of the named cookie set by this response, if any.
pub fn response_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// An HTTP client bound to one broker platform.
///
/// Holds the browser-like defaults (baked into the client) plus the session
/// headers a successful login installs; both go out on every request made
/// through [`HttpSession::get`] and [`HttpSession::post`].
pub struct HttpSession {
    client: Option<Client>,
    base_url: String,
    headers: HeaderMap,
}

impl HttpSession {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .build()
            .map_err(|e| BrokerError::Configuration(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client: Some(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HeaderMap::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path (which may carry a query string).
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Session headers currently applied on top of the browser defaults.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), BrokerError> {
        let value = header_value(&name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    fn client(&self) -> Result<&Client, BrokerError> {
        self.client.as_ref().ok_or(BrokerError::SessionClosed)
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder, BrokerError> {
        Ok(self.client()?.get(self.url(path)).headers(self.headers.clone()))
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder, BrokerError> {
        Ok(self.client()?.post(self.url(path)).headers(self.headers.clone()))
    }

    /// Drop the client (and its pooled connections) and the session headers.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed HTTP session for {}", self.base_url);
        }
        self.headers.clear();
    }
}
