use async_trait::async_trait;
use propacct_brokers_common::*;
use propacct_core::*;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::StatusCode;
use tracing::{debug, error, info};

use crate::wire::*;

const LOGIN_PATH: &str = "/dxsca-web/login";
const METRICS_PATH: &str = "/dxsca-web/accounts/metrics";
const SESSION_COOKIE: &str = "JSESSIONID";
/// DXtrade reports a single USD figure per account.
const METRICS_CURRENCY: &str = "USD";

const X_SESSION_TOKEN: HeaderName = HeaderName::from_static("x-session-token");

/// Headers that authenticate a request with a DXtrade session token.
fn token_headers(token: &str) -> [(HeaderName, String); 3] {
    [
        (AUTHORIZATION, format!("DXAPI {}", token)),
        (X_SESSION_TOKEN, token.to_string()),
        (COOKIE, format!("{}={}", SESSION_COOKIE, token)),
    ]
}

/// DXtrade session.
///
/// Login posts JSON credentials and accepts the session token from the body
/// or, failing that, from the `JSESSIONID` cookie. The token is then sent as
/// `Authorization: DXAPI <token>`, `X-Session-Token` and the session cookie.
pub struct DxTradeSession {
    identity: BrokerIdentity,
    http: HttpSession,
    session_token: Option<String>,
}

impl DxTradeSession {
    pub fn new(identity: BrokerIdentity) -> Result<Self, BrokerError> {
        Self::with_base_url(identity, BrokerKind::DxTrade.default_base_url())
    }

    pub fn with_base_url(
        identity: BrokerIdentity,
        base_url: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        if identity.kind() != BrokerKind::DxTrade {
            return Err(BrokerError::Configuration(format!(
                "DXtrade session cannot log in a {} account",
                identity.kind()
            )));
        }
        Ok(Self {
            identity,
            http: HttpSession::new(base_url)?,
            session_token: None,
        })
    }

    /// Headers installed by the last successful login.
    pub fn session_headers(&self) -> &HeaderMap {
        self.http.headers()
    }

    /// Run the login exchange and return the session token.
    async fn request_token(&self) -> Result<String, BrokerError> {
        info!("Attempting login to DXTrade with URL: {}", self.http.url(LOGIN_PATH));

        let body = LoginRequest {
            username: self.identity.username(),
            password: self.identity.password(),
            domain: self.identity.domain(),
        };
        let response = self
            .http
            .post(LOGIN_PATH)?
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        info!("DXTrade login response status: {}", status);
        debug!("DXTrade login response headers: {:?}", response.headers());

        let cookie_token = response_cookie(&response, SESSION_COOKIE);
        let text = response.text().await.map_err(transport_error)?;
        debug!("DXTrade login response body: {}", text);

        if status != StatusCode::OK {
            return Err(BrokerError::LoginFailed(format!(
                "status code {}",
                status.as_u16()
            )));
        }

        let data: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| BrokerError::Transport(format!("Malformed login response: {}", e)))?;

        data.token()
            .map(str::to_string)
            .or(cookie_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| BrokerError::LoginFailed("No session token found in response".to_string()))
    }

    fn install_token(&mut self, token: &str) -> Result<(), BrokerError> {
        for (name, value) in token_headers(token) {
            self.http.set_header(name, &value)?;
        }
        Ok(())
    }

    async fn fetch_metrics(&self, token: &str) -> Result<BalanceSnapshot, BrokerError> {
        // Auth headers go on the call itself too, not only via the session set.
        let mut headers = HeaderMap::new();
        for (name, value) in token_headers(token) {
            let value = header_value(&name, &value)?;
            headers.insert(name, value);
        }
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));

        let response = self
            .http
            .get(METRICS_PATH)?
            .headers(headers)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        info!("DXTrade balance response status: {}", status);
        let text = response.text().await.map_err(transport_error)?;
        debug!("DXTrade balance response body: {}", text);

        if status != StatusCode::OK {
            return Err(BrokerError::BalanceUnavailable);
        }

        let data: MetricsResponse = serde_json::from_str(&text)
            .map_err(|e| BrokerError::Transport(format!("Malformed metrics response: {}", e)))?;
        let metrics = data.first().ok_or(BrokerError::BalanceUnavailable)?;

        Ok(BalanceSnapshot::single_currency(
            METRICS_CURRENCY,
            metrics.balance,
            metrics.available_balance,
        ))
    }
}

#[async_trait]
impl BrokerSession for DxTradeSession {
    fn kind(&self) -> BrokerKind {
        BrokerKind::DxTrade
    }

    fn identity(&self) -> &BrokerIdentity {
        &self.identity
    }

    fn is_logged_in(&self) -> bool {
        self.session_token.is_some()
    }

    async fn login(&mut self) -> bool {
        self.session_token = None;
        self.http.clear_headers();

        let result = match self.request_token().await {
            Ok(token) => self.install_token(&token).map(|()| token),
            Err(e) => Err(e),
        };

        match result {
            Ok(token) => {
                self.session_token = Some(token);
                info!("DXTrade login successful for {}", self.identity.account_id());
                true
            }
            Err(e) => {
                self.http.clear_headers();
                error!("DXTrade login failed for {}: {}", self.identity.account_id(), e);
                false
            }
        }
    }

    async fn get_balance(&self) -> Result<BalanceSnapshot, BrokerError> {
        let Some(token) = self.session_token.as_deref() else {
            error!("Not logged in. Please login first.");
            return Err(BrokerError::NotLoggedIn);
        };

        info!("Fetching DXTrade balance from: {}", self.http.url(METRICS_PATH));
        let result = self.fetch_metrics(token).await;
        if let Err(e) = &result {
            error!("Failed to get DXTrade balance for {}: {}", self.identity.account_id(), e);
        }
        result
    }

    async fn close(&mut self) {
        self.session_token = None;
        self.http.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propacct_brokers_common::mock::{unreachable_base_url, MockResponse, MockServer};
    use rust_decimal_macros::dec;

    fn session(base_url: &str) -> DxTradeSession {
        let identity = BrokerIdentity::new(BrokerKind::DxTrade, "FTP_1", "pw");
        DxTradeSession::with_base_url(identity, base_url).unwrap()
    }

    #[test]
    fn test_rejects_other_broker_identity() {
        let identity = BrokerIdentity::new(BrokerKind::MatchTrade, "me@example.com", "pw");
        let err = DxTradeSession::new(identity).err().unwrap();
        assert!(matches!(err, BrokerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_login_with_session_token() {
        let server =
            MockServer::start(vec![MockResponse::json(200, r#"{"sessionToken":"T1"}"#)]).await;
        let mut broker = session(server.base_url());

        assert!(broker.login().await);
        assert!(broker.is_logged_in());
        let headers = broker.session_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "DXAPI T1");
        assert_eq!(headers.get(X_SESSION_TOKEN).unwrap(), "T1");
        assert_eq!(headers.get(COOKIE).unwrap(), "JSESSIONID=T1");

        let requests = server.finish().await;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path(), LOGIN_PATH);
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "FTP_1", "password": "pw", "domain": "default"})
        );
    }

    #[tokio::test]
    async fn test_login_falls_back_to_cookie() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"status":"ok"}"#).with_cookie("JSESSIONID", "C1"),
        ])
        .await;
        let mut broker = session(server.base_url());

        assert!(broker.login().await);
        assert_eq!(broker.session_headers().get(AUTHORIZATION).unwrap(), "DXAPI C1");
        assert_eq!(broker.session_headers().get(COOKIE).unwrap(), "JSESSIONID=C1");
        server.finish().await;
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let server = MockServer::start(vec![MockResponse::json(200, r#"{"status":"ok"}"#)]).await;
        let mut broker = session(server.base_url());

        assert!(!broker.login().await);
        assert!(!broker.is_logged_in());
        assert!(broker.session_headers().is_empty());
        server.finish().await;
    }

    #[tokio::test]
    async fn test_login_non_200_fails() {
        let server = MockServer::start(vec![
            MockResponse::json(401, r#"{"sessionToken":"T1"}"#),
        ])
        .await;
        let mut broker = session(server.base_url());

        assert!(!broker.login().await);
        assert!(!broker.is_logged_in());
        server.finish().await;
    }

    #[tokio::test]
    async fn test_login_malformed_body_fails() {
        let server = MockServer::start(vec![MockResponse::text(200, "<html>maintenance</html>")]).await;
        let mut broker = session(server.base_url());

        assert!(!broker.login().await);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_login_transport_failure_fails() {
        let mut broker = session(&unreachable_base_url());
        assert!(!broker.login().await);
        assert!(!broker.is_logged_in());
    }

    #[tokio::test]
    async fn test_balance_before_login() {
        let server = MockServer::start(vec![]).await;
        let broker = session(server.base_url());

        let err = broker.get_balance().await.unwrap_err();
        assert_eq!(err, BrokerError::NotLoggedIn);
        assert_eq!(err.to_string(), "Not logged in");
        assert!(server.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_balance_from_first_metrics_entry() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sessionToken":"T1"}"#),
            MockResponse::json(
                200,
                r#"{"metrics":[{"balance":1000,"availableBalance":800},{"balance":5,"availableBalance":5}]}"#,
            ),
        ])
        .await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);

        let balance = broker.get_balance().await.unwrap();
        assert_eq!(balance.total_balance, dec!(1000));
        assert_eq!(balance.available_balance, dec!(800));
        assert_eq!(
            balance.currency_balances,
            vec![CurrencyBalance {
                currency: "USD".to_string(),
                value: dec!(1000),
                available: dec!(800),
            }]
        );

        let requests = server.finish().await;
        let metrics = &requests[1];
        assert_eq!(metrics.method, "GET");
        assert_eq!(metrics.path(), METRICS_PATH);
        assert_eq!(metrics.header("authorization"), Some("DXAPI T1"));
        assert_eq!(metrics.header("x-session-token"), Some("T1"));
        assert_eq!(metrics.header("cookie"), Some("JSESSIONID=T1"));
        assert_eq!(metrics.header("x-requested-with"), Some("XMLHttpRequest"));
    }

    #[tokio::test]
    async fn test_balance_empty_metrics() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sessionToken":"T1"}"#),
            MockResponse::json(200, r#"{"metrics":[]}"#),
        ])
        .await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);

        let err = broker.get_balance().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to get balance");
        server.finish().await;
    }

    #[tokio::test]
    async fn test_balance_null_metrics() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sessionToken":"T1"}"#),
            MockResponse::json(200, r#"{"metrics":null}"#),
        ])
        .await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);

        assert_eq!(
            broker.get_balance().await.unwrap_err(),
            BrokerError::BalanceUnavailable
        );
        server.finish().await;
    }

    #[tokio::test]
    async fn test_balance_non_200() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sessionToken":"T1"}"#),
            MockResponse::json(500, r#"{"error":"down"}"#),
        ])
        .await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);

        assert_eq!(
            broker.get_balance().await.unwrap_err(),
            BrokerError::BalanceUnavailable
        );
        server.finish().await;
    }

    #[tokio::test]
    async fn test_balance_transport_failure() {
        let server =
            MockServer::start(vec![MockResponse::json(200, r#"{"sessionToken":"T1"}"#)]).await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);
        server.finish().await;

        let err = broker.get_balance().await.unwrap_err();
        assert!(matches!(err, BrokerError::Transport(_)));
    }

    #[tokio::test]
    async fn test_failed_relogin_drops_credential() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sessionToken":"T1"}"#),
            MockResponse::json(403, "{}"),
        ])
        .await;
        let mut broker = session(server.base_url());

        assert!(broker.login().await);
        assert!(!broker.login().await);
        assert!(!broker.is_logged_in());
        assert!(broker.session_headers().is_empty());
        assert_eq!(broker.get_balance().await.unwrap_err(), BrokerError::NotLoggedIn);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_close_logs_out() {
        let server =
            MockServer::start(vec![MockResponse::json(200, r#"{"sessionToken":"T1"}"#)]).await;
        let mut broker = session(server.base_url());
        assert!(broker.login().await);
        server.finish().await;

        broker.close().await;
        assert!(!broker.is_logged_in());
        assert!(!broker.login().await);
        assert_eq!(broker.get_balance().await.unwrap_err(), BrokerError::NotLoggedIn);
    }
}
