use async_trait::async_trait;
use propacct_brokers_common::*;
use propacct_core::*;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::StatusCode;
use tracing::{debug, error, info};

use crate::wire::*;

const PARTNER_ID: u32 = 1;
const SESSION_COOKIE: &str = "co-auth";
const DEFAULT_CURRENCY: &str = "USD";

const AUTH_TRADING_API: HeaderName = HeaderName::from_static("auth-trading-api");

/// Tokens issued by the manager login.
#[derive(Clone)]
struct Credential {
    trading_api_token: String,
    co_auth: String,
}

impl Credential {
    fn headers(&self) -> [(HeaderName, String); 2] {
        [
            (AUTH_TRADING_API, self.trading_api_token.clone()),
            (COOKIE, format!("{}={}", SESSION_COOKIE, self.co_auth)),
        ]
    }
}

/// Match-Trader session.
///
/// The manager login returns every account for the email; the first one
/// supplies the trading API token and the system uuid that scopes the
/// trading API, and the `co-auth` cookie carries the web session.
pub struct MatchTradeSession {
    identity: BrokerIdentity,
    http: HttpSession,
    credential: Option<Credential>,
    system_uuid: Option<String>,
}

impl MatchTradeSession {
    pub fn new(identity: BrokerIdentity) -> Result<Self, BrokerError> {
        Self::with_base_url(identity, BrokerKind::MatchTrade.default_base_url())
    }

    pub fn with_base_url(
        identity: BrokerIdentity,
        base_url: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        if identity.kind() != BrokerKind::MatchTrade {
            return Err(BrokerError::Configuration(format!(
                "Match-Trader session cannot log in a {} account",
                identity.kind()
            )));
        }
        Ok(Self {
            identity,
            http: HttpSession::new(base_url)?,
            credential: None,
            system_uuid: None,
        })
    }

    /// Headers installed by the last successful login.
    pub fn session_headers(&self) -> &HeaderMap {
        self.http.headers()
    }

    /// Trading system the logged-in account belongs to.
    pub fn system_uuid(&self) -> Option<&str> {
        self.system_uuid.as_deref()
    }

    fn login_path(&self) -> String {
        // The email goes in unescaped; the platform rejects `%2B` for `+`.
        format!(
            "/manager/login-v2?partnerId={}&email={}",
            PARTNER_ID,
            self.identity.username()
        )
    }

    async fn request_credential(&self) -> Result<(Credential, String), BrokerError> {
        let path = self.login_path();
        info!("Attempting login to MatchTrade with URL: {}", self.http.url(&path));

        let response = self
            .http
            .post(&path)?
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&LoginForm {
                password: self.identity.password(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        info!("MatchTrade login response status: {}", status);

        let co_auth = response_cookie(&response, SESSION_COOKIE).filter(|c| !c.is_empty());
        let text = response.text().await.map_err(transport_error)?;
        debug!("MatchTrade login response body: {}", text);

        if status != StatusCode::OK {
            return Err(BrokerError::LoginFailed(format!(
                "status code {}",
                status.as_u16()
            )));
        }

        let data: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| BrokerError::Transport(format!("Malformed login response: {}", e)))?;
        let account = data
            .first_account()
            .ok_or_else(|| BrokerError::LoginFailed("No accounts found in response".to_string()))?;

        match (account.trading_api_token(), account.system_uuid(), co_auth) {
            (Some(token), Some(uuid), Some(co_auth)) => Ok((
                Credential {
                    trading_api_token: token.to_string(),
                    co_auth,
                },
                uuid.to_string(),
            )),
            (token, uuid, co_auth) => {
                let missing: Vec<&str> = [
                    (token.is_none(), "tradingApiToken"),
                    (uuid.is_none(), "offer.system.uuid"),
                    (co_auth.is_none(), "co-auth cookie"),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(BrokerError::LoginFailed(format!(
                    "Missing {}",
                    missing.join(", ")
                )))
            }
        }
    }

    fn install(&mut self, credential: &Credential) -> Result<(), BrokerError> {
        for (name, value) in credential.headers() {
            self.http.set_header(name, &value)?;
        }
        Ok(())
    }

    async fn fetch_balance(
        &self,
        credential: &Credential,
        system_uuid: &str,
    ) -> Result<BalanceSnapshot, BrokerError> {
        let mut headers = HeaderMap::new();
        for (name, value) in credential.headers() {
            let value: HeaderValue = header_value(&name, &value)?;
            headers.insert(name, value);
        }

        let response = self
            .http
            .get(&balance_path(system_uuid))?
            .headers(headers)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        info!("MatchTrade balance response status: {}", status);
        let text = response.text().await.map_err(transport_error)?;
        debug!("MatchTrade balance response body: {}", text);

        if status != StatusCode::OK {
            return Err(BrokerError::Rejected(text));
        }

        let data: BalanceResponse = serde_json::from_str(&text)
            .map_err(|e| BrokerError::Transport(format!("Malformed balance response: {}", e)))?;

        Ok(BalanceSnapshot::single_currency(
            data.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
            data.balance,
            data.free_margin,
        ))
    }
}

fn balance_path(system_uuid: &str) -> String {
    format!("/mtr-api/{}/balance", system_uuid)
}

#[async_trait]
impl BrokerSession for MatchTradeSession {
    fn kind(&self) -> BrokerKind {
        BrokerKind::MatchTrade
    }

    fn identity(&self) -> &BrokerIdentity {
        &self.identity
    }

    fn is_logged_in(&self) -> bool {
        self.credential.is_some()
    }

    async fn login(&mut self) -> bool {
        self.credential = None;
        self.system_uuid = None;
        self.http.clear_headers();

        let result = match self.request_credential().await {
            Ok((credential, uuid)) => self.install(&credential).map(|()| (credential, uuid)),
            Err(e) => Err(e),
        };

        match result {
            Ok((credential, uuid)) => {
                self.credential = Some(credential);
                self.system_uuid = Some(uuid);
                info!("MatchTrade login successful for {}", self.identity.account_id());
                true
            }
            Err(e) => {
                self.http.clear_headers();
                error!("MatchTrade login failed for {}: {}", self.identity.account_id(), e);
                false
            }
        }
    }

    async fn get_balance(&self) -> Result<BalanceSnapshot, BrokerError> {
        let Some(credential) = self.credential.as_ref() else {
            error!("Not logged in. Please login first.");
            return Err(BrokerError::NotLoggedIn);
        };
        let Some(system_uuid) = self.system_uuid.as_deref() else {
            error!("System UUID not found. Please login first.");
            return Err(BrokerError::MissingSystemId);
        };

        info!(
            "Fetching MatchTrade balance from: {}",
            self.http.url(&balance_path(system_uuid))
        );
        let result = self.fetch_balance(credential, system_uuid).await;
        if let Err(e) = &result {
            error!("Failed to get MatchTrade balance for {}: {}", self.identity.account_id(), e);
        }
        result
    }

    async fn close(&mut self) {
        self.credential = None;
        self.system_uuid = None;
        self.http.close();
    }
}
