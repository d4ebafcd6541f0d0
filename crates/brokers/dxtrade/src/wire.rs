use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /dxsca-web/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub domain: &'a str,
}

/// Login reply. Deployments disagree on the token field name.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "sessionToken")]
    pub session_token: Option<String>,
    pub token: Option<String>,
    pub access_token: Option<String>,
}

impl LoginResponse {
    /// First non-empty of `sessionToken`, `token`, `access_token`.
    pub fn token(&self) -> Option<&str> {
        [&self.session_token, &self.token, &self.access_token]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|t| !t.is_empty())
    }
}

/// Reply of `GET /dxsca-web/accounts/metrics`.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsResponse {
    /// Absent or `null` when the account has no metrics yet.
    pub metrics: Option<Vec<AccountMetrics>>,
}

impl MetricsResponse {
    /// Metrics of the first account, if any.
    pub fn first(&self) -> Option<&AccountMetrics> {
        self.metrics.as_deref().unwrap_or_default().first()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetrics {
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub available_balance: Decimal,
}
