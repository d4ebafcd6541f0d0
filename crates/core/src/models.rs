use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BrokerError;

/// Domain value meaning "no sub-account qualifier".
pub const DEFAULT_DOMAIN: &str = "default";

// ---------------------------------------------------------------------------
// Broker Kind
// ---------------------------------------------------------------------------

/// The trading platform a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// DXtrade (The Funded Trader).
    DxTrade,
    /// Match-Trader (Funded Trading Plus).
    MatchTrade,
}

impl BrokerKind {
    pub const ALL: [BrokerKind; 2] = [BrokerKind::DxTrade, BrokerKind::MatchTrade];

    /// Fixed platform endpoint for this broker.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            BrokerKind::DxTrade => "https://trade.gooeytrade.com",
            BrokerKind::MatchTrade => "https://mtr.voyagemarkets.net",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerKind::DxTrade => "dxtrade",
            BrokerKind::MatchTrade => "matchtrade",
        }
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerKind {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dxtrade" => Ok(BrokerKind::DxTrade),
            "matchtrade" => Ok(BrokerKind::MatchTrade),
            _ => Err(BrokerError::Configuration(format!(
                "Unsupported broker type: {}",
                s
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who we log in as, and where.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerIdentity {
    kind: BrokerKind,
    username: String,
    password: String,
    domain: String,
}

impl BrokerIdentity {
    /// Identity on the default domain.
    pub fn new(kind: BrokerKind, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_domain(kind, username, password, DEFAULT_DOMAIN)
    }

    pub fn with_domain(
        kind: BrokerKind,
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            username: username.into(),
            password: password.into(),
            domain: domain.into(),
        }
    }

    pub fn kind(&self) -> BrokerKind {
        self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `domain:username`, or just `username` on the default domain.
    pub fn account_id(&self) -> String {
        if self.domain == DEFAULT_DOMAIN {
            self.username.clone()
        } else {
            format!("{}:{}", self.domain, self.username)
        }
    }
}

impl fmt::Debug for BrokerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerIdentity")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

/// Balance held in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyBalance {
    pub currency: String,
    pub value: Decimal,
    pub available: Decimal,
}

/// Normalized account balance, fetched fresh on every query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub currency_balances: Vec<CurrencyBalance>,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Snapshot of an account that reports a single currency.
    pub fn single_currency(currency: impl Into<String>, total: Decimal, available: Decimal) -> Self {
        Self {
            total_balance: total,
            available_balance: available,
            currency_balances: vec![CurrencyBalance {
                currency: currency.into(),
                value: total,
                available,
            }],
            fetched_at: Utc::now(),
        }
    }
}
