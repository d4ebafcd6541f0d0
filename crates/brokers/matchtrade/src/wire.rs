use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Form body of `POST /manager/login-v2`. The email travels in the query.
#[derive(Debug, Serialize)]
pub struct LoginForm<'a> {
    pub password: &'a str,
}

/// Manager login reply: every trading account the email can see.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    /// Absent or `null` when the email has no trading accounts.
    pub accounts: Option<Vec<TradingAccount>>,
}

impl LoginResponse {
    pub fn first_account(&self) -> Option<&TradingAccount> {
        self.accounts.as_deref().unwrap_or_default().first()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingAccount {
    pub trading_api_token: Option<String>,
    pub offer: Option<Offer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Offer {
    pub system: Option<TradingSystem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingSystem {
    pub uuid: Option<String>,
}

impl TradingAccount {
    pub fn trading_api_token(&self) -> Option<&str> {
        self.trading_api_token.as_deref().filter(|t| !t.is_empty())
    }

    /// `offer.system.uuid`; missing at any level counts as absent.
    pub fn system_uuid(&self) -> Option<&str> {
        self.offer
            .as_ref()?
            .system
            .as_ref()?
            .uuid
            .as_deref()
            .filter(|u| !u.is_empty())
    }
}

/// Reply of `GET /mtr-api/<system_uuid>/balance`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub free_margin: Decimal,
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(body: &str) -> TradingAccount {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_nested_system_uuid() {
        let full = account(r#"{"tradingApiToken":"tok","offer":{"system":{"uuid":"u1"}}}"#);
        assert_eq!(full.trading_api_token(), Some("tok"));
        assert_eq!(full.system_uuid(), Some("u1"));

        assert_eq!(account(r#"{"tradingApiToken":"tok"}"#).system_uuid(), None);
        assert_eq!(account(r#"{"offer":null}"#).system_uuid(), None);
        assert_eq!(account(r#"{"offer":{}}"#).system_uuid(), None);
        assert_eq!(account(r#"{"offer":{"system":{}}}"#).system_uuid(), None);
        assert_eq!(account(r#"{"offer":{"system":{"uuid":""}}}"#).system_uuid(), None);
    }

    #[test]
    fn test_missing_accounts_is_empty() {
        let data: LoginResponse = serde_json::from_str(r#"{"email":"me@example.com"}"#).unwrap();
        assert!(data.first_account().is_none());

        let null: LoginResponse = serde_json::from_str(r#"{"accounts":null}"#).unwrap();
        assert!(null.first_account().is_none());
    }

    #[test]
    fn test_balance_fields() {
        let data: BalanceResponse =
            serde_json::from_str(r#"{"balance":500,"freeMargin":300,"currency":"EUR"}"#).unwrap();
        assert_eq!(data.balance, dec!(500));
        assert_eq!(data.free_margin, dec!(300));
        assert_eq!(data.currency.as_deref(), Some("EUR"));

        let bare: BalanceResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.balance, Decimal::ZERO);
        assert_eq!(bare.currency, None);
    }
}
