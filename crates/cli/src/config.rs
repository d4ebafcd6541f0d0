use anyhow::{Context, Result};
use propacct_core::{BrokerError, BrokerIdentity, BrokerKind, DEFAULT_DOMAIN};
use serde::Deserialize;
use std::path::Path;

/// Accounts file for `propacct check`.
///
/// ```toml
/// [[accounts]]
/// broker = "dxtrade"
/// username = "FTP_12345"
/// password_env = "TFT_PASSWORD"
/// ```
#[derive(Debug, Deserialize)]
pub struct AccountsFile {
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    /// Broker kind, e.g. "dxtrade" or "matchtrade".
    pub broker: String,
    pub username: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Environment variable holding the password.
    pub password_env: String,
    /// Overrides the platform's fixed endpoint.
    pub base_url: Option<String>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl AccountsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid accounts file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl AccountEntry {
    /// Resolve the identity, reading the password from the process environment.
    pub fn identity(&self) -> Result<BrokerIdentity, BrokerError> {
        self.identity_with(|name| std::env::var(name).ok())
    }

    pub fn identity_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<BrokerIdentity, BrokerError> {
        let kind: BrokerKind = self.broker.parse()?;
        let password = lookup(&self.password_env).ok_or_else(|| {
            BrokerError::Configuration(format!(
                "Password variable {} is not set",
                self.password_env
            ))
        })?;
        Ok(BrokerIdentity::with_domain(
            kind,
            &self.username,
            password,
            &self.domain,
        ))
    }
}
