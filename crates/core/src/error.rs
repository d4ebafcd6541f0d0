/// Errors that can occur during broker operations.
///
/// The `Display` text of each variant is the message reported to the caller,
/// so balance failures read the same regardless of which broker produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Invalid setup detected before any network activity.
    #[error("{0}")]
    Configuration(String),
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("System UUID not found")]
    MissingSystemId,
    /// The broker answered, but not with a usable balance.
    #[error("Failed to get balance")]
    BalanceUnavailable,
    /// The broker refused the request; carries the raw response body.
    #[error("Failed to get balance: {0}")]
    Rejected(String),
    /// Login was answered but did not yield a usable credential.
    #[error("Login failed: {0}")]
    LoginFailed(String),
    /// Connection, TLS, timeout, or decode failure.
    #[error("{0}")]
    Transport(String),
    #[error("Invalid header value for {0}")]
    InvalidHeader(String),
    #[error("Session closed")]
    SessionClosed,
}
