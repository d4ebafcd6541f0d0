use crate::error::BrokerError;
use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Broker Session Trait
// ---------------------------------------------------------------------------

/// An authenticated conversation with one broker account.
///
/// Callers drive it sequentially: one `login`, then any number of
/// `get_balance` calls, then `close`. Failures come back as values; nothing
/// here panics or propagates transport errors past the call.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Which platform this session talks to.
    fn kind(&self) -> BrokerKind;

    /// The account this session logs in as.
    fn identity(&self) -> &BrokerIdentity;

    /// Whether a session credential is currently held.
    fn is_logged_in(&self) -> bool;

    /// Perform the login handshake. Returns `false` (and logs the cause)
    /// on any failure. A failed relogin drops the previous credential.
    async fn login(&mut self) -> bool;

    /// Fetch a fresh, normalized balance.
    async fn get_balance(&self) -> Result<BalanceSnapshot, BrokerError>;

    /// Release the underlying HTTP client and forget the credential.
    async fn close(&mut self);
}
