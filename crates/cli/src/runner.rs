use propacct_brokers_dxtrade::DxTradeSession;
use propacct_brokers_matchtrade::MatchTradeSession;
use propacct_core::*;
use serde::Serialize;
use tracing::{error, info};

/// Build the session implementation for the identity's broker kind.
pub fn open_session(
    identity: BrokerIdentity,
    base_url: Option<&str>,
) -> Result<Box<dyn BrokerSession>, BrokerError> {
    let kind = identity.kind();
    let base_url = base_url.unwrap_or(kind.default_base_url());
    let session: Box<dyn BrokerSession> = match kind {
        BrokerKind::DxTrade => Box::new(DxTradeSession::with_base_url(identity, base_url)?),
        BrokerKind::MatchTrade => Box::new(MatchTradeSession::with_base_url(identity, base_url)?),
    };
    Ok(session)
}

/// What happened to one account.
#[derive(Debug)]
pub enum Outcome {
    Balance(BalanceSnapshot),
    LoginFailed,
    BalanceFailed(BrokerError),
}

/// Log in, fetch the balance, and close the session whatever happened.
pub async fn check_account(session: &mut dyn BrokerSession) -> Outcome {
    let kind = session.kind();
    let account = session.identity().account_id();
    info!("Testing {} broker for {}...", kind, account);

    let outcome = if session.login().await {
        info!("{} login successful", kind);
        match session.get_balance().await {
            Ok(balance) => {
                info!(
                    "{} balance: total={} available={}",
                    kind, balance.total_balance, balance.available_balance
                );
                Outcome::Balance(balance)
            }
            Err(e) => {
                error!("Failed to get {} balance: {}", kind, e);
                Outcome::BalanceFailed(e)
            }
        }
    } else {
        error!("{} login failed", kind);
        Outcome::LoginFailed
    };

    session.close().await;
    outcome
}

#[derive(Serialize)]
struct BalanceReport<'a> {
    broker: BrokerKind,
    account_id: String,
    #[serde(flatten)]
    balance: &'a BalanceSnapshot,
}

/// Pretty JSON line for stdout.
pub fn balance_report(identity: &BrokerIdentity, balance: &BalanceSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&BalanceReport {
        broker: identity.kind(),
        account_id: identity.account_id(),
        balance,
    })
}
