use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use propacct_core::{BrokerIdentity, BrokerKind, DEFAULT_DOMAIN};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod runner;

use config::AccountsFile;
use runner::{balance_report, check_account, open_session, Outcome};

#[derive(Parser)]
#[command(name = "propacct")]
#[command(about = "Prop firm account checker: log in to a trading platform and report the balance")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to one account and print its balance
    Balance {
        /// Broker kind ("dxtrade" or "matchtrade")
        #[arg(short, long)]
        broker: BrokerKind,

        /// Account username (email for Match-Trader)
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(long, env = "PROPACCT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Domain / sub-account qualifier
        #[arg(short, long, default_value = DEFAULT_DOMAIN)]
        domain: String,

        /// Override the platform endpoint
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Check every account listed in a TOML file
    Check {
        /// Path to the accounts file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List supported brokers
    Brokers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the balance reports.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let logger = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        logger.json().init();
    } else {
        logger.init();
    }

    match cli.command {
        Commands::Balance {
            broker,
            username,
            password,
            domain,
            base_url,
        } => {
            let identity = BrokerIdentity::with_domain(broker, username, password, domain);
            if !run_account(identity, base_url.as_deref()).await {
                bail!("Balance check failed");
            }
        }
        Commands::Check { config } => {
            let file = AccountsFile::load(&config)?;
            let total = file.accounts.len();
            let mut failed = 0;
            for entry in &file.accounts {
                let ok = match entry.identity() {
                    Ok(identity) => run_account(identity, entry.base_url.as_deref()).await,
                    Err(e) => {
                        error!("Skipping {} account {}: {}", entry.broker, entry.username, e);
                        false
                    }
                };
                if !ok {
                    failed += 1;
                }
            }
            if failed > 0 {
                bail!("{} of {} accounts failed", failed, total);
            }
        }
        Commands::Brokers => {
            println!("Supported brokers:");
            for kind in BrokerKind::ALL {
                println!("  {:<11} - {}", kind.as_str(), kind.default_base_url());
            }
        }
    }

    Ok(())
}

/// Run one account end to end; `true` if a balance was printed.
async fn run_account(identity: BrokerIdentity, base_url: Option<&str>) -> bool {
    let mut session = match open_session(identity.clone(), base_url) {
        Ok(session) => session,
        Err(e) => {
            error!("Cannot set up {} session: {}", identity.kind(), e);
            return false;
        }
    };

    match check_account(session.as_mut()).await {
        Outcome::Balance(balance) => match balance_report(&identity, &balance) {
            Ok(report) => {
                println!("{}", report);
                true
            }
            Err(e) => {
                error!("Failed to render balance report: {}", e);
                false
            }
        },
        Outcome::BalanceFailed(e) => {
            error!("Balance check for {} failed: {}", identity.account_id(), e);
            false
        }
        Outcome::LoginFailed => false,
    }
}
