//! Match-Trader broker adapter.
//!
//! Logs in through the manager API with a form-encoded password, then reads
//! the balance from the trading API of the first account's system.

pub mod client;
pub mod wire;

pub use client::MatchTradeSession;
