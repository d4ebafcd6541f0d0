//! DXtrade broker adapter.
//!
//! Logs in through the DXtrade web API (`/dxsca-web`) and reads the
//! account metrics of the first account returned.

pub mod client;
pub mod wire;

pub use client::DxTradeSession;
