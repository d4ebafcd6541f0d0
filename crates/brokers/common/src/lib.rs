//! Shared plumbing for HTTP-based broker adapters.
//!
//! Every adapter talks to its platform through an [`HttpSession`], which
//! carries the browser-like header set the platforms expect and the
//! per-session auth headers set after login.

pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use http::*;
