//! External proof checker for deduct.
//!
//! [`ProcessChecker`] is the client side: it starts the configured command
//! once per check and exchanges one framed JSON-RPC request and response over
//! its stdio. [`serve`] is the server side used by `deduct check-server`.

pub mod codec;

mod client;
mod protocol;
mod server;
mod types;

pub use client::ProcessChecker;
pub use protocol::{CHECK_METHOD, CheckResult, RpcError};
pub use server::serve;
pub use types::CheckerConfig;
