//! Single-chat message dispatcher core.
//!
//! Inbound updates go through [`receiver::UpdateReceiver`]; outbound actions are
//! validated by [`dispatcher::ChatDispatcher`] and executed one at a time, in
//! submission order, by a single dispatch loop. The chat API itself lives
//! behind [`messaging::port::ChatTransport`], implemented in adapter crates.

pub mod audit;
pub mod callbacks;
pub mod config;
pub mod dispatch;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod outbound;
pub mod receiver;
pub mod session;

pub use dispatcher::ChatDispatcher;
pub use errors::{Error, Result};
