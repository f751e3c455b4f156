//! chatsync - client-side conversation synchronizer
//!
//! Reconciles a conversation's stored history with live pushed messages into
//! one ordered view, binds late-resolving conversation ids to early events,
//! and appends outgoing messages optimistically.

pub mod attention;
pub mod binder;
pub mod cli_app;
pub mod color;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod identity;
pub mod message;
pub mod sender;
pub mod session;
pub mod store;
pub mod transport;
pub mod view;

pub use config::Config;
pub use error::{Result, SyncError};
pub use session::{ChatSession, SessionOptions};
