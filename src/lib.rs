//! Signal group bot library.
//!
//! Keeps a directory of named subscriber groups, lets people subscribe
//! themselves, and lets a configured set of admins manage groups and broadcast
//! messages to them.

pub mod bot;
pub mod broadcast;
pub mod cli;
pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod permission;
pub mod phone;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use bot::BotController;
pub use config::Config;
pub use directory::{GroupDirectory, GroupSelector, MemberSelector};
pub use permission::PermissionGate;
pub use phone::PhoneNormalizer;
pub use store::{GroupStore, SqliteStore};
pub use transport::{InboundMessage, MemoryTransport, SignalCliTransport, Transport};
