//! Transport abstraction for inbound commands and outbound messages.
//!
//! The bot handles one inbound message completely, including every send it
//! triggers, before it asks for the next one.

pub mod memory;
pub mod signal_cli;

pub use memory::MemoryTransport;
pub use signal_cli::SignalCliTransport;

use crate::error::TransportError;
use async_trait::async_trait;

/// A text message delivered to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender timestamp in milliseconds since the epoch.
    pub timestamp: u64,
    /// Sender identifier, usually a phone number.
    pub source: String,
    /// Group chat the message was posted in, if any.
    pub group_id: Option<String>,
    pub text: String,
    /// Attachment identifiers; commands ignore them.
    pub attachments: Vec<String>,
}

impl InboundMessage {
    /// A direct text message with no group context or attachments.
    pub fn direct(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: 0,
            source: source.into(),
            group_id: None,
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Abstraction over a messaging channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next inbound text message.
    ///
    /// Returns `Ok(None)` once the channel is closed and no more messages
    /// will arrive.
    async fn receive(&self) -> Result<Option<InboundMessage>, TransportError>;

    /// Send `text` to a single recipient.
    ///
    /// Failures are scoped to this recipient; the caller decides whether to
    /// continue with others.
    async fn send(&self, recipient: &str, text: &str) -> Result<(), TransportError>;

    /// Get the platform name for logging purposes.
    fn platform_name(&self) -> &'static str;
}
