//! In-process transport.
//!
//! Serves a fixed queue of inbound messages and records everything sent.
//! Used by the `exec` subcommand and by tests.

use super::{InboundMessage, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// A message that was handed to [`MemoryTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
}

#[derive(Debug, Default)]
struct State {
    inbound: VecDeque<InboundMessage>,
    sent: Vec<SentMessage>,
    failing: HashSet<String>,
}

/// Transport backed by in-memory queues.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inbound message for [`Transport::receive`].
    pub fn push_inbound(&self, message: InboundMessage) {
        self.lock().inbound.push_back(message);
    }

    /// Make every send to `recipient` fail.
    pub fn fail_for(&self, recipient: &str) {
        self.lock().failing.insert(recipient.to_string());
    }

    /// Successfully sent messages, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    /// Successfully sent messages to one recipient, in order.
    pub fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.recipient == recipient)
            .map(|m| m.text.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn receive(&self) -> Result<Option<InboundMessage>, TransportError> {
        Ok(self.lock().inbound.pop_front())
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.failing.contains(recipient) {
            return Err(TransportError::Delivery(format!(
                "{} is unreachable",
                recipient
            )));
        }
        state.sent.push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inbound_queue_drains_then_closes() {
        let transport = MemoryTransport::new();
        transport.push_inbound(InboundMessage::direct("+1", "bot help"));

        let first = transport.receive().await.unwrap().unwrap();
        assert_eq!(first.text, "bot help");
        assert!(transport.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let transport = MemoryTransport::new();
        transport.fail_for("+2");

        transport.send("+1", "hi").await.unwrap();
        assert!(matches!(
            transport.send("+2", "hi").await,
            Err(TransportError::Delivery(_))
        ));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent_to("+1"), vec!["hi".to_string()]);
    }
}
