//! Group broadcasts.

use crate::error::{DirectoryError, TransportError};
use crate::store::{Group, Member};
use crate::transport::Transport;

/// Outcome of a broadcast, both lists in member order.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub succeeded: Vec<Member>,
    pub failed: Vec<(Member, TransportError)>,
}

impl BroadcastReport {
    /// Number of members a delivery was attempted for.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Sends one message to every member of a group.
pub struct BroadcastDispatcher<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> BroadcastDispatcher<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Deliver `text` to each member in turn.
    ///
    /// A failed delivery is recorded and the loop moves on to the next member.
    /// An empty body is rejected before anything is sent.
    pub async fn broadcast(
        &self,
        group: &Group,
        members: Vec<Member>,
        text: &str,
    ) -> Result<BroadcastReport, DirectoryError> {
        if text.trim().is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "you didn't supply the message text after the groupname".to_string(),
            ));
        }

        let mut report = BroadcastReport::default();
        for member in members {
            match self.transport.send(&member.phone, text).await {
                Ok(()) => report.succeeded.push(member),
                Err(e) => {
                    tracing::warn!(
                        "send to {} in group {} failed: {}",
                        member.phone,
                        group.name,
                        e
                    );
                    report.failed.push((member, e));
                }
            }
        }

        tracing::debug!(
            "broadcast to group {}: {} of {} delivered",
            group.name,
            report.succeeded.len(),
            report.attempted()
        );

        Ok(report)
    }
}
