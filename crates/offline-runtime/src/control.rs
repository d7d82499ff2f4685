//! Out-of-band control messages.

use offline_cache::LogicalPartition;
use offline_core::LifecycleState;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A message posted to the runtime from a page.
///
/// Wire format is a JSON object tagged by `type`, e.g.
/// `{"type":"INVALIDATE_PARTITION","partition":"images"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate as soon as installation has finished.
    SkipWaiting,
    /// Clear the data partition.
    InvalidateProductCache,
    /// Clear a named logical partition.
    InvalidatePartition { partition: String },
    /// Report generation and lifecycle state.
    GetVersion,
}

impl ControlMessage {
    /// Parse a message from its JSON form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Logical partition this message clears, if any.
    ///
    /// `Some(Err(name))` for an invalidation naming an unknown partition.
    pub fn invalidation_target(&self) -> Option<Result<LogicalPartition, String>> {
        match self {
            Self::InvalidateProductCache => Some(Ok(LogicalPartition::Data)),
            Self::InvalidatePartition { partition } => {
                Some(LogicalPartition::parse(partition).ok_or_else(|| partition.clone()))
            }
            Self::SkipWaiting | Self::GetVersion => None,
        }
    }
}

/// Reply sent back on a message's reply port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlReply {
    /// Answer to `GET_VERSION`.
    Version {
        generation: String,
        state: LifecycleState,
    },
    /// Success or failure of any other message.
    Ack {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ControlReply {
    pub fn ok() -> Self {
        Self::Ack { ok: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Ack {
            ok: false,
            error: Some(error.into()),
        }
    }

    /// Whether the message was handled successfully.
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Version { .. } => true,
            Self::Ack { ok, .. } => *ok,
        }
    }
}

/// Sending half of a reply port.
pub type ReplyPort = oneshot::Sender<ControlReply>;

/// Create a reply port and the receiver the sender waits on.
pub fn reply_port() -> (ReplyPort, oneshot::Receiver<ControlReply>) {
    oneshot::channel()
}

/// Deliver a reply if a port was supplied. A dropped receiver is not an error.
pub(crate) fn send_reply(port: Option<ReplyPort>, reply: ControlReply) {
    if let Some(port) = port {
        if port.send(reply).is_err() {
            tracing::debug!("reply port closed before reply");
        }
    }
}
