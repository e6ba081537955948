//! Transport-agnostic envelopes crossing the session boundary.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::ds::{DeliveryServiceError, TransportEventError};
use crate::identity::{GroupToken, Identity, MessageId};

/// Fields every inbound message carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub sender: Identity,
    pub recipient: Identity,
    pub id: MessageId,
    pub date: DateTime<Utc>,
    /// Nickname the sender chose for themselves, without the tilde.
    pub pub_nick: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Delivered,
    Read,
    Approved,
    Disapproved,
    Unknown(u8),
}

impl ReceiptStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ReceiptStatus::Delivered,
            2 => ReceiptStatus::Read,
            3 => ReceiptStatus::Approved,
            4 => ReceiptStatus::Disapproved,
            other => ReceiptStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ReceiptStatus::Delivered => 1,
            ReceiptStatus::Read => 2,
            ReceiptStatus::Approved => 3,
            ReceiptStatus::Disapproved => 4,
            ReceiptStatus::Unknown(code) => *code,
        }
    }
}

impl Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiptStatus::Delivered => write!(f, "delivered"),
            ReceiptStatus::Read => write!(f, "read"),
            ReceiptStatus::Approved => write!(f, "approved"),
            ReceiptStatus::Disapproved => write!(f, "disapproved"),
            ReceiptStatus::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingState {
    Stopped,
    Started,
    Unknown(u8),
}

impl TypingState {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => TypingState::Stopped,
            1 => TypingState::Started,
            other => TypingState::Unknown(other),
        }
    }
}

/// Closed set of message kinds the bot understands.
///
/// Group management kinds that only name a token (`GroupSetName`,
/// `GroupSetMembers`) are sent by the group creator, so the header's sender
/// doubles as the creator for those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text {
        text: String,
    },
    /// Payload contents are never inspected.
    Image {
        size: u32,
    },
    Audio {
        duration_secs: u16,
    },
    GroupText {
        creator: Identity,
        token: GroupToken,
        text: String,
    },
    GroupSetName {
        token: GroupToken,
        name: String,
    },
    GroupSetMembers {
        token: GroupToken,
        members: Vec<Identity>,
    },
    GroupMemberLeft {
        creator: Identity,
        token: GroupToken,
    },
    DeliveryReceipt {
        message_id: MessageId,
        status: ReceiptStatus,
    },
    Typing {
        state: TypingState,
    },
    Unknown {
        type_code: u8,
    },
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Text { .. } => "TextMessage",
            MessageKind::Image { .. } => "ImageMessage",
            MessageKind::Audio { .. } => "AudioMessage",
            MessageKind::GroupText { .. } => "GroupTextMessage",
            MessageKind::GroupSetName { .. } => "GroupManageSetNameMessage",
            MessageKind::GroupSetMembers { .. } => "GroupManageSetMembersMessage",
            MessageKind::GroupMemberLeft { .. } => "GroupMemberLeftMessage",
            MessageKind::DeliveryReceipt { .. } => "DeliveryReceiptMessage",
            MessageKind::Typing { .. } => "TypingNotificationMessage",
            MessageKind::Unknown { .. } => "UnknownMessage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(header: MessageHeader, kind: MessageKind) -> Self {
        Self { header, kind }
    }
}

/// One item from the session's inbound source. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(Message),
    TransportError(TransportEventError),
}

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Text {
        to: Identity,
        id: MessageId,
        text: String,
    },
    GroupText {
        creator: Identity,
        token: GroupToken,
        to: Vec<Identity>,
        id: MessageId,
        text: String,
    },
    Receipt {
        to: Identity,
        id: MessageId,
        message_id: MessageId,
        status: ReceiptStatus,
    },
}

impl OutboundEvent {
    pub fn text(to: Identity, text: impl Into<String>) -> Self {
        OutboundEvent::Text {
            to,
            id: MessageId::random(),
            text: text.into(),
        }
    }
}

impl Display for OutboundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboundEvent::Text { to, id, .. } => write!(f, "Text[{id}] -> {to}"),
            OutboundEvent::GroupText {
                creator, token, to, id, ..
            } => write!(
                f,
                "GroupText[{id}] -> group [{token}] by [{creator}] ({} recipients)",
                to.len()
            ),
            OutboundEvent::Receipt {
                to,
                message_id,
                status,
                ..
            } => write!(f, "Receipt({status}) for [{message_id}] -> {to}"),
        }
    }
}

/// A running session: a lazy inbound source that ends when the transport
/// closes, and an outbound sink that may apply backpressure.
///
/// The sink is a cloneable `mpsc::Sender`, so the dispatch loop and a
/// proactive sender can both write to it; the channel serializes them.
pub struct Session {
    pub inbound: mpsc::Receiver<InboundEvent>,
    pub outbound: mpsc::Sender<OutboundEvent>,
}

/// Starts a session for the local identity.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn start(&self, local: Identity, nickname: &str)
        -> Result<Session, DeliveryServiceError>;
}
