//! The dispatch loop: consumes inbound events one at a time, keeps the
//! directories current and answers text messages with a quoted echo.
//!
//! Everything happens on the loop's own task. Per event, failures are logged
//! and the loop moves on; only [fatal](DispatchError::is_fatal) errors end it.
use log::{debug, error, info, warn};
use std::{fmt::Display, sync::Arc, time::Duration};
use tokio::sync::{mpsc, Mutex};

use crate::contact::ContactDirectory;
use crate::ds::{
    DeliveryServiceError, InboundEvent, MessageHeader, MessageKind, OutboundEvent, ReceiptFactory,
    ReceiptStatus, TypingState,
};
use crate::error::DispatchError;
use crate::group::GroupDirectory;
use crate::identity::{GroupToken, Identity, MessageId};
use crate::reply::{acknowledgement, quote_echo};

pub const DEFAULT_REPLY_SUFFIX: &str = "Exactly!";
pub const DEFAULT_GROUP_REPLY_SUFFIX: &str = "Exactly in group!";
/// Pause before a group reply, to go easy on the transport.
pub const DEFAULT_GROUP_REPLY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub reply_suffix: String,
    pub group_reply_suffix: String,
    pub group_reply_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            reply_suffix: DEFAULT_REPLY_SUFFIX.to_string(),
            group_reply_suffix: DEFAULT_GROUP_REPLY_SUFFIX.to_string(),
            group_reply_delay: DEFAULT_GROUP_REPLY_DELAY,
        }
    }
}

/// What handling a single event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Outbound events were written to the sink.
    Replied { sent: usize },
    /// A directory was updated, nothing was sent.
    Updated,
    /// Logged only.
    Observed,
    /// Ignored on purpose: our own message or a transport error.
    Dropped,
    /// Message kind the bot does not know.
    Unrecognized,
}

impl Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Replied { sent } => write!(f, "Replied({sent})"),
            DispatchOutcome::Updated => write!(f, "Updated"),
            DispatchOutcome::Observed => write!(f, "Observed"),
            DispatchOutcome::Dropped => write!(f, "Dropped"),
            DispatchOutcome::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

pub struct Dispatcher {
    local: Identity,
    contacts: Arc<Mutex<ContactDirectory>>,
    groups: Arc<Mutex<GroupDirectory>>,
    receipts: Arc<dyn ReceiptFactory>,
    outbound: mpsc::Sender<OutboundEvent>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        local: Identity,
        contacts: Arc<Mutex<ContactDirectory>>,
        groups: Arc<Mutex<GroupDirectory>>,
        receipts: Arc<dyn ReceiptFactory>,
        outbound: mpsc::Sender<OutboundEvent>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            local,
            contacts,
            groups,
            receipts,
            outbound,
            config,
        }
    }

    /// Consume `inbound` until the transport closes it.
    ///
    /// Returns `Err` only for a fatal error; the event source is dropped then.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundEvent>) -> Result<(), DispatchError> {
        info!("Dispatch loop started for {}", self.local);
        while let Some(event) = inbound.recv().await {
            match self.dispatch(event).await {
                Ok(outcome) => debug!("Event handled: {outcome}"),
                Err(e) if e.is_fatal() => {
                    error!("Fatal error, stopping dispatch loop: {e}");
                    return Err(e);
                }
                Err(e) => error!("Error handling event: {e}"),
            }
        }
        info!("Inbound source closed, dispatch loop finished");
        Ok(())
    }

    /// Handle one event.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome, DispatchError> {
        let message = match event {
            InboundEvent::TransportError(e) => {
                warn!("Error receiving message: {e}");
                return Ok(DispatchOutcome::Dropped);
            }
            InboundEvent::Message(message) => message,
        };
        let header = &message.header;
        debug!(
            "Dispatching {} [{}] from [{}]",
            message.kind.name(),
            header.id,
            header.sender
        );

        match &message.kind {
            MessageKind::Text { text } => self.handle_text(header, text).await,
            MessageKind::Image { size } => {
                info!(
                    "ImageMessage: ~{} [{}] sent an image ({size} bytes)",
                    header.pub_nick, header.sender
                );
                Ok(DispatchOutcome::Observed)
            }
            MessageKind::Audio { duration_secs } => {
                info!(
                    "AudioMessage: ~{} [{}] sent {duration_secs}s of audio",
                    header.pub_nick, header.sender
                );
                Ok(DispatchOutcome::Observed)
            }
            MessageKind::GroupText {
                creator,
                token,
                text,
            } => self.handle_group_text(header, *creator, *token, text).await,
            MessageKind::GroupSetName { token, name } => {
                self.groups
                    .lock()
                    .await
                    .apply_name(header.sender, *token, name)?;
                info!("Group [{token}] is now called {name}");
                Ok(DispatchOutcome::Updated)
            }
            MessageKind::GroupSetMembers { token, members } => {
                let group = self.groups.lock().await.apply_authoritative_members(
                    header.sender,
                    *token,
                    members,
                )?;
                info!("Group [{token}] now includes {:?}", group.members);
                Ok(DispatchOutcome::Updated)
            }
            MessageKind::GroupMemberLeft { creator, token } => {
                let was_member = self
                    .groups
                    .lock()
                    .await
                    .note_member_left(creator, token, &header.sender);
                if was_member {
                    info!("Member [{}] left the group [{token}]", header.sender);
                } else {
                    info!(
                        "Member [{}] left the group [{token}] (not on our roster)",
                        header.sender
                    );
                }
                Ok(DispatchOutcome::Observed)
            }
            MessageKind::DeliveryReceipt { message_id, status } => {
                log_receipt(header, *message_id, *status);
                Ok(DispatchOutcome::Observed)
            }
            MessageKind::Typing { state } => {
                match state {
                    TypingState::Started => {
                        info!("Contact ~{} [{}] is typing", header.pub_nick, header.sender)
                    }
                    TypingState::Stopped => info!(
                        "Contact ~{} [{}] is not typing",
                        header.pub_nick, header.sender
                    ),
                    TypingState::Unknown(value) => warn!(
                        "Unknown typing notification {value} from ~{} [{}]",
                        header.pub_nick, header.sender
                    ),
                }
                Ok(DispatchOutcome::Observed)
            }
            MessageKind::Unknown { type_code } => {
                warn!(
                    "Unknown message type {type_code:#04x} from [{}], message [{}]",
                    header.sender, header.id
                );
                Ok(DispatchOutcome::Unrecognized)
            }
        }
    }

    async fn handle_text(
        &self,
        header: &MessageHeader,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        info!(
            "TextMessage: ~{} [{}]: {text}",
            header.pub_nick, header.sender
        );
        // Answering our own messages would quote the quotes forever.
        if header.sender == self.local {
            return Ok(DispatchOutcome::Dropped);
        }

        let contact = self
            .contacts
            .lock()
            .await
            .reconcile_suggested_name(&header.sender, &header.pub_nick)
            .await?;
        info!(
            "TextMessage: {} (~{}) [{}]: {text}",
            contact.display_name(),
            header.pub_nick,
            header.sender
        );

        let quote = quote_echo(
            header.sender.as_str(),
            text,
            &self.config.reply_suffix,
        );
        self.send(OutboundEvent::text(header.sender, quote)).await?;
        let mut sent = 1;

        for status in [ReceiptStatus::Delivered, ReceiptStatus::Read] {
            match acknowledgement(self.receipts.as_ref(), &header.sender, header.id, status) {
                Ok(receipt) => {
                    self.send(receipt).await?;
                    sent += 1;
                }
                Err(e) => warn!("Skipping {status} receipt for [{}]: {e}", header.id),
            }
        }

        Ok(DispatchOutcome::Replied { sent })
    }

    async fn handle_group_text(
        &self,
        header: &MessageHeader,
        creator: Identity,
        token: GroupToken,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        info!(
            "GroupTextMessage: ~{} [{}] for group [{token}] created by [{creator}]: {text}",
            header.pub_nick, header.sender
        );
        if header.sender == self.local {
            return Ok(DispatchOutcome::Dropped);
        }

        let recipients = {
            let mut groups = self.groups.lock().await;
            let group = groups.infer_from_observed_message(
                creator,
                token,
                header.sender,
                header.recipient,
            )?;
            groups.recipients(&group)
        };
        if recipients.is_empty() {
            warn!("Group [{token}] by [{creator}] has nobody to reply to");
            return Ok(DispatchOutcome::Observed);
        }

        if !self.config.group_reply_delay.is_zero() {
            tokio::time::sleep(self.config.group_reply_delay).await;
        }
        let quote = quote_echo(
            header.sender.as_str(),
            text,
            &self.config.group_reply_suffix,
        );
        self.send(OutboundEvent::GroupText {
            creator,
            token,
            to: recipients,
            id: MessageId::random(),
            text: quote,
        })
        .await?;
        Ok(DispatchOutcome::Replied { sent: 1 })
    }

    async fn send(&self, event: OutboundEvent) -> Result<(), DispatchError> {
        debug!("Sending {event}");
        self.outbound
            .send(event)
            .await
            .map_err(|_| DeliveryServiceError::SinkClosed)?;
        Ok(())
    }
}

fn log_receipt(header: &MessageHeader, message_id: MessageId, status: ReceiptStatus) {
    let who = format!("~{} [{}]", header.pub_nick, header.sender);
    match status {
        ReceiptStatus::Delivered => info!("Message [{message_id}] was received by {who}"),
        ReceiptStatus::Read => info!("Message [{message_id}] was read by {who}"),
        ReceiptStatus::Approved => {
            info!("Message [{message_id}] was approved (thumb up) by {who}")
        }
        ReceiptStatus::Disapproved => {
            info!("Message [{message_id}] was disapproved (thumb down) by {who}")
        }
        ReceiptStatus::Unknown(code) => warn!(
            "Message [{message_id}] has been acknowledged by {who} with unknown status {code}"
        ),
    }
}
