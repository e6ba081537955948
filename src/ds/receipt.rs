//! Receipt collaborator: mints delivery/read acknowledgements.
use crate::ds::{OutboundEvent, ReceiptStatus};
use crate::error::ReceiptError;
use crate::identity::{Identity, MessageId};

pub trait ReceiptFactory: Send + Sync {
    fn build_receipt(
        &self,
        target: &Identity,
        message_id: MessageId,
        status: ReceiptStatus,
    ) -> Result<OutboundEvent, ReceiptError>;
}

/// Builds receipts on behalf of the local identity of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionReceiptFactory {
    local: Identity,
}

impl SessionReceiptFactory {
    pub fn new(local: Identity) -> Self {
        Self { local }
    }
}

impl ReceiptFactory for SessionReceiptFactory {
    fn build_receipt(
        &self,
        target: &Identity,
        message_id: MessageId,
        status: ReceiptStatus,
    ) -> Result<OutboundEvent, ReceiptError> {
        if *target == self.local {
            return Err(ReceiptError::SelfAddressed(target.to_string()));
        }
        if let ReceiptStatus::Unknown(_) = status {
            return Err(ReceiptError::UnsupportedStatus(status.to_string()));
        }
        Ok(OutboundEvent::Receipt {
            to: *target,
            id: MessageId::random(),
            message_id,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_receipt_factory() {
        let local: Identity = "ECHOECHO".parse().unwrap();
        let peer: Identity = "8S3HMY9Z".parse().unwrap();
        let factory = SessionReceiptFactory::new(local);

        let receipt = factory
            .build_receipt(&peer, MessageId(7), ReceiptStatus::Read)
            .expect("receipt for peer");
        match receipt {
            OutboundEvent::Receipt {
                to,
                message_id,
                status,
                ..
            } => {
                assert_eq!(to, peer);
                assert_eq!(message_id, MessageId(7));
                assert_eq!(status, ReceiptStatus::Read);
            }
            other => panic!("expected receipt, got {other:?}"),
        }

        assert!(matches!(
            factory.build_receipt(&local, MessageId(7), ReceiptStatus::Delivered),
            Err(ReceiptError::SelfAddressed(_))
        ));
        assert!(matches!(
            factory.build_receipt(&peer, MessageId(7), ReceiptStatus::Unknown(9)),
            Err(ReceiptError::UnsupportedStatus(_))
        ));
    }
}
