//! Stateless builders for outgoing replies.
use crate::ds::{OutboundEvent, ReceiptFactory, ReceiptStatus};
use crate::error::ReceiptError;
use crate::identity::{Identity, MessageId};

/// Quote `text` as `sender_display`, then append `suffix` on its own line.
///
/// Every line of `text` gets the `> ` quote marker.
pub fn quote_echo(sender_display: &str, text: &str, suffix: &str) -> String {
    format!(
        "> {sender_display}: {}\n{suffix}",
        text.replace('\n', "\n> ")
    )
}

/// Delivery or read acknowledgement for `message_id`, addressed at `target`.
pub fn acknowledgement(
    receipts: &dyn ReceiptFactory,
    target: &Identity,
    message_id: MessageId,
    status: ReceiptStatus,
) -> Result<OutboundEvent, ReceiptError> {
    receipts.build_receipt(target, message_id, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::SessionReceiptFactory;

    #[test]
    fn test_quote_echo_multiline() {
        assert_eq!(
            quote_echo("Bob", "line1\nline2", "Exactly!"),
            "> Bob: line1\n> line2\nExactly!"
        );
    }

    #[test]
    fn test_quote_echo_single_and_empty() {
        assert_eq!(quote_echo("Bob", "hi", "Exactly!"), "> Bob: hi\nExactly!");
        assert_eq!(quote_echo("Bob", "", "Exactly!"), "> Bob: \nExactly!");
        assert_eq!(
            quote_echo("Bob", "a\n\nb\n", "!"),
            "> Bob: a\n> \n> b\n> \n!"
        );
    }

    #[test]
    fn test_acknowledgement_delegates_to_factory() {
        let local: Identity = "ECHOECHO".parse().unwrap();
        let peer: Identity = "8S3HMY9Z".parse().unwrap();
        let factory = SessionReceiptFactory::new(local);

        let ack = acknowledgement(&factory, &peer, MessageId(42), ReceiptStatus::Delivered)
            .expect("ack");
        assert!(matches!(
            ack,
            OutboundEvent::Receipt {
                status: ReceiptStatus::Delivered,
                message_id: MessageId(42),
                ..
            }
        ));
        assert!(acknowledgement(&factory, &local, MessageId(42), ReceiptStatus::Read).is_err());
    }
}
