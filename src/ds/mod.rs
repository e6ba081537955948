//! Seam between the bot and the external end-to-end-encrypted session.
//!
//! The transport, handshake and directory server live outside this crate.
//! Everything here is either a plain data type crossing that boundary or a
//! trait the external layer implements. `loopback` is an in-process stand-in
//! used when no transport is linked.

mod directory;
mod error;
pub mod loopback;
mod receipt;
mod transport;

pub use directory::{DirectoryService, OfflineDirectory, StaticDirectory};
pub use error::{DeliveryServiceError, TransportEventError};
pub use receipt::{ReceiptFactory, SessionReceiptFactory};
pub use transport::{
    InboundEvent, Message, MessageHeader, MessageKind, OutboundEvent, ReceiptStatus, Session,
    SessionConnector, TypingState,
};
