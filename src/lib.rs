//! A directory-synchronizing echo bot on top of an external encrypted
//! messaging session.
//!
//! - [`contact::ContactDirectory`] and [`group::GroupDirectory`] keep the
//!   address book and group rosters, persisted after every change
//! - [`dispatch::Dispatcher`] consumes inbound events and answers them
//! - [`reply`] builds the quoted echo and acknowledgements
//! - [`ds`] is the seam to the transport, directory server and receipt minting
//! - [`bootstrap`] wires it all together for the binary

pub mod bootstrap;
pub mod cli;
pub mod contact;
pub mod dispatch;
pub mod ds;
pub mod error;
pub mod group;
pub mod identity;
pub mod identity_store;
pub mod reply;
pub mod sender;
pub mod storage;

pub use bootstrap::{bootstrap, Bot, Collaborators};
pub use cli::{Args, BotConfig};
pub use contact::{Contact, ContactDirectory};
pub use dispatch::{DispatchConfig, DispatchOutcome, Dispatcher};
pub use error::{DirectoryError, DispatchError, IdentityError, ReceiptError, StorageError};
pub use group::{Group, GroupDirectory, GroupKey};
pub use identity::{GroupToken, Identity, MessageId};
