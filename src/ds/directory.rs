//! Directory-service collaborator: resolves an identity to a contact record.
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::contact::Contact;
use crate::error::DirectoryError;
use crate::identity::Identity;

#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Fetch the public record of `identity`. No retries are attempted.
    async fn fetch_contact(&self, identity: &Identity) -> Result<Contact, DirectoryError>;
}

/// Fixed set of known contacts. Unknown identities fail the lookup.
#[derive(Default)]
pub struct StaticDirectory {
    entries: Mutex<HashMap<Identity, Contact>>,
    lookups: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let dir = Self::new();
        for contact in contacts {
            dir.insert(contact);
        }
        dir
    }

    pub fn insert(&self, contact: Contact) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(contact.identity, contact);
        }
    }

    /// Number of `fetch_contact` calls served so far, successful or not.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryService for StaticDirectory {
    async fn fetch_contact(&self, identity: &Identity) -> Result<Contact, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let entries = self
            .entries
            .lock()
            .map_err(|_| DirectoryError::LookupFailed {
                identity: identity.to_string(),
                reason: "directory poisoned".to_string(),
            })?;
        entries
            .get(identity)
            .cloned()
            .ok_or_else(|| DirectoryError::LookupFailed {
                identity: identity.to_string(),
                reason: "identity not found".to_string(),
            })
    }
}

/// Accepts every well-formed identity and returns it with an empty name.
///
/// Used when the bot runs without a directory server.
#[derive(Default, Clone, Copy)]
pub struct OfflineDirectory;

#[async_trait]
impl DirectoryService for OfflineDirectory {
    async fn fetch_contact(&self, identity: &Identity) -> Result<Contact, DirectoryError> {
        Ok(Contact::new(*identity, ""))
    }
}
