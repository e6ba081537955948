//! Contact directory: lazily fetched, persisted address book.
//!
//! Names starting with [`SUGGESTED_NAME_PREFIX`] were picked by the contact
//! themselves and are only suggestions. Any other non-empty name is
//! confirmed and is never overwritten by a suggestion.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use crate::ds::DirectoryService;
use crate::error::DirectoryError;
use crate::identity::Identity;
use crate::storage::SnapshotStore;

pub const SUGGESTED_NAME_PREFIX: char = '~';

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub identity: Identity,
    #[serde(default)]
    pub name: String,
}

impl Contact {
    pub fn new(identity: Identity, name: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
        }
    }

    pub fn has_suggested_name(&self) -> bool {
        self.name.starts_with(SUGGESTED_NAME_PREFIX)
    }

    /// The stored name, or the identity when no name is known.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.identity.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Turn a sender-chosen nickname into a suggested name (`parrot` -> `~parrot`).
pub fn suggested_name(pub_nick: &str) -> String {
    if pub_nick.starts_with(SUGGESTED_NAME_PREFIX) {
        pub_nick.to_string()
    } else {
        format!("{SUGGESTED_NAME_PREFIX}{pub_nick}")
    }
}

pub struct ContactDirectory {
    contacts: BTreeMap<Identity, Contact>,
    directory: Arc<dyn DirectoryService>,
    store: Arc<dyn SnapshotStore>,
}

impl ContactDirectory {
    pub fn new(directory: Arc<dyn DirectoryService>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            contacts: BTreeMap::new(),
            directory,
            store,
        }
    }

    /// Build a directory from the last persisted snapshot, empty if none.
    pub fn load(
        directory: Arc<dyn DirectoryService>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self, DirectoryError> {
        let mut dir = Self::new(directory, store);
        if let Some(bytes) = dir.store.load()? {
            let stored: BTreeMap<Identity, Contact> = serde_json::from_slice(&bytes)
                .map_err(|e| DirectoryError::Storage(e.into()))?;
            dir.contacts = stored
                .into_values()
                .map(|contact| (contact.identity, contact))
                .collect();
            info!("Loaded {} contacts", dir.contacts.len());
        }
        Ok(dir)
    }

    pub fn get(&self, identity: &Identity) -> Option<&Contact> {
        self.contacts.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.contacts.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    /// Return the cached contact, fetching and persisting it if unknown.
    pub async fn resolve(&mut self, identity: &Identity) -> Result<Contact, DirectoryError> {
        if let Some(contact) = self.contacts.get(identity) {
            return Ok(contact.clone());
        }
        let contact = self.fetch(identity).await?;
        self.upsert(contact.clone())?;
        Ok(contact)
    }

    /// Apply a sender-supplied nickname to the stored contact.
    ///
    /// Unknown contacts are fetched and take the suggestion. Known contacts
    /// take it only if their name is empty or a different suggestion.
    /// Confirmed names stay as they are. Persists at most once.
    pub async fn reconcile_suggested_name(
        &mut self,
        identity: &Identity,
        suggestion: &str,
    ) -> Result<Contact, DirectoryError> {
        let suggestion = suggested_name(suggestion);
        // A bare tilde carries no name.
        let has_suggestion = suggestion.len() > SUGGESTED_NAME_PREFIX.len_utf8();

        let Some(current) = self.contacts.get(identity).cloned() else {
            info!("Contact {identity} missing in address book, adding it");
            let mut contact = self.fetch(identity).await?;
            if has_suggestion {
                contact.name = suggestion;
            }
            self.upsert(contact.clone())?;
            return Ok(contact);
        };

        if !has_suggestion {
            return Ok(current);
        }

        if current.name.is_empty() {
            info!("Address book has no name for {identity}, using {suggestion}");
        } else if current.has_suggested_name() && current.name != suggestion {
            info!(
                "Suggested name of {identity} changed from {} to {suggestion}",
                current.name
            );
        } else {
            return Ok(current);
        }

        let updated = Contact::new(*identity, suggestion);
        self.upsert(updated.clone())?;
        Ok(updated)
    }

    async fn fetch(&self, identity: &Identity) -> Result<Contact, DirectoryError> {
        info!("Retrieving {identity} from directory server");
        let mut contact = self.directory.fetch_contact(identity).await?;
        // The record is filed under the identity that was asked for.
        contact.identity = *identity;
        Ok(contact)
    }

    fn upsert(&mut self, contact: Contact) -> Result<(), DirectoryError> {
        self.contacts.insert(contact.identity, contact);
        self.persist()
    }

    fn persist(&self) -> Result<(), DirectoryError> {
        let bytes =
            serde_json::to_vec_pretty(&self.contacts).map_err(|e| DirectoryError::Storage(e.into()))?;
        self.store.store(&bytes)?;
        debug!("Address book saved ({} contacts)", self.contacts.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_name() {
        assert_eq!(suggested_name("parrot"), "~parrot");
        assert_eq!(suggested_name("~parrot"), "~parrot");
        assert_eq!(suggested_name(""), "~");
    }

    #[test]
    fn test_display_name_falls_back_to_identity() {
        let id: Identity = "8S3HMY9Z".parse().unwrap();
        assert_eq!(Contact::new(id, "").display_name(), "8S3HMY9Z");
        assert_eq!(Contact::new(id, "~bob").display_name(), "~bob");
        assert!(Contact::new(id, "~bob").has_suggested_name());
        assert!(!Contact::new(id, "Bob").has_suggested_name());
    }
}
