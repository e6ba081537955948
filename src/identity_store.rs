//! Local identity persistence.
//!
//! The real identity carries key material sealed with a passphrase; that
//! format belongs to the session layer. The bot only needs the [`Identity`]
//! back, so it talks to an [`IdentityStore`].
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::IdentityError;
use crate::identity::Identity;
use crate::storage::{FileStore, SnapshotStore};

pub trait IdentityStore: Send + Sync {
    /// Mint a new identity.
    fn create(&self) -> Result<Identity, IdentityError>;

    fn save(&self, identity: &Identity, path: &Path, passphrase: &[u8])
        -> Result<(), IdentityError>;

    /// Fails with [`IdentityError::IdentityMissing`] if nothing is stored at `path`.
    fn load(&self, path: &Path, passphrase: &[u8]) -> Result<Identity, IdentityError>;
}

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    identity: Identity,
}

/// Stores the identity as plain JSON. The passphrase is not used.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainIdentityStore;

impl IdentityStore for PlainIdentityStore {
    fn create(&self) -> Result<Identity, IdentityError> {
        Ok(Identity::random())
    }

    fn save(
        &self,
        identity: &Identity,
        path: &Path,
        passphrase: &[u8],
    ) -> Result<(), IdentityError> {
        if !passphrase.is_empty() {
            warn!("Plain identity store does not encrypt {}", path.display());
        }
        let bytes = serde_json::to_vec(&StoredIdentity {
            identity: *identity,
        })
        .map_err(crate::error::StorageError::from)?;
        FileStore::new(path).store(&bytes)?;
        Ok(())
    }

    fn load(&self, path: &Path, _passphrase: &[u8]) -> Result<Identity, IdentityError> {
        let bytes = FileStore::new(path)
            .load()?
            .ok_or_else(|| IdentityError::IdentityMissing(path.display().to_string()))?;
        let stored: StoredIdentity =
            serde_json::from_slice(&bytes).map_err(crate::error::StorageError::from)?;
        Ok(stored.identity)
    }
}

/// Load the identity at `path`, or create and save one when `create` is set.
pub fn load_or_create(
    store: &dyn IdentityStore,
    path: &Path,
    passphrase: &[u8],
    create: bool,
) -> Result<Identity, IdentityError> {
    match store.load(path, passphrase) {
        Ok(identity) => {
            info!("Loaded ID from {}", path.display());
            Ok(identity)
        }
        Err(IdentityError::IdentityMissing(_)) if create => {
            info!("Creating new identity");
            let identity = store.create()?;
            store.save(&identity, path, passphrase)?;
            info!("Saved ID to {}", path.display());
            Ok(identity)
        }
        Err(e) => Err(e),
    }
}
