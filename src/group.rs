//! Group directory keyed by (creator, token).
//!
//! There is no remote roster query. Rosters come either from authoritative
//! set-members events or, for a group seen only through its traffic, are
//! inferred from a single message and marked as such until corrected.
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use crate::error::StorageError;
use crate::identity::{GroupToken, Identity};
use crate::storage::SnapshotStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub creator: Identity,
    pub token: GroupToken,
}

impl GroupKey {
    pub fn new(creator: Identity, token: GroupToken) -> Self {
        Self { creator, token }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] created by [{}]", self.token, self.creator)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub creator: Identity,
    pub token: GroupToken,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<Identity>,
    /// Roster was guessed from observed traffic, not received from the creator.
    #[serde(default)]
    pub inferred: bool,
}

impl Group {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.creator, self.token)
    }

    pub fn is_member(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }
}

fn push_unique(members: &mut Vec<Identity>, identity: Identity) {
    if !members.contains(&identity) {
        members.push(identity);
    }
}

pub struct GroupDirectory {
    groups: BTreeMap<GroupKey, Group>,
    local: Identity,
    store: Arc<dyn SnapshotStore>,
}

impl GroupDirectory {
    pub fn new(local: Identity, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            groups: BTreeMap::new(),
            local,
            store,
        }
    }

    pub fn load(local: Identity, store: Arc<dyn SnapshotStore>) -> Result<Self, StorageError> {
        let mut dir = Self::new(local, store);
        if let Some(bytes) = dir.store.load()? {
            let stored: Vec<Group> = serde_json::from_slice(&bytes)?;
            dir.groups = stored.into_iter().map(|g| (g.key(), g)).collect();
            info!("Loaded {} groups", dir.groups.len());
        }
        Ok(dir)
    }

    pub fn lookup(&self, creator: &Identity, token: &GroupToken) -> Option<&Group> {
        self.groups.get(&GroupKey::new(*creator, *token))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Everyone on the roster except ourselves.
    pub fn recipients(&self, group: &Group) -> Vec<Identity> {
        group
            .members
            .iter()
            .filter(|m| **m != self.local)
            .copied()
            .collect()
    }

    /// Return the known group, or insert a minimal roster of
    /// `{creator, sender, recipient}` so a reply can be routed.
    ///
    /// An inferred roster keeps growing with every observed participant until
    /// an authoritative member list replaces it. Authoritative rosters are
    /// returned as they are.
    pub fn infer_from_observed_message(
        &mut self,
        creator: Identity,
        token: GroupToken,
        sender: Identity,
        recipient: Identity,
    ) -> Result<Group, StorageError> {
        let key = GroupKey::new(creator, token);
        if let Some(group) = self.groups.get_mut(&key) {
            if !group.inferred {
                return Ok(group.clone());
            }
            let before = group.members.len();
            for identity in [creator, sender, recipient] {
                push_unique(&mut group.members, identity);
            }
            if group.members.len() == before {
                return Ok(group.clone());
            }
            info!("Group {key} inferred members now {:?}", group.members);
            let group = group.clone();
            self.persist()?;
            return Ok(group);
        }

        let mut members = Vec::with_capacity(3);
        for identity in [creator, sender, recipient] {
            push_unique(&mut members, identity);
        }
        info!("Group {key} unknown, inferring members {members:?}");
        let group = Group {
            creator,
            token,
            name: None,
            members,
            inferred: true,
        };
        self.groups.insert(key, group.clone());
        self.persist()?;
        Ok(group)
    }

    /// Replace the roster with the authoritative member list.
    ///
    /// Set-members events are sent by the creator and name everyone but the
    /// creator, so the creator is put back at the head of the roster. Our own
    /// identity is kept wherever it appears. Duplicates are dropped.
    pub fn apply_authoritative_members(
        &mut self,
        creator: Identity,
        token: GroupToken,
        members: &[Identity],
    ) -> Result<Group, StorageError> {
        let key = GroupKey::new(creator, token);

        let mut roster = Vec::with_capacity(members.len() + 1);
        if !members.contains(&creator) {
            roster.push(creator);
        }
        for identity in members {
            push_unique(&mut roster, *identity);
        }
        if !roster.contains(&self.local) {
            warn!("Group {key} roster does not include us ({})", self.local);
        }

        let group = self.groups.entry(key).or_insert_with(|| Group {
            creator,
            token,
            name: None,
            members: Vec::new(),
            inferred: false,
        });
        if group.inferred {
            debug!("Replacing inferred roster of {key}: {:?}", group.members);
        }
        group.members = roster;
        group.inferred = false;
        let group = group.clone();

        self.persist()?;
        Ok(group)
    }

    /// Set the group name, creating a stub record for an unknown group.
    pub fn apply_name(
        &mut self,
        creator: Identity,
        token: GroupToken,
        name: &str,
    ) -> Result<Group, StorageError> {
        let key = GroupKey::new(creator, token);
        if let Some(group) = self.groups.get(&key) {
            if group.name.as_deref() == Some(name) {
                return Ok(group.clone());
            }
        }

        let group = self.groups.entry(key).or_insert_with(|| Group {
            creator,
            token,
            name: None,
            members: vec![creator],
            inferred: true,
        });
        group.name = Some(name.to_string());
        let group = group.clone();

        self.persist()?;
        Ok(group)
    }

    /// Departures are observational only; the roster is left untouched.
    /// Returns whether `member` was on a known roster.
    pub fn note_member_left(
        &self,
        creator: &Identity,
        token: &GroupToken,
        member: &Identity,
    ) -> bool {
        self.lookup(creator, token)
            .map(|group| group.is_member(member))
            .unwrap_or(false)
    }

    fn persist(&self) -> Result<(), StorageError> {
        let groups: Vec<&Group> = self.groups.values().collect();
        let bytes = serde_json::to_vec_pretty(&groups)?;
        self.store.store(&bytes)?;
        debug!("Group directory saved ({} groups)", groups.len());
        Ok(())
    }
}
