//! Contact and group directory behaviour, including persistence.

use std::sync::Arc;

use parrot_bot::ds::StaticDirectory;
use parrot_bot::storage::{FileStore, MemoryStore, SnapshotStore};
use parrot_bot::{
    Contact, ContactDirectory, DirectoryError, GroupDirectory, GroupToken, Identity,
};

fn id(s: &str) -> Identity {
    s.parse().expect("valid identity")
}

fn directory_with(contacts: &[(&str, &str)]) -> Arc<StaticDirectory> {
    Arc::new(StaticDirectory::with_contacts(
        contacts.iter().map(|(i, n)| Contact::new(id(i), *n)),
    ))
}

#[tokio::test]
async fn test_resolve_fetches_once_and_persists() {
    let remote = directory_with(&[("8S3HMY9Z", "")]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote.clone(), store.clone());

    let first = contacts.resolve(&id("8S3HMY9Z")).await.expect("resolve");
    assert_eq!(first, Contact::new(id("8S3HMY9Z"), ""));
    assert_eq!(remote.lookups(), 1);
    assert_eq!(store.writes(), 1);

    let second = contacts.resolve(&id("8S3HMY9Z")).await.expect("cached");
    assert_eq!(second, first);
    assert_eq!(remote.lookups(), 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_resolve_unknown_identity_fails_without_mutation() {
    let remote = directory_with(&[]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote, store.clone());

    let err = contacts.resolve(&id("NOBODY00")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::LookupFailed { .. }));
    assert!(contacts.is_empty());
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_confirmed_name_is_never_overwritten() {
    let remote = directory_with(&[("8S3HMY9Z", "Bob")]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote, store.clone());
    contacts.resolve(&id("8S3HMY9Z")).await.unwrap();
    let writes = store.writes();

    for suggestion in ["~bobby", "bobby", "~Bob", ""] {
        let contact = contacts
            .reconcile_suggested_name(&id("8S3HMY9Z"), suggestion)
            .await
            .unwrap();
        assert_eq!(contact.name, "Bob");
    }
    assert_eq!(contacts.get(&id("8S3HMY9Z")).unwrap().name, "Bob");
    assert_eq!(store.writes(), writes);
}

#[tokio::test]
async fn test_empty_name_takes_suggestion_exactly_once() {
    let remote = directory_with(&[("8S3HMY9Z", "")]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote, store.clone());
    contacts.resolve(&id("8S3HMY9Z")).await.unwrap();
    assert_eq!(store.writes(), 1);

    let contact = contacts
        .reconcile_suggested_name(&id("8S3HMY9Z"), "~X")
        .await
        .unwrap();
    assert_eq!(contact.name, "~X");
    assert_eq!(store.writes(), 2);

    contacts
        .reconcile_suggested_name(&id("8S3HMY9Z"), "~X")
        .await
        .unwrap();
    assert_eq!(contacts.get(&id("8S3HMY9Z")).unwrap().name, "~X");
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn test_suggested_name_follows_new_suggestion() {
    let remote = directory_with(&[("8S3HMY9Z", "~old")]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote, store.clone());
    contacts.resolve(&id("8S3HMY9Z")).await.unwrap();

    let contact = contacts
        .reconcile_suggested_name(&id("8S3HMY9Z"), "new")
        .await
        .unwrap();
    assert_eq!(contact.name, "~new");
    assert_eq!(store.writes(), 2);
}

#[tokio::test]
async fn test_unknown_contact_is_fetched_with_suggestion_in_one_write() {
    let remote = directory_with(&[("8S3HMY9Z", "")]);
    let store = Arc::new(MemoryStore::new());
    let mut contacts = ContactDirectory::new(remote.clone(), store.clone());

    let contact = contacts
        .reconcile_suggested_name(&id("8S3HMY9Z"), "~parrotfan")
        .await
        .unwrap();
    assert_eq!(contact, Contact::new(id("8S3HMY9Z"), "~parrotfan"));
    assert_eq!(remote.lookups(), 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_contacts_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("address.book");
    let remote = directory_with(&[("8S3HMY9Z", "Bob"), ("ECHOECHO", ""), ("ABCDEFGH", "")]);

    let mut contacts = ContactDirectory::new(remote.clone(), Arc::new(FileStore::new(&path)));
    contacts.resolve(&id("8S3HMY9Z")).await.unwrap();
    contacts.resolve(&id("ECHOECHO")).await.unwrap();
    contacts
        .reconcile_suggested_name(&id("ABCDEFGH"), "~abc")
        .await
        .unwrap();

    let reloaded = ContactDirectory::load(remote, Arc::new(FileStore::new(&path))).unwrap();
    let mut before: Vec<Contact> = contacts.contacts().cloned().collect();
    let mut after: Vec<Contact> = reloaded.contacts().cloned().collect();
    before.sort_by_key(|c| c.identity);
    after.sort_by_key(|c| c.identity);
    assert_eq!(before, after);
    assert_eq!(reloaded.len(), 3);
}

#[tokio::test]
async fn test_failed_persist_is_reported() {
    let remote = directory_with(&[("8S3HMY9Z", "")]);
    let mut contacts = ContactDirectory::new(remote, Arc::new(MemoryStore::failing()));
    let err = contacts.resolve(&id("8S3HMY9Z")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Storage(_)));
}

#[test]
fn test_inferred_group_replaced_by_authoritative_roster() {
    let local = id("ECHOECHO");
    let creator = id("CREATOR1");
    let sender = id("SENDER01");
    let token = GroupToken([9; 8]);
    let store = Arc::new(MemoryStore::new());
    let mut groups = GroupDirectory::new(local, store.clone());

    assert!(groups.lookup(&creator, &token).is_none());
    let inferred = groups
        .infer_from_observed_message(creator, token, sender, local)
        .unwrap();
    assert_eq!(groups.len(), 1);
    for member in [creator, sender, local] {
        assert!(inferred.is_member(&member));
    }
    assert!(inferred.inferred);

    let roster = [creator, local, id("MEMBER01")];
    let group = groups
        .apply_authoritative_members(creator, token, &roster)
        .unwrap();
    assert_eq!(group.members, roster.to_vec());
    assert!(!group.inferred);
    assert!(!group.is_member(&sender));
    assert_eq!(groups.len(), 1);
    assert_eq!(store.writes(), 2);
}

#[test]
fn test_authoritative_roster_adds_creator_and_keeps_local() {
    let local = id("ECHOECHO");
    let creator = id("CREATOR1");
    let token = GroupToken([7; 8]);
    let mut groups = GroupDirectory::new(local, Arc::new(MemoryStore::new()));

    groups.apply_name(creator, token, "Flock").unwrap();
    let group = groups
        .apply_authoritative_members(creator, token, &[local, id("MEMBER01"), local])
        .unwrap();
    assert_eq!(group.members, vec![creator, local, id("MEMBER01")]);
    assert_eq!(group.name.as_deref(), Some("Flock"));
}

#[test]
fn test_groups_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group.directory");
    let local = id("ECHOECHO");

    let mut groups = GroupDirectory::new(local, Arc::new(FileStore::new(&path)));
    groups
        .apply_authoritative_members(id("CREATOR1"), GroupToken([1; 8]), &[local])
        .unwrap();
    groups
        .infer_from_observed_message(id("CREATOR2"), GroupToken([2; 8]), id("SENDER01"), local)
        .unwrap();
    groups
        .apply_name(id("CREATOR1"), GroupToken([1; 8]), "Birds")
        .unwrap();

    let reloaded = GroupDirectory::load(local, Arc::new(FileStore::new(&path))).unwrap();
    let before: Vec<_> = groups.groups().cloned().collect();
    let after: Vec<_> = reloaded.groups().cloned().collect();
    assert_eq!(before, after);

    let raw = FileStore::new(&path).load().unwrap().unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.contains("0101010101010101"));
}
