// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drip_core::test_support::ContactBuilder;

fn tenant() -> TenantId {
    TenantId::new("acme")
}

#[tokio::test]
async fn tag_updates_are_idempotent_set_ops() {
    let store = MemoryContactStore::new();
    let tenant = tenant();
    store.insert(&tenant, ContactBuilder::new("a@x.test").tag("lead").build());

    let add = vec!["vip".to_string()];
    store.update_tags(&tenant, "a@x.test", &add, &[]).await.unwrap();
    store.update_tags(&tenant, "a@x.test", &add, &[]).await.unwrap();

    let contact = store.contact(&tenant, "a@x.test").unwrap();
    assert_eq!(contact.tags.iter().filter(|t| *t == "vip").count(), 1);
    assert!(contact.has_tag("lead"));

    store.update_tags(&tenant, "a@x.test", &[], &add).await.unwrap();
    let contact = store.contact(&tenant, "a@x.test").unwrap();
    assert!(!contact.has_tag("vip"));
}

#[tokio::test]
async fn segment_membership() {
    let store = MemoryContactStore::new();
    let tenant = tenant();
    store.insert(&tenant, ContactBuilder::new("a@x.test").build());
    store.add_to_segment("seg-1", "a@x.test");

    assert!(store.in_segment(&tenant, "a@x.test", "seg-1").await.unwrap());
    assert!(!store.in_segment(&tenant, "a@x.test", "seg-2").await.unwrap());
}

#[tokio::test]
async fn field_patch_merges() {
    let store = MemoryContactStore::new();
    let tenant = tenant();
    store.insert(
        &tenant,
        ContactBuilder::new("a@x.test").field("city", FieldValue::Str("Oslo".into())).build(),
    );

    let mut patch = HashMap::new();
    patch.insert("plan".to_string(), FieldValue::Str("pro".into()));
    store.update_fields(&tenant, "a@x.test", &patch).await.unwrap();

    let contact = store.contact(&tenant, "a@x.test").unwrap();
    assert_eq!(contact.custom_fields.get("city"), Some(&FieldValue::Str("Oslo".into())));
    assert_eq!(contact.custom_fields.get("plan"), Some(&FieldValue::Str("pro".into())));
}

#[tokio::test]
async fn list_scopes_by_tenant() {
    let store = MemoryContactStore::new();
    store.insert(&TenantId::new("acme"), ContactBuilder::new("a@x.test").build());
    store.insert(&TenantId::new("other"), ContactBuilder::new("b@x.test").build());

    let contacts = store.list(&TenantId::new("acme")).await.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].email, "a@x.test");
}

#[tokio::test]
async fn unsubscribe_marks_contact() {
    let store = MemoryContactStore::new();
    let tenant = tenant();
    store.insert(&tenant, ContactBuilder::new("a@x.test").build());
    store.set_unsubscribed(&tenant, "a@x.test").await.unwrap();
    assert!(store.contact(&tenant, "a@x.test").unwrap().unsubscribed);
}
