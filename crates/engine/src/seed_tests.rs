// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn draw_is_stable_for_same_inputs() {
    let sub = SubscriberId::from_string("sub-1");
    let step = StepId::new("s1");
    assert_eq!(stable_draw(&sub, &step), stable_draw(&sub, &step));
}

#[test]
fn draw_varies_across_subscribers_and_steps() {
    let step = StepId::new("s1");
    let draws: Vec<u32> = (0..50)
        .map(|i| stable_draw(&SubscriberId::from_string(format!("sub-{i}")), &step))
        .collect();
    let distinct: std::collections::HashSet<_> = draws.iter().collect();
    assert!(distinct.len() > 40, "draws should spread: {distinct:?}");

    let sub = SubscriberId::from_string("sub-1");
    assert_ne!(stable_draw(&sub, &StepId::new("s1")), stable_draw(&sub, &StepId::new("s2")));
}

#[test]
fn draw_is_in_basis_point_range() {
    for i in 0..100 {
        let draw = stable_draw(&SubscriberId::from_string(format!("sub-{i}")), &StepId::new("s"));
        assert!(draw < 10_000);
    }
}

#[test]
fn idempotency_key_is_stable_per_epoch() {
    let sub = SubscriberId::from_string("sub-1");
    let step = StepId::new("s1");
    assert_eq!(idempotency_key(&sub, &step, 0), idempotency_key(&sub, &step, 0));
    assert_ne!(idempotency_key(&sub, &step, 0), idempotency_key(&sub, &step, 1));
}

#[test]
fn idempotency_key_is_fresh_per_subscriber() {
    let step = StepId::new("s1");
    assert_ne!(
        idempotency_key(&SubscriberId::from_string("sub-1"), &step, 0),
        idempotency_key(&SubscriberId::from_string("sub-2"), &step, 0),
    );
}

#[test]
fn hex_encoding_is_lowercase_pairs() {
    assert_eq!(hex_encode(&[0x00, 0xff, 0x0a]), "00ff0a");
}
