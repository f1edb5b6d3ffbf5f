// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use valstake::core::economics::registry::StakingRegistry;
use valstake::core::economics::unbound::UnboundQueue;
use valstake::core::types::{Address, GenesisValidator, StakingConfig, StakingParams};

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

#[test]
fn claims_preserve_fifo_order() {
    let mut q = UnboundQueue::new();
    q.push(100, 10);
    q.push(100, 20);
    q.push(100, 30);
    assert_eq!(q.pending(), 300);
    assert_eq!(q.len(), 3);

    // Only entries matured at `now` are visible or claimable.
    assert_eq!(q.claimable(15), 100);
    assert_eq!(q.claim_matured(15), 100);
    assert_eq!(q.claim_matured(25), 100);
    assert_eq!(q.pending(), 100);
    assert_eq!(q.claim_matured(5), 0);
    assert_eq!(q.claim_matured(30), 100);
    assert!(q.is_empty());
}

#[test]
fn slash_consumes_front_regardless_of_maturity() {
    let mut q = UnboundQueue::new();
    q.push(100, 1_000);
    q.push(50, 2_000);

    // Partial front entry is reduced in place.
    assert_eq!(q.slash(30), 30);
    assert_eq!(q.pending(), 120);
    assert_eq!(q.len(), 2);
    assert_eq!(q.claimable(1_000), 70);

    assert_eq!(q.slash(70), 70);
    assert_eq!(q.len(), 1);
    assert_eq!(q.pending(), 50);
}

#[test]
fn over_slash_resets_to_canonical_empty() {
    let mut q = UnboundQueue::new();
    q.push(100, 10);
    q.push(50, 20);

    // Consumption is bounded by what the queue holds.
    assert_eq!(q.slash(200), 150);
    assert_eq!(q.pending(), 0);
    assert_eq!(q.len(), 0);
    assert_eq!(q.start_idx(), 0);
    assert!(q.is_empty());

    // Queue is fully reusable afterwards.
    q.push(70, 30);
    assert_eq!(q.pending(), 70);
    assert_eq!(q.claim_matured(30), 70);
}

#[test]
fn drained_queue_resets_cursors() {
    let mut q = UnboundQueue::new();
    q.push(10, 0);
    q.push(20, 0);
    assert_eq!(q.claim_matured(0), 30);
    assert_eq!(q.start_idx(), 0);
    assert_eq!(q.pending(), 0);
}

#[test]
fn zero_push_is_ignored() {
    let mut q = UnboundQueue::new();
    q.push(0, 10);
    assert!(q.is_empty());
    assert_eq!(q.pending(), 0);
}

#[test]
fn lock_period_gates_release() {
    let mut params = StakingParams::default();
    params.unbound_lock_period = 100;
    let mut reg = StakingRegistry::from_genesis(&StakingConfig {
        admin: addr(1),
        params,
        genesis: vec![GenesisValidator {
            validator: addr(10),
            manager: addr(11),
            commission_rate: 0,
            stake: 3_000_000,
            accept_delegation: true,
        }],
    })
    .unwrap();

    reg.sub_stake(addr(11), addr(10), 500_000, true, 50).unwrap();

    // Before maturity nothing is released; the claim is not consumed.
    let early = reg.validator_claim_any(addr(11), addr(10), 100).unwrap();
    assert_eq!(early.released_stake, 0);
    assert_eq!(reg.validator(&addr(10)).unwrap().total_unwithdrawn(), 3_000_000);

    let late = reg.validator_claim_any(addr(11), addr(10), 150).unwrap();
    assert_eq!(late.released_stake, 500_000);
    assert_eq!(reg.validator(&addr(10)).unwrap().total_unwithdrawn(), 2_500_000);
}
