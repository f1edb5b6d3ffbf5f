// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use valstake::core::economics::registry::{RegistryError, StakingRegistry};
use valstake::core::types::{
    decode_canonical_limited, encode_canonical, Address, Event, GenesisValidator, StakingConfig,
    StakingParams,
};

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn genesis_validator(v: u8, m: u8, stake: u128) -> GenesisValidator {
    GenesisValidator {
        validator: addr(v),
        manager: addr(m),
        commission_rate: 0,
        stake,
        accept_delegation: true,
    }
}

fn setup(genesis: Vec<GenesisValidator>) -> StakingRegistry {
    StakingRegistry::from_genesis(&StakingConfig {
        admin: addr(1),
        params: StakingParams::default(),
        genesis,
    })
    .unwrap()
}

#[test]
fn admin_transfer_is_two_phase() {
    let mut reg = setup(vec![]);

    assert_eq!(
        reg.change_admin(addr(9), addr(2)),
        Err(RegistryError::NotAdmin)
    );
    reg.change_admin(addr(1), addr(2)).unwrap();
    // Proposal alone does not transfer ownership.
    assert_eq!(reg.admin(), addr(1));

    assert_eq!(reg.accept_admin(addr(9)), Err(RegistryError::NotPendingAdmin));
    reg.accept_admin(addr(2)).unwrap();
    assert_eq!(reg.admin(), addr(2));
    assert_eq!(reg.accept_admin(addr(2)), Err(RegistryError::NoPendingAdmin));

    let events = reg.take_events();
    assert!(events.contains(&Event::AdminChanging { proposed: addr(2) }));
    assert!(events.contains(&Event::AdminChanged {
        old: addr(1),
        new: addr(2)
    }));
}

#[test]
fn permission_gate_is_one_way() {
    let mut reg = setup(vec![]);

    // Gated: only the admin may register.
    assert_eq!(
        reg.register_validator(addr(9), addr(10), addr(11), 0, 150_000, true),
        Err(RegistryError::PermissionDenied)
    );
    assert_eq!(reg.remove_permission(addr(9)), Err(RegistryError::NotAdmin));

    reg.remove_permission(addr(1)).unwrap();
    assert!(reg.is_opened());
    reg.register_validator(addr(9), addr(10), addr(11), 0, 150_000, true)
        .unwrap();

    assert_eq!(reg.remove_permission(addr(1)), Err(RegistryError::AlreadyOpened));
}

#[test]
fn registration_validates_inputs() {
    let mut reg = setup(vec![genesis_validator(10, 11, 2_000_000)]);

    assert_eq!(
        reg.register_validator(addr(1), addr(10), addr(11), 0, 2_000_000, true),
        Err(RegistryError::DuplicateValidator)
    );
    assert_eq!(
        reg.register_validator(addr(1), Address::zero(), addr(11), 0, 2_000_000, true),
        Err(RegistryError::ZeroAddress)
    );
    assert_eq!(
        reg.register_validator(addr(1), addr(12), addr(13), 0, 149_999, true),
        Err(RegistryError::BelowMinSelfStakes)
    );
    assert!(matches!(
        reg.register_validator(addr(1), addr(12), addr(13), 101, 2_000_000, true),
        Err(RegistryError::Validator(_))
    ));
}

#[test]
fn top_validators_order_and_sizing() {
    let mut reg = setup(vec![
        genesis_validator(10, 11, 2_000_000),
        genesis_validator(12, 13, 3_000_000),
        genesis_validator(14, 15, 2_000_000),
    ]);

    // Stake descending, ties broken by registration order.
    assert_eq!(reg.get_top_validators(0), vec![addr(12), addr(10), addr(14)]);
    assert_eq!(reg.get_top_validators(2), vec![addr(12), addr(10)]);
    assert_eq!(reg.get_top_validators(99), vec![addr(12), addr(10), addr(14)]);

    // A stake change re-seats the ranking.
    reg.add_stake(addr(11), addr(10), 2_000_000).unwrap();
    assert_eq!(reg.get_top_validators(0), vec![addr(10), addr(12), addr(14)]);
}

#[test]
fn active_set_rotates_only_at_epoch_boundaries() {
    let mut reg = setup(vec![
        genesis_validator(10, 11, 2_000_000),
        genesis_validator(12, 13, 3_000_000),
    ]);

    assert_eq!(
        reg.update_active_validator_set(addr(9), vec![addr(10)], 200),
        Err(RegistryError::NotAdmin)
    );
    assert_eq!(
        reg.update_active_validator_set(addr(1), vec![addr(10)], 150),
        Err(RegistryError::NotEpochBoundary)
    );
    assert_eq!(
        reg.update_active_validator_set(addr(1), vec![], 200),
        Err(RegistryError::InvalidActiveSet)
    );
    // Members must come from the current top ranking, no duplicates.
    assert_eq!(
        reg.update_active_validator_set(addr(1), vec![addr(14)], 200),
        Err(RegistryError::InvalidActiveSet)
    );
    assert_eq!(
        reg.update_active_validator_set(addr(1), vec![addr(10), addr(10)], 200),
        Err(RegistryError::InvalidActiveSet)
    );

    reg.update_active_validator_set(addr(1), vec![addr(12)], 200)
        .unwrap();
    assert_eq!(reg.active_validators(), &[addr(12)]);
}

#[test]
fn block_fee_splits_equally_with_dust_carry() {
    let mut reg = setup(vec![
        genesis_validator(10, 11, 2_000_000),
        genesis_validator(12, 13, 2_000_000),
        genesis_validator(14, 15, 2_000_000),
    ]);
    assert_eq!(reg.active_validators().len(), 3);

    reg.distribute_block_fee(10).unwrap();
    // 10 / 3: each member gets 3, the remainder is carried.
    assert_eq!(reg.fee_dust(), 1);
    for v in [addr(10), addr(12), addr(14)] {
        assert_eq!(reg.validator(&v).unwrap().curr_commission(), 3);
    }

    // Carried dust joins the next distribution: (1 + 2) / 3 == 1 each.
    reg.distribute_block_fee(2).unwrap();
    assert_eq!(reg.fee_dust(), 0);
    assert_eq!(reg.validator(&addr(10)).unwrap().curr_commission(), 4);
}

#[test]
fn fee_distribution_requires_active_set() {
    let mut reg = setup(vec![]);
    assert_eq!(
        reg.distribute_block_fee(1_000),
        Err(RegistryError::EmptyActiveSet)
    );
}

#[test]
fn manager_change_moves_control() {
    let mut reg = setup(vec![genesis_validator(10, 11, 2_000_000)]);

    assert_eq!(
        reg.change_validator_manager(addr(9), addr(10), addr(12)),
        Err(RegistryError::NotManager)
    );
    reg.change_validator_manager(addr(11), addr(10), addr(12))
        .unwrap();

    // Control follows the new manager.
    assert_eq!(
        reg.add_stake(addr(11), addr(10), 1_000),
        Err(RegistryError::NotManager)
    );
    reg.add_stake(addr(12), addr(10), 1_000).unwrap();
}

#[test]
fn event_stream_encodes_canonically() {
    let mut reg = setup(vec![genesis_validator(10, 11, 2_000_000)]);
    reg.add_delegation(addr(20), addr(10), 500_000).unwrap();
    reg.remove_permission(addr(1)).unwrap();

    // The drained stream is the indexer feed; its wire form must survive a
    // round trip and stay in emission order.
    let events = reg.take_events();
    assert!(!events.is_empty());
    let bytes = encode_canonical(&events).unwrap();
    let decoded: Vec<Event> = decode_canonical_limited(&bytes, 1 << 20).unwrap();
    assert_eq!(decoded, events);

    assert!(decode_canonical_limited::<Vec<Event>>(&bytes, 4).is_err());
}

#[test]
fn stake_ops_check_authorization() {
    let mut reg = setup(vec![genesis_validator(10, 11, 2_000_000)]);

    assert_eq!(
        reg.add_stake(addr(9), addr(10), 1_000),
        Err(RegistryError::NotManager)
    );
    assert_eq!(
        reg.add_stake(addr(11), addr(99), 1_000),
        Err(RegistryError::UnknownValidator)
    );
    assert_eq!(
        reg.add_delegation(Address::zero(), addr(10), 1_000),
        Err(RegistryError::ZeroAddress)
    );
    assert!(matches!(
        reg.sub_delegation(addr(20), addr(10), 1_000, false, 0),
        Err(RegistryError::Validator(_))
    ));
}
