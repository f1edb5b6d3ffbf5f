// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;

use valstake::core::economics::accounting::{per_stake_delta, split_commission};
use valstake::core::economics::validator::Validator;
use valstake::core::types::{Address, StakingParams};

proptest! {
    #[test]
    fn commission_split_is_exact(amount in any::<u64>(), rate in 0u8..=100) {
        let (commission, distributable) = split_commission(amount as u128, rate).unwrap();
        prop_assert_eq!(commission + distributable, amount as u128);
        prop_assert!(commission <= amount as u128);
    }

    #[test]
    fn per_stake_delta_loses_nothing(distributable in any::<u64>(), total_stake in any::<u64>()) {
        let (delta, dust) = per_stake_delta(distributable as u128, total_stake as u128);
        prop_assert_eq!(delta * total_stake as u128 + dust, distributable as u128);
        prop_assert!(dust < total_stake.max(1) as u128 || total_stake == 0);
    }

    #[test]
    fn accumulator_is_monotonic_and_owner_recovers_every_fee(
        rate in 0u8..=100,
        fees in proptest::collection::vec(1u64..=1_000_000_000, 1..40),
    ) {
        let params = StakingParams::default();
        let mut v = Validator::new(
            Address::from_bytes([10; 20]),
            Address::from_bytes([11; 20]),
            rate,
            2_000_000,
            false,
            &params,
        ).unwrap();

        let mut acc_prev = 0;
        let mut total_fees: u128 = 0;
        for fee in &fees {
            v.receive_fee(*fee as u128).unwrap();
            prop_assert!(v.acc_rewards_per_stake() >= acc_prev);
            acc_prev = v.acc_rewards_per_stake();
            total_fees += *fee as u128;
        }

        // The owner holds all stake, so commission plus per-stake rewards
        // must add back up to every fee received, exactly.
        let payout = v.validator_claim_any(0).unwrap();
        prop_assert_eq!(payout.rewards, total_fees);

        // Nothing is left behind.
        let second = v.validator_claim_any(0).unwrap();
        prop_assert_eq!(second.rewards, 0);
    }

    #[test]
    fn split_positions_recover_every_fee(
        rate in 0u8..=100,
        delegated in 1u64..=10_000_000,
        fees in proptest::collection::vec(1u64..=1_000_000_000, 1..40),
    ) {
        let params = StakingParams::default();
        let owner = Address::from_bytes([11; 20]);
        let delegator = Address::from_bytes([20; 20]);
        let mut v = Validator::new(
            Address::from_bytes([10; 20]),
            owner,
            rate,
            2_000_000,
            true,
            &params,
        ).unwrap();
        v.add_delegation(delegated as u128, delegator, &params).unwrap();

        let mut total_fees: u128 = 0;
        for fee in &fees {
            v.receive_fee(*fee as u128).unwrap();
            total_fees += *fee as u128;
        }

        let d = v.delegator_claim_any(delegator, 0, &params).unwrap();
        let o = v.validator_claim_any(0).unwrap();
        prop_assert_eq!(d.rewards + o.rewards, total_fees);
    }
}
