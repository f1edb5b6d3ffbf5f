// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Global staking coordinator: validator set, stake ranking, active-set
//! rotation, block-fee routing and lazy-punishment bookkeeping.
//!
//! Every entry point validates fully before mutating; a returned error
//! leaves no partial state. The global stake aggregate is adjusted in the
//! same step as the per-validator total, so the two never diverge.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::economics::validator::{Payout, Validator, ValidatorError};
use crate::core::types::{
    Address, Amount, Event, StakingConfig, StakingParams, ValidatorState,
};

/// Coordinator error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("zero address")]
    ZeroAddress,
    #[error("caller is not the registry admin")]
    NotAdmin,
    #[error("caller is not the validator manager")]
    NotManager,
    #[error("unknown validator")]
    UnknownValidator,
    #[error("validator already registered")]
    DuplicateValidator,
    #[error("registration permission denied")]
    PermissionDenied,
    #[error("permission gate already opened")]
    AlreadyOpened,
    #[error("no pending admin transfer")]
    NoPendingAdmin,
    #[error("caller is not the pending admin")]
    NotPendingAdmin,
    #[error("self-stake below the registration minimum")]
    BelowMinSelfStakes,
    #[error("active set is empty")]
    EmptyActiveSet,
    #[error("not an epoch boundary")]
    NotEpochBoundary,
    #[error("invalid active set")]
    InvalidActiveSet,
    #[error("source and destination validator are the same")]
    SameValidator,
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

/// Ranking key: stake descending, registration order ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct RankKey {
    total_stake: Amount,
    seq: u64,
    validator: Address,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total_stake
            .cmp(&self.total_stake)
            .then(self.seq.cmp(&other.seq))
            .then(self.validator.cmp(&other.validator))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Global staking coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakingRegistry {
    params: StakingParams,
    admin: Address,
    pending_admin: Option<Address>,
    /// One-way: once opened, anyone may register.
    permission_less: bool,

    /// Every ever-registered validator address, append-only.
    all_validator_addrs: Vec<Address>,
    validators: BTreeMap<Address, Validator>,
    seq_by_validator: BTreeMap<Address, u64>,
    next_seq: u64,

    /// Ready validators only, stake descending.
    ranking: BTreeSet<RankKey>,
    ranked: BTreeMap<Address, RankKey>,
    active_set: Vec<Address>,

    /// Mirrors the sum of all per-validator total stakes.
    total_stake: Amount,
    /// Block-fee split remainder rolled into the next distribution.
    fee_dust: Amount,

    lazy_punish_counters: BTreeMap<Address, u32>,
    events: Vec<Event>,
}

impl StakingRegistry {
    /// Build a registry from genesis configuration, seeding validators
    /// past the permission gate.
    pub fn from_genesis(config: &StakingConfig) -> Result<Self, RegistryError> {
        if config.admin.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        let mut reg = Self {
            params: config.params.clone(),
            admin: config.admin,
            pending_admin: None,
            permission_less: false,
            all_validator_addrs: Vec::new(),
            validators: BTreeMap::new(),
            seq_by_validator: BTreeMap::new(),
            next_seq: 0,
            ranking: BTreeSet::new(),
            ranked: BTreeMap::new(),
            active_set: Vec::new(),
            total_stake: 0,
            fee_dust: 0,
            lazy_punish_counters: BTreeMap::new(),
            events: Vec::new(),
        };
        for gv in &config.genesis {
            reg.register_internal(
                gv.validator,
                gv.manager,
                gv.commission_rate,
                gv.stake,
                gv.accept_delegation,
            )?;
        }
        // First active set: the initial top ranking.
        reg.active_set = reg.get_top_validators(0);
        info!(
            validators = reg.all_validator_addrs.len(),
            active = reg.active_set.len(),
            total_stake = %reg.total_stake,
            "registry seeded from genesis"
        );
        Ok(reg)
    }

    /// Protocol constants.
    pub fn params(&self) -> &StakingParams {
        &self.params
    }
    /// Current registry admin.
    pub fn admin(&self) -> Address {
        self.admin
    }
    /// True once the registration gate has been opened.
    pub fn is_opened(&self) -> bool {
        self.permission_less
    }
    /// Global active-stake aggregate.
    pub fn total_stake(&self) -> Amount {
        self.total_stake
    }
    /// Number of validators ever registered.
    pub fn validator_count(&self) -> usize {
        self.all_validator_addrs.len()
    }
    /// Every registered validator address, in registration order.
    pub fn all_validator_addrs(&self) -> &[Address] {
        &self.all_validator_addrs
    }
    /// Current active set.
    pub fn active_validators(&self) -> &[Address] {
        &self.active_set
    }
    /// Undistributed block-fee remainder.
    pub fn fee_dust(&self) -> Amount {
        self.fee_dust
    }
    /// Per-validator accounting view.
    pub fn validator(&self, addr: &Address) -> Option<&Validator> {
        self.validators.get(addr)
    }
    /// Consecutive-miss counter for a validator.
    pub fn punish_record(&self, addr: &Address) -> u32 {
        self.lazy_punish_counters.get(addr).copied().unwrap_or(0)
    }

    /// Drain the buffered observation stream, in emission order.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Register a new validator. Until the permission gate is opened only
    /// the admin may call this.
    pub fn register_validator(
        &mut self,
        caller: Address,
        validator: Address,
        manager: Address,
        commission_rate: u8,
        stake: Amount,
        accept_delegation: bool,
    ) -> Result<(), RegistryError> {
        if !self.permission_less && caller != self.admin {
            return Err(RegistryError::PermissionDenied);
        }
        self.register_internal(validator, manager, commission_rate, stake, accept_delegation)
    }

    fn register_internal(
        &mut self,
        validator: Address,
        manager: Address,
        commission_rate: u8,
        stake: Amount,
        accept_delegation: bool,
    ) -> Result<(), RegistryError> {
        if validator.is_zero() || manager.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        if self.validators.contains_key(&validator) {
            return Err(RegistryError::DuplicateValidator);
        }
        if stake < self.params.min_self_stakes {
            return Err(RegistryError::BelowMinSelfStakes);
        }
        let v = Validator::new(
            validator,
            manager,
            commission_rate,
            stake,
            accept_delegation,
            &self.params,
        )?;
        let state = v.state();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.all_validator_addrs.push(validator);
        self.seq_by_validator.insert(validator, seq);
        self.validators.insert(validator, v);

        let old_global = self.total_stake;
        self.total_stake += stake;
        self.update_ranking(&validator);

        self.events.push(Event::ValidatorRegistered {
            validator,
            manager,
            commission_rate,
            stake,
            state,
        });
        self.events.push(Event::TotalStakeChanged {
            validator,
            old: old_global,
            new: self.total_stake,
        });
        info!(%validator, %manager, stake = %stake, ?state, "validator registered");
        self.assert_conservation();
        Ok(())
    }

    /// Increase a validator's self-stake. Caller must be its manager.
    pub fn add_stake(
        &mut self,
        caller: Address,
        validator: Address,
        amount: Amount,
    ) -> Result<(), RegistryError> {
        self.require_manager(caller, &validator)?;
        self.with_validator(validator, caller, |v, p| v.add_stake(amount, p))?;
        Ok(())
    }

    /// Decrease a validator's self-stake. Returns the immediately released
    /// amount (zero when `to_unbound`).
    pub fn sub_stake(
        &mut self,
        caller: Address,
        validator: Address,
        amount: Amount,
        to_unbound: bool,
        now: u64,
    ) -> Result<Amount, RegistryError> {
        self.require_manager(caller, &validator)?;
        let released =
            self.with_validator(validator, caller, |v, p| v.sub_stake(amount, to_unbound, now, p))?;
        if released > 0 {
            self.events.push(Event::StakeReleased {
                validator,
                recipient: caller,
                amount: released,
            });
        }
        Ok(released)
    }

    /// Delegate stake to a validator. Any non-zero account may call.
    pub fn add_delegation(
        &mut self,
        caller: Address,
        validator: Address,
        amount: Amount,
    ) -> Result<(), RegistryError> {
        if caller.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.with_validator(validator, caller, |v, p| v.add_delegation(amount, caller, p))?;
        Ok(())
    }

    /// Reduce the caller's delegation. Returns the immediately released
    /// amount (zero when `to_unbound`).
    pub fn sub_delegation(
        &mut self,
        caller: Address,
        validator: Address,
        amount: Amount,
        to_unbound: bool,
        now: u64,
    ) -> Result<Amount, RegistryError> {
        let released = self.with_validator(validator, caller, |v, p| {
            v.sub_delegation(amount, caller, to_unbound, now, p)
        })?;
        if released > 0 {
            self.events.push(Event::StakeReleased {
                validator,
                recipient: caller,
                amount: released,
            });
        }
        Ok(released)
    }

    /// Withdraw the entire self-stake and move the validator to Exit.
    pub fn exit_staking(
        &mut self,
        caller: Address,
        validator: Address,
        now: u64,
    ) -> Result<(), RegistryError> {
        self.require_manager(caller, &validator)?;
        self.with_validator(validator, caller, |v, p| v.exit_staking(now, p))?;
        Ok(())
    }

    /// Withdraw the caller's entire delegation into the unbound queue.
    pub fn exit_delegation(
        &mut self,
        caller: Address,
        validator: Address,
        now: u64,
    ) -> Result<(), RegistryError> {
        self.with_validator(validator, caller, |v, p| v.exit_delegation(caller, now, p))?;
        Ok(())
    }

    /// Move self-stake from one validator into a position at another,
    /// atomically. Pending rewards at the source are paid out; unbound
    /// entries stay queued at the source.
    pub fn re_staking(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        now: u64,
    ) -> Result<Payout, RegistryError> {
        self.require_manager(caller, &from)?;
        self.move_stake(caller, from, to, amount, now, true)
    }

    /// Move the caller's delegation from one validator to another,
    /// atomically. Same payout rules as [`Self::re_staking`].
    pub fn re_delegation(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        now: u64,
    ) -> Result<Payout, RegistryError> {
        if caller.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.move_stake(caller, from, to, amount, now, false)
    }

    fn move_stake(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        now: u64,
        from_self: bool,
    ) -> Result<Payout, RegistryError> {
        if from == to {
            return Err(RegistryError::SameValidator);
        }
        if amount == 0 {
            return Err(ValidatorError::ZeroAmount.into());
        }
        // Validate both ends before any mutation so the move is atomic.
        let dest_is_self = {
            let src = self
                .validators
                .get(&from)
                .ok_or(RegistryError::UnknownValidator)?;
            if !src.state().can_do_staking() {
                return Err(ValidatorError::NotStakable.into());
            }
            if from_self {
                if src.self_stake() < amount {
                    return Err(ValidatorError::InsufficientSelfStake.into());
                }
            } else {
                let dlg = src
                    .delegation(&caller)
                    .ok_or(ValidatorError::NoSuchDelegator)?;
                let owed = src.delegator_punishment_owed(&caller, &self.params)?;
                if dlg.stake.saturating_sub(owed) < amount {
                    return Err(ValidatorError::InsufficientDelegation.into());
                }
            }
            let dst = self
                .validators
                .get(&to)
                .ok_or(RegistryError::UnknownValidator)?;
            if !dst.state().can_do_staking() {
                return Err(ValidatorError::NotStakable.into());
            }
            let dest_is_self = dst.manager() == caller;
            if dest_is_self {
                if dst.self_stake().saturating_add(amount) > self.params.max_stakes {
                    return Err(ValidatorError::AboveMaxStakes.into());
                }
            } else if !dst.accept_delegation() {
                return Err(ValidatorError::DelegationRefused.into());
            }
            dest_is_self
        };

        let rewards = self.with_validator(from, caller, |v, p| {
            let rewards = v.claim_rewards_only(caller, p)?;
            if from_self {
                v.sub_stake(amount, false, now, p)?;
            } else {
                v.sub_delegation(amount, caller, false, now, p)?;
            }
            Ok(rewards)
        })?;
        self.with_validator(to, caller, |v, p| {
            if dest_is_self {
                v.add_stake(amount, p)
            } else {
                v.add_delegation(amount, caller, p)
            }
        })?;

        if rewards > 0 {
            self.events.push(Event::RewardsWithdrawn {
                validator: from,
                recipient: caller,
                amount: rewards,
            });
        }
        self.events.push(Event::ClaimDeferredUnbound {
            validator: from,
            account: caller,
        });
        debug!(%from, %to, account = %caller, amount = %amount, "stake moved");
        Ok(Payout {
            rewards,
            released_stake: 0,
        })
    }

    /// Split a block fee equally across the active set; the remainder is
    /// carried into the next distribution.
    pub fn distribute_block_fee(&mut self, amount: Amount) -> Result<(), RegistryError> {
        if self.active_set.is_empty() {
            return Err(RegistryError::EmptyActiveSet);
        }
        let total = self.fee_dust.saturating_add(amount);
        let n = self.active_set.len() as Amount;
        let share = total / n;
        self.fee_dust = total - share * n;
        if share == 0 {
            return Ok(());
        }
        for addr in self.active_set.clone() {
            // Active members are registered by construction.
            if let Some(v) = self.validators.get_mut(&addr) {
                v.receive_fee(share).map_err(RegistryError::Validator)?;
            }
        }
        debug!(amount = %amount, share = %share, dust = %self.fee_dust, "block fee distributed");
        Ok(())
    }

    /// Record a missed block. At the consecutive-miss threshold the
    /// validator is punished once with the lazy factor, removed from
    /// ranking, and the counter resets.
    pub fn lazy_punish(&mut self, validator: Address) -> Result<(), RegistryError> {
        if !self.validators.contains_key(&validator) {
            return Err(RegistryError::UnknownValidator);
        }
        let counter = self.lazy_punish_counters.entry(validator).or_insert(0);
        *counter += 1;
        if *counter < self.params.lazy_punish_threshold {
            return Ok(());
        }
        self.lazy_punish_counters.insert(validator, 0);
        let factor = self.params.lazy_punish_factor;
        self.punish_internal(validator, factor)
    }

    /// Punish provable misbehavior with the evil factor.
    pub fn punish(&mut self, validator: Address) -> Result<(), RegistryError> {
        let factor = self.params.evil_punish_factor;
        self.punish_internal(validator, factor)
    }

    fn punish_internal(&mut self, validator: Address, factor: Amount) -> Result<(), RegistryError> {
        let from_stake =
            self.with_validator(validator, validator, |v, p| v.punish(factor, p))?;
        info!(%validator, factor = %factor, slashed = %from_stake, "validator punished");
        Ok(())
    }

    /// Replace the active set at an epoch boundary. Members must come from
    /// the current top ranking.
    pub fn update_active_validator_set(
        &mut self,
        caller: Address,
        new_set: Vec<Address>,
        height: u64,
    ) -> Result<(), RegistryError> {
        if caller != self.admin {
            return Err(RegistryError::NotAdmin);
        }
        if self.params.block_epoch == 0 || height % self.params.block_epoch != 0 {
            return Err(RegistryError::NotEpochBoundary);
        }
        if new_set.is_empty() || new_set.len() > self.params.max_validators {
            return Err(RegistryError::InvalidActiveSet);
        }
        let top: BTreeSet<Address> = self
            .get_top_validators(0)
            .into_iter()
            .collect();
        let mut seen = BTreeSet::new();
        for addr in &new_set {
            if !top.contains(addr) || !seen.insert(*addr) {
                return Err(RegistryError::InvalidActiveSet);
            }
        }
        self.active_set = new_set;
        info!(height, active = self.active_set.len(), "active set rotated");
        Ok(())
    }

    /// Top-ranked validators by stake, ties broken by registration order.
    /// `n == 0` means the active-set size limit.
    pub fn get_top_validators(&self, n: usize) -> Vec<Address> {
        let want = if n == 0 { self.params.max_validators } else { n };
        let limit = want.min(self.params.max_validators).min(self.ranking.len());
        self.ranking
            .iter()
            .take(limit)
            .map(|k| k.validator)
            .collect()
    }

    /// Claim all rewards and matured unbound stake for a validator owner.
    pub fn validator_claim_any(
        &mut self,
        caller: Address,
        validator: Address,
        now: u64,
    ) -> Result<Payout, RegistryError> {
        self.require_manager(caller, &validator)?;
        let payout = self.with_validator(validator, caller, |v, _| v.validator_claim_any(now))?;
        self.emit_payout(validator, caller, payout);
        Ok(payout)
    }

    /// Claim all rewards and matured unbound stake for a delegator.
    pub fn delegator_claim_any(
        &mut self,
        caller: Address,
        validator: Address,
        now: u64,
    ) -> Result<Payout, RegistryError> {
        let payout =
            self.with_validator(validator, caller, |v, p| v.delegator_claim_any(caller, now, p))?;
        self.emit_payout(validator, caller, payout);
        Ok(payout)
    }

    /// What a claim would pay right now, were `unsettled` fee income merged
    /// first. Non-mutating.
    pub fn any_claimable(
        &self,
        validator: &Address,
        account: Address,
        unsettled: Amount,
        now: u64,
    ) -> Result<Payout, RegistryError> {
        let v = self
            .validators
            .get(validator)
            .ok_or(RegistryError::UnknownValidator)?;
        Ok(v.any_claimable(unsettled, account, now, &self.params)?)
    }

    /// Propose a new registry admin (first phase).
    pub fn change_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), RegistryError> {
        if caller != self.admin {
            return Err(RegistryError::NotAdmin);
        }
        if new_admin.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.pending_admin = Some(new_admin);
        self.events.push(Event::AdminChanging { proposed: new_admin });
        Ok(())
    }

    /// Finalize a pending admin transfer (second phase).
    pub fn accept_admin(&mut self, caller: Address) -> Result<(), RegistryError> {
        let pending = self.pending_admin.ok_or(RegistryError::NoPendingAdmin)?;
        if caller != pending {
            return Err(RegistryError::NotPendingAdmin);
        }
        let old = self.admin;
        self.admin = pending;
        self.pending_admin = None;
        self.events.push(Event::AdminChanged { old, new: pending });
        info!(old = %old, new = %pending, "registry admin changed");
        Ok(())
    }

    /// Hand a validator to a new managing account.
    pub fn change_validator_manager(
        &mut self,
        caller: Address,
        validator: Address,
        new_manager: Address,
    ) -> Result<(), RegistryError> {
        if new_manager.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.require_manager(caller, &validator)?;
        let v = self
            .validators
            .get_mut(&validator)
            .ok_or(RegistryError::UnknownValidator)?;
        let old = v.manager();
        v.set_manager(new_manager);
        self.events.push(Event::ManagerChanged {
            validator,
            old,
            new: new_manager,
        });
        Ok(())
    }

    /// Open the registration gate permanently. Fails when already open.
    pub fn remove_permission(&mut self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.admin {
            return Err(RegistryError::NotAdmin);
        }
        if self.permission_less {
            return Err(RegistryError::AlreadyOpened);
        }
        self.permission_less = true;
        self.events.push(Event::PermissionLess);
        info!("registration permission gate opened");
        Ok(())
    }

    fn require_manager(&self, caller: Address, validator: &Address) -> Result<(), RegistryError> {
        let v = self
            .validators
            .get(validator)
            .ok_or(RegistryError::UnknownValidator)?;
        if v.manager() != caller {
            return Err(RegistryError::NotManager);
        }
        Ok(())
    }

    /// Run a mutation against one validator, then reconcile the global
    /// aggregate, ranking and event stream with whatever changed.
    fn with_validator<T>(
        &mut self,
        validator: Address,
        account: Address,
        f: impl FnOnce(&mut Validator, &StakingParams) -> Result<T, ValidatorError>,
    ) -> Result<T, RegistryError> {
        let params = self.params.clone();
        let v = self
            .validators
            .get_mut(&validator)
            .ok_or(RegistryError::UnknownValidator)?;
        let old_state = v.state();
        let old_total = v.total_stake();
        let manager = v.manager();
        let out = f(v, &params)?;
        let new_state = v.state();
        let new_total = v.total_stake();

        if new_total != old_total {
            let old_global = self.total_stake;
            self.total_stake = self.total_stake - old_total + new_total;
            self.events.push(Event::StakesChanged {
                validator,
                account,
                new_total_stake: new_total,
            });
            self.events.push(Event::TotalStakeChanged {
                validator,
                old: old_global,
                new: self.total_stake,
            });
        }
        if new_state != old_state {
            self.events.push(Event::StateChanged {
                validator,
                manager,
                old: old_state,
                new: new_state,
            });
            if new_state == ValidatorState::Jail || new_state == ValidatorState::Exit {
                self.active_set.retain(|a| a != &validator);
            }
        }
        self.update_ranking(&validator);
        self.assert_conservation();
        Ok(out)
    }

    /// Re-seat one validator in the ranking: Ready validators are ranked,
    /// everyone else is removed.
    fn update_ranking(&mut self, validator: &Address) {
        if let Some(key) = self.ranked.remove(validator) {
            self.ranking.remove(&key);
        }
        let Some(v) = self.validators.get(validator) else {
            return;
        };
        if v.state() != ValidatorState::Ready {
            return;
        }
        let seq = self.seq_by_validator.get(validator).copied().unwrap_or(u64::MAX);
        let key = RankKey {
            total_stake: v.total_stake(),
            seq,
            validator: *validator,
        };
        self.ranking.insert(key);
        self.ranked.insert(*validator, key);
    }

    fn emit_payout(&mut self, validator: Address, recipient: Address, payout: Payout) {
        if payout.rewards > 0 {
            self.events.push(Event::RewardsWithdrawn {
                validator,
                recipient,
                amount: payout.rewards,
            });
        }
        if payout.released_stake > 0 {
            self.events.push(Event::StakeReleased {
                validator,
                recipient,
                amount: payout.released_stake,
            });
        }
    }

    #[cfg(debug_assertions)]
    fn assert_conservation(&self) {
        let sum: Amount = self.validators.values().map(Validator::total_stake).sum();
        debug_assert_eq!(sum, self.total_stake);
    }

    #[cfg(not(debug_assertions))]
    fn assert_conservation(&self) {}
}
