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

//! Per-validator accounting engine: stake ledger, delegator set, commission
//! split, reward accumulation and punishment accumulation.
//!
//! Reward distribution uses a per-stake-unit accumulator with per-position
//! debt watermarks; punishment uses the same pattern in the negative
//! direction, settled lazily the next time a delegator's stake is touched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::economics::accounting::{
    pending_rewards, per_stake_delta, punish_share, reward_debt, split_commission,
    AccountingError,
};
use crate::core::economics::unbound::UnboundQueue;
use crate::core::types::{Address, Amount, StakingParams, ValidatorState};

/// Validator engine error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("commission rate above 100")]
    InvalidCommissionRate,
    #[error("self-stake above the max-stakes bound")]
    AboveMaxStakes,
    #[error("zero amount")]
    ZeroAmount,
    #[error("staking actions require the Idle or Ready state")]
    NotStakable,
    #[error("validator already exited")]
    AlreadyExited,
    #[error("insufficient self-stake")]
    InsufficientSelfStake,
    #[error("insufficient delegation")]
    InsufficientDelegation,
    #[error("no such delegator")]
    NoSuchDelegator,
    #[error("validator does not accept delegation")]
    DelegationRefused,
    #[error(transparent)]
    Accounting(#[from] AccountingError),
}

/// One delegator's position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Active stake still earning rewards.
    pub stake: Amount,
    /// `stake * acc_rewards_per_stake` at the last settlement.
    pub debt: Amount,
    /// Rewards frozen by earlier partial unstakes; no longer grows with the
    /// accumulator.
    pub settled: Amount,
    /// Punishment accumulator watermark up to which this position has
    /// already been punished.
    pub punish_free: Amount,
}

/// Funds owed to the caller after a claim; the host ledger performs the
/// actual transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Payout {
    /// Reward portion (commission, settled and accumulator rewards).
    pub rewards: Amount,
    /// Stake released from the unbound queue (and, in Exit, the remaining
    /// delegation stake).
    pub released_stake: Amount,
}

impl Payout {
    /// Total value leaving the engine.
    pub fn total(&self) -> Amount {
        self.rewards.saturating_add(self.released_stake)
    }
}

/// Per-validator stake/reward/punishment ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Validator {
    validator: Address,
    manager: Address,
    commission_rate: u8,
    accept_delegation: bool,
    state: ValidatorState,

    self_stake: Amount,
    total_stake: Amount,
    /// Stake still owed to someone, including queued unbound entries.
    /// Only completed withdrawals and slashes reduce it.
    total_unwithdrawn: Amount,

    acc_rewards_per_stake: Amount,
    curr_commission: Amount,
    self_debt: Amount,
    self_settled: Amount,
    acc_punish_factor: Amount,

    delegators: BTreeMap<Address, Delegation>,
    unbound: BTreeMap<Address, UnboundQueue>,
}

impl Validator {
    /// Create a validator with its initial self-stake.
    pub fn new(
        validator: Address,
        manager: Address,
        commission_rate: u8,
        stake: Amount,
        accept_delegation: bool,
        params: &StakingParams,
    ) -> Result<Self, ValidatorError> {
        if commission_rate > 100 {
            return Err(ValidatorError::InvalidCommissionRate);
        }
        if stake > params.max_stakes {
            return Err(ValidatorError::AboveMaxStakes);
        }
        let mut v = Self {
            validator,
            manager,
            commission_rate,
            accept_delegation,
            state: ValidatorState::Idle,
            self_stake: stake,
            total_stake: stake,
            total_unwithdrawn: stake,
            acc_rewards_per_stake: 0,
            curr_commission: 0,
            self_debt: 0,
            self_settled: 0,
            acc_punish_factor: 0,
            delegators: BTreeMap::new(),
            unbound: BTreeMap::new(),
        };
        v.re_evaluate(params);
        Ok(v)
    }

    /// Validator identity address.
    pub fn validator(&self) -> Address {
        self.validator
    }
    /// Managing admin account.
    pub fn manager(&self) -> Address {
        self.manager
    }
    /// Lifecycle state.
    pub fn state(&self) -> ValidatorState {
        self.state
    }
    /// Commission percentage.
    pub fn commission_rate(&self) -> u8 {
        self.commission_rate
    }
    /// Whether third-party delegation is accepted.
    pub fn accept_delegation(&self) -> bool {
        self.accept_delegation
    }
    /// Active stake pool (self-stake plus delegations).
    pub fn total_stake(&self) -> Amount {
        self.total_stake
    }
    /// Validator's own stake.
    pub fn self_stake(&self) -> Amount {
        self.self_stake
    }
    /// Stake not yet withdrawn (active pool plus queued unbound entries).
    pub fn total_unwithdrawn(&self) -> Amount {
        self.total_unwithdrawn
    }
    /// Monotonic per-stake-unit reward accumulator.
    pub fn acc_rewards_per_stake(&self) -> Amount {
        self.acc_rewards_per_stake
    }
    /// Commission (plus rounding dust) not yet claimed.
    pub fn curr_commission(&self) -> Amount {
        self.curr_commission
    }
    /// Monotonic punishment-factor accumulator.
    pub fn acc_punish_factor(&self) -> Amount {
        self.acc_punish_factor
    }
    /// Delegation record, if the account ever delegated here.
    pub fn delegation(&self, delegator: &Address) -> Option<&Delegation> {
        self.delegators.get(delegator)
    }
    /// Number of delegator records (historical records persist).
    pub fn delegators_len(&self) -> usize {
        self.delegators.len()
    }

    /// Replace the managing account.
    pub fn set_manager(&mut self, new_manager: Address) {
        self.manager = new_manager;
    }

    /// Queued unbound amount for an account, matured or not.
    pub fn pending_unbound(&self, account: &Address) -> Amount {
        self.unbound.get(account).map(UnboundQueue::pending).unwrap_or(0)
    }

    /// Unbound amount already matured at `now`.
    pub fn claimable_unbound(&self, account: &Address, now: u64) -> Amount {
        self.unbound
            .get(account)
            .map(|q| q.claimable(now))
            .unwrap_or(0)
    }

    /// Merge an incoming fee payment into the reward accumulator.
    ///
    /// The commission cut and the integer-division remainder both land in
    /// `curr_commission`, so no value is ever lost to rounding. With an
    /// empty stake pool the whole fee becomes commission.
    pub fn receive_fee(&mut self, amount: Amount) -> Result<(), ValidatorError> {
        let (commission, distributable) = split_commission(amount, self.commission_rate)?;
        let (delta, dust) = per_stake_delta(distributable, self.total_stake);
        self.curr_commission = self
            .curr_commission
            .checked_add(commission)
            .and_then(|c| c.checked_add(dust))
            .ok_or(AccountingError::Overflow)?;
        self.acc_rewards_per_stake = self
            .acc_rewards_per_stake
            .checked_add(delta)
            .ok_or(AccountingError::Overflow)?;
        Ok(())
    }

    /// Increase self-stake.
    pub fn add_stake(
        &mut self,
        amount: Amount,
        params: &StakingParams,
    ) -> Result<(), ValidatorError> {
        if amount == 0 {
            return Err(ValidatorError::ZeroAmount);
        }
        if !self.state.can_do_staking() {
            return Err(ValidatorError::NotStakable);
        }
        let new_self = self
            .self_stake
            .checked_add(amount)
            .ok_or(AccountingError::Overflow)?;
        if new_self > params.max_stakes {
            return Err(ValidatorError::AboveMaxStakes);
        }
        self.settle_self()?;
        self.self_stake = new_self;
        self.total_stake += amount;
        self.total_unwithdrawn += amount;
        self.self_debt = reward_debt(self.self_stake, self.acc_rewards_per_stake)?;
        self.re_evaluate(params);
        Ok(())
    }

    /// Decrease self-stake. With `to_unbound` the amount enters the FIFO
    /// unbound queue; otherwise it is released immediately and returned.
    pub fn sub_stake(
        &mut self,
        amount: Amount,
        to_unbound: bool,
        now: u64,
        params: &StakingParams,
    ) -> Result<Amount, ValidatorError> {
        if amount == 0 {
            return Err(ValidatorError::ZeroAmount);
        }
        if !self.state.can_do_staking() {
            return Err(ValidatorError::NotStakable);
        }
        if self.self_stake < amount {
            return Err(ValidatorError::InsufficientSelfStake);
        }
        self.settle_self()?;
        self.self_stake -= amount;
        self.total_stake = self.total_stake.saturating_sub(amount);
        self.self_debt = reward_debt(self.self_stake, self.acc_rewards_per_stake)?;
        let released = if to_unbound {
            self.push_unbound(self.validator, amount, now, params);
            0
        } else {
            self.total_unwithdrawn = self.total_unwithdrawn.saturating_sub(amount);
            amount
        };
        self.re_evaluate(params);
        Ok(released)
    }

    /// Increase a delegation, creating the record on first use.
    pub fn add_delegation(
        &mut self,
        amount: Amount,
        delegator: Address,
        params: &StakingParams,
    ) -> Result<(), ValidatorError> {
        if amount == 0 {
            return Err(ValidatorError::ZeroAmount);
        }
        if !self.state.can_do_staking() {
            return Err(ValidatorError::NotStakable);
        }
        if !self.accept_delegation {
            return Err(ValidatorError::DelegationRefused);
        }
        if !self.delegators.contains_key(&delegator) {
            self.delegators.insert(
                delegator,
                Delegation {
                    punish_free: self.acc_punish_factor,
                    ..Delegation::default()
                },
            );
        }
        self.settle_delegator(&delegator, params)?;
        let dlg = self
            .delegators
            .get_mut(&delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        dlg.stake = dlg
            .stake
            .checked_add(amount)
            .ok_or(AccountingError::Overflow)?;
        dlg.debt = reward_debt(dlg.stake, self.acc_rewards_per_stake)?;
        self.total_stake += amount;
        self.total_unwithdrawn += amount;
        self.re_evaluate(params);
        Ok(())
    }

    /// Decrease a delegation; queue or release like [`Self::sub_stake`].
    pub fn sub_delegation(
        &mut self,
        amount: Amount,
        delegator: Address,
        to_unbound: bool,
        now: u64,
        params: &StakingParams,
    ) -> Result<Amount, ValidatorError> {
        if amount == 0 {
            return Err(ValidatorError::ZeroAmount);
        }
        if !self.state.can_do_staking() {
            return Err(ValidatorError::NotStakable);
        }
        let owed = self.delegator_punishment_owed(&delegator, params)?;
        let current = self
            .delegators
            .get(&delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?
            .stake;
        // The balance check is against the post-punishment stake, so a
        // failed call leaves the lazy settlement untouched too.
        if current.saturating_sub(owed) < amount {
            return Err(ValidatorError::InsufficientDelegation);
        }
        self.settle_delegator(&delegator, params)?;
        let acc = self.acc_rewards_per_stake;
        let dlg = self
            .delegators
            .get_mut(&delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        dlg.stake -= amount;
        dlg.debt = reward_debt(dlg.stake, acc)?;
        self.total_stake = self.total_stake.saturating_sub(amount);
        let released = if to_unbound {
            self.push_unbound(delegator, amount, now, params);
            0
        } else {
            self.total_unwithdrawn = self.total_unwithdrawn.saturating_sub(amount);
            amount
        };
        self.re_evaluate(params);
        Ok(released)
    }

    /// Withdraw the entire self-stake into the unbound queue and move to
    /// the terminal Exit state. Allowed from Idle, Ready and Jail.
    pub fn exit_staking(&mut self, now: u64, params: &StakingParams) -> Result<(), ValidatorError> {
        if self.state == ValidatorState::Exit {
            return Err(ValidatorError::AlreadyExited);
        }
        self.settle_self()?;
        let amount = self.self_stake;
        self.self_stake = 0;
        self.self_debt = 0;
        self.total_stake = self.total_stake.saturating_sub(amount);
        self.push_unbound(self.validator, amount, now, params);
        self.state = ValidatorState::Exit;
        Ok(())
    }

    /// Withdraw an entire delegation into the unbound queue, freezing its
    /// accumulated rewards.
    pub fn exit_delegation(
        &mut self,
        delegator: Address,
        now: u64,
        params: &StakingParams,
    ) -> Result<(), ValidatorError> {
        if !self.state.can_do_staking() {
            return Err(ValidatorError::NotStakable);
        }
        if !self.delegators.contains_key(&delegator) {
            return Err(ValidatorError::NoSuchDelegator);
        }
        self.settle_delegator(&delegator, params)?;
        let dlg = self
            .delegators
            .get_mut(&delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        let amount = dlg.stake;
        dlg.stake = 0;
        dlg.debt = 0;
        self.total_stake = self.total_stake.saturating_sub(amount);
        self.push_unbound(delegator, amount, now, params);
        self.re_evaluate(params);
        Ok(())
    }

    /// Apply a punishment factor.
    ///
    /// The slash is computed over everything not yet withdrawn, deducted
    /// from the active pool first (bounded at zero); the self-stake share is
    /// settled eagerly, delegator shares lazily on next touch. Jails the
    /// validator unless it already exited. Returns the portion deducted
    /// from the active pool so the registry can adjust the global total.
    pub fn punish(
        &mut self,
        factor: Amount,
        params: &StakingParams,
    ) -> Result<Amount, ValidatorError> {
        self.acc_punish_factor = self
            .acc_punish_factor
            .checked_add(factor)
            .ok_or(AccountingError::Overflow)?;

        let slash = punish_share(self.total_unwithdrawn, factor, params.punish_base)?;
        let from_stake = slash.min(self.total_stake);
        self.total_stake -= from_stake;
        self.total_unwithdrawn = self.total_unwithdrawn.saturating_sub(slash);

        // Self-stake is punished eagerly; settle rewards first so already
        // earned rewards survive the stake reduction.
        self.settle_self()?;
        let self_pending = self.pending_unbound(&self.validator);
        let self_slash = punish_share(
            self.self_stake.saturating_add(self_pending),
            factor,
            params.punish_base,
        )?;
        let from_self = self_slash.min(self.self_stake);
        self.self_stake -= from_self;
        self.self_debt = reward_debt(self.self_stake, self.acc_rewards_per_stake)?;
        let rest = self_slash - from_self;
        if rest > 0 {
            if let Some(q) = self.unbound.get_mut(&self.validator) {
                q.slash(rest);
            }
        }

        if self.state != ValidatorState::Exit {
            self.state = ValidatorState::Jail;
        }
        Ok(from_stake)
    }

    /// Claim everything owed to the validator owner: settled self rewards,
    /// commission plus dust, and matured unbound stake.
    pub fn validator_claim_any(&mut self, now: u64) -> Result<Payout, ValidatorError> {
        self.settle_self()?;
        let rewards = self.self_settled.saturating_add(self.curr_commission);
        self.self_settled = 0;
        self.curr_commission = 0;
        let validator = self.validator;
        let released = self.claim_unbound(&validator, now);
        Ok(Payout {
            rewards,
            released_stake: released,
        })
    }

    /// Claim everything owed to a delegator. In the Exit state the
    /// remaining delegation stake is released as well; only claims remain
    /// possible after exit.
    pub fn delegator_claim_any(
        &mut self,
        delegator: Address,
        now: u64,
        params: &StakingParams,
    ) -> Result<Payout, ValidatorError> {
        if !self.delegators.contains_key(&delegator) {
            return Err(ValidatorError::NoSuchDelegator);
        }
        self.settle_delegator_punishment(&delegator, params)?;
        self.settle_delegator_rewards(&delegator)?;
        let exited = self.state == ValidatorState::Exit;
        let dlg = self
            .delegators
            .get_mut(&delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        let rewards = dlg.settled;
        dlg.settled = 0;
        let mut released = 0;
        if exited && dlg.stake > 0 {
            let stake = dlg.stake;
            dlg.stake = 0;
            dlg.debt = 0;
            self.total_stake = self.total_stake.saturating_sub(stake);
            self.total_unwithdrawn = self.total_unwithdrawn.saturating_sub(stake);
            released += stake;
        }
        released += self.claim_unbound(&delegator, now);
        Ok(Payout {
            rewards,
            released_stake: released,
        })
    }

    /// Claim rewards only, leaving unbound entries queued. Used by the
    /// re-stake/re-delegate path.
    pub fn claim_rewards_only(
        &mut self,
        account: Address,
        params: &StakingParams,
    ) -> Result<Amount, ValidatorError> {
        if account == self.manager {
            self.settle_self()?;
            let rewards = self.self_settled.saturating_add(self.curr_commission);
            self.self_settled = 0;
            self.curr_commission = 0;
            Ok(rewards)
        } else {
            if !self.delegators.contains_key(&account) {
                return Err(ValidatorError::NoSuchDelegator);
            }
            self.settle_delegator_punishment(&account, params)?;
            self.settle_delegator_rewards(&account)?;
            let dlg = self
                .delegators
                .get_mut(&account)
                .ok_or(ValidatorError::NoSuchDelegator)?;
            let rewards = dlg.settled;
            dlg.settled = 0;
            Ok(rewards)
        }
    }

    /// What a claim would pay right now if `unsettled` fee income were
    /// merged first. Non-mutating; must agree with the claim operations.
    pub fn any_claimable(
        &self,
        unsettled: Amount,
        account: Address,
        now: u64,
        params: &StakingParams,
    ) -> Result<Payout, ValidatorError> {
        let (commission, distributable) = split_commission(unsettled, self.commission_rate)?;
        let (delta, dust) = per_stake_delta(distributable, self.total_stake);
        let acc = self
            .acc_rewards_per_stake
            .checked_add(delta)
            .ok_or(AccountingError::Overflow)?;

        if account == self.manager {
            let rewards = pending_rewards(self.self_stake, acc, self.self_debt, self.self_settled)?
                .saturating_add(self.curr_commission)
                .saturating_add(commission)
                .saturating_add(dust);
            Ok(Payout {
                rewards,
                released_stake: self.claimable_unbound(&self.validator, now),
            })
        } else {
            let dlg = self
                .delegators
                .get(&account)
                .ok_or(ValidatorError::NoSuchDelegator)?;
            // Simulate the lazy punishment settlement on copies.
            let pending = self.pending_unbound(&account);
            let owed = punish_share(
                dlg.stake.saturating_add(pending),
                self.acc_punish_factor - dlg.punish_free,
                params.punish_base,
            )?;
            let from_stake = owed.min(dlg.stake);
            let eff_stake = dlg.stake - from_stake;
            let from_unbound = owed - from_stake;
            let rewards = pending_rewards(eff_stake, acc, dlg.debt, dlg.settled)?;
            let mut released = self
                .claimable_unbound(&account, now)
                .saturating_sub(from_unbound);
            if self.state == ValidatorState::Exit {
                released = released.saturating_add(eff_stake);
            }
            Ok(Payout {
                rewards,
                released_stake: released,
            })
        }
    }

    /// Punishment a delegator would owe if touched now.
    pub fn delegator_punishment_owed(
        &self,
        delegator: &Address,
        params: &StakingParams,
    ) -> Result<Amount, ValidatorError> {
        let dlg = self
            .delegators
            .get(delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        let base = dlg
            .stake
            .saturating_add(self.pending_unbound(delegator));
        Ok(punish_share(
            base,
            self.acc_punish_factor - dlg.punish_free,
            params.punish_base,
        )?)
    }

    fn push_unbound(&mut self, account: Address, amount: Amount, now: u64, params: &StakingParams) {
        if amount == 0 {
            return;
        }
        self.unbound
            .entry(account)
            .or_default()
            .push(amount, now.saturating_add(params.unbound_lock_period));
    }

    fn claim_unbound(&mut self, account: &Address, now: u64) -> Amount {
        let released = self
            .unbound
            .get_mut(account)
            .map(|q| q.claim_matured(now))
            .unwrap_or(0);
        self.total_unwithdrawn = self.total_unwithdrawn.saturating_sub(released);
        released
    }

    /// Fold the self position's accumulator rewards into `self_settled`
    /// and advance the debt watermark.
    fn settle_self(&mut self) -> Result<(), ValidatorError> {
        let gross = reward_debt(self.self_stake, self.acc_rewards_per_stake)?;
        self.self_settled = self
            .self_settled
            .saturating_add(gross.saturating_sub(self.self_debt));
        self.self_debt = gross;
        Ok(())
    }

    /// Lazy punishment first, then reward settlement, for one delegator.
    fn settle_delegator(
        &mut self,
        delegator: &Address,
        params: &StakingParams,
    ) -> Result<(), ValidatorError> {
        self.settle_delegator_punishment(delegator, params)?;
        self.settle_delegator_rewards(delegator)
    }

    fn settle_delegator_rewards(&mut self, delegator: &Address) -> Result<(), ValidatorError> {
        let acc = self.acc_rewards_per_stake;
        let dlg = self
            .delegators
            .get_mut(delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        let gross = reward_debt(dlg.stake, acc)?;
        dlg.settled = dlg.settled.saturating_add(gross.saturating_sub(dlg.debt));
        dlg.debt = gross;
        Ok(())
    }

    /// Apply any punishment owed since `punish_free`, stake first, then the
    /// account's unbound queue, and advance the watermark.
    fn settle_delegator_punishment(
        &mut self,
        delegator: &Address,
        params: &StakingParams,
    ) -> Result<(), ValidatorError> {
        let owed = self.delegator_punishment_owed(delegator, params)?;
        let acc_punish = self.acc_punish_factor;
        let dlg = self
            .delegators
            .get_mut(delegator)
            .ok_or(ValidatorError::NoSuchDelegator)?;
        let from_stake = owed.min(dlg.stake);
        dlg.stake -= from_stake;
        dlg.punish_free = acc_punish;
        let rest = owed - from_stake;
        if rest > 0 {
            if let Some(q) = self.unbound.get_mut(delegator) {
                q.slash(rest);
            }
        }
        Ok(())
    }

    /// Idle/Ready transition after a stake change; Jail and Exit are only
    /// left through their dedicated operations.
    fn re_evaluate(&mut self, params: &StakingParams) {
        if !self.state.can_do_staking() {
            return;
        }
        self.state = if self.total_stake >= params.threshold_stakes
            && self.self_stake >= params.min_self_stakes
        {
            ValidatorState::Ready
        } else {
            ValidatorState::Idle
        };
    }
}
