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

//! Deterministic integer arithmetic for per-stake-unit accumulators.
//!
//! Repeated small updates must never leak value to rounding: every split
//! returns the division remainder explicitly so the caller can bank it.

use crate::core::types::Amount;
use thiserror::Error;

/// Accounting arithmetic error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountingError {
    #[error("amount overflow")]
    Overflow,
}

/// Split an incoming fee into commission and the distributable remainder.
///
/// Exact: `commission + distributable == amount` for any rate in [0, 100].
pub fn split_commission(
    amount: Amount,
    commission_rate: u8,
) -> Result<(Amount, Amount), AccountingError> {
    let commission = amount
        .checked_mul(commission_rate as Amount)
        .ok_or(AccountingError::Overflow)?
        / 100;
    Ok((commission, amount - commission))
}

/// Per-stake-unit accumulator delta for a distributable amount.
///
/// Returns `(delta, dust)` with `delta * total_stake + dust ==
/// distributable`. A zero stake pool distributes nothing; the full amount
/// comes back as dust.
pub fn per_stake_delta(distributable: Amount, total_stake: Amount) -> (Amount, Amount) {
    if total_stake == 0 {
        return (0, distributable);
    }
    let delta = distributable / total_stake;
    (delta, distributable - delta * total_stake)
}

/// Punishment share of `base_amount` for an accumulated factor delta.
pub fn punish_share(
    base_amount: Amount,
    factor_delta: Amount,
    punish_base: Amount,
) -> Result<Amount, AccountingError> {
    if punish_base == 0 {
        return Ok(0);
    }
    Ok(base_amount
        .checked_mul(factor_delta)
        .ok_or(AccountingError::Overflow)?
        / punish_base)
}

/// Rewards owed to a stake position since its last settlement.
///
/// `debt` is the `stake * acc` watermark recorded at that settlement;
/// `settled` holds rewards frozen by earlier partial unstakes. Lazy
/// punishment can shrink `stake` below the watermark, so the subtraction
/// saturates instead of underflowing.
pub fn pending_rewards(
    stake: Amount,
    acc_rewards_per_stake: Amount,
    debt: Amount,
    settled: Amount,
) -> Result<Amount, AccountingError> {
    let gross = stake
        .checked_mul(acc_rewards_per_stake)
        .ok_or(AccountingError::Overflow)?;
    Ok(gross.saturating_sub(debt).saturating_add(settled))
}

/// Settlement watermark for a stake position (`stake * acc`).
pub fn reward_debt(stake: Amount, acc_rewards_per_stake: Amount) -> Result<Amount, AccountingError> {
    stake
        .checked_mul(acc_rewards_per_stake)
        .ok_or(AccountingError::Overflow)
}
