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

//! Deterministic core types, configuration and canonical encoding helpers.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules. Requires deterministic container ordering (use BTreeMap/BTreeSet).
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    // Fast-path cap on the raw wire payload.
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Native stake/reward quantity, expressed in integer stake units.
pub type Amount = u128;

/// Address parsing error.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid hex")]
    InvalidHex,
    #[error("expected 20 bytes")]
    BadLength,
}

/// Ledger account address (20 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    /// Return raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The all-zero address, never a valid actor.
    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|_| AddressError::InvalidHex)?;
        if bytes.len() != 20 {
            return Err(AddressError::BadLength);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != 20 {
                return Err(serde::de::Error::custom("expected 20 bytes"));
            }
            let mut out = [0u8; 20];
            out.copy_from_slice(&bytes);
            Ok(Self(out))
        }
    }
}

/// Validator lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorState {
    /// Registered but below the ready thresholds.
    Idle,
    /// Eligible for the active set.
    Ready,
    /// Jailed by punishment; out of ranking until exit.
    Jail,
    /// Terminal: self-stake withdrawn, only claims remain.
    Exit,
}

impl ValidatorState {
    /// Stake and delegation mutations are accepted only in Idle/Ready.
    pub fn can_do_staking(&self) -> bool {
        matches!(self, ValidatorState::Idle | ValidatorState::Ready)
    }
}

/// Protocol constants, fixed at construction and immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakingParams {
    /// Active-set size limit.
    pub max_validators: usize,
    /// Total stake required for the Ready state.
    pub threshold_stakes: Amount,
    /// Self-stake required for the Ready state and for registration.
    pub min_self_stakes: Amount,
    /// Self-stake ceiling per validator.
    pub max_stakes: Amount,
    /// Denominator for punishment factors.
    pub punish_base: Amount,
    /// Factor applied when the missed-block threshold is reached.
    pub lazy_punish_factor: Amount,
    /// Factor applied for provable (evil) misbehavior.
    pub evil_punish_factor: Amount,
    /// Consecutive misses before a lazy punishment fires.
    pub lazy_punish_threshold: u32,
    /// Block interval at which the active set may rotate.
    pub block_epoch: u64,
    /// Seconds an unbound entry must age before it is claimable.
    #[serde(default)]
    pub unbound_lock_period: u64,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            max_validators: 21,
            threshold_stakes: 2_000_000,
            min_self_stakes: 150_000,
            max_stakes: 24_000_000,
            punish_base: 1000,
            lazy_punish_factor: 1,
            evil_punish_factor: 10,
            lazy_punish_threshold: 3,
            block_epoch: 200,
            unbound_lock_period: 0,
        }
    }
}

/// One pre-seeded validator in the genesis configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisValidator {
    /// Validator identity address.
    pub validator: Address,
    /// Managing admin account (receives commission).
    pub manager: Address,
    /// Commission percentage in [0, 100].
    pub commission_rate: u8,
    /// Initial self-stake.
    pub stake: Amount,
    /// Whether third-party delegation is accepted.
    pub accept_delegation: bool,
}

/// Registry configuration root (TOML).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Registry admin account.
    pub admin: Address,
    /// Protocol constants.
    pub params: StakingParams,
    /// Pre-seeded validators.
    #[serde(default)]
    pub genesis: Vec<GenesisValidator>,
}

impl StakingConfig {
    /// Parse a TOML configuration document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Structured observations emitted by the registry, in call order.
///
/// The stream is append-only and causally tied to the triggering call;
/// external indexers drain it via `StakingRegistry::take_events`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A validator entered the registry.
    ValidatorRegistered {
        /// Validator address.
        validator: Address,
        /// Managing admin.
        manager: Address,
        /// Commission percentage.
        commission_rate: u8,
        /// Initial self-stake.
        stake: Amount,
        /// State assigned at registration.
        state: ValidatorState,
    },
    /// A validator's stake pool changed.
    StakesChanged {
        /// Validator address.
        validator: Address,
        /// Account whose stake moved (manager or delegator).
        account: Address,
        /// Validator total stake after the change.
        new_total_stake: Amount,
    },
    /// A validator's lifecycle state changed.
    StateChanged {
        /// Validator address.
        validator: Address,
        /// Managing admin.
        manager: Address,
        /// State before.
        old: ValidatorState,
        /// State after.
        new: ValidatorState,
    },
    /// Rewards were paid out.
    RewardsWithdrawn {
        /// Validator address.
        validator: Address,
        /// Paid account.
        recipient: Address,
        /// Reward amount (excludes released stake).
        amount: Amount,
    },
    /// Matured unbound stake was released to its owner.
    StakeReleased {
        /// Validator address.
        validator: Address,
        /// Paid account.
        recipient: Address,
        /// Released amount.
        amount: Amount,
    },
    /// The global stake aggregate changed.
    TotalStakeChanged {
        /// Validator that triggered the change.
        validator: Address,
        /// Global total before.
        old: Amount,
        /// Global total after.
        new: Amount,
    },
    /// An admin transfer was proposed (first phase).
    AdminChanging {
        /// Proposed new admin.
        proposed: Address,
    },
    /// An admin transfer was finalized (second phase).
    AdminChanged {
        /// Previous admin.
        old: Address,
        /// New admin.
        new: Address,
    },
    /// A validator's manager was replaced.
    ManagerChanged {
        /// Validator address.
        validator: Address,
        /// Previous manager.
        old: Address,
        /// New manager.
        new: Address,
    },
    /// The registration permission gate was opened (one-way).
    PermissionLess,
    /// Rewards were claimed while unbound entries stayed queued
    /// (re-stake / re-delegate path).
    ClaimDeferredUnbound {
        /// Validator address.
        validator: Address,
        /// Claiming account.
        account: Address,
    },
}
