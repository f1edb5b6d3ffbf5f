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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Registered validators gauge.
    pub validators_total: IntGauge,
    /// Active-set size gauge.
    pub active_validators: IntGauge,
    /// Global active stake gauge.
    pub total_stake: IntGauge,

    /// Block fees routed through the active set.
    pub fees_distributed_total: IntCounter,
    /// Punishments applied (lazy and evil).
    pub punishments_total: IntCounter,
    /// Validator registrations.
    pub registrations_total: IntCounter,
    /// Rewards paid out by claims.
    pub rewards_withdrawn_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let validators_total = IntGauge::new("valstake_validators_total", "Registered validators")
            .map_err(|_| MetricsError::Prom)?;
        let active_validators = IntGauge::new("valstake_active_validators", "Active-set size")
            .map_err(|_| MetricsError::Prom)?;
        let total_stake = IntGauge::new("valstake_total_stake", "Global active stake")
            .map_err(|_| MetricsError::Prom)?;

        let fees_distributed_total = IntCounter::new(
            "valstake_fees_distributed_total",
            "Block fees routed through the active set",
        )
        .map_err(|_| MetricsError::Prom)?;
        let punishments_total =
            IntCounter::new("valstake_punishments_total", "Punishments applied")
                .map_err(|_| MetricsError::Prom)?;
        let registrations_total =
            IntCounter::new("valstake_registrations_total", "Validator registrations")
                .map_err(|_| MetricsError::Prom)?;
        let rewards_withdrawn_total = IntCounter::new(
            "valstake_rewards_withdrawn_total",
            "Rewards paid out by claims",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(validators_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(active_validators.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(total_stake.clone()))
            .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(fees_distributed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(punishments_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(registrations_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(rewards_withdrawn_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            validators_total,
            active_validators,
            total_stake,
            fees_distributed_total,
            punishments_total,
            registrations_total,
            rewards_withdrawn_total,
        })
    }
}
