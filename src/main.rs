#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Valstake devnet simulator entrypoint.
//! Loads a staking config and drives a deterministic block loop.

use anyhow::Context;
use prometheus::{Encoder, TextEncoder};
use tracing::info;

use valstake::core::economics::registry::StakingRegistry;
use valstake::core::types::{Event, StakingConfig};
use valstake::monitoring::metrics::Metrics;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn apply_events(metrics: &Metrics, events: &[Event]) {
    for ev in events {
        match ev {
            Event::ValidatorRegistered { .. } => metrics.registrations_total.inc(),
            Event::RewardsWithdrawn { amount, .. } => {
                metrics.rewards_withdrawn_total.inc_by(*amount as u64);
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let config_path = env("VALSTAKE_CONFIG", "./config.toml");
    let blocks: u64 = env("VALSTAKE_BLOCKS", "1000")
        .parse()
        .context("VALSTAKE_BLOCKS must be an integer")?;
    let fee_per_block: u128 = env("VALSTAKE_BLOCK_FEE", "1000")
        .parse()
        .context("VALSTAKE_BLOCK_FEE must be an integer")?;

    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {config_path}"))?;
    let config = StakingConfig::from_toml_str(&raw).context("parsing staking config")?;

    let metrics = Metrics::new().map_err(|e| anyhow::anyhow!("metrics init: {e}"))?;
    let mut registry = StakingRegistry::from_genesis(&config)
        .map_err(|e| anyhow::anyhow!("genesis: {e}"))?;
    apply_events(&metrics, &registry.take_events());

    let admin = registry.admin();
    let epoch = registry.params().block_epoch;
    info!(config = %config_path, blocks, fee = %fee_per_block, "simulator starting");

    for height in 1..=blocks {
        // Block time advances one second per block.
        if !registry.active_validators().is_empty() {
            registry
                .distribute_block_fee(fee_per_block)
                .map_err(|e| anyhow::anyhow!("fee at height {height}: {e}"))?;
            metrics.fees_distributed_total.inc_by(fee_per_block as u64);
        }
        if epoch > 0 && height % epoch == 0 {
            let top = registry.get_top_validators(0);
            if !top.is_empty() {
                registry
                    .update_active_validator_set(admin, top, height)
                    .map_err(|e| anyhow::anyhow!("rotation at height {height}: {e}"))?;
            }
        }
        apply_events(&metrics, &registry.take_events());
        metrics.validators_total.set(registry.validator_count() as i64);
        metrics
            .active_validators
            .set(registry.active_validators().len() as i64);
        metrics.total_stake.set(registry.total_stake() as i64);
    }

    info!(
        total_stake = %registry.total_stake(),
        active = registry.active_validators().len(),
        fee_dust = %registry.fee_dust(),
        "simulation finished"
    );

    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&metrics.registry.gather(), &mut buf)
        .context("encoding metrics")?;
    println!("{}", String::from_utf8_lossy(&buf));
    Ok(())
}
