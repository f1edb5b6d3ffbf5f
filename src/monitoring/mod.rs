#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Monitoring: Prometheus metrics for the staking engine.

pub mod metrics;
