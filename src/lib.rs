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

//! Valstake - delegated proof-of-stake validator registry and reward engine.
//!
//! This repository provides:
//! - Deterministic integer accounting for per-stake-unit reward and
//!   punishment accumulators (no value lost to rounding)
//! - A per-validator engine covering self-stake, delegations, commission,
//!   unbound (pending-withdrawal) queues and lazy punishment settlement
//! - A global registry that ranks validators by stake, rotates the active
//!   set at epoch boundaries and routes block-fee income
//! - Monitoring via Prometheus metrics and structured logging

/// Core protocol primitives (types, staking economics).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
