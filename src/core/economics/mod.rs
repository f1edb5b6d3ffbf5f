#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Staking economics: fixed-point accounting, unbound queues, the
//! per-validator engine and the global registry.

pub mod accounting;
pub mod registry;
pub mod unbound;
pub mod validator;
