#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Core protocol: deterministic types and staking economics.

pub mod economics;
pub mod types;
