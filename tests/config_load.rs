// Copyright (c) 2026 Valstake
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use std::io::Write;

use valstake::core::economics::registry::StakingRegistry;
use valstake::core::types::StakingConfig;

const SAMPLE: &str = r#"
admin = "0x0101010101010101010101010101010101010101"

[params]
max_validators = 21
threshold_stakes = 2000000
min_self_stakes = 150000
max_stakes = 24000000
punish_base = 1000
lazy_punish_factor = 1
evil_punish_factor = 10
lazy_punish_threshold = 3
block_epoch = 200
unbound_lock_period = 86400

[[genesis]]
validator = "0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a"
manager = "0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b"
commission_rate = 20
stake = 2000000
accept_delegation = true

[[genesis]]
validator = "0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"
manager = "0x0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d"
commission_rate = 0
stake = 3000000
accept_delegation = false
"#;

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let raw = std::fs::read_to_string(file.path()).unwrap();
    let cfg = StakingConfig::from_toml_str(&raw).unwrap();

    assert_eq!(cfg.params.max_validators, 21);
    assert_eq!(cfg.params.unbound_lock_period, 86_400);
    assert_eq!(cfg.genesis.len(), 2);
    assert_eq!(cfg.genesis[0].commission_rate, 20);
    assert_eq!(cfg.genesis[1].stake, 3_000_000);
    assert!(!cfg.genesis[1].accept_delegation);
    assert_eq!(
        cfg.admin.to_string(),
        "0x0101010101010101010101010101010101010101"
    );
}

#[test]
fn lock_period_defaults_to_zero() {
    let cfg = StakingConfig::from_toml_str(
        r#"
admin = "0x0101010101010101010101010101010101010101"

[params]
max_validators = 21
threshold_stakes = 2000000
min_self_stakes = 150000
max_stakes = 24000000
punish_base = 1000
lazy_punish_factor = 1
evil_punish_factor = 10
lazy_punish_threshold = 3
block_epoch = 200
"#,
    )
    .unwrap();
    assert_eq!(cfg.params.unbound_lock_period, 0);
    assert!(cfg.genesis.is_empty());
}

#[test]
fn genesis_seeds_a_working_registry() {
    let cfg = StakingConfig::from_toml_str(SAMPLE).unwrap();
    let reg = StakingRegistry::from_genesis(&cfg).unwrap();

    assert_eq!(reg.validator_count(), 2);
    assert_eq!(reg.total_stake(), 5_000_000);
    // Both genesis validators qualify and are active from block one.
    assert_eq!(reg.active_validators().len(), 2);
}

#[test]
fn bad_documents_are_rejected() {
    assert!(StakingConfig::from_toml_str("admin = 7").is_err());
    assert!(StakingConfig::from_toml_str("admin = \"0x1234\"").is_err());
    assert!(StakingConfig::from_toml_str("").is_err());
}
