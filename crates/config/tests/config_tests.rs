// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwired_config::{ChipDescriptor, RunScript, SystemManifest};
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("blinkwired-config-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

#[test]
fn test_load_chip_descriptor_from_file() {
    let path = write_temp_file(
        "chip",
        r#"
schema_version: "1.0"
name: "MSP430G2553"
peripherals:
  - id: "wdt"
    type: "watchdog"
    base_address: 0x0120
  - id: "port1"
    type: "port"
    base_address: 0x0020
    size: 8
"#,
    );

    let chip = ChipDescriptor::from_file(&path).unwrap();
    assert_eq!(chip.name, "MSP430G2553");
    assert_eq!(chip.peripherals[1].base_address, 0x0020);
}

#[test]
fn test_load_system_manifest_from_file() {
    let path = write_temp_file(
        "system",
        r#"
schema_version: "1.0"
name: "launchpad-blink"
chip: "chips/msp430g2553.yaml"
board_io:
  - id: "red_led"
    peripheral: "port1"
    pin: 0
    active_high: true
"#,
    );

    let manifest = SystemManifest::from_file(&path).unwrap();
    assert_eq!(manifest.chip, "chips/msp430g2553.yaml");
    assert_eq!(manifest.board_io[0].id, "red_led");
}

#[test]
fn test_load_run_script_validates() {
    let path = write_temp_file(
        "script-bad",
        r#"
schema_version: "1.0"
limits:
  max_steps: 0
"#,
    );

    let err = RunScript::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("max_steps"));
}

#[test]
fn test_missing_file_has_context() {
    let err = RunScript::from_file("/nonexistent/script.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to open run script"));
}

#[test]
fn test_unknown_script_field_rejected() {
    let path = write_temp_file(
        "script-unknown",
        r#"
schema_version: "1.0"
limits:
  max_steps: 4
  max_uart_bytes: 10
"#,
    );

    assert!(RunScript::from_file(&path).is_err());
}
