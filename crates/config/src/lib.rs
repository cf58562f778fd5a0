// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "watchdog" or "port"
    pub base_address: u16,
    #[serde(default)]
    pub size: Option<u16>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChipDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub peripherals: Vec<PeripheralConfig>,
}

/// Board-level LED wiring: which port pin the LED hangs off, and its
/// polarity. Observation-side only; the firmware's pin choice is fixed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardIoBinding {
    pub id: String,
    pub peripheral: String,
    pub pin: u8,
    #[serde(default = "default_true")]
    pub active_high: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SystemManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub chip: String, // Path to the chip descriptor, relative to this file
    #[serde(default)]
    pub board_io: Vec<BoardIoBinding>,
}

impl ChipDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read chip descriptor at {:?}", path.as_ref()))?;
        serde_yaml::from_str(&content).context("Failed to parse Chip Descriptor YAML")
    }
}

impl SystemManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open system manifest at {:?}", path.as_ref()))?;
        serde_yaml::from_reader(f).context("Failed to parse System Manifest")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    /// Blink loop iterations.
    pub max_steps: u64,
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxSteps,
    MaxCycles,
    WatchdogReset,
    KeyViolation,
    /// The run hit a bus fault (a firmware access outside the register map).
    Fault,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct MinTransitionsAssertion {
    pub min_transitions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct FinalLevelAssertion {
    /// Expected electrical level of the LED pin when the run stops: 0 or 1.
    pub final_level: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(untagged)]
pub enum RunAssertion {
    MinTransitions(MinTransitionsAssertion),
    FinalLevel(FinalLevelAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

/// Deterministic, CI-friendly run description for the `test` subcommand.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub schema_version: String,
    /// Optional system manifest path, relative to this file. Defaults to
    /// the built-in LaunchPad system.
    #[serde(default)]
    pub system: Option<String>,
    pub limits: RunLimits,
    #[serde(default)]
    pub assertions: Vec<RunAssertion>,
}

impl RunScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open run script at {:?}", path.as_ref()))?;
        let script: Self = serde_yaml::from_reader(f).context("Failed to parse Run Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        for assertion in &self.assertions {
            if let RunAssertion::FinalLevel(a) = assertion {
                if a.final_level > 1 {
                    anyhow::bail!(
                        "Assertion 'final_level' must be 0 or 1, got {}",
                        a.final_level
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_steps: 8
  max_cycles: 500000
assertions:
  - min_transitions: 8
  - final_level: 0
  - expected_stop_reason: max_steps
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.limits.max_steps, 8);
        assert_eq!(script.limits.max_cycles, Some(500_000));
        assert_eq!(script.assertions.len(), 3);
        assert!(matches!(
            script.assertions[2],
            RunAssertion::ExpectedStopReason(StopReasonAssertion {
                expected_stop_reason: StopReason::MaxSteps,
            })
        ));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
limits:
  max_steps: 100
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_max_steps() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_steps: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn test_invalid_final_level() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_steps: 4
assertions:
  - final_level: 2
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("final_level"));
    }

    #[test]
    fn test_chip_descriptor_parsing() {
        let yaml = r#"
schema_version: "1.0"
name: "MSP430G2553"
peripherals:
  - id: "wdt"
    type: "watchdog"
    base_address: 0x0120
    size: 2
  - id: "port1"
    type: "port"
    base_address: 0x0020
"#;
        let chip: ChipDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(chip.name, "MSP430G2553");
        assert_eq!(chip.peripherals.len(), 2);
        assert_eq!(chip.peripherals[0].base_address, 0x0120);
        assert_eq!(chip.peripherals[0].size, Some(2));
        assert_eq!(chip.peripherals[1].r#type, "port");
        assert_eq!(chip.peripherals[1].size, None);
    }

    #[test]
    fn test_system_manifest_parsing() {
        let yaml = r#"
name: "launchpad-blink"
chip: "configs/chips/msp430g2553.yaml"
board_io:
  - id: "red_led"
    peripheral: "port1"
    pin: 0
"#;
        let manifest: SystemManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.schema_version, "1.0");
        assert_eq!(manifest.board_io.len(), 1);
        assert!(manifest.board_io[0].active_high);
        assert_eq!(manifest.board_io[0].pin, 0);
    }
}
