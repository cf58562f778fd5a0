// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use blinkwired_config::{
    BoardIoBinding, ChipDescriptor, RunAssertion, RunScript, StopReason, SystemManifest,
};
use blinkwired_core::bus::SystemBus;
use blinkwired_core::metrics::PerformanceMetrics;
use blinkwired_core::peripherals::port::OUT_OFFSET;
use blinkwired_core::{Device, RunLimits};

mod transition_log;
use transition_log::TransitionLog;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "BlinkWired Simulator", long_about = None)]
struct Cli {
    /// Path to the system manifest (YAML). Defaults to the built-in
    /// LaunchPad system (MSP430G2553, LED on P1.0).
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Maximum number of blink iterations to execute
    #[arg(long, default_value_t = 16)]
    max_steps: u64,

    /// Optional ceiling on total simulated cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Enable cycle-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a run script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the run script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Directory to write run artifacts (result.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Override max cycles limit
    #[arg(long)]
    max_cycles: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    steps_executed: u64,
    cycles: u64,
    transitions: u64,
    final_level: u8,
    stop_reason: StopReason,
    limits: blinkwired_config::RunLimits,
    assertions: Vec<AssertionResult>,
}

#[derive(Debug, Serialize)]
struct AssertionResult {
    assertion: RunAssertion,
    passed: bool,
}

struct BoardSetup {
    device: Device,
    led: BoardIoBinding,
    /// Bus address of the output register the LED hangs off.
    led_out_addr: u16,
}

fn default_led() -> BoardIoBinding {
    BoardIoBinding {
        id: "red_led".to_string(),
        peripheral: "port1".to_string(),
        pin: 0,
        active_high: true,
    }
}

fn build_device(system: Option<&Path>) -> anyhow::Result<BoardSetup> {
    let (bus, led) = match system {
        None => (SystemBus::new(), default_led()),
        Some(path) => {
            let manifest = SystemManifest::from_file(path)?;
            let chip_path = path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&manifest.chip);
            let chip = ChipDescriptor::from_file(&chip_path)?;
            let bus = SystemBus::from_config(&chip)?;
            let led = manifest
                .board_io
                .into_iter()
                .next()
                .unwrap_or_else(default_led);
            (bus, led)
        }
    };

    let base = bus
        .peripherals
        .iter()
        .find(|p| p.name == led.peripheral)
        .map(|p| p.base)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Board LED '{}' references unknown peripheral '{}'",
                led.id,
                led.peripheral
            )
        })?;

    Ok(BoardSetup {
        device: Device::new(bus),
        led_out_addr: base + OUT_OFFSET,
        led,
    })
}

fn map_stop_reason(reason: blinkwired_core::StopReason) -> StopReason {
    match reason {
        blinkwired_core::StopReason::MaxSteps => StopReason::MaxSteps,
        blinkwired_core::StopReason::MaxCycles => StopReason::MaxCycles,
        blinkwired_core::StopReason::WatchdogReset => StopReason::WatchdogReset,
        blinkwired_core::StopReason::KeyViolation => StopReason::KeyViolation,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Some(Commands::Test(args)) => run_test(args),
        None => run_interactive(cli),
    }
}

fn run_interactive(cli: Cli) -> ExitCode {
    info!("Starting BlinkWired Simulator");

    let mut setup = match build_device(cli.system.as_deref()) {
        Ok(setup) => setup,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(
        "Board LED '{}' on {} pin {} ({})",
        setup.led.id,
        setup.led.peripheral,
        setup.led.pin,
        if setup.led.active_high {
            "active-high"
        } else {
            "active-low"
        }
    );

    let transitions = Arc::new(TransitionLog::new(
        setup.led_out_addr,
        setup.led.clone(),
        false,
    ));
    let metrics = Arc::new(PerformanceMetrics::new());
    setup.device.observers.push(transitions.clone());
    setup.device.observers.push(metrics.clone());

    let limits = RunLimits {
        max_steps: cli.max_steps,
        max_cycles: cli.max_cycles,
    };

    match setup.device.run_blink(limits) {
        Ok(outcome) => {
            info!(
                "Run complete: {:?} after {} iterations, {} cycles",
                outcome.stop_reason, outcome.steps, outcome.cycles
            );
            info!("LED transitions observed: {}", transitions.count());
            info!("Simulation speed: {:.0} cycles/sec", metrics.get_cps());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_test(args: TestArgs) -> ExitCode {
    let script = match RunScript::from_file(&args.script) {
        Ok(script) => script,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    // The script's system path is relative to the script file.
    let system_path = script.system.as_ref().map(|rel| {
        args.script
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(rel)
    });

    let mut setup = match build_device(system_path.as_deref()) {
        Ok(setup) => setup,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let transitions = Arc::new(TransitionLog::new(
        setup.led_out_addr,
        setup.led.clone(),
        false,
    ));
    setup.device.observers.push(transitions.clone());

    let limits = RunLimits {
        max_steps: args.max_steps.unwrap_or(script.limits.max_steps),
        max_cycles: args.max_cycles.or(script.limits.max_cycles),
    };

    let result = match setup.device.run_blink(limits) {
        Ok(outcome) => {
            let stop_reason = map_stop_reason(outcome.stop_reason);
            let final_level = transitions.last_level() as u8;
            let assertions: Vec<AssertionResult> = script
                .assertions
                .iter()
                .map(|assertion| AssertionResult {
                    assertion: *assertion,
                    passed: check_assertion(assertion, stop_reason, transitions.count(), final_level),
                })
                .collect();

            let status = if assertions.iter().all(|a| a.passed) {
                "pass"
            } else {
                "fail"
            };

            TestResult {
                result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
                status: status.to_string(),
                steps_executed: outcome.steps,
                cycles: outcome.cycles,
                transitions: transitions.count(),
                final_level,
                stop_reason,
                limits: blinkwired_config::RunLimits {
                    max_steps: limits.max_steps,
                    max_cycles: limits.max_cycles,
                },
                assertions,
            }
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            TestResult {
                result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
                status: "error".to_string(),
                steps_executed: 0,
                cycles: setup.device.total_cycles(),
                transitions: transitions.count(),
                final_level: transitions.last_level() as u8,
                stop_reason: StopReason::Fault,
                limits: blinkwired_config::RunLimits {
                    max_steps: limits.max_steps,
                    max_cycles: limits.max_cycles,
                },
                assertions: Vec::new(),
            }
        }
    };

    for assertion in &result.assertions {
        if !assertion.passed {
            error!("Assertion failed: {:?}", assertion.assertion);
        }
    }

    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = write_result(output_dir, &result) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    info!(
        "Run script finished: {} ({:?}, {} transitions)",
        result.status, result.stop_reason, result.transitions
    );

    match result.status.as_str() {
        "pass" => ExitCode::from(EXIT_PASS),
        "fail" => ExitCode::from(EXIT_ASSERT_FAIL),
        _ => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn check_assertion(
    assertion: &RunAssertion,
    stop_reason: StopReason,
    transitions: u64,
    final_level: u8,
) -> bool {
    match assertion {
        RunAssertion::MinTransitions(a) => transitions >= a.min_transitions,
        RunAssertion::FinalLevel(a) => final_level == a.final_level,
        RunAssertion::ExpectedStopReason(a) => stop_reason == a.expected_stop_reason,
    }
}

fn write_result(output_dir: &Path, result: &TestResult) -> anyhow::Result<()> {
    use anyhow::Context;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    let path = output_dir.join("result.json");
    let f = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create result file {:?}", path))?;
    serde_json::to_writer_pretty(f, result).context("Failed to serialize result.json")?;
    Ok(())
}
