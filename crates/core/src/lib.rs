// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod metrics;
pub mod peripherals;

use std::sync::Arc;

use blinkwired_firmware as firmware;
use blinkwired_firmware::regs;

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#06x}")]
    MemoryViolation(u16),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Why a peripheral requested a device reset (a PUC on the real chip).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    /// The watchdog counter expired while the watchdog was live.
    WatchdogExpiry,
    /// A WDTCTL write without the 0x5A password.
    KeyViolation,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TickResult {
    pub cycles: u32,
    pub reset: Option<ResetCause>,
}

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_register_read(&self, _addr: u16, _value: u8) {}
    fn on_register_write(&self, _addr: u16, _value: u8) {}
    fn on_nop(&self) {}
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u16) -> SimResult<u8>;
    fn write(&mut self, offset: u16, value: u8) -> SimResult<()>;
    fn tick(&mut self) -> TickResult {
        TickResult::default()
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Stop conditions injected by the harness. The firmware itself never
/// terminates; these are the only ways a bounded run ends.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    /// Maximum number of toggle+delay iterations.
    pub max_steps: u64,
    /// Optional ceiling on total consumed cycles.
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxSteps,
    MaxCycles,
    WatchdogReset,
    KeyViolation,
}

impl From<ResetCause> for StopReason {
    fn from(cause: ResetCause) -> Self {
        match cause {
            ResetCause::WatchdogExpiry => StopReason::WatchdogReset,
            ResetCause::KeyViolation => StopReason::KeyViolation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    /// Completed loop iterations.
    pub steps: u64,
    pub cycles: u64,
}

/// The simulated device: the system bus plus the execution bookkeeping the
/// real chip does in silicon. It implements [`firmware::Hardware`], so the
/// blink program runs against it unmodified.
///
/// Every register access and every `nop` costs one cycle and advances the
/// peripherals, which is what makes the watchdog countdown and the delay
/// monotonicity observable to harnesses.
pub struct Device {
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    total_cycles: u64,
    pending_reset: Option<ResetCause>,
    fault: Option<SimulationError>,
}

impl Default for Device {
    fn default() -> Self {
        Self::new(bus::SystemBus::new())
    }
}

impl Device {
    pub fn new(bus: bus::SystemBus) -> Self {
        Self {
            bus,
            observers: Vec::new(),
            total_cycles: 0,
            pending_reset: None,
            fault: None,
        }
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// A reset requested by a peripheral (watchdog expiry or key violation).
    /// Latched until the run loop picks it up; the real chip would restart.
    pub fn pending_reset(&self) -> Option<ResetCause> {
        self.pending_reset
    }

    /// The first bus fault hit through the infallible firmware interface,
    /// if any. Accesses to unmapped addresses land here instead of
    /// propagating through the firmware, which has no error path.
    pub fn take_fault(&mut self) -> Option<SimulationError> {
        self.fault.take()
    }

    pub fn peek_peripheral(&self, name: &str) -> Option<serde_json::Value> {
        self.bus.peek(name)
    }

    fn consume_cycle(&mut self) {
        self.total_cycles += 1;
        let res = self.bus.tick_peripherals();
        self.total_cycles += res.cycles as u64;
        if let Some(cause) = res.reset {
            if self.pending_reset.is_none() {
                tracing::debug!("Reset requested: {:?}", cause);
                self.pending_reset = Some(cause);
            }
        }
    }

    /// Run the blink program under the given stop conditions.
    ///
    /// Initializes the firmware, then executes whole loop iterations until
    /// a limit trips or a peripheral requests a reset. Checks run between
    /// iterations; a watchdog expiry inside an iteration is reported at the
    /// next boundary, before the step/cycle limits.
    pub fn run_blink(&mut self, limits: RunLimits) -> SimResult<RunOutcome> {
        for observer in &self.observers {
            observer.on_simulation_start();
        }

        firmware::init(self, regs::LED);

        let mut steps = 0u64;
        let stop_reason = loop {
            if let Some(fault) = self.fault.take() {
                return Err(fault);
            }
            if let Some(cause) = self.pending_reset {
                break cause.into();
            }
            if steps >= limits.max_steps {
                break StopReason::MaxSteps;
            }
            if let Some(max) = limits.max_cycles {
                if self.total_cycles >= max {
                    break StopReason::MaxCycles;
                }
            }

            firmware::blink_iteration(self, regs::LED);
            steps += 1;
        };

        for observer in &self.observers {
            observer.on_simulation_stop();
        }

        Ok(RunOutcome {
            stop_reason,
            steps,
            cycles: self.total_cycles,
        })
    }
}

impl firmware::Hardware for Device {
    fn read8(&mut self, addr: u16) -> u8 {
        let value = match self.bus.read_u8(addr) {
            Ok(value) => value,
            Err(e) => {
                if self.fault.is_none() {
                    tracing::warn!("{}", e);
                    self.fault = Some(e);
                }
                0
            }
        };
        for observer in &self.observers {
            observer.on_register_read(addr, value);
        }
        self.consume_cycle();
        value
    }

    fn write8(&mut self, addr: u16, value: u8) {
        if let Err(e) = self.bus.write_u8(addr, value) {
            if self.fault.is_none() {
                tracing::warn!("{}", e);
                self.fault = Some(e);
            }
        }
        for observer in &self.observers {
            observer.on_register_write(addr, value);
        }
        self.consume_cycle();
    }

    fn read16(&mut self, addr: u16) -> u16 {
        let lo = self.read8(addr);
        let hi = self.read8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write8(addr, lo);
        self.write8(addr.wrapping_add(1), hi);
    }

    fn nop(&mut self) {
        for observer in &self.observers {
            observer.on_nop();
        }
        self.consume_cycle();
    }
}
