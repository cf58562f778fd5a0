// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::port::Port;
use crate::peripherals::watchdog::Watchdog;
use crate::{Peripheral, SimResult, SimulationError, TickResult};
use blinkwired_config::ChipDescriptor;
use blinkwired_firmware::regs;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u16,
    pub size: u16,
    pub dev: Box<dyn Peripheral>,
}

/// Byte-addressed register bus. 16-bit registers are assembled
/// little-endian from two byte accesses, as on the real part.
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// Default MSP430G2553 map: the watchdog word at 0x0120 and the Port 1
    /// byte registers at 0x0020.
    pub fn new() -> Self {
        Self {
            peripherals: vec![
                PeripheralEntry {
                    name: "wdt".to_string(),
                    base: regs::WDTCTL,
                    size: 2,
                    dev: Box::new(Watchdog::new()),
                },
                PeripheralEntry {
                    name: "port1".to_string(),
                    base: regs::P1_BASE,
                    size: 8,
                    dev: Box::new(Port::new()),
                },
            ],
        }
    }

    pub fn from_config(chip: &ChipDescriptor) -> anyhow::Result<Self> {
        let mut bus = Self {
            peripherals: Vec::new(),
        };

        for p_cfg in &chip.peripherals {
            let (dev, default_size): (Box<dyn Peripheral>, u16) = match p_cfg.r#type.as_str() {
                "watchdog" => (Box::new(Watchdog::new()), 2),
                "port" => (Box::new(Port::new()), 8),
                other => {
                    tracing::warn!(
                        "Unsupported peripheral type '{}' for id '{}'; skipping",
                        other,
                        p_cfg.id
                    );
                    continue;
                }
            };

            bus.peripherals.push(PeripheralEntry {
                name: p_cfg.id.clone(),
                base: p_cfg.base_address,
                size: p_cfg.size.unwrap_or(default_size),
                dev,
            });
        }

        Ok(bus)
    }

    pub fn read_u8(&self, addr: u16) -> SimResult<u8> {
        for p in &self.peripherals {
            if addr >= p.base && addr < p.base + p.size {
                return p.dev.read(addr - p.base);
            }
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    pub fn write_u8(&mut self, addr: u16, value: u8) -> SimResult<()> {
        for p in &mut self.peripherals {
            if addr >= p.base && addr < p.base + p.size {
                return p.dev.write(addr - p.base, value);
            }
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    pub fn read_u16(&self, addr: u16) -> SimResult<u16> {
        let lo = self.read_u8(addr)? as u16;
        let hi = self.read_u8(addr + 1)? as u16;
        Ok(lo | (hi << 8))
    }

    pub fn write_u16(&mut self, addr: u16, value: u16) -> SimResult<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr + 1, (value >> 8) as u8)?;
        Ok(())
    }

    /// Advance every peripheral by one cycle. Cycle costs are summed; the
    /// first reset request wins.
    pub fn tick_peripherals(&mut self) -> TickResult {
        let mut result = TickResult::default();
        for p in &mut self.peripherals {
            let res = p.dev.tick();
            result.cycles += res.cycles;
            if result.reset.is_none() {
                result.reset = res.reset;
            }
        }
        result
    }

    pub fn peek(&self, name: &str) -> Option<serde_json::Value> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dev.snapshot())
    }
}
