// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwired_config::BoardIoBinding;
use blinkwired_core::SimulationObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

/// Watches writes to the LED port's output register and counts level
/// changes on the bound pin.
///
/// Seeded with the register's reset level, so the first driven edge counts
/// as a transition. The reported on/off state honors the binding's
/// polarity; the recorded level is the electrical one.
#[derive(Debug)]
pub struct TransitionLog {
    out_addr: u16,
    binding: BoardIoBinding,
    last_level: Mutex<bool>,
    transitions: AtomicU64,
}

impl TransitionLog {
    pub fn new(out_addr: u16, binding: BoardIoBinding, reset_level: bool) -> Self {
        Self {
            out_addr,
            binding,
            last_level: Mutex::new(reset_level),
            transitions: AtomicU64::new(0),
        }
    }

    pub fn count(&self) -> u64 {
        self.transitions.load(Ordering::SeqCst)
    }

    /// Last observed electrical level of the bound pin.
    pub fn last_level(&self) -> bool {
        *self.last_level.lock().unwrap()
    }
}

impl SimulationObserver for TransitionLog {
    fn on_register_write(&self, addr: u16, value: u8) {
        if addr != self.out_addr {
            return;
        }

        let level = value & (1 << self.binding.pin) != 0;
        let mut last = self.last_level.lock().unwrap();
        if *last != level {
            *last = level;
            let n = self.transitions.fetch_add(1, Ordering::SeqCst) + 1;
            let lit = level == self.binding.active_high;
            info!(
                "LED '{}' {} (transition {})",
                self.binding.id,
                if lit { "on" } else { "off" },
                n
            );
        }
    }
}
