// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    register_reads: AtomicU64,
    register_writes: AtomicU64,
    nops: AtomicU64,
    start_time: Instant,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            register_reads: AtomicU64::new(0),
            register_writes: AtomicU64::new(0),
            nops: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.register_reads.store(0, Ordering::SeqCst);
        self.register_writes.store(0, Ordering::SeqCst);
        self.nops.store(0, Ordering::SeqCst);
    }

    pub fn get_register_reads(&self) -> u64 {
        self.register_reads.load(Ordering::SeqCst)
    }

    pub fn get_register_writes(&self) -> u64 {
        self.register_writes.load(Ordering::SeqCst)
    }

    pub fn get_nops(&self) -> u64 {
        self.nops.load(Ordering::SeqCst)
    }

    /// Simulated cycles executed so far: every access and every nop is one.
    pub fn get_cycles(&self) -> u64 {
        self.get_register_reads() + self.get_register_writes() + self.get_nops()
    }

    /// Simulated cycles per wall-clock second.
    pub fn get_cps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_cycles() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_register_read(&self, _addr: u16, _value: u8) {
        self.register_reads.fetch_add(1, Ordering::SeqCst);
    }

    fn on_register_write(&self, _addr: u16, _value: u8) {
        self.register_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_nop(&self) {
        self.nops.fetch_add(1, Ordering::SeqCst);
    }
}
