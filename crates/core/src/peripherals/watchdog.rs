// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{ResetCause, SimResult, TickResult};
use blinkwired_firmware::regs::{WdtCtl, WDTPW};

/// Upper byte of every WDTCTL read on the real part.
const READ_SIGNATURE: u8 = 0x69;

/// MSP430 Watchdog Timer (watchdog mode only).
///
/// Out of reset the watchdog is live: the counter advances once per device
/// cycle and requests a PUC when it reaches the interval selected by the
/// WDTIS bits. A word write of `WDTPW | WDTHOLD` freezes it; a write with
/// any other upper byte is a security key violation and requests a PUC
/// immediately.
///
/// WDTCTL is word-access-only on the real chip. The bus is byte-addressed,
/// so writes are staged per byte and committed once both halves of the
/// word have arrived.
#[derive(Debug, serde::Serialize)]
pub struct Watchdog {
    ctl: u8,
    counter: u32,
    #[serde(skip)]
    write_buf: u16,
    #[serde(skip)]
    write_mask: u8,
    #[serde(skip)]
    reset_request: Option<ResetCause>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            ctl: 0,
            counter: 0,
            write_buf: 0,
            write_mask: 0,
            reset_request: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.ctl & WdtCtl::HOLD.bits() as u8 != 0
    }

    /// Cycles until expiry, from the WDTIS interval select bits.
    fn interval(&self) -> u32 {
        match self.ctl & 0x03 {
            0b00 => 32_768,
            0b01 => 8_192,
            0b10 => 512,
            _ => 64,
        }
    }

    fn commit_write(&mut self, word: u16) {
        if word & 0xFF00 != WDTPW {
            tracing::warn!("WDTCTL security key violation: {:#06x}", word);
            self.reset_request = Some(ResetCause::KeyViolation);
            return;
        }

        let bits = WdtCtl::from_bits_truncate(word);
        if bits.contains(WdtCtl::CNTCL) {
            self.counter = 0;
        }
        // CNTCL is self-clearing and always reads back as zero.
        self.ctl = (bits & !WdtCtl::CNTCL).bits() as u8;
    }
}

impl crate::Peripheral for Watchdog {
    fn read(&self, offset: u16) -> SimResult<u8> {
        Ok(match offset {
            0 => self.ctl,
            1 => READ_SIGNATURE,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        if offset > 1 {
            return Ok(());
        }

        let shift = offset * 8;
        self.write_buf &= !(0xFF << shift);
        self.write_buf |= (value as u16) << shift;
        self.write_mask |= 1 << offset;

        if self.write_mask == 0x03 {
            let word = self.write_buf;
            self.write_buf = 0;
            self.write_mask = 0;
            self.commit_write(word);
        }
        Ok(())
    }

    fn tick(&mut self) -> TickResult {
        if let Some(cause) = self.reset_request.take() {
            return TickResult {
                cycles: 0,
                reset: Some(cause),
            };
        }

        if self.is_held() {
            return TickResult::default();
        }

        self.counter += 1;
        if self.counter >= self.interval() {
            tracing::debug!("Watchdog expired after {} cycles", self.counter);
            self.counter = 0;
            return TickResult {
                cycles: 0,
                reset: Some(ResetCause::WatchdogExpiry),
            };
        }

        TickResult::default()
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
