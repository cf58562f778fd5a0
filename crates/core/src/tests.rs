// BlinkWired - MSP430 Blink Firmware Simulation
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod integration_tests {
    use crate::{Device, ResetCause, RunLimits, SimulationError, SimulationObserver, StopReason};
    use blinkwired_firmware::regs::{LED, P1DIR, P1OUT, WDTCTL};
    use blinkwired_firmware::{self as firmware, Hardware};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct RecordingObserver {
        writes: Mutex<Vec<(u16, u8)>>,
    }

    impl RecordingObserver {
        fn writes(&self) -> Vec<(u16, u8)> {
            self.writes.lock().unwrap().clone()
        }

        fn writes_to(&self, addr: u16) -> Vec<u8> {
            self.writes()
                .into_iter()
                .filter(|(a, _)| *a == addr)
                .map(|(_, v)| v)
                .collect()
        }
    }

    impl SimulationObserver for RecordingObserver {
        fn on_register_write(&self, addr: u16, value: u8) {
            self.writes.lock().unwrap().push((addr, value));
        }
    }

    fn device_with_observer() -> (Device, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let mut device = Device::default();
        device.observers.push(observer.clone());
        (device, observer)
    }

    #[test]
    fn test_init_write_order() {
        let (mut device, observer) = device_with_observer();
        device
            .run_blink(RunLimits {
                max_steps: 1,
                max_cycles: None,
            })
            .unwrap();

        let writes = observer.writes();
        let wdt = writes
            .iter()
            .position(|(a, _)| *a == WDTCTL || *a == WDTCTL + 1)
            .expect("no watchdog write");
        let dir = writes
            .iter()
            .position(|(a, _)| *a == P1DIR)
            .expect("no direction write");
        let out = writes
            .iter()
            .position(|(a, _)| *a == P1OUT)
            .expect("no output write");
        assert!(wdt < dir);
        assert!(dir < out);
    }

    #[test]
    fn test_end_to_end_three_iterations() {
        let (mut device, observer) = device_with_observer();
        let outcome = device
            .run_blink(RunLimits {
                max_steps: 3,
                max_cycles: None,
            })
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::MaxSteps);
        assert_eq!(outcome.steps, 3);

        // From an all-zero register file the LED bit reads 1, 0, 1 after
        // the three iterations.
        assert_eq!(observer.writes_to(P1OUT), vec![0x01, 0x00, 0x01]);

        // The direction bit is written once during init and stays set.
        assert_eq!(observer.writes_to(P1DIR), vec![0x01]);
        assert_eq!(device.bus.read_u8(P1DIR).unwrap() & 0x01, 0x01);

        // Each iteration is one toggle (read + write) plus 50000 nops.
        assert!(outcome.cycles > 150_000);
        assert!(outcome.cycles < 150_100);
    }

    #[test]
    fn test_run_stops_only_by_external_bound() {
        let mut device = Device::default();
        let outcome = device
            .run_blink(RunLimits {
                max_steps: 0,
                max_cycles: None,
            })
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::MaxSteps);
        assert_eq!(outcome.steps, 0);

        let mut device = Device::default();
        let outcome = device
            .run_blink(RunLimits {
                max_steps: u64::MAX,
                max_cycles: Some(200_000),
            })
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::MaxCycles);
        assert!(outcome.cycles >= 200_000);
    }

    #[test]
    fn test_watchdog_resets_without_disable() {
        let mut device = Device::default();
        // Skip disable_watchdog: the counter expires inside the first
        // 50000-cycle busy-wait.
        firmware::configure_pin_as_output(&mut device, LED);
        firmware::blink_iteration(&mut device, LED);
        assert_eq!(device.pending_reset(), Some(ResetCause::WatchdogExpiry));
        assert_eq!(
            StopReason::from(ResetCause::WatchdogExpiry),
            StopReason::WatchdogReset
        );
    }

    #[test]
    fn test_key_violation_latches_reset() {
        let mut device = Device::default();
        device.write16(WDTCTL, 0x5B80);
        assert_eq!(device.pending_reset(), Some(ResetCause::KeyViolation));
    }

    #[test]
    fn test_delay_monotonicity() {
        let mut device = Device::default();
        firmware::disable_watchdog(&mut device);

        let before = device.total_cycles();
        firmware::busy_wait(&mut device, 0);
        assert_eq!(device.total_cycles(), before);

        firmware::busy_wait(&mut device, 10);
        let after_short = device.total_cycles();
        assert_eq!(after_short - before, 10);

        firmware::busy_wait(&mut device, 100);
        assert_eq!(device.total_cycles() - after_short, 100);
    }

    #[test]
    fn test_wdtctl_readback_after_disable() {
        let mut device = Device::default();
        firmware::disable_watchdog(&mut device);
        assert_eq!(device.read16(WDTCTL), 0x6980);
    }

    #[test]
    fn test_unmapped_access_latches_fault() {
        let mut device = Device::default();
        device.write8(0x0500, 1);
        assert!(matches!(
            device.take_fault(),
            Some(SimulationError::MemoryViolation(0x0500))
        ));
        assert!(device.take_fault().is_none());
    }

    #[test]
    fn test_peek_peripheral() {
        let mut device = Device::default();
        device
            .run_blink(RunLimits {
                max_steps: 1,
                max_cycles: None,
            })
            .unwrap();

        let port = device.peek_peripheral("port1").expect("port1 snapshot");
        assert_eq!(port.get("out").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(port.get("dir").and_then(|v| v.as_u64()), Some(1));

        let wdt = device.peek_peripheral("wdt").expect("wdt snapshot");
        assert_eq!(wdt.get("ctl").and_then(|v| v.as_u64()), Some(0x80));

        assert!(device.peek_peripheral("uart0").is_none());
    }
}
