//! Kernel-log backend and the `log_info!`/`log_warn!`/`log_error!` macros.
//!
//! Adapted from the teacher's `SerialPort`/`SERIAL1` pattern: a
//! lazily-initialized device handle behind a `spin::Mutex`, written via
//! `core::fmt::Write`. The simulated board has no 16550 UART, so this talks
//! directly to terminal device 0's transmit registers instead of a port-IO
//! serial chip, busy-waiting on `READY` the same way the teacher's
//! `wait_for_tx_empty` busy-waits on the UART's line-status bit. This is a
//! debug-only path: it bypasses the ASL/device-semaphore protocol entirely
//! (kernel log lines are not process I/O), exactly as a teaching kernel's
//! `termPrint` utility would.

use crate::hal::state::STATUS_READY;
use lazy_static::lazy_static;
use spin::Mutex;

pub struct DebugTerminal {
    device_index: usize,
}

impl DebugTerminal {
    const fn new(device_index: usize) -> Self {
        DebugTerminal { device_index }
    }

    fn send(&mut self, byte: u8) {
        unsafe {
            let area = crate::hal::devreg_area();
            let reg = &mut area.devreg[self.device_index];
            while reg.transmit_status() & 0xFF != STATUS_READY {}
            reg.set_transmit_command(0x0200 | byte as u32);
        }
    }
}

impl core::fmt::Write for DebugTerminal {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.send(byte);
        }
        Ok(())
    }
}

lazy_static! {
    pub static ref DEBUG_TERM: Mutex<DebugTerminal> = Mutex::new(DebugTerminal::new(0));
}

#[doc(hidden)]
pub fn _print(args: ::core::fmt::Arguments) {
    use core::fmt::Write;
    let _ = DEBUG_TERM.lock().write_fmt(args);
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!("[INFO] "));
        $crate::serial::_print(format_args!($($arg)*));
        $crate::serial::_print(format_args!("\n"));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!("[WARN] "));
        $crate::serial::_print(format_args!($($arg)*));
        $crate::serial::_print(format_args!("\n"));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!("[ERROR] "));
        $crate::serial::_print(format_args!($($arg)*));
        $crate::serial::_print(format_args!("\n"));
    };
}

pub fn init() {
    let _ = DEBUG_TERM.lock();
}
