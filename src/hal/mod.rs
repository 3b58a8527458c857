//! Hardware access layer: the fixed physical addresses and primitive
//! instructions the CPU/board contract (§6) exposes. Expressed as free
//! functions over known addresses rather than a trait object, since there is
//! exactly one hardware target — the teacher reaches for direct MMIO/port
//! access the same way (`x86_64::instructions::port::Port`) instead of an
//! abstracted driver trait for its serial backend.

pub mod state;

use state::{DeviceRegisterArea, ExceptionState};

/// Physical base address of the device-register area (bus info, interrupt
/// bitmaps, device register quads).
pub const RAMBASEADDR: usize = 0x1000_0000;

/// Physical address of the BIOS data page: where the CPU deposits the
/// architectural state snapshot on every trap and interrupt.
pub const BIOS_DATA_PAGE: usize = 0x0FFF_F000;

/// Physical address of the pass-up vector the bootstrap populates.
pub const PASSUP_VECTOR: usize = 0x0FFF_F900;

/// The pass-up vector: entry points and kernel-stack tops the CPU consults
/// on TLB-refill and general-exception traps.
#[repr(C)]
pub struct PassUpVector {
    pub tlb_refill_handler: u32,
    pub tlb_refill_stack_ptr: u32,
    pub exception_handler: u32,
    pub exception_stack_ptr: u32,
}

/// Returns a mutable reference to the BIOS data page, reinterpreted as an
/// `ExceptionState`. Always the same fixed address — the nucleus never
/// caches this pointer across calls, it re-derives it on every trap entry
/// exactly as the source material re-assigns `savedExceptionState` each
/// time.
///
/// # Safety
/// Caller must not alias this with another live reference; the nucleus
/// holds at most one at a time, for the duration of a single trap.
pub unsafe fn bios_data_page() -> &'static mut ExceptionState {
    &mut *(BIOS_DATA_PAGE as *mut ExceptionState)
}

/// Returns a reference to the device-register area.
///
/// # Safety
/// The area is genuinely `'static` MMIO; aliasing is only a concern for the
/// individual `Volatile` fields, which serialize through hardware, not Rust
/// borrow rules.
pub unsafe fn devreg_area() -> &'static mut DeviceRegisterArea {
    &mut *(RAMBASEADDR as *mut DeviceRegisterArea)
}

/// Installs the nucleus's own trap entries into the pass-up vector and
/// points both stack-pointer fields at the given kernel stack top. Called
/// once, from the bootstrap, before any process runs.
///
/// # Safety
/// Must run before interrupts/traps are enabled.
pub unsafe fn install_trap_vector(
    tlb_refill_handler: extern "C" fn() -> !,
    exception_handler: extern "C" fn() -> !,
    kernel_stack_top: u32,
) {
    let vector = &mut *(PASSUP_VECTOR as *mut PassUpVector);
    vector.tlb_refill_handler = tlb_refill_handler as usize as u32;
    vector.tlb_refill_stack_ptr = kernel_stack_top;
    vector.exception_handler = exception_handler as usize as u32;
    vector.exception_stack_ptr = kernel_stack_top;
}

/// Finds the lowest-numbered device with a pending interrupt bit on the
/// given line's bitmap. Returns `None` if the hardware fired a line with no
/// device actually pending (the "silently falls through" case of §4.5).
pub fn find_interrupt_device(line: u32) -> Option<usize> {
    arch::find_interrupt_device(line)
}

/// Timer (PLT) interface: countdown in TOD units, a countdown of 0 triggers
/// a line-1 interrupt.
pub mod timer {
    /// Arms the processor local timer with the given countdown.
    pub fn set(ticks: u32) {
        arch::set_timer(ticks);
    }

    /// Reads the remaining countdown on the processor local timer.
    pub fn get() -> u32 {
        arch::get_timer()
    }
}

/// Interval timer (pseudo-clock) interface: a single primitive, used only by
/// the interval-timer handler and at bootstrap.
pub mod interval_timer {
    pub fn set(period: u32) {
        super::arch::set_interval_timer(period);
    }
}

/// Monotonic TOD clock, divided by the board's time-scale to yield
/// microsecond-like ticks.
pub mod tod {
    pub fn read() -> u32 {
        super::arch::read_tod()
    }
}

/// Halts the machine cleanly (process_count reached 0).
pub fn halt() -> ! {
    arch::halt()
}

/// Halts the machine to signal an unrecoverable deadlock, distinguishable
/// in the board's panic signal from a clean halt.
pub fn panic_halt() -> ! {
    arch::panic_halt()
}

/// Enables interrupts and executes a wait-for-interrupt. Only ever called
/// from the idle path in `sched::dispatch`; control resumes in the
/// interrupt dispatcher.
pub fn wait_for_interrupt() {
    arch::wait()
}

/// Loads a saved processor state, transferring control to it. This is the
/// board's `LDST` primitive (see §6): it never returns to its caller.
pub fn load_state(state: &state::ExceptionState) -> ! {
    arch::load_state(state)
}

/// Loads a saved stack pointer/status/pc triple, transferring control to it
/// without restoring general-purpose registers. This is the board's
/// `LDCXT` primitive, used only when passing an exception up to a process's
/// support level.
pub fn load_context(ctx: &state::Context) -> ! {
    arch::load_context(ctx)
}

#[cfg(all(target_arch = "mips", not(feature = "std-test")))]
mod arch {
    use core::arch::asm;

    pub fn find_interrupt_device(line: u32) -> Option<usize> {
        let area = unsafe { super::devreg_area() };
        let bitmap = area.interrupt_dev[(line - crate::config::BASE_DEVICE_LINE) as usize].read();
        (0..crate::config::DEVICES_PER_LINE).find(|&dev| bitmap & (1 << dev) != 0)
    }

    pub fn set_interval_timer(period: u32) {
        unsafe {
            let area = super::devreg_area();
            area.interval_timer.write(period * area.time_scale);
        }
    }

    pub fn read_tod() -> u32 {
        unsafe {
            let area = super::devreg_area();
            area.tod_lo.read() / area.time_scale
        }
    }

    pub fn set_timer(ticks: u32) {
        unsafe {
            let area = super::devreg_area();
            let _ = area;
            asm!("mtc0 {0}, $11", in(reg) ticks, options(nomem, nostack));
        }
    }

    pub fn get_timer() -> u32 {
        let ticks: u32;
        unsafe {
            asm!("mfc0 {0}, $11", out(reg) ticks, options(nomem, nostack));
        }
        ticks
    }

    pub fn halt() -> ! {
        unsafe {
            asm!("li $a0, 0", "syscall", options(noreturn));
        }
    }

    pub fn panic_halt() -> ! {
        unsafe {
            asm!("li $a0, 1", "syscall", options(noreturn));
        }
    }

    pub fn wait() {
        unsafe {
            asm!("wait", options(nomem, nostack));
        }
    }

    pub fn load_state(state: &super::state::ExceptionState) -> ! {
        unsafe {
            asm!("ldst $a0", in("$4") state as *const _ as u32, options(noreturn));
        }
    }

    pub fn load_context(ctx: &super::state::Context) -> ! {
        unsafe {
            asm!("ldcxt $a0", in("$4") ctx as *const _ as u32, options(noreturn));
        }
    }
}

/// Host-side stand-in for the hardware primitives above, used so the
/// architecture-independent unit tests (pcb/asl/sched decision logic) link
/// and run under `cfg(test)` on the developer's machine without a simulator.
/// `read_tod`/`find_interrupt_device` return deterministic values the decision
/// logic can assert against; the rest exist only to satisfy the linker and
/// are never reached by a test (calling `load_state`/`halt`/`wait` would
/// hang, since they loop forever here exactly as their real counterparts
/// never return).
#[cfg(any(not(target_arch = "mips"), feature = "std-test"))]
mod arch {
    /// No simulated device bitmap exists on the host; a line fires with no
    /// device pending, exercising the same "silently falls through" path
    /// §4.5 describes for real hardware noise.
    pub fn find_interrupt_device(_line: u32) -> Option<usize> {
        None
    }

    pub fn set_interval_timer(_period: u32) {}

    /// The host has no real TOD register; always reads as 0, so accounting
    /// tests exercise the read-subtract-add-reset path with a known,
    /// deterministic elapsed time of 0.
    pub fn read_tod() -> u32 {
        0
    }

    pub fn set_timer(_ticks: u32) {}
    pub fn get_timer() -> u32 {
        0
    }
    pub fn halt() -> ! {
        loop {}
    }
    pub fn panic_halt() -> ! {
        loop {}
    }
    pub fn wait() {}
    pub fn load_state(_state: &super::state::ExceptionState) -> ! {
        loop {}
    }
    pub fn load_context(_ctx: &super::state::Context) -> ! {
        loop {}
    }
}
