//! Bootstrap: brings up every nucleus subsystem, installs the trap vector,
//! creates the first process (P0), and enters the scheduler. Runs once,
//! from `lib.rs`'s entry point, and never returns.

use crate::config::{BOOT_PROC_ENTRY, BOOT_PROC_STACK_TOP, KERNEL_STACK_TOP, PSEUDO_CLOCK_INTERVAL};
use crate::hal;
use crate::hal::state::status_bits;
use crate::nucleus_state;
use crate::{exceptions, log_info, sched};

pub fn bootstrap() -> ! {
    crate::serial::init();
    log_info!("nucleus bootstrap starting");

    let nucleus = unsafe { nucleus_state::nucleus() };
    nucleus.init();

    unsafe {
        hal::install_trap_vector(tlb_refill_trampoline, exception_trampoline, KERNEL_STACK_TOP);
    }

    let p0 = nucleus
        .pcbs
        .alloc()
        .expect("a freshly initialized pool always has room for P0");
    {
        let pcb = nucleus.pcbs.get_mut(p0);
        pcb.state.pc = BOOT_PROC_ENTRY;
        pcb.state.regs[crate::config::REG_SP] = BOOT_PROC_STACK_TOP;
        pcb.state.status =
            status_bits::IEP_ON | status_bits::INTERRUPT_MASK_ALL | status_bits::PLT_ON;
    }
    nucleus.process_count = 1;
    nucleus.ready_enqueue(p0);

    hal::interval_timer::set(PSEUDO_CLOCK_INTERVAL);
    log_info!("P0 created, entering scheduler");

    sched::dispatch(nucleus)
}

extern "C" fn tlb_refill_trampoline() -> ! {
    let nucleus = unsafe { nucleus_state::nucleus() };
    exceptions::exception_handler(nucleus)
}

extern "C" fn exception_trampoline() -> ! {
    let nucleus = unsafe { nucleus_state::nucleus() };
    exceptions::exception_handler(nucleus)
}
