//! SYS1 through SYS8: the nucleus's supervisor calls.
//!
//! Entered only from `sys_trap_handler`, which has already verified the
//! call came from kernel mode and carries a number in 1..=8, and has copied
//! the saved state into the current process's PCB. Every handler below ends
//! by diverging: into `sched::resume_current` (the call didn't give up the
//! CPU), `sched::dispatch` (it did), or, for SYS1, by falling through to
//! `resume_current` after either outcome.

use crate::config::{
    BASE_DEVICE_LINE, PSEUDO_CLOCK_INDEX, SYS1_CREATE, SYS2_TERMINATE, SYS3_P, SYS4_V,
    SYS5_WAIT_IO, SYS6_CPU_TIME, SYS7_WAIT_CLOCK, SYS8_SUPPORT, TERMINAL_LINE,
};
use crate::hal;
use crate::hal::state::ExceptionState;
use crate::nucleus_state::Nucleus;
use crate::sched;

const SUCCESS: u32 = 0;
const ERROR: u32 = u32::MAX; // -1, reinterpreted

/// Entry point for `Cause.ExcCode == 8`. Advances the saved PC past the
/// SYSCALL instruction, rejects a privileged call from user mode (rewritten
/// to a reserved-instruction program trap) and an out-of-range call number
/// (treated the same way), then dispatches on the number in `a0`.
pub fn sys_trap_handler(nucleus: &mut Nucleus) -> ! {
    let saved = unsafe { hal::bios_data_page() };
    saved.pc = saved.pc.wrapping_add(4);

    if saved.was_user_mode() {
        saved.set_exc_code(crate::config::CAUSE_RESERVED_INSTRUCTION);
        return super::program_trap_handler(nucleus);
    }

    let sys_num = saved.a0();
    if !(SYS1_CREATE..=SYS8_SUPPORT).contains(&sys_num) {
        return super::program_trap_handler(nucleus);
    }

    let curr = nucleus
        .current
        .expect("syscall trap with no current process");
    nucleus.pcbs.get_mut(curr).state.copy_from(saved);
    let args = nucleus.pcbs.get(curr).state;

    match sys_num {
        SYS1_CREATE => sys1_create(nucleus, args.a1(), args.a2()),
        SYS2_TERMINATE => sys2_terminate(nucleus),
        SYS3_P => sys3_passeren(nucleus, args.a1()),
        SYS4_V => sys4_verhogen(nucleus, args.a1()),
        SYS5_WAIT_IO => sys5_wait_for_io(nucleus, args.a1(), args.a2(), args.a3()),
        SYS6_CPU_TIME => sys6_cpu_time(nucleus),
        SYS7_WAIT_CLOCK => sys7_wait_for_clock(nucleus),
        SYS8_SUPPORT => sys8_get_support_data(nucleus),
        _ => unreachable!("sys_num checked against SYS1_CREATE..=SYS8_SUPPORT above"),
    }
}

/// Allocates a new process from the state and (optional) support-struct
/// address in `a1`/`a2`, makes it a child of the current process, and
/// enqueues it ready. `v0` is `SUCCESS` or `ERROR`, and the current process
/// always resumes — the new child simply waits its turn in the ready queue.
fn sys1_create(nucleus: &mut Nucleus, state_addr: u32, support_addr: u32) -> ! {
    let curr = nucleus.current.unwrap();
    let result = nucleus.pcbs.alloc();
    match result {
        Ok(child) => {
            let initial_state = unsafe { &*(state_addr as *const ExceptionState) };
            nucleus.pcbs.get_mut(child).state.copy_from(initial_state);
            nucleus.pcbs.get_mut(child).support = if support_addr == 0 {
                None
            } else {
                Some(support_addr)
            };
            nucleus.pcbs.insert_child(curr, child);
            nucleus.ready_enqueue(child);
            nucleus.process_count += 1;
            nucleus.pcbs.get_mut(curr).state.set_v0(SUCCESS);
        }
        Err(_) => {
            nucleus.pcbs.get_mut(curr).state.set_v0(ERROR);
        }
    }
    sched::resume_current(nucleus)
}

/// Terminates the current process and every descendant, then dispatches
/// whatever is ready next. Never returns to the caller.
fn sys2_terminate(nucleus: &mut Nucleus) -> ! {
    let curr = nucleus.current.unwrap();
    super::terminate_process(nucleus, curr);
    nucleus.current = None;
    sched::dispatch(nucleus)
}

/// `P(semaphore)`: the semaphore address in `a1` is an opaque, address-sized
/// key into arbitrary process or kernel memory; the nucleus only ever
/// dereferences it as the `int` the source material treats it as.
fn sys3_passeren(nucleus: &mut Nucleus, sem_key: u32) -> ! {
    let value = unsafe {
        let cell = sem_key as *mut i32;
        *cell -= 1;
        *cell
    };
    if value < 0 {
        let curr = nucleus.current.take().unwrap();
        sched::charge_cpu_time(nucleus);
        nucleus
            .asl
            .insert_blocked(&mut nucleus.pcbs, sem_key, curr)
            .expect("ASL descriptor pool exhausted");
        sched::dispatch(nucleus)
    } else {
        sched::resume_current(nucleus)
    }
}

/// `V(semaphore)`: wakes the head of the semaphore's wait queue, if any.
fn sys4_verhogen(nucleus: &mut Nucleus, sem_key: u32) -> ! {
    let value = unsafe {
        let cell = sem_key as *mut i32;
        *cell += 1;
        *cell
    };
    if value <= 0 {
        if let Some(p) = nucleus.asl.remove_blocked(&mut nucleus.pcbs, sem_key) {
            nucleus.ready_enqueue(p);
        }
    }
    sched::resume_current(nucleus)
}

/// Blocks on the device-semaphore slot named by `(line, device, read)`,
/// applying the terminal write-subdevice offset from §4.4. The read flag is
/// only meaningful on the terminal line (see Open Questions): lines 3..=6
/// ignore it, matching the source material.
fn sys5_wait_for_io(nucleus: &mut Nucleus, line: u32, device: u32, wait_for_read: u32) -> ! {
    let mut index = ((line - BASE_DEVICE_LINE) * crate::config::DEVICES_PER_LINE as u32
        + device) as usize;
    if line == TERMINAL_LINE && wait_for_read == 0 {
        index += crate::config::DEVICES_PER_LINE;
    }

    nucleus.device_sem[index] -= 1;

    if nucleus.device_sem[index] < 0 {
        nucleus.soft_blocked_count += 1;
        let curr = nucleus.current.take().unwrap();
        sched::charge_cpu_time(nucleus);
        let key = nucleus.device_sem_key(index);
        nucleus
            .asl
            .insert_blocked(&mut nucleus.pcbs, key, curr)
            .expect("ASL descriptor pool exhausted");
        sched::dispatch(nucleus)
    } else {
        sched::resume_current(nucleus)
    }
}

/// Places the current process's total accumulated CPU time (including the
/// still-running slice, charged just now) in `v0`.
fn sys6_cpu_time(nucleus: &mut Nucleus) -> ! {
    sched::charge_cpu_time(nucleus);
    let curr = nucleus.current.unwrap();
    let total = nucleus.pcbs.get(curr).cpu_time;
    nucleus.pcbs.get_mut(curr).state.set_v0(total);
    sched::resume_current(nucleus)
}

/// Blocks on the pseudo-clock semaphore; the only caller of `V` on this
/// semaphore is the interval-timer interrupt handler, which drains every
/// waiter at once.
fn sys7_wait_for_clock(nucleus: &mut Nucleus) -> ! {
    nucleus.device_sem[PSEUDO_CLOCK_INDEX] -= 1;

    if nucleus.device_sem[PSEUDO_CLOCK_INDEX] < 0 {
        nucleus.soft_blocked_count += 1;
        let curr = nucleus.current.take().unwrap();
        sched::charge_cpu_time(nucleus);
        let key = nucleus.device_sem_key(PSEUDO_CLOCK_INDEX);
        nucleus
            .asl
            .insert_blocked(&mut nucleus.pcbs, key, curr)
            .expect("ASL descriptor pool exhausted");
        sched::dispatch(nucleus)
    } else {
        sched::resume_current(nucleus)
    }
}

/// Places the current process's (possibly null) support-struct address in
/// `v0`.
fn sys8_get_support_data(nucleus: &mut Nucleus) -> ! {
    let curr = nucleus.current.unwrap();
    let support = nucleus.pcbs.get(curr).support.unwrap_or(0);
    nucleus.pcbs.get_mut(curr).state.set_v0(support);
    sched::resume_current(nucleus)
}
