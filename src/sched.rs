//! The scheduler (C4): dispatch policy and the CPU-time accounting shared by
//! every path that can hand the CPU to a different process.
//!
//! Mirrors the source material's `scheduler()`/`switchContext` pair: pop the
//! ready queue, arm the timer, `LDST` into the winner; failing that, halt,
//! idle-wait, or declare deadlock depending on `process_count` and
//! `soft_blocked_count`.

use crate::config::{INFINITE_TIMER, TIME_SLICE};
use crate::hal;
use crate::nucleus_state::Nucleus;
use crate::{log_error, log_info};

/// Charges the elapsed time since `start_tod` to the currently running
/// process, then resets `start_tod` to now. Called from every path that
/// either hands off the CPU (PLT expiry, a blocking syscall) or merely
/// needs an up-to-date reading without giving up the CPU (SYS6).
pub fn charge_cpu_time(nucleus: &mut Nucleus) {
    charge_cpu_time_until(nucleus, hal::tod::read());
}

/// Charges the elapsed time since `start_tod` up to `until`, rather than
/// "now", to the currently running process. Used by the device-interrupt
/// path: the interval between the interrupt's entry TOD and "now" is already
/// credited to the process the interrupt unblocked, so charging `current` to
/// "now" as well would double-count it.
pub fn charge_cpu_time_until(nucleus: &mut Nucleus, until: u32) {
    if let Some(curr) = nucleus.current {
        let elapsed = until.wrapping_sub(nucleus.start_tod);
        let pcb = nucleus.pcbs.get_mut(curr);
        pcb.cpu_time = pcb.cpu_time.wrapping_add(elapsed);
        nucleus.start_tod = until;
    }
}

/// Pops the next ready process and transfers control to it, or idles/halts
/// according to the policy in §5: halt if no process remains at all, wait
/// for an interrupt if some process is soft-blocked, otherwise deadlock.
/// Never returns.
pub fn dispatch(nucleus: &mut Nucleus) -> ! {
    if let Some(p) = nucleus.ready_dequeue() {
        nucleus.current = Some(p);
        nucleus.start_tod = hal::tod::read();
        hal::timer::set(TIME_SLICE);
        let state = nucleus.pcbs.get(p).state;
        hal::load_state(&state)
    }

    nucleus.current = None;

    if nucleus.process_count == 0 {
        log_info!("process count reached zero, halting");
        hal::halt();
    }

    if nucleus.soft_blocked_count == 0 {
        log_error!("deadlock: ready queue empty, no soft-blocked process, {} process(es) remain", nucleus.process_count);
        hal::panic_halt();
    }

    hal::timer::set(INFINITE_TIMER);
    loop {
        hal::wait_for_interrupt();
    }
}

/// Charges the elapsed slice to the current process and resumes it in
/// place, without touching the ready queue or the timer. The common tail of
/// every non-blocking syscall handler.
pub fn resume_current(nucleus: &mut Nucleus) -> ! {
    charge_cpu_time(nucleus);
    let curr = nucleus
        .current
        .expect("resume_current with no current process");
    let state = nucleus.pcbs.get(curr).state;
    hal::load_state(&state)
}

/// Returns the running process (if any) to the tail of the ready queue.
/// Used by the PLT handler before re-entering `dispatch`.
pub fn requeue_current(nucleus: &mut Nucleus) {
    if let Some(curr) = nucleus.current.take() {
        nucleus.ready_enqueue(curr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_cpu_time_is_noop_with_no_current() {
        let mut n = Nucleus::new();
        n.init();
        charge_cpu_time(&mut n);
        assert_eq!(n.current, None);
    }

    #[test]
    fn charge_cpu_time_accumulates_against_current() {
        let mut n = Nucleus::new();
        n.init();
        let p = n.pcbs.alloc().unwrap();
        n.current = Some(p);
        n.start_tod = 0;
        charge_cpu_time(&mut n);
        // Host stand-in TOD always reads 0, so elapsed is 0 here; the
        // accounting path itself (read-subtract-add-reset) is what's under
        // test, exercised further by the interrupt/PLT integration tests.
        assert_eq!(n.pcbs.get(p).cpu_time, 0);
    }

    #[test]
    fn requeue_current_clears_current_and_enqueues() {
        let mut n = Nucleus::new();
        n.init();
        let p = n.pcbs.alloc().unwrap();
        n.current = Some(p);
        requeue_current(&mut n);
        assert_eq!(n.current, None);
        assert_eq!(n.ready_dequeue(), Some(p));
    }
}
