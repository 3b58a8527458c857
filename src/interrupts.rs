//! The interrupt dispatcher (C6): priority-ordered handling of pending
//! interrupt lines once `exceptions::exception_handler` has routed
//! `Cause.ExcCode == 0` here. Line 1 (the processor local timer) outranks
//! line 2 (the interval timer / pseudo-clock), which outranks the device
//! lines 3..=7 in ascending order, matching `interruptTrapHandler`'s
//! priority scan.

use crate::config::{
    BASE_DEVICE_LINE, DEVICES_PER_LINE, MAX_DEVICE_LINE, PSEUDO_CLOCK_INDEX,
    PSEUDO_CLOCK_INTERVAL, TERMINAL_LINE, TIME_SLICE,
};
use crate::hal;
use crate::hal::state::{CMD_ACK, STATUS_READY};
use crate::nucleus_state::Nucleus;
use crate::sched;

const LINE_PLT: u32 = 1;
const LINE_INTERVAL_TIMER: u32 = 2;

/// Single entry point, reached with `Cause.ExcCode == 0`. Never returns.
/// Snapshots the TOD and the processor local timer's remaining countdown
/// once, at entry, before any handler below has a chance to disturb either
/// — both are needed to correctly charge and restore whichever process was
/// running when the interrupt landed.
pub fn interrupt_handler(nucleus: &mut Nucleus) -> ! {
    let entry_tod = hal::tod::read();
    let remaining = hal::timer::get();
    let pending = unsafe { hal::bios_data_page() }.pending_lines();

    if pending & (1 << LINE_PLT) != 0 {
        return plt_handler(nucleus);
    }
    if pending & (1 << LINE_INTERVAL_TIMER) != 0 {
        return interval_timer_handler(nucleus, remaining);
    }
    for line in BASE_DEVICE_LINE..=MAX_DEVICE_LINE {
        if pending & (1 << line) != 0 {
            return device_handler(nucleus, line, entry_tod, remaining);
        }
    }
    // A line fired with nothing actually pending by the time we looked: no
    // work to do, just reschedule.
    resume_current_or_dispatch(nucleus)
}

/// The process local timer expired: the running process used its whole
/// slice. Save its state, charge the full slice, put it back on the ready
/// queue, and let the scheduler pick whoever's next.
fn plt_handler(nucleus: &mut Nucleus) -> ! {
    hal::timer::set(TIME_SLICE);
    if let Some(curr) = nucleus.current {
        let saved = unsafe { hal::bios_data_page() };
        nucleus.pcbs.get_mut(curr).state.copy_from(saved);
        sched::charge_cpu_time(nucleus);
        sched::requeue_current(nucleus);
    }
    sched::dispatch(nucleus)
}

/// The pseudo-clock ticked: reload it, release every process waiting on it,
/// and reset its semaphore to zero (it is not a counting semaphore in the
/// usual sense — the interval timer is the only source of `V`s on it). The
/// process that was running when the tick landed, if any, resumes from the
/// state the CPU deposited at the BIOS data page — not its stale PCB-stored
/// state — with its remaining preemption slice restored.
fn interval_timer_handler(nucleus: &mut Nucleus, remaining: u32) -> ! {
    hal::interval_timer::set(PSEUDO_CLOCK_INTERVAL);

    let key = nucleus.device_sem_key(PSEUDO_CLOCK_INDEX);
    loop {
        match nucleus.asl.remove_blocked(&mut nucleus.pcbs, key) {
            Some(p) => {
                nucleus.ready_enqueue(p);
                nucleus.soft_blocked_count -= 1;
            }
            None => break,
        }
    }
    nucleus.device_sem[PSEUDO_CLOCK_INDEX] = 0;

    if let Some(curr) = nucleus.current {
        let saved = unsafe { hal::bios_data_page() };
        nucleus.pcbs.get_mut(curr).state.copy_from(saved);
        sched::charge_cpu_time(nucleus);
        hal::timer::set(remaining);
        let state = nucleus.pcbs.get(curr).state;
        hal::load_state(&state)
    }
    sched::dispatch(nucleus)
}

/// A device on `line` raised an interrupt: find which one, acknowledge it,
/// wake whoever was waiting on its semaphore (crediting the interrupt's
/// handling time to them), and resume whatever was running with its timer
/// budget undisturbed.
fn device_handler(nucleus: &mut Nucleus, line: u32, entry_tod: u32, remaining: u32) -> ! {
    let Some(device) = hal::find_interrupt_device(line) else {
        // The line's pending bit was set but no device on it actually has
        // one raised by the time we looked: nothing to acknowledge, nothing
        // to unblock (§4.5, "silently falls through to dispatch()").
        return resume_current_or_dispatch(nucleus);
    };
    let mut index = ((line - BASE_DEVICE_LINE) as usize) * DEVICES_PER_LINE + device;

    let status = unsafe {
        let area = hal::devreg_area();
        let reg = &mut area.devreg[index];
        if line == TERMINAL_LINE && reg.transmit_status() & 0xFF != STATUS_READY {
            index += DEVICES_PER_LINE;
            let status = reg.transmit_status();
            reg.set_transmit_command(CMD_ACK);
            status
        } else {
            let status = reg.recv_status();
            reg.set_recv_command(CMD_ACK);
            status
        }
    };

    nucleus.device_sem[index] += 1;
    let key = nucleus.device_sem_key(index);
    if let Some(p) = nucleus.asl.remove_blocked(&mut nucleus.pcbs, key) {
        let now = hal::tod::read();
        let pcb = nucleus.pcbs.get_mut(p);
        pcb.state.set_v0(status);
        pcb.cpu_time = pcb.cpu_time.wrapping_add(now.wrapping_sub(entry_tod));
        nucleus.ready_enqueue(p);
        nucleus.soft_blocked_count -= 1;
    }

    if let Some(curr) = nucleus.current {
        let saved = unsafe { hal::bios_data_page() };
        nucleus.pcbs.get_mut(curr).state.copy_from(saved);
        // Charge current only up to the interrupt's entry TOD, not to now:
        // the interval from entry_tod to now was just credited above to
        // whichever process this interrupt unblocked, and charging it here
        // too would double-count it.
        sched::charge_cpu_time_until(nucleus, entry_tod);
        hal::timer::set(remaining);
        let state = nucleus.pcbs.get(curr).state;
        hal::load_state(&state)
    }
    sched::dispatch(nucleus)
}

fn resume_current_or_dispatch(nucleus: &mut Nucleus) -> ! {
    if nucleus.current.is_some() {
        sched::resume_current(nucleus)
    } else {
        sched::dispatch(nucleus)
    }
}
