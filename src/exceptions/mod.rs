//! The exception dispatcher (C5): decodes `Cause.ExcCode` from the saved
//! state at the BIOS data page and routes to the interrupt dispatcher, the
//! SYSCALL handlers, or pass-up-or-die, exactly as the single general
//! exception vector does in the source material.

pub mod syscalls;

use crate::config::{GENERAL_EXCEPT, PAGE_FAULT_EXCEPT};
use crate::hal;
use crate::hal::state::SupportStruct;
use crate::nucleus_state::Nucleus;
use crate::pcb::PcbIndex;
use crate::sched;

/// MIPS `Cause.ExcCode` boundaries: 0 is reserved for interrupts, 1..=3 are
/// the TLB exceptions, 8 is SYSCALL. Everything else is a program trap.
const EXC_INTERRUPT: u32 = 0;
const EXC_TLB_MOD: u32 = 1;
const EXC_TLB_LOAD: u32 = 2;
const EXC_TLB_STORE: u32 = 3;
const EXC_SYSCALL: u32 = 8;

/// Single entry point for the general exception vector. Never returns.
pub fn exception_handler(nucleus: &mut Nucleus) -> ! {
    let code = unsafe { hal::bios_data_page() }.exc_code();
    match code {
        EXC_INTERRUPT => crate::interrupts::interrupt_handler(nucleus),
        EXC_TLB_MOD | EXC_TLB_LOAD | EXC_TLB_STORE => tlb_trap_handler(nucleus),
        EXC_SYSCALL => syscalls::sys_trap_handler(nucleus),
        _ => program_trap_handler(nucleus),
    }
}

fn tlb_trap_handler(nucleus: &mut Nucleus) -> ! {
    pass_up_or_die(nucleus, PAGE_FAULT_EXCEPT)
}

fn program_trap_handler(nucleus: &mut Nucleus) -> ! {
    pass_up_or_die(nucleus, GENERAL_EXCEPT)
}

/// If the current process registered a support structure, copies the saved
/// state into its `except_state[kind]` slot and resumes it at
/// `except_context[kind]` via `LDCXT`. Otherwise the process (and all of its
/// descendants) dies: this is SYS2 termination applied to the current
/// process, followed by a fresh dispatch.
pub fn pass_up_or_die(nucleus: &mut Nucleus, kind: usize) -> ! {
    let curr = nucleus
        .current
        .expect("pass-up-or-die with no current process");
    let support_addr = nucleus.pcbs.get(curr).support;
    match support_addr {
        Some(addr) => {
            let saved = unsafe { hal::bios_data_page() };
            let support = unsafe { &mut *(addr as *mut SupportStruct) };
            support.except_state[kind].copy_from(saved);
            sched::charge_cpu_time(nucleus);
            let ctx = support.except_context[kind];
            hal::load_context(&ctx)
        }
        None => {
            terminate_process(nucleus, curr);
            nucleus.current = None;
            sched::dispatch(nucleus)
        }
    }
}

/// Recursively tears down `p` and every descendant: detaches each from its
/// parent, removes it from wherever it is linked (the ready queue, an ASL
/// wait queue, or nowhere if it is the running process), releases a waiting
/// semaphore or the soft-blocked count as appropriate, and returns the PCB
/// to the pool. Does not touch `nucleus.current` — callers update that
/// themselves once the target process is known to be gone.
pub(crate) fn terminate_process(nucleus: &mut Nucleus, p: PcbIndex) {
    while let Some(child) = nucleus.pcbs.remove_first_child(p) {
        terminate_process(nucleus, child);
    }
    nucleus.pcbs.detach(p);

    if nucleus.current != Some(p) {
        if let Some(key) = nucleus.pcbs.get(p).wait_key {
            nucleus.asl.out_blocked(&mut nucleus.pcbs, p);
            if nucleus.is_device_sem_key(key) {
                nucleus.soft_blocked_count -= 1;
            } else {
                unsafe {
                    *(key as *mut i32) += 1;
                }
            }
        } else {
            nucleus.ready_remove(p);
        }
    }

    nucleus.pcbs.free(p);
    nucleus.process_count -= 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nucleus_state::Nucleus;

    fn fresh() -> Nucleus {
        let mut n = Nucleus::new();
        n.init();
        n
    }

    /// Property 7: SYS2 on a process with n descendants removes exactly
    /// n+1 PCBs and decrements `process_count` by n+1.
    fn terminate_and_assert_removed(n: &mut Nucleus, root: crate::pcb::PcbIndex, removed: u32) {
        let before = n.process_count;
        terminate_process(n, root);
        assert_eq!(n.process_count, before - removed);
    }

    #[test]
    fn terminate_childless_current_just_frees() {
        let mut n = fresh();
        let p = n.pcbs.alloc().unwrap();
        n.process_count = 1;
        n.current = Some(p);
        terminate_and_assert_removed(&mut n, p, 1);
        assert!(n.pcbs.alloc().is_ok());
    }

    #[test]
    fn terminate_recursively_removes_whole_subtree() {
        let mut n = fresh();
        let root = n.pcbs.alloc().unwrap();
        let c1 = n.pcbs.alloc().unwrap();
        let c2 = n.pcbs.alloc().unwrap();
        let gc = n.pcbs.alloc().unwrap();
        n.pcbs.insert_child(root, c1);
        n.pcbs.insert_child(root, c2);
        n.pcbs.insert_child(c1, gc);
        n.process_count = 4;
        n.current = Some(root);
        terminate_and_assert_removed(&mut n, root, 4);
        // All four descriptors must be back in the pool.
        for _ in 0..4 {
            assert!(n.pcbs.alloc().is_ok());
        }
    }

    #[test]
    fn terminate_ready_process_removes_from_ready_queue() {
        let mut n = fresh();
        let a = n.pcbs.alloc().unwrap();
        let b = n.pcbs.alloc().unwrap();
        n.ready_enqueue(a);
        n.ready_enqueue(b);
        n.process_count = 2;
        terminate_and_assert_removed(&mut n, a, 1);
        assert_eq!(n.ready_dequeue(), Some(b));
        assert!(n.ready_is_empty());
    }

    #[test]
    fn terminate_blocked_on_device_key_decrements_soft_blocked() {
        let mut n = fresh();
        let p = n.pcbs.alloc().unwrap();
        n.process_count = 1;
        n.soft_blocked_count = 1;
        let key = n.device_sem_key(0);
        n.device_sem[0] = -1;
        n.asl.insert_blocked(&mut n.pcbs, key, p).unwrap();
        terminate_and_assert_removed(&mut n, p, 1);
        assert_eq!(n.soft_blocked_count, 0);
    }

    #[test]
    fn terminate_blocked_on_user_semaphore_increments_it() {
        let mut n = fresh();
        let p = n.pcbs.alloc().unwrap();
        n.process_count = 1;
        let mut sem: i32 = -1;
        let key = &mut sem as *mut i32 as u32;
        n.asl.insert_blocked(&mut n.pcbs, key, p).unwrap();
        terminate_and_assert_removed(&mut n, p, 1);
        assert_eq!(sem, 0);
    }
}
