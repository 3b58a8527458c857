//! The nucleus's single block of mutable global state: the PCB pool, the
//! ASL, the ready queue, the running process, and the device-semaphore
//! table. Every handler threads through this one value, the same way the
//! teacher's scheduler threads everything through one `Mutex<Scheduler>`
//! singleton rather than scattering statics.

use crate::asl::Asl;
use crate::config::DEVICE_SEMAPHORES;
use crate::pcb::{PcbIndex, PcbPool};

pub struct Nucleus {
    pub pcbs: PcbPool,
    pub asl: Asl,

    /// Number of PCBs that exist, whether ready, running, or blocked.
    pub process_count: u32,
    /// Number of PCBs blocked specifically on a device or the pseudo-clock,
    /// as opposed to blocked on a process-private semaphore.
    pub soft_blocked_count: u32,

    ready_queue: Option<PcbIndex>,
    pub current: Option<PcbIndex>,

    /// One signed counter per device-semaphore slot (terminal write slots
    /// occupy the second bank of 8, the pseudo-clock occupies the last).
    /// Negative values are the negated count of processes blocked on that
    /// device, mirroring the source's `softBlockCount`-by-convention
    /// semaphore encoding.
    pub device_sem: [i32; DEVICE_SEMAPHORES],

    /// TOD reading at the moment `current` was dispatched; the delta from
    /// this to "now" is what gets charged to `current.cpu_time` on the next
    /// context switch or SYS6 query.
    pub start_tod: u32,
}

impl Nucleus {
    pub const fn new() -> Self {
        Nucleus {
            pcbs: PcbPool::new(),
            asl: Asl::new(),
            process_count: 0,
            soft_blocked_count: 0,
            ready_queue: None,
            current: None,
            device_sem: [0; DEVICE_SEMAPHORES],
            start_tod: 0,
        }
    }

    pub fn init(&mut self) {
        self.pcbs.init();
        self.asl.init();
        self.process_count = 0;
        self.soft_blocked_count = 0;
        self.ready_queue = None;
        self.current = None;
        self.device_sem = [0; DEVICE_SEMAPHORES];
        self.start_tod = 0;
    }

    pub fn ready_enqueue(&mut self, p: PcbIndex) {
        self.pcbs.queue_insert_tail(&mut self.ready_queue, p);
    }

    pub fn ready_dequeue(&mut self) -> Option<PcbIndex> {
        self.pcbs.queue_remove_head(&mut self.ready_queue)
    }

    pub fn ready_is_empty(&self) -> bool {
        PcbPool::queue_is_empty(self.ready_queue)
    }

    /// Removes `p` from the ready queue if it happens to be sitting there.
    pub fn ready_remove(&mut self, p: PcbIndex) -> Option<PcbIndex> {
        self.pcbs.queue_remove(&mut self.ready_queue, p)
    }

    /// The address-sized "key" a device or pseudo-clock semaphore is blocked
    /// on: the address of its own counter cell. Matches the source
    /// material's use of `&deviceSemaphores[i]` as the ASL key for I/O
    /// waits.
    pub fn device_sem_key(&mut self, index: usize) -> u32 {
        &mut self.device_sem[index] as *mut i32 as u32
    }

    /// True if `key` falls within the device-semaphore table's address
    /// range, mirroring the source material's `this_semaphore >=
    /// &deviceSemaphores[FIRSTDEVINDEX] && <= &deviceSemaphores[PCLOCKIDX]`
    /// check in `terminateProcess`.
    pub fn is_device_sem_key(&self, key: u32) -> bool {
        let base = &self.device_sem[0] as *const i32 as usize as u32;
        let span = (DEVICE_SEMAPHORES * core::mem::size_of::<i32>()) as u32;
        key >= base && key < base + span
    }
}

impl Default for Nucleus {
    fn default() -> Self {
        Self::new()
    }
}

/// The one nucleus instance. Unlike the teacher's `Mutex<Scheduler>`
/// singleton, this is not behind a lock: §5 is explicit that nucleus globals
/// "are accessed only from the nucleus path, which is single-threaded
/// relative to itself; no locks are required". A real lock would be actively
/// wrong here besides being unnecessary — the teacher's own context switch
/// (`scheduler::try_yield_now`) explicitly `drop(sched)`s its guard *before*
/// `switch_context`, because that primitive returns and the guard's drop
/// would otherwise run with the lock still meaningfully held across two
/// different tasks' stacks. The nucleus's equivalent primitives (`LDST`,
/// `LDCXT`, `HALT`, `WAIT`) never return at all, so a guard acquired before
/// one of them would simply never unlock, deadlocking the very next trap.
static mut NUCLEUS: Nucleus = Nucleus::new();

/// Access to the single nucleus instance.
///
/// # Safety
/// Must only be called from the nucleus's own trap entry points
/// (`boot::bootstrap` and the trampolines it installs). The entire path from
/// trap entry to the next state-load or wait-for-interrupt runs with
/// interrupts masked by the trap-entry status word (§5), so at most one
/// caller is ever live at a time; nothing outside the nucleus can reach this
/// function.
pub unsafe fn nucleus() -> &'static mut Nucleus {
    &mut *core::ptr::addr_of_mut!(NUCLEUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_queue_is_fifo() {
        let mut n = Nucleus::new();
        n.init();
        let a = n.pcbs.alloc().unwrap();
        let b = n.pcbs.alloc().unwrap();
        n.ready_enqueue(a);
        n.ready_enqueue(b);
        assert_eq!(n.ready_dequeue(), Some(a));
        assert_eq!(n.ready_dequeue(), Some(b));
        assert!(n.ready_is_empty());
    }
}
