//! The active-semaphore list: a sorted singly-linked index from
//! synchronization address to a FIFO of blocked PCBs.
//!
//! Two sentinel entries, keys `0` and `MAX_KEY`, bracket the list and are
//! never removed (I-A1: keys strictly increasing along `next`). A traversal
//! seeking `key` walks until the current node's key is `>= key`; the
//! predecessor is always defined — never the virtual head — which is why
//! every splice below can unconditionally write through `prev`.

use crate::config::{MAX_KEY, MAX_SEMD};
use crate::error::{NucleusError, NucleusResult};
use crate::pcb::{PcbIndex, PcbPool};

type SemdIndex = u8;

struct SemEntry {
    key: u32,
    wait_queue: Option<PcbIndex>,
    next: Option<SemdIndex>,
}

pub struct Asl {
    table: [SemEntry; MAX_SEMD],
    head: SemdIndex,
    free_head: Option<SemdIndex>,
}

impl Asl {
    pub const fn new() -> Self {
        // Placeholder; `init` performs the real construction since const
        // fns can't loop-initialize a non-Copy array concisely here.
        Asl {
            table: [const {
                SemEntry {
                    key: 0,
                    wait_queue: None,
                    next: None,
                }
            }; MAX_SEMD],
            head: 0,
            free_head: None,
        }
    }

    /// Builds the two sentinels (index 0 = key 0, index 1 = key `MAX_KEY`)
    /// and threads the remaining `MAX_SEMD - 2` descriptors onto the free
    /// list.
    pub fn init(&mut self) {
        self.table[0] = SemEntry {
            key: 0,
            wait_queue: None,
            next: Some(1),
        };
        self.table[1] = SemEntry {
            key: MAX_KEY,
            wait_queue: None,
            next: None,
        };
        self.head = 0;
        self.free_head = None;
        for i in (2..MAX_SEMD as SemdIndex).rev() {
            self.table[i as usize] = SemEntry {
                key: 0,
                wait_queue: None,
                next: self.free_head,
            };
            self.free_head = Some(i);
        }
    }

    /// Finds the first entry whose key is `>= key`, and the index of its
    /// predecessor (always defined, possibly the dummy head itself).
    fn locate(&self, key: u32) -> (SemdIndex, SemdIndex) {
        let mut prev = self.head;
        let mut curr = self.table[self.head as usize].next.unwrap();
        while self.table[curr as usize].key < key {
            prev = curr;
            curr = self.table[curr as usize].next.unwrap();
        }
        (prev, curr)
    }

    /// Appends `p` to the wait queue for `key`, allocating a descriptor and
    /// splicing it into sorted position if this is the first waiter on
    /// `key`. Sets `pcbs[p].wait_key`.
    pub fn insert_blocked(
        &mut self,
        pcbs: &mut PcbPool,
        key: u32,
        p: PcbIndex,
    ) -> NucleusResult<()> {
        let (prev, mut curr) = self.locate(key);
        if self.table[curr as usize].key != key {
            let new = self.free_head.ok_or(NucleusError::NoFreeDescriptor)?;
            self.free_head = self.table[new as usize].next;
            self.table[new as usize] = SemEntry {
                key,
                wait_queue: None,
                next: Some(curr),
            };
            self.table[prev as usize].next = Some(new);
            curr = new;
        }
        pcbs.get_mut(p).wait_key = Some(key);
        let mut wq = self.table[curr as usize].wait_queue;
        pcbs.queue_insert_tail(&mut wq, p);
        self.table[curr as usize].wait_queue = wq;
        Ok(())
    }

    /// Removes the head of `key`'s wait queue, clears its `wait_key`, and
    /// frees the descriptor if the queue drains.
    pub fn remove_blocked(&mut self, pcbs: &mut PcbPool, key: u32) -> Option<PcbIndex> {
        let (prev, curr) = self.locate(key);
        if self.table[curr as usize].key != key {
            return None;
        }
        let mut wq = self.table[curr as usize].wait_queue;
        let removed = pcbs.queue_remove_head(&mut wq)?;
        pcbs.get_mut(removed).wait_key = None;
        self.table[curr as usize].wait_queue = wq;
        if PcbPool::queue_is_empty(wq) {
            self.unsplice_and_free(prev, curr);
        }
        Some(removed)
    }

    /// Removes `p` from the wait queue named by its own `wait_key`. Does
    /// **not** clear `wait_key` — this is the distinguishing feature from
    /// `remove_blocked`. Returns `None` when `p` is not actually linked
    /// there (an error condition the caller reports).
    pub fn out_blocked(&mut self, pcbs: &mut PcbPool, p: PcbIndex) -> Option<PcbIndex> {
        let key = pcbs.get(p).wait_key?;
        let (prev, curr) = self.locate(key);
        if self.table[curr as usize].key != key {
            return None;
        }
        let mut wq = self.table[curr as usize].wait_queue;
        let removed = pcbs.queue_remove(&mut wq, p)?;
        self.table[curr as usize].wait_queue = wq;
        if PcbPool::queue_is_empty(wq) {
            self.unsplice_and_free(prev, curr);
        }
        Some(removed)
    }

    /// Head of `key`'s wait queue without removing it.
    pub fn peek_blocked(&self, pcbs: &PcbPool, key: u32) -> Option<PcbIndex> {
        let (_, curr) = self.locate(key);
        if self.table[curr as usize].key != key {
            return None;
        }
        pcbs.queue_peek_head(self.table[curr as usize].wait_queue)
    }

    fn unsplice_and_free(&mut self, prev: SemdIndex, curr: SemdIndex) {
        self.table[prev as usize].next = self.table[curr as usize].next;
        self.table[curr as usize].next = self.free_head;
        self.free_head = Some(curr);
    }
}

impl Default for Asl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Asl, PcbPool) {
        let mut asl = Asl::new();
        asl.init();
        let mut pool = PcbPool::new();
        pool.init();
        (asl, pool)
    }

    #[test]
    fn insert_then_remove_round_trips() {
        let (mut asl, mut pool) = fresh();
        let p = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 100, p).unwrap();
        assert_eq!(pool.get(p).wait_key, Some(100));
        let removed = asl.remove_blocked(&mut pool, 100);
        assert_eq!(removed, Some(p));
        assert_eq!(pool.get(p).wait_key, None);
    }

    #[test]
    fn out_blocked_does_not_clear_wait_key() {
        let (mut asl, mut pool) = fresh();
        let p = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 200, p).unwrap();
        let removed = asl.out_blocked(&mut pool, p);
        assert_eq!(removed, Some(p));
        assert_eq!(pool.get(p).wait_key, Some(200));
    }

    #[test]
    fn fifo_order_per_key() {
        let (mut asl, mut pool) = fresh();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 50, a).unwrap();
        asl.insert_blocked(&mut pool, 50, b).unwrap();
        assert_eq!(asl.remove_blocked(&mut pool, 50), Some(a));
        assert_eq!(asl.remove_blocked(&mut pool, 50), Some(b));
    }

    #[test]
    fn sorted_insertion_across_keys() {
        let (mut asl, mut pool) = fresh();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        let c = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 300, a).unwrap();
        asl.insert_blocked(&mut pool, 100, b).unwrap();
        asl.insert_blocked(&mut pool, 200, c).unwrap();
        // Keys must remain strictly increasing along `next`: walking from
        // the sentinel head should yield 100, 200, 300 in that order.
        let mut curr = asl.table[asl.head as usize].next.unwrap();
        let mut keys = [0u32; 3];
        for slot in keys.iter_mut() {
            *slot = asl.table[curr as usize].key;
            curr = asl.table[curr as usize].next.unwrap();
        }
        assert_eq!(keys, [100, 200, 300]);
    }

    #[test]
    fn descriptor_freed_when_queue_drains() {
        let (mut asl, mut pool) = fresh();
        let before_free = asl.free_head;
        let p = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 400, p).unwrap();
        assert_ne!(asl.free_head, before_free);
        asl.remove_blocked(&mut pool, 400);
        assert_eq!(asl.free_head, before_free);
    }

    #[test]
    fn peek_does_not_remove() {
        let (mut asl, mut pool) = fresh();
        let p = pool.alloc().unwrap();
        asl.insert_blocked(&mut pool, 9, p).unwrap();
        assert_eq!(asl.peek_blocked(&pool, 9), Some(p));
        assert_eq!(asl.peek_blocked(&pool, 9), Some(p));
        assert_eq!(pool.get(p).wait_key, Some(9));
    }

    #[test]
    fn exhausted_free_list_reports_error() {
        let (mut asl, mut pool) = fresh();
        // Exhausting every free descriptor takes one distinctly-keyed PCB
        // per descriptor (MAX_SEMD - 2), which happens to equal MAX_PROC —
        // there is no spare PCB left to hand to the triggering call. That's
        // fine: on the no-free-descriptor path `insert_blocked` returns
        // before it ever touches the PCB argument (the failing `ok_or?`
        // comes before `pcbs.get_mut(p)`), so reusing an already-blocked
        // index for that call is safe.
        let mut first = None;
        for key in 1..=(MAX_SEMD as u32 - 2) {
            let p = pool.alloc().unwrap();
            asl.insert_blocked(&mut pool, key, p).unwrap();
            first.get_or_insert(p);
        }
        assert_eq!(
            asl.insert_blocked(&mut pool, 9999, first.unwrap()),
            Err(NucleusError::NoFreeDescriptor)
        );
    }
}
