//! The process-control-block pool: a fixed arena of `MAX_PROC` descriptors,
//! plus the process-queue and process-tree operations over it.
//!
//! Pointers from the source material (`p_next`/`p_prev`/`p_prnt`/...) become
//! `Option<PcbIndex>` links into the arena. The arena itself is the only
//! owner of storage; every operation here takes `&mut PcbPool` rather than
//! reaching for ambient mutable statics.

use crate::config::MAX_PROC;
use crate::error::{NucleusError, NucleusResult};
use crate::hal::state::ExceptionState;

/// Index of a live descriptor within the pool's backing array.
pub type PcbIndex = u8;

/// A single process descriptor. See spec invariants I-P1..I-P3: a PCB is in
/// at most one process queue at a time (I-P1); `wait_key.is_some()` iff it
/// is linked from exactly one ASL wait queue (I-P2); the tree is acyclic and
/// every non-root PCB appears in exactly one parent's sibling list (I-P3).
#[derive(Clone, Copy)]
pub struct Pcb {
    pub state: ExceptionState,
    pub cpu_time: u32,

    queue_next: Option<PcbIndex>,
    queue_prev: Option<PcbIndex>,

    parent: Option<PcbIndex>,
    child: Option<PcbIndex>,
    left_sib: Option<PcbIndex>,
    right_sib: Option<PcbIndex>,

    /// The synchronization address this PCB is blocked on, or `None`.
    /// Treated as an opaque, address-sized integer — the ASL never
    /// dereferences it, only orders and compares it (Design Notes §9).
    pub wait_key: Option<u32>,

    /// Opaque pointer to a user-supplied support structure, carried as its
    /// raw address and never interpreted by the core.
    pub support: Option<u32>,
}

impl Pcb {
    const fn blank() -> Self {
        Pcb {
            state: ExceptionState::zeroed(),
            cpu_time: 0,
            queue_next: None,
            queue_prev: None,
            parent: None,
            child: None,
            left_sib: None,
            right_sib: None,
            wait_key: None,
            support: None,
        }
    }
}

/// The fixed pool of `MAX_PROC` descriptors and its free list.
pub struct PcbPool {
    pcbs: [Pcb; MAX_PROC],
    free_head: Option<PcbIndex>,
}

impl PcbPool {
    pub const fn new() -> Self {
        PcbPool {
            pcbs: [Pcb::blank(); MAX_PROC],
            free_head: None,
        }
    }

    /// Populates the free list with every descriptor in the array, in
    /// descending index order (mirroring `initPcbs`'s construction order —
    /// observable only through the resulting allocation order, which no
    /// invariant in §8 depends on).
    pub fn init(&mut self) {
        self.free_head = None;
        for i in (0..MAX_PROC as PcbIndex).rev() {
            self.pcbs[i as usize] = Pcb::blank();
            self.pcbs[i as usize].queue_next = self.free_head;
            self.free_head = Some(i);
        }
    }

    pub fn get(&self, i: PcbIndex) -> &Pcb {
        &self.pcbs[i as usize]
    }

    pub fn get_mut(&mut self, i: PcbIndex) -> &mut Pcb {
        &mut self.pcbs[i as usize]
    }

    /// Returns a zeroed descriptor from the pool, or `PoolExhausted`.
    pub fn alloc(&mut self) -> NucleusResult<PcbIndex> {
        let idx = self.free_head.ok_or(NucleusError::PoolExhausted)?;
        self.free_head = self.pcbs[idx as usize].queue_next;
        self.pcbs[idx as usize] = Pcb::blank();
        Ok(idx)
    }

    /// Returns a descriptor to the pool. The caller must ensure it is not
    /// linked anywhere (not queued, not in the ASL, not in the tree).
    /// Idempotent on an already-free index is the caller's responsibility
    /// to avoid, same as the source's `freePcb(NULL)` no-op — there is no
    /// "is this index free" check here since the arena does not track that
    /// beyond the free list itself.
    pub fn free(&mut self, i: PcbIndex) {
        self.pcbs[i as usize].queue_next = self.free_head;
        self.free_head = Some(i);
    }

    // ---- process queue operations (doubly-linked circular, tail handle) ----

    pub fn queue_is_empty(tail: Option<PcbIndex>) -> bool {
        tail.is_none()
    }

    /// Head of the queue identified by `tail`, i.e. `tail.next`.
    pub fn queue_peek_head(&self, tail: Option<PcbIndex>) -> Option<PcbIndex> {
        tail.map(|t| self.pcbs[t as usize].queue_next.unwrap())
    }

    pub fn queue_insert_tail(&mut self, tail: &mut Option<PcbIndex>, p: PcbIndex) {
        match *tail {
            None => {
                self.pcbs[p as usize].queue_next = Some(p);
                self.pcbs[p as usize].queue_prev = Some(p);
                *tail = Some(p);
            }
            Some(t) => {
                let head = self.pcbs[t as usize].queue_next.unwrap();
                self.pcbs[t as usize].queue_next = Some(p);
                self.pcbs[p as usize].queue_prev = Some(t);
                self.pcbs[p as usize].queue_next = Some(head);
                self.pcbs[head as usize].queue_prev = Some(p);
                *tail = Some(p);
            }
        }
    }

    pub fn queue_remove_head(&mut self, tail: &mut Option<PcbIndex>) -> Option<PcbIndex> {
        let t = (*tail)?;
        let head = self.pcbs[t as usize].queue_next.unwrap();
        if head == t {
            *tail = None;
        } else {
            let new_head = self.pcbs[head as usize].queue_next.unwrap();
            self.pcbs[t as usize].queue_next = Some(new_head);
            self.pcbs[new_head as usize].queue_prev = Some(t);
        }
        self.pcbs[head as usize].queue_next = None;
        self.pcbs[head as usize].queue_prev = None;
        Some(head)
    }

    /// Removes an arbitrary element `p` from the queue. O(n) in the queue
    /// length: walks the circle looking for `p`.
    pub fn queue_remove(&mut self, tail: &mut Option<PcbIndex>, p: PcbIndex) -> Option<PcbIndex> {
        let t = (*tail)?;
        let mut curr = self.pcbs[t as usize].queue_next.unwrap();
        loop {
            if curr == p {
                let next = self.pcbs[curr as usize].queue_next.unwrap();
                if next == curr {
                    *tail = None;
                } else {
                    let prev = self.pcbs[curr as usize].queue_prev.unwrap();
                    self.pcbs[prev as usize].queue_next = Some(next);
                    self.pcbs[next as usize].queue_prev = Some(prev);
                    if curr == t {
                        *tail = Some(prev);
                    }
                }
                self.pcbs[curr as usize].queue_next = None;
                self.pcbs[curr as usize].queue_prev = None;
                return Some(curr);
            }
            curr = self.pcbs[curr as usize].queue_next.unwrap();
            if curr == self.pcbs[t as usize].queue_next.unwrap() {
                return None;
            }
        }
    }

    // ---- process tree operations ----

    /// Places `child` at the head of `parent`'s sibling list (the insertion
    /// end, giving LIFO traversal on `remove_first_child`).
    pub fn insert_child(&mut self, parent: PcbIndex, child: PcbIndex) {
        let first = self.pcbs[parent as usize].child;
        self.pcbs[child as usize].parent = Some(parent);
        self.pcbs[child as usize].left_sib = None;
        self.pcbs[child as usize].right_sib = first;
        if let Some(f) = first {
            self.pcbs[f as usize].left_sib = Some(child);
        }
        self.pcbs[parent as usize].child = Some(child);
    }

    /// Detaches and returns `parent`'s first child, or `None` if childless.
    pub fn remove_first_child(&mut self, parent: PcbIndex) -> Option<PcbIndex> {
        let child = self.pcbs[parent as usize].child?;
        let next = self.pcbs[child as usize].right_sib;
        self.pcbs[parent as usize].child = next;
        if let Some(n) = next {
            self.pcbs[n as usize].left_sib = None;
        }
        self.pcbs[child as usize].parent = None;
        self.pcbs[child as usize].left_sib = None;
        self.pcbs[child as usize].right_sib = None;
        Some(child)
    }

    /// Removes `p` from its parent's sibling list. No-op (returns `None`)
    /// when `p` has no parent.
    pub fn detach(&mut self, p: PcbIndex) -> Option<PcbIndex> {
        let parent = self.pcbs[p as usize].parent?;
        if self.pcbs[parent as usize].child == Some(p) {
            self.remove_first_child(parent);
        } else {
            let left = self.pcbs[p as usize].left_sib.unwrap();
            let right = self.pcbs[p as usize].right_sib;
            self.pcbs[left as usize].right_sib = right;
            if let Some(r) = right {
                self.pcbs[r as usize].left_sib = Some(left);
            }
            self.pcbs[p as usize].parent = None;
            self.pcbs[p as usize].left_sib = None;
            self.pcbs[p as usize].right_sib = None;
        }
        Some(p)
    }
}

impl Default for PcbPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_pool() -> PcbPool {
        let mut pool = PcbPool::new();
        pool.init();
        pool
    }

    #[test]
    fn alloc_free_returns_to_pre_call_contents() {
        let mut pool = fresh_pool();
        let mut allocated = [0 as PcbIndex; MAX_PROC];
        for slot in allocated.iter_mut() {
            *slot = pool.alloc().unwrap();
        }
        assert!(pool.alloc().is_err());
        for &p in allocated.iter() {
            pool.free(p);
        }
        for _ in 0..MAX_PROC {
            assert!(pool.alloc().is_ok());
        }
    }

    #[test]
    fn alloc_zeroes_descriptor() {
        let mut pool = fresh_pool();
        let p = pool.alloc().unwrap();
        pool.get_mut(p).cpu_time = 42;
        pool.get_mut(p).wait_key = Some(7);
        pool.free(p);
        let p2 = pool.alloc().unwrap();
        assert_eq!(pool.get(p2).cpu_time, 0);
        assert_eq!(pool.get(p2).wait_key, None);
    }

    #[test]
    fn queue_fifo_order() {
        let mut pool = fresh_pool();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        let c = pool.alloc().unwrap();
        let mut tail = None;
        pool.queue_insert_tail(&mut tail, a);
        pool.queue_insert_tail(&mut tail, b);
        pool.queue_insert_tail(&mut tail, c);
        assert_eq!(pool.queue_remove_head(&mut tail), Some(a));
        assert_eq!(pool.queue_remove_head(&mut tail), Some(b));
        assert_eq!(pool.queue_remove_head(&mut tail), Some(c));
        assert_eq!(pool.queue_remove_head(&mut tail), None);
        assert!(PcbPool::queue_is_empty(tail));
    }

    #[test]
    fn queue_remove_arbitrary_middle() {
        let mut pool = fresh_pool();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        let c = pool.alloc().unwrap();
        let mut tail = None;
        pool.queue_insert_tail(&mut tail, a);
        pool.queue_insert_tail(&mut tail, b);
        pool.queue_insert_tail(&mut tail, c);
        assert_eq!(pool.queue_remove(&mut tail, b), Some(b));
        assert_eq!(pool.queue_remove_head(&mut tail), Some(a));
        assert_eq!(pool.queue_remove_head(&mut tail), Some(c));
    }

    #[test]
    fn queue_remove_sole_element_empties_tail() {
        let mut pool = fresh_pool();
        let a = pool.alloc().unwrap();
        let mut tail = None;
        pool.queue_insert_tail(&mut tail, a);
        assert_eq!(pool.queue_remove(&mut tail, a), Some(a));
        assert!(PcbPool::queue_is_empty(tail));
    }

    #[test]
    fn tree_insert_child_is_lifo() {
        let mut pool = fresh_pool();
        let parent = pool.alloc().unwrap();
        let c1 = pool.alloc().unwrap();
        let c2 = pool.alloc().unwrap();
        pool.insert_child(parent, c1);
        pool.insert_child(parent, c2);
        assert_eq!(pool.remove_first_child(parent), Some(c2));
        assert_eq!(pool.remove_first_child(parent), Some(c1));
        assert_eq!(pool.remove_first_child(parent), None);
    }

    #[test]
    fn tree_detach_middle_sibling() {
        let mut pool = fresh_pool();
        let parent = pool.alloc().unwrap();
        let c1 = pool.alloc().unwrap();
        let c2 = pool.alloc().unwrap();
        let c3 = pool.alloc().unwrap();
        pool.insert_child(parent, c1); // list: c1
        pool.insert_child(parent, c2); // list: c2, c1
        pool.insert_child(parent, c3); // list: c3, c2, c1
        assert_eq!(pool.detach(c2), Some(c2));
        assert_eq!(pool.remove_first_child(parent), Some(c3));
        assert_eq!(pool.remove_first_child(parent), Some(c1));
        assert_eq!(pool.remove_first_child(parent), None);
    }

    #[test]
    fn tree_detach_parentless_is_noop() {
        let mut pool = fresh_pool();
        let p = pool.alloc().unwrap();
        assert_eq!(pool.detach(p), None);
    }
}
