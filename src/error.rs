use core::fmt;

/// Nucleus-internal error conditions. No handler on the hardware trap path
/// returns these to a caller — each is folded into the architecturally
/// defined outcome (v0 = -1, pass-up-or-die, panic) at the point it occurs.
/// They exist so internal helpers (the PCB pool, the ASL) can be matched
/// exhaustively by their callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NucleusError {
    /// The PCB pool has no free descriptors.
    PoolExhausted,
    /// The ASL needs a new descriptor for a never-before-seen key but its
    /// free list is empty.
    NoFreeDescriptor,
    /// SYSCALL number outside 1..=8, or a privileged SYSCALL attempted from
    /// user mode.
    InvalidSyscall,
    /// Ready queue empty, nothing soft-blocked, processes remain: no process
    /// can ever make progress again.
    Deadlock,
}

impl fmt::Display for NucleusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NucleusError::PoolExhausted => write!(f, "process pool exhausted"),
            NucleusError::NoFreeDescriptor => write!(f, "no free ASL descriptor"),
            NucleusError::InvalidSyscall => write!(f, "invalid or privileged syscall"),
            NucleusError::Deadlock => write!(f, "deadlock: no ready or soft-blocked process"),
        }
    }
}

pub type NucleusResult<T> = Result<T, NucleusError>;
