//! Fixed capacities and timing constants shared by every nucleus component.
//!
//! Centralizing these mirrors the teacher's use of named constants
//! (`TASK_STACK_SIZE`, `PIC_1_OFFSET`) instead of inline literals.

/// Maximum number of process descriptors the pool can hold at once.
pub const MAX_PROC: usize = 20;

/// Two sentinel descriptors bracket the ASL in addition to one per process.
pub const MAX_SEMD: usize = MAX_PROC + 2;

/// Length of a process's CPU slice before preemption, in TOD ticks
/// (5 milliseconds at the board's microsecond-scale TOD).
pub const TIME_SLICE: u32 = 5_000;

/// Countdown value that disables the processor local timer (effectively
/// "infinite"), used while idling for an interrupt.
pub const INFINITE_TIMER: u32 = 0xFFFF_FFFF;

/// Pseudo-clock tick period, in TOD ticks (100 milliseconds).
pub const PSEUDO_CLOCK_INTERVAL: u32 = 100_000;

/// First interrupt line carrying a device class (lines 0..=2 are reserved,
/// the local timer, and the pseudo-clock respectively).
pub const BASE_DEVICE_LINE: u32 = 3;

/// Last interrupt line carrying a device class.
pub const MAX_DEVICE_LINE: u32 = 7;

/// Terminal devices live on the last device line.
pub const TERMINAL_LINE: u32 = MAX_DEVICE_LINE;

/// Number of device-class interrupt lines (3..=7).
pub const DEVICE_LINE_COUNT: usize = 5;

/// Devices per interrupt line.
pub const DEVICES_PER_LINE: usize = 8;

/// Size of the device-semaphore table: one counter per (line, device) pair,
/// a second bank of 8 for terminal transmit sub-devices, plus one final slot
/// for the pseudo-clock.
pub const DEVICE_SEMAPHORES: usize = DEVICE_LINE_COUNT * DEVICES_PER_LINE + DEVICES_PER_LINE + 1;

/// Index of the pseudo-clock counter within the device-semaphore table.
pub const PSEUDO_CLOCK_INDEX: usize = DEVICE_SEMAPHORES - 1;

/// Largest representable key in the ASL's sentinel sense ("MAXINT" in the
/// source material): brackets the sorted key space from above.
pub const MAX_KEY: u32 = 0x0FFF_FFFF;

/// Number of general-purpose registers saved per exception (STATEREGNUM).
pub const STATE_GPR_COUNT: usize = 31;

/// Index within `regs` of the multiply/divide HI register.
pub const REG_HI: usize = 29;
/// Index within `regs` of the multiply/divide LO register.
pub const REG_LO: usize = 30;

/// Index within `regs` of syscall argument/return registers.
pub const REG_V0: usize = 1;
pub const REG_A0: usize = 3;
pub const REG_A1: usize = 4;
pub const REG_A2: usize = 5;
pub const REG_A3: usize = 6;

/// Index within `regs` of the stack pointer.
pub const REG_SP: usize = 26;

/// Entry point and initial stack top for the first process the bootstrap
/// creates (P0). Board-specific boot-time configuration, not a hardware
/// constant: a real deployment would read these from its loaded program
/// image instead of hardcoding them.
pub const BOOT_PROC_ENTRY: u32 = 0x2000_0000;
pub const BOOT_PROC_STACK_TOP: u32 = 0x2000_1000;

/// Kernel stack top the trap vector hands every exception/interrupt
/// handler.
pub const KERNEL_STACK_TOP: u32 = 0x2000_1000;

/// Supervisor call numbers (a0 at SYSCALL time).
pub const SYS1_CREATE: u32 = 1;
pub const SYS2_TERMINATE: u32 = 2;
pub const SYS3_P: u32 = 3;
pub const SYS4_V: u32 = 4;
pub const SYS5_WAIT_IO: u32 = 5;
pub const SYS6_CPU_TIME: u32 = 6;
pub const SYS7_WAIT_CLOCK: u32 = 7;
pub const SYS8_SUPPORT: u32 = 8;

/// Pass-up exception kinds, indexing the support structure's per-kind slots.
pub const PAGE_FAULT_EXCEPT: usize = 0;
pub const GENERAL_EXCEPT: usize = 1;

/// `Cause` code reserved-instruction value SYS8 (and friends) is rewritten to
/// when requested from user mode.
pub const CAUSE_RESERVED_INSTRUCTION: u32 = 10;
