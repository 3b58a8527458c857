//! The architectural state saved by the CPU on every trap, and the
//! MMIO-mapped hardware structures the nucleus reads and writes.

use crate::config::STATE_GPR_COUNT;
use bit_field::BitField;

/// The complete processor state snapshot: 35 machine words (EntryHi, Cause,
/// Status, PC, and 31 general-purpose registers — the multiply/divide HI/LO
/// registers live inside `regs` at indices `REG_HI`/`REG_LO`, not as
/// separate fields). This is the exact layout the CPU writes to the BIOS
/// data page on every exception and interrupt, and the layout a PCB carries
/// as its saved context.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExceptionState {
    pub entry_hi: u32,
    pub cause: u32,
    pub status: u32,
    pub pc: u32,
    pub regs: [u32; STATE_GPR_COUNT],
}

impl ExceptionState {
    /// An all-zero state, as handed out by a fresh PCB allocation.
    pub const fn zeroed() -> Self {
        ExceptionState {
            entry_hi: 0,
            cause: 0,
            status: 0,
            pc: 0,
            regs: [0; STATE_GPR_COUNT],
        }
    }

    /// Field-by-field copy, mirroring the source material's `moveState`
    /// helper: every fixed field plus all 31 general registers.
    pub fn copy_from(&mut self, source: &ExceptionState) {
        self.entry_hi = source.entry_hi;
        self.cause = source.cause;
        self.status = source.status;
        self.pc = source.pc;
        self.regs = source.regs;
    }

    /// The 5-bit exception code occupying bits 2..=6 of `cause`.
    pub fn exc_code(&self) -> u32 {
        self.cause.get_bits(2..7)
    }

    /// Overwrite the exception code, leaving the rest of `cause` untouched.
    /// Used when a privileged SYSCALL from user mode is rewritten to a
    /// reserved-instruction program trap.
    pub fn set_exc_code(&mut self, code: u32) {
        self.cause.set_bits(2..7, code);
    }

    /// The pending-interrupt-line bitmap occupying bits 8..=15 of `cause`.
    pub fn pending_lines(&self) -> u32 {
        self.cause.get_bits(8..16)
    }

    /// True when the CPU was in user mode (the "user-previous" bit of
    /// `status`) at the moment this state was captured.
    pub fn was_user_mode(&self) -> bool {
        self.status.get_bit(3)
    }

    pub fn v0(&self) -> u32 {
        self.regs[crate::config::REG_V0]
    }
    pub fn set_v0(&mut self, value: u32) {
        self.regs[crate::config::REG_V0] = value;
    }
    pub fn a0(&self) -> u32 {
        self.regs[crate::config::REG_A0]
    }
    pub fn a1(&self) -> u32 {
        self.regs[crate::config::REG_A1]
    }
    pub fn a2(&self) -> u32 {
        self.regs[crate::config::REG_A2]
    }
    pub fn a3(&self) -> u32 {
        self.regs[crate::config::REG_A3]
    }
}

impl Default for ExceptionState {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A saved execution context: just enough to resume execution without a
/// full register set (stack pointer, status, program counter). This is what
/// `LDCXT` loads when the nucleus hands a pass-up exception off to a
/// process's support level, as opposed to the full `ExceptionState` an
/// `LDST` loads when resuming an ordinary process.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context {
    pub stack_ptr: u32,
    pub status: u32,
    pub pc: u32,
}

/// A process's support-level exception-handling block: one saved state and
/// one resume context per pass-up kind (`PAGE_FAULT_EXCEPT`,
/// `GENERAL_EXCEPT`). The nucleus carries a PCB's pointer to this structure
/// as an opaque address (see `Pcb::support`) and only ever touches these two
/// arrays, on the pass-up path; everything else about the structure belongs
/// to the level above the nucleus.
#[repr(C)]
pub struct SupportStruct {
    pub asid: u32,
    pub except_state: [ExceptionState; 2],
    pub except_context: [Context; 2],
}

bitflags::bitflags! {
    /// Status-register bits the nucleus manipulates directly (see §6). Named
    /// after their meaning in the *next* loaded state, the same sense the
    /// source material's `STATUS`-word constants use (`IEPON`, `USERPON`,
    /// ...): these describe what a PCB's `state.status` word will become
    /// once `LDST` runs, not the currently executing process's status.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct StatusBits: u32 {
        /// Global interrupt enable (IEc, bit 0).
        const IEC_ON = 0x0000_0001;
        /// Interrupts-enabled-previous (IEp, bit 2), what gets restored as
        /// IEc on the next LDST.
        const IEP_ON = 0x0000_0004;
        /// User-mode-previous (KUp, bit 3): set to run the loaded state in
        /// user mode.
        const USER_PREVIOUS = 0x0000_0008;
        /// Interrupt mask bits (bits 8..=15): all on, i.e. every line
        /// unmasked.
        const INTERRUPT_MASK_ALL = 0x0000_FF00;
        /// Processor Local Timer enable (TE, bit 27).
        const PLT_ON = 0x0800_0000;
    }
}

/// The same bits as plain `u32` masks, for call sites assembling a raw
/// status word (a PCB's `state.status`) rather than working with
/// `StatusBits` itself.
pub mod status_bits {
    use super::StatusBits;
    pub const IEC_ON: u32 = StatusBits::IEC_ON.bits();
    pub const IEP_ON: u32 = StatusBits::IEP_ON.bits();
    pub const USER_PREVIOUS: u32 = StatusBits::USER_PREVIOUS.bits();
    pub const INTERRUPT_MASK_ALL: u32 = StatusBits::INTERRUPT_MASK_ALL.bits();
    pub const PLT_ON: u32 = StatusBits::PLT_ON.bits();
}

/// One memory-mapped device register quad. Terminal devices reinterpret the
/// four words as (recv-status, recv-command, transmit-status,
/// transmit-command) instead of (status, command, data0, data1).
#[repr(C)]
pub struct DeviceRegister {
    pub status: volatile::Volatile<u32>,
    pub command: volatile::Volatile<u32>,
    pub data0: volatile::Volatile<u32>,
    pub data1: volatile::Volatile<u32>,
}

impl DeviceRegister {
    pub fn recv_status(&self) -> u32 {
        self.status.read()
    }
    pub fn set_recv_command(&mut self, value: u32) {
        self.command.write(value);
    }
    pub fn transmit_status(&self) -> u32 {
        self.data0.read()
    }
    pub fn set_transmit_command(&mut self, value: u32) {
        self.data1.write(value);
    }
}

/// The full device-register area mapped at `RAMBASEADDR`: bus info,
/// per-line interrupt-pending bitmaps, and the dense array of device
/// register quads (`DEVICE_LINE_COUNT * DEVICES_PER_LINE` entries).
#[repr(C)]
pub struct DeviceRegisterArea {
    pub ram_base: u32,
    pub ram_size: u32,
    pub exec_base: u32,
    pub exec_size: u32,
    pub boot_base: u32,
    pub boot_size: u32,
    pub tod_hi: u32,
    pub tod_lo: volatile::Volatile<u32>,
    pub interval_timer: volatile::Volatile<u32>,
    pub time_scale: u32,
    pub tlb_floor_addr: u32,
    pub inst_dev: [volatile::Volatile<u32>; crate::config::DEVICE_LINE_COUNT],
    pub interrupt_dev: [volatile::Volatile<u32>; crate::config::DEVICE_LINE_COUNT],
    pub devreg: [DeviceRegister; crate::config::DEVICE_LINE_COUNT * crate::config::DEVICES_PER_LINE],
}

/// Status code meaning "no outstanding event" for a device register.
pub const STATUS_READY: u32 = 1;
/// Command code that acknowledges a device interrupt.
pub const CMD_ACK: u32 = 1;
