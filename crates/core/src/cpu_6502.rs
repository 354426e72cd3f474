//! MOS 6502 CPU core implementation
//!
//! This module provides a reusable 6502 interpreter that can be used by any
//! system (NES, Atari 2600, Apple II, etc.) by implementing the
//! [`Memory6502`] trait. The interpreter is instruction-stepped: one call to
//! [`Cpu6502::step`] executes one instruction (plus any pending interrupt
//! service) and returns the cycles consumed.
//!
//! Only the 151 official opcodes are implemented. Decoding goes through a
//! fixed 256-entry table of [`Opcode`] metadata; an unpopulated slot makes
//! [`Cpu6502::step`] fail with [`CpuError::InvalidOpcode`] without touching
//! CPU state.

use crate::logging::{log, LogCategory, LogConfig, LogLevel};
use thiserror::Error;

/// Memory interface trait for the 6502 CPU
///
/// Systems using the 6502 must implement this trait to provide memory
/// access. The CPU performs every fetch, operand read, and store through it.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u16, val: u8);

    /// Report and clear a pending sprite-DMA stall.
    ///
    /// A bus that performs an OAM DMA transfer on a register write returns
    /// `true` exactly once afterwards; the CPU then charges the 513/514
    /// cycle stall. Plain memories never stall.
    fn take_dma_stall(&mut self) -> bool {
        false
    }
}

/// Interrupt vector locations
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const STACK_BASE: u16 = 0x0100;
const INTERRUPT_CYCLES: u32 = 7;
const BRANCH_TAKEN_CYCLES: u32 = 1;

// Status register bit positions when materialized as a byte.
const FLAG_C: u8 = 0x01;
const FLAG_Z: u8 = 0x02;
const FLAG_I: u8 = 0x04;
const FLAG_D: u8 = 0x08;
const FLAG_B: u8 = 0x10;
const FLAG_U: u8 = 0x20;
const FLAG_V: u8 = 0x40;
const FLAG_N: u8 = 0x80;

/// 6502 processor status register (P).
///
/// Flags are tracked as independent booleans; the byte encoding is
/// C=bit0, Z=bit1, I=bit2, D=bit3, B=bit4, unused=bit5, V=bit6, N=bit7.
/// The unused bit always reads as 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    /// Carry
    pub c: bool,
    /// Zero result
    pub z: bool,
    /// Interrupt disable
    pub i: bool,
    /// Decimal mode (tracked; arithmetic ignores it on this platform)
    pub d: bool,
    /// Break command
    pub b: bool,
    /// Overflow
    pub v: bool,
    /// Negative
    pub n: bool,
}

impl Status {
    /// Materialize the register as a byte. The unused bit reads as 1.
    pub fn as_byte(self) -> u8 {
        let mut p = FLAG_U;
        if self.c {
            p |= FLAG_C;
        }
        if self.z {
            p |= FLAG_Z;
        }
        if self.i {
            p |= FLAG_I;
        }
        if self.d {
            p |= FLAG_D;
        }
        if self.b {
            p |= FLAG_B;
        }
        if self.v {
            p |= FLAG_V;
        }
        if self.n {
            p |= FLAG_N;
        }
        p
    }

    /// Rebuild the register from a byte, bit for bit.
    pub fn from_byte(p: u8) -> Self {
        Self {
            c: p & FLAG_C != 0,
            z: p & FLAG_Z != 0,
            i: p & FLAG_I != 0,
            d: p & FLAG_D != 0,
            b: p & FLAG_B != 0,
            v: p & FLAG_V != 0,
            n: p & FLAG_N != 0,
        }
    }

    /// Update Z and N from a freshly computed value.
    fn set_zn(&mut self, val: u8) {
        self.z = val == 0;
        self.n = val & 0x80 != 0;
    }
}

/// Errors surfaced by instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    /// The byte at `pc` does not decode to an official opcode. The CPU has
    /// not advanced: registers, flags, and the cycle counter are untouched.
    #[error("invalid opcode {opcode:#04X} at PC={pc:#06X}")]
    InvalidOpcode { opcode: u8, pc: u16 },
}

/// Hardware interrupt kinds that can be posted to the CPU.
///
/// NMI is edge-triggered (a posted request fires once); IRQ is
/// level-sensitive and stays pending until the I flag permits service.
/// RESET is typically posted exactly once on power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Irq,
    Reset,
}

impl Interrupt {
    fn vector(self) -> u16 {
        match self {
            Interrupt::Nmi => NMI_VECTOR,
            Interrupt::Irq => IRQ_VECTOR,
            Interrupt::Reset => RESET_VECTOR,
        }
    }
}

/// The thirteen 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

/// Instruction mnemonics. Diagnostic only: the sole external surface on
/// which these names appear is the trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::And => "AND",
            Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC",
            Mnemonic::Bcs => "BCS",
            Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT",
            Mnemonic::Bmi => "BMI",
            Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL",
            Mnemonic::Brk => "BRK",
            Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS",
            Mnemonic::Clc => "CLC",
            Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI",
            Mnemonic::Clv => "CLV",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX",
            Mnemonic::Cpy => "CPY",
            Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX",
            Mnemonic::Dey => "DEY",
            Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC",
            Mnemonic::Inx => "INX",
            Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jsr => "JSR",
            Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX",
            Mnemonic::Ldy => "LDY",
            Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP",
            Mnemonic::Ora => "ORA",
            Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP",
            Mnemonic::Pla => "PLA",
            Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL",
            Mnemonic::Ror => "ROR",
            Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED",
            Mnemonic::Sei => "SEI",
            Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX",
            Mnemonic::Sty => "STY",
            Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY",
            Mnemonic::Tsx => "TSX",
            Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS",
            Mnemonic::Tya => "TYA",
        }
    }
}

/// Per-opcode metadata: mnemonic, addressing mode, byte width, base cycle
/// cost, and the page-cross add-on (0 or 1).
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    pub bytes: u8,
    pub cycles: u8,
    pub page_cycles: u8,
}

const fn op(
    mnemonic: Mnemonic,
    mode: AddressingMode,
    bytes: u8,
    cycles: u8,
    page_cycles: u8,
) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        bytes,
        cycles,
        page_cycles,
    })
}

/// Dispatch table indexed by opcode byte. Costs follow the official data
/// sheet; slots left `None` are unofficial opcodes and fail decoding.
pub static OPCODES: [Option<Opcode>; 256] = {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t: [Option<Opcode>; 256] = [None; 256];

    t[0x69] = op(Adc, Immediate, 2, 2, 0);
    t[0x65] = op(Adc, ZeroPage, 2, 3, 0);
    t[0x75] = op(Adc, ZeroPageX, 2, 4, 0);
    t[0x6D] = op(Adc, Absolute, 3, 4, 0);
    t[0x7D] = op(Adc, AbsoluteX, 3, 4, 1);
    t[0x79] = op(Adc, AbsoluteY, 3, 4, 1);
    t[0x61] = op(Adc, IndirectX, 2, 6, 0);
    t[0x71] = op(Adc, IndirectY, 2, 5, 1);

    t[0x29] = op(And, Immediate, 2, 2, 0);
    t[0x25] = op(And, ZeroPage, 2, 3, 0);
    t[0x35] = op(And, ZeroPageX, 2, 4, 0);
    t[0x2D] = op(And, Absolute, 3, 4, 0);
    t[0x3D] = op(And, AbsoluteX, 3, 4, 1);
    t[0x39] = op(And, AbsoluteY, 3, 4, 1);
    t[0x21] = op(And, IndirectX, 2, 6, 0);
    t[0x31] = op(And, IndirectY, 2, 5, 1);

    t[0x0A] = op(Asl, Accumulator, 1, 2, 0);
    t[0x06] = op(Asl, ZeroPage, 2, 5, 0);
    t[0x16] = op(Asl, ZeroPageX, 2, 6, 0);
    t[0x0E] = op(Asl, Absolute, 3, 6, 0);
    t[0x1E] = op(Asl, AbsoluteX, 3, 7, 0);

    t[0x90] = op(Bcc, Relative, 2, 2, 1);
    t[0xB0] = op(Bcs, Relative, 2, 2, 1);
    t[0xF0] = op(Beq, Relative, 2, 2, 1);
    t[0x30] = op(Bmi, Relative, 2, 2, 1);
    t[0xD0] = op(Bne, Relative, 2, 2, 1);
    t[0x10] = op(Bpl, Relative, 2, 2, 1);
    t[0x50] = op(Bvc, Relative, 2, 2, 1);
    t[0x70] = op(Bvs, Relative, 2, 2, 1);

    t[0x24] = op(Bit, ZeroPage, 2, 3, 0);
    t[0x2C] = op(Bit, Absolute, 3, 4, 0);

    t[0x00] = op(Brk, Implied, 1, 7, 0);

    t[0x18] = op(Clc, Implied, 1, 2, 0);
    t[0xD8] = op(Cld, Implied, 1, 2, 0);
    t[0x58] = op(Cli, Implied, 1, 2, 0);
    t[0xB8] = op(Clv, Implied, 1, 2, 0);

    t[0xC9] = op(Cmp, Immediate, 2, 2, 0);
    t[0xC5] = op(Cmp, ZeroPage, 2, 3, 0);
    t[0xD5] = op(Cmp, ZeroPageX, 2, 4, 0);
    t[0xCD] = op(Cmp, Absolute, 3, 4, 0);
    t[0xDD] = op(Cmp, AbsoluteX, 3, 4, 1);
    t[0xD9] = op(Cmp, AbsoluteY, 3, 4, 1);
    t[0xC1] = op(Cmp, IndirectX, 2, 6, 0);
    t[0xD1] = op(Cmp, IndirectY, 2, 5, 1);

    t[0xE0] = op(Cpx, Immediate, 2, 2, 0);
    t[0xE4] = op(Cpx, ZeroPage, 2, 3, 0);
    t[0xEC] = op(Cpx, Absolute, 3, 4, 0);

    t[0xC0] = op(Cpy, Immediate, 2, 2, 0);
    t[0xC4] = op(Cpy, ZeroPage, 2, 3, 0);
    t[0xCC] = op(Cpy, Absolute, 3, 4, 0);

    t[0xC6] = op(Dec, ZeroPage, 2, 5, 0);
    t[0xD6] = op(Dec, ZeroPageX, 2, 6, 0);
    t[0xCE] = op(Dec, Absolute, 3, 6, 0);
    t[0xDE] = op(Dec, AbsoluteX, 3, 7, 0);

    t[0xCA] = op(Dex, Implied, 1, 2, 0);
    t[0x88] = op(Dey, Implied, 1, 2, 0);

    t[0x49] = op(Eor, Immediate, 2, 2, 0);
    t[0x45] = op(Eor, ZeroPage, 2, 3, 0);
    t[0x55] = op(Eor, ZeroPageX, 2, 4, 0);
    t[0x4D] = op(Eor, Absolute, 3, 4, 0);
    t[0x5D] = op(Eor, AbsoluteX, 3, 4, 1);
    t[0x59] = op(Eor, AbsoluteY, 3, 4, 1);
    t[0x41] = op(Eor, IndirectX, 2, 6, 0);
    t[0x51] = op(Eor, IndirectY, 2, 5, 1);

    t[0xE6] = op(Inc, ZeroPage, 2, 5, 0);
    t[0xF6] = op(Inc, ZeroPageX, 2, 6, 0);
    t[0xEE] = op(Inc, Absolute, 3, 6, 0);
    t[0xFE] = op(Inc, AbsoluteX, 3, 7, 0);

    t[0xE8] = op(Inx, Implied, 1, 2, 0);
    t[0xC8] = op(Iny, Implied, 1, 2, 0);

    t[0x4C] = op(Jmp, Absolute, 3, 3, 0);
    t[0x6C] = op(Jmp, Indirect, 3, 5, 0);
    t[0x20] = op(Jsr, Absolute, 3, 6, 0);

    t[0xA9] = op(Lda, Immediate, 2, 2, 0);
    t[0xA5] = op(Lda, ZeroPage, 2, 3, 0);
    t[0xB5] = op(Lda, ZeroPageX, 2, 4, 0);
    t[0xAD] = op(Lda, Absolute, 3, 4, 0);
    t[0xBD] = op(Lda, AbsoluteX, 3, 4, 1);
    t[0xB9] = op(Lda, AbsoluteY, 3, 4, 1);
    t[0xA1] = op(Lda, IndirectX, 2, 6, 0);
    t[0xB1] = op(Lda, IndirectY, 2, 5, 1);

    t[0xA2] = op(Ldx, Immediate, 2, 2, 0);
    t[0xA6] = op(Ldx, ZeroPage, 2, 3, 0);
    t[0xB6] = op(Ldx, ZeroPageY, 2, 4, 0);
    t[0xAE] = op(Ldx, Absolute, 3, 4, 0);
    t[0xBE] = op(Ldx, AbsoluteY, 3, 4, 1);

    t[0xA0] = op(Ldy, Immediate, 2, 2, 0);
    t[0xA4] = op(Ldy, ZeroPage, 2, 3, 0);
    t[0xB4] = op(Ldy, ZeroPageX, 2, 4, 0);
    t[0xAC] = op(Ldy, Absolute, 3, 4, 0);
    t[0xBC] = op(Ldy, AbsoluteX, 3, 4, 1);

    t[0x4A] = op(Lsr, Accumulator, 1, 2, 0);
    t[0x46] = op(Lsr, ZeroPage, 2, 5, 0);
    t[0x56] = op(Lsr, ZeroPageX, 2, 6, 0);
    t[0x4E] = op(Lsr, Absolute, 3, 6, 0);
    t[0x5E] = op(Lsr, AbsoluteX, 3, 7, 0);

    t[0xEA] = op(Nop, Implied, 1, 2, 0);

    t[0x09] = op(Ora, Immediate, 2, 2, 0);
    t[0x05] = op(Ora, ZeroPage, 2, 3, 0);
    t[0x15] = op(Ora, ZeroPageX, 2, 4, 0);
    t[0x0D] = op(Ora, Absolute, 3, 4, 0);
    t[0x1D] = op(Ora, AbsoluteX, 3, 4, 1);
    t[0x19] = op(Ora, AbsoluteY, 3, 4, 1);
    t[0x01] = op(Ora, IndirectX, 2, 6, 0);
    t[0x11] = op(Ora, IndirectY, 2, 5, 1);

    t[0x48] = op(Pha, Implied, 1, 3, 0);
    t[0x08] = op(Php, Implied, 1, 3, 0);
    t[0x68] = op(Pla, Implied, 1, 4, 0);
    t[0x28] = op(Plp, Implied, 1, 4, 0);

    t[0x2A] = op(Rol, Accumulator, 1, 2, 0);
    t[0x26] = op(Rol, ZeroPage, 2, 5, 0);
    t[0x36] = op(Rol, ZeroPageX, 2, 6, 0);
    t[0x2E] = op(Rol, Absolute, 3, 6, 0);
    t[0x3E] = op(Rol, AbsoluteX, 3, 7, 0);

    t[0x6A] = op(Ror, Accumulator, 1, 2, 0);
    t[0x66] = op(Ror, ZeroPage, 2, 5, 0);
    t[0x76] = op(Ror, ZeroPageX, 2, 6, 0);
    t[0x6E] = op(Ror, Absolute, 3, 6, 0);
    t[0x7E] = op(Ror, AbsoluteX, 3, 7, 0);

    t[0x40] = op(Rti, Implied, 1, 6, 0);
    t[0x60] = op(Rts, Implied, 1, 6, 0);

    t[0xE9] = op(Sbc, Immediate, 2, 2, 0);
    t[0xE5] = op(Sbc, ZeroPage, 2, 3, 0);
    t[0xF5] = op(Sbc, ZeroPageX, 2, 4, 0);
    t[0xED] = op(Sbc, Absolute, 3, 4, 0);
    t[0xFD] = op(Sbc, AbsoluteX, 3, 4, 1);
    t[0xF9] = op(Sbc, AbsoluteY, 3, 4, 1);
    t[0xE1] = op(Sbc, IndirectX, 2, 6, 0);
    t[0xF1] = op(Sbc, IndirectY, 2, 5, 1);

    t[0x38] = op(Sec, Implied, 1, 2, 0);
    t[0xF8] = op(Sed, Implied, 1, 2, 0);
    t[0x78] = op(Sei, Implied, 1, 2, 0);

    t[0x85] = op(Sta, ZeroPage, 2, 3, 0);
    t[0x95] = op(Sta, ZeroPageX, 2, 4, 0);
    t[0x8D] = op(Sta, Absolute, 3, 4, 0);
    t[0x9D] = op(Sta, AbsoluteX, 3, 5, 0);
    t[0x99] = op(Sta, AbsoluteY, 3, 5, 0);
    t[0x81] = op(Sta, IndirectX, 2, 6, 0);
    t[0x91] = op(Sta, IndirectY, 2, 6, 0);

    t[0x86] = op(Stx, ZeroPage, 2, 3, 0);
    t[0x96] = op(Stx, ZeroPageY, 2, 4, 0);
    t[0x8E] = op(Stx, Absolute, 3, 4, 0);

    t[0x84] = op(Sty, ZeroPage, 2, 3, 0);
    t[0x94] = op(Sty, ZeroPageX, 2, 4, 0);
    t[0x8C] = op(Sty, Absolute, 3, 4, 0);

    t[0xAA] = op(Tax, Implied, 1, 2, 0);
    t[0xA8] = op(Tay, Implied, 1, 2, 0);
    t[0xBA] = op(Tsx, Implied, 1, 2, 0);
    t[0x8A] = op(Txa, Implied, 1, 2, 0);
    t[0x9A] = op(Txs, Implied, 1, 2, 0);
    t[0x98] = op(Tya, Implied, 1, 2, 0);

    t
};

fn pages_differ(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}

/// MOS 6502 CPU state and execution engine
///
/// Generic over its memory interface: the NES system plugs its bus in,
/// tests use [`ArrayMemory`].
#[derive(Debug)]
pub struct Cpu6502<M: Memory6502> {
    /// Accumulator register
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (the stack lives at 0x0100 + sp)
    pub sp: u8,
    /// Program counter
    pub pc: u16,
    /// Status register
    pub status: Status,
    /// Total cycles executed since power-on
    pub cycles: u64,
    /// Memory interface
    pub memory: M,

    nmi_pending: bool,
    irq_pending: bool,
    reset_pending: bool,

    // Per-instruction bookkeeping, cleared at the top of each step.
    page_crossed: bool,
    branch_taken: bool,
    branch_page_cross: bool,
}

impl<M: Memory6502> Cpu6502<M> {
    /// Create a new 6502 CPU with the given memory interface.
    ///
    /// Registers come up in the power-on state; call [`reset`](Self::reset)
    /// to load PC from the RESET vector once memory holds a program.
    pub fn new(memory: M) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status {
                i: true,
                ..Status::default()
            },
            cycles: 0,
            memory,
            nmi_pending: false,
            irq_pending: false,
            reset_pending: false,
            page_crossed: false,
            branch_taken: false,
            branch_page_cross: false,
        }
    }

    /// Reset the CPU to the power-on state and load PC from the RESET
    /// vector at $FFFC. Memory contents are preserved.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = Status {
            i: true,
            ..Status::default()
        };
        self.cycles = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.reset_pending = false;
        self.pc = self.read_u16(RESET_VECTOR);
    }

    /// Post a hardware interrupt. The request is honored at the next
    /// `step()` entry: NMI always, IRQ only while the I flag is clear.
    pub fn request_interrupt(&mut self, kind: Interrupt) {
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("{kind:?} requested at PC={:04X}", self.pc)
        });
        match kind {
            Interrupt::Nmi => self.nmi_pending = true,
            Interrupt::Irq => self.irq_pending = true,
            Interrupt::Reset => self.reset_pending = true,
        }
    }

    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.memory.write(addr, val);
    }

    /// Little-endian 16-bit read with 16-bit address wraparound.
    fn read_u16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// 16-bit read reproducing the 6502 indirect-JMP page-wrapping bug: if
    /// the pointer's low byte is $FF, the high byte comes from the start of
    /// the same page rather than the next one.
    fn read_u16_bug(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let hi = self.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    /// 16-bit read from the zero page where the high byte's address wraps
    /// within the page: `(ptr + 1) mod 256`.
    fn read_u16_zero_page(&self, ptr: u8) -> u16 {
        let lo = self.read(ptr as u16) as u16;
        let hi = self.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push(&mut self, val: u8) {
        self.write(STACK_BASE | self.sp as u16, val);
        self.sp = self.sp.wrapping_sub(1);
    }

    #[inline]
    fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_BASE | self.sp as u16)
    }

    /// Push a word: high byte first, then low, so a later pull yields low
    /// then high.
    fn push_u16(&mut self, word: u16) {
        self.push((word >> 8) as u8);
        self.push(word as u8);
    }

    fn pull_u16(&mut self) -> u16 {
        let lo = self.pull() as u16;
        let hi = self.pull() as u16;
        (hi << 8) | lo
    }

    /// Take the one interrupt (if any) to service at this step entry.
    /// RESET outranks NMI outranks IRQ; a masked IRQ stays pending.
    fn take_pending_interrupt(&mut self) -> Option<Interrupt> {
        if self.reset_pending {
            self.reset_pending = false;
            Some(Interrupt::Reset)
        } else if self.nmi_pending {
            self.nmi_pending = false;
            Some(Interrupt::Nmi)
        } else if self.irq_pending && !self.status.i {
            self.irq_pending = false;
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    /// Interrupt service routine: push PC (high, low) and P with the B bit
    /// clear, set I, and load PC from the source's vector.
    fn service_interrupt(&mut self, kind: Interrupt) {
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("servicing {kind:?} at PC={:04X}", self.pc)
        });
        self.push_u16(self.pc);
        self.push(self.status.as_byte() & !FLAG_B);
        self.status.i = true;
        self.pc = self.read_u16(kind.vector());
    }

    /// Resolve the effective operand address for `mode`.
    ///
    /// Called while PC still points at the opcode. Sets the page-cross
    /// bookkeeping for indexed modes; for relative mode the page comparison
    /// is against the branch opcode's own address and is only charged when
    /// the branch is taken.
    fn operand_address(&mut self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate => self.pc.wrapping_add(1),
            AddressingMode::ZeroPage => self.read(self.pc.wrapping_add(1)) as u16,
            AddressingMode::ZeroPageX => {
                self.read(self.pc.wrapping_add(1)).wrapping_add(self.x) as u16
            }
            AddressingMode::ZeroPageY => {
                self.read(self.pc.wrapping_add(1)).wrapping_add(self.y) as u16
            }
            AddressingMode::Relative => {
                // Two's complement offset, applied after PC has moved past
                // the two-byte branch.
                let offset = self.read(self.pc.wrapping_add(1)) as i8;
                let target = self.pc.wrapping_add(2).wrapping_add(offset as i16 as u16);
                self.branch_page_cross = pages_differ(self.pc, target);
                target
            }
            AddressingMode::Absolute => self.read_u16(self.pc.wrapping_add(1)),
            AddressingMode::AbsoluteX => {
                let base = self.read_u16(self.pc.wrapping_add(1));
                let addr = base.wrapping_add(self.x as u16);
                self.page_crossed = pages_differ(base, addr);
                addr
            }
            AddressingMode::AbsoluteY => {
                let base = self.read_u16(self.pc.wrapping_add(1));
                let addr = base.wrapping_add(self.y as u16);
                self.page_crossed = pages_differ(base, addr);
                addr
            }
            AddressingMode::Indirect => {
                let ptr = self.read_u16(self.pc.wrapping_add(1));
                self.read_u16_bug(ptr)
            }
            AddressingMode::IndirectX => {
                let ptr = self.read(self.pc.wrapping_add(1)).wrapping_add(self.x);
                self.read_u16_zero_page(ptr)
            }
            AddressingMode::IndirectY => {
                let base = self.read_u16_zero_page(self.read(self.pc.wrapping_add(1)));
                let addr = base.wrapping_add(self.y as u16);
                self.page_crossed = pages_differ(base, addr);
                addr
            }
        }
    }

    /// Execute one instruction and return the cycles consumed, including
    /// any interrupt service, branch, page-cross, and DMA-stall add-ons.
    ///
    /// On an invalid opcode the CPU is left exactly as it was: PC still
    /// points at the offending byte and no cycles are charged for the
    /// failed fetch.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        self.page_crossed = false;
        self.branch_taken = false;
        self.branch_page_cross = false;

        let mut used: u32 = 0;
        if let Some(kind) = self.take_pending_interrupt() {
            self.service_interrupt(kind);
            self.cycles += INTERRUPT_CYCLES as u64;
            used += INTERRUPT_CYCLES;
        }

        let pc = self.pc;
        let opcode = self.read(pc);
        let entry = match OPCODES[opcode as usize] {
            Some(entry) => entry,
            None => {
                log(LogCategory::Cpu, LogLevel::Error, || {
                    format!("invalid opcode {opcode:#04X} at PC={pc:04X}")
                });
                return Err(CpuError::InvalidOpcode { opcode, pc });
            }
        };

        if LogConfig::global().should_log(LogCategory::Cpu, LogLevel::Trace) {
            let line = self.format_trace(pc, &entry);
            log(LogCategory::Cpu, LogLevel::Trace, || line);
        }

        let addr = self.operand_address(entry.mode);

        // Advance PC before executing: jumps and branches overwrite it.
        self.pc = pc.wrapping_add(entry.bytes as u16);

        self.execute(&entry, addr);

        let mut instr_cycles = entry.cycles as u32;
        if self.branch_taken {
            instr_cycles += BRANCH_TAKEN_CYCLES;
        }
        if self.page_crossed {
            instr_cycles += entry.page_cycles as u32;
        }
        self.cycles += instr_cycles as u64;
        used += instr_cycles;

        if self.memory.take_dma_stall() {
            let stall: u32 = if self.cycles % 2 == 1 { 514 } else { 513 };
            self.cycles += stall as u64;
            used += stall;
        }

        Ok(used)
    }

    /// Format the instruction at the current PC as a nestest-style trace
    /// line without executing it:
    ///
    /// `C000  4C F5 C5  JMP  A:00 X:00 Y:00 P:24 SP:FD CYC:0`
    pub fn trace(&self) -> Result<String, CpuError> {
        let pc = self.pc;
        let opcode = self.read(pc);
        let entry = OPCODES[opcode as usize].ok_or(CpuError::InvalidOpcode { opcode, pc })?;
        Ok(self.format_trace(pc, &entry))
    }

    fn format_trace(&self, pc: u16, entry: &Opcode) -> String {
        use std::fmt::Write as _;

        let mut bytes = String::with_capacity(8);
        for i in 0..entry.bytes as u16 {
            if i > 0 {
                bytes.push(' ');
            }
            let _ = write!(bytes, "{:02X}", self.read(pc.wrapping_add(i)));
        }
        format!(
            "{:04X}  {:<8}  {:<4} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            bytes,
            entry.mnemonic.as_str(),
            self.a,
            self.x,
            self.y,
            self.status.as_byte(),
            self.sp,
            self.cycles
        )
    }

    fn execute(&mut self, entry: &Opcode, addr: u16) {
        use Mnemonic::*;
        match entry.mnemonic {
            Lda => self.lda(addr),
            Ldx => self.ldx(addr),
            Ldy => self.ldy(addr),
            Sta => self.sta(addr),
            Stx => self.stx(addr),
            Sty => self.sty(addr),
            Tax => self.tax(),
            Tay => self.tay(),
            Tsx => self.tsx(),
            Txa => self.txa(),
            Txs => self.txs(),
            Tya => self.tya(),
            Pha => self.pha(),
            Php => self.php(),
            Pla => self.pla(),
            Plp => self.plp(),
            And => self.and(addr),
            Ora => self.ora(addr),
            Eor => self.eor(addr),
            Bit => self.bit(addr),
            Adc => self.adc(addr),
            Sbc => self.sbc(addr),
            Cmp => self.cmp(addr),
            Cpx => self.cpx(addr),
            Cpy => self.cpy(addr),
            Inc => self.inc(addr),
            Dec => self.dec(addr),
            Inx => self.inx(),
            Dex => self.dex(),
            Iny => self.iny(),
            Dey => self.dey(),
            Asl => match entry.mode {
                AddressingMode::Accumulator => self.asl_accumulator(),
                _ => self.asl_memory(addr),
            },
            Lsr => match entry.mode {
                AddressingMode::Accumulator => self.lsr_accumulator(),
                _ => self.lsr_memory(addr),
            },
            Rol => match entry.mode {
                AddressingMode::Accumulator => self.rol_accumulator(),
                _ => self.rol_memory(addr),
            },
            Ror => match entry.mode {
                AddressingMode::Accumulator => self.ror_accumulator(),
                _ => self.ror_memory(addr),
            },
            Jmp => self.jmp(addr),
            Jsr => self.jsr(addr),
            Rts => self.rts(),
            Bcc => self.bcc(addr),
            Bcs => self.bcs(addr),
            Beq => self.beq(addr),
            Bmi => self.bmi(addr),
            Bne => self.bne(addr),
            Bpl => self.bpl(addr),
            Bvc => self.bvc(addr),
            Bvs => self.bvs(addr),
            Clc => self.status.c = false,
            Sec => self.status.c = true,
            Cli => self.status.i = false,
            Sei => self.status.i = true,
            Cld => self.status.d = false,
            Sed => self.status.d = true,
            Clv => self.status.v = false,
            Brk => self.brk(),
            Rti => self.rti(),
            Nop => {}
        }
    }

    // --- Load/Store ---

    fn lda(&mut self, addr: u16) {
        self.a = self.read(addr);
        self.status.set_zn(self.a);
    }

    fn ldx(&mut self, addr: u16) {
        self.x = self.read(addr);
        self.status.set_zn(self.x);
    }

    fn ldy(&mut self, addr: u16) {
        self.y = self.read(addr);
        self.status.set_zn(self.y);
    }

    fn sta(&mut self, addr: u16) {
        self.write(addr, self.a);
    }

    fn stx(&mut self, addr: u16) {
        self.write(addr, self.x);
    }

    fn sty(&mut self, addr: u16) {
        self.write(addr, self.y);
    }

    // --- Transfers ---

    fn tax(&mut self) {
        self.x = self.a;
        self.status.set_zn(self.x);
    }

    fn tay(&mut self) {
        self.y = self.a;
        self.status.set_zn(self.y);
    }

    fn tsx(&mut self) {
        self.x = self.sp;
        self.status.set_zn(self.x);
    }

    fn txa(&mut self) {
        self.a = self.x;
        self.status.set_zn(self.a);
    }

    // TXS is the one transfer that leaves the flags alone.
    fn txs(&mut self) {
        self.sp = self.x;
    }

    fn tya(&mut self) {
        self.a = self.y;
        self.status.set_zn(self.a);
    }

    // --- Stack ---

    fn pha(&mut self) {
        self.push(self.a);
    }

    /// PHP pushes P with bits 4 and 5 set.
    fn php(&mut self) {
        self.push(self.status.as_byte() | FLAG_B);
    }

    fn pla(&mut self) {
        self.a = self.pull();
        self.status.set_zn(self.a);
    }

    /// PLP restores P, ignoring pushed bits 4 and 5.
    fn plp(&mut self) {
        let p = self.pull();
        self.status = Status::from_byte(p & !FLAG_B);
    }

    // --- Logical ---

    fn and(&mut self, addr: u16) {
        self.a &= self.read(addr);
        self.status.set_zn(self.a);
    }

    fn ora(&mut self, addr: u16) {
        self.a |= self.read(addr);
        self.status.set_zn(self.a);
    }

    fn eor(&mut self, addr: u16) {
        self.a ^= self.read(addr);
        self.status.set_zn(self.a);
    }

    /// BIT: Z from A AND mem, N from bit 7 of mem, V from bit 6 of mem.
    fn bit(&mut self, addr: u16) {
        let val = self.read(addr);
        self.status.z = self.a & val == 0;
        self.status.v = val & 0x40 != 0;
        self.status.n = val & 0x80 != 0;
    }

    // --- Arithmetic ---

    /// Common core of ADC and SBC: SBC(m) is ADC(m XOR $FF).
    /// Decimal mode is ignored on this platform.
    fn add_with_carry(&mut self, val: u8) {
        let carry = self.status.c as u16;
        let sum = self.a as u16 + val as u16 + carry;
        let result = sum as u8;
        self.status.c = sum > 0xFF;
        self.status.v = (self.a ^ result) & (val ^ result) & 0x80 != 0;
        self.a = result;
        self.status.set_zn(self.a);
    }

    fn adc(&mut self, addr: u16) {
        self.add_with_carry(self.read(addr));
    }

    fn sbc(&mut self, addr: u16) {
        self.add_with_carry(self.read(addr) ^ 0xFF);
    }

    // --- Compare ---

    fn compare(&mut self, reg: u8, addr: u16) {
        let val = self.read(addr);
        self.status.set_zn(reg.wrapping_sub(val));
        self.status.c = reg >= val;
    }

    fn cmp(&mut self, addr: u16) {
        self.compare(self.a, addr);
    }

    fn cpx(&mut self, addr: u16) {
        self.compare(self.x, addr);
    }

    fn cpy(&mut self, addr: u16) {
        self.compare(self.y, addr);
    }

    // --- Increment/Decrement ---

    fn inc(&mut self, addr: u16) {
        let val = self.read(addr).wrapping_add(1);
        self.write(addr, val);
        self.status.set_zn(val);
    }

    fn dec(&mut self, addr: u16) {
        let val = self.read(addr).wrapping_sub(1);
        self.write(addr, val);
        self.status.set_zn(val);
    }

    fn inx(&mut self) {
        self.x = self.x.wrapping_add(1);
        self.status.set_zn(self.x);
    }

    fn dex(&mut self) {
        self.x = self.x.wrapping_sub(1);
        self.status.set_zn(self.x);
    }

    fn iny(&mut self) {
        self.y = self.y.wrapping_add(1);
        self.status.set_zn(self.y);
    }

    fn dey(&mut self) {
        self.y = self.y.wrapping_sub(1);
        self.status.set_zn(self.y);
    }

    // --- Shifts/Rotates ---
    //
    // Each shift/rotate is split into an accumulator form and a memory
    // form: the addressing mode does not deliver a writable target for the
    // accumulator variant.

    fn asl_accumulator(&mut self) {
        self.status.c = self.a & 0x80 != 0;
        self.a <<= 1;
        self.status.set_zn(self.a);
    }

    fn asl_memory(&mut self, addr: u16) {
        let mut val = self.read(addr);
        self.status.c = val & 0x80 != 0;
        val <<= 1;
        self.write(addr, val);
        self.status.set_zn(val);
    }

    fn lsr_accumulator(&mut self) {
        self.status.c = self.a & 0x01 != 0;
        self.a >>= 1;
        self.status.set_zn(self.a);
    }

    fn lsr_memory(&mut self, addr: u16) {
        let mut val = self.read(addr);
        self.status.c = val & 0x01 != 0;
        val >>= 1;
        self.write(addr, val);
        self.status.set_zn(val);
    }

    fn rol_accumulator(&mut self) {
        let carry_out = self.a & 0x80 != 0;
        self.a = (self.a << 1) | self.status.c as u8;
        self.status.c = carry_out;
        self.status.set_zn(self.a);
    }

    fn rol_memory(&mut self, addr: u16) {
        let old = self.read(addr);
        let carry_out = old & 0x80 != 0;
        let val = (old << 1) | self.status.c as u8;
        self.write(addr, val);
        self.status.c = carry_out;
        self.status.set_zn(val);
    }

    fn ror_accumulator(&mut self) {
        let carry_out = self.a & 0x01 != 0;
        self.a = (self.a >> 1) | ((self.status.c as u8) << 7);
        self.status.c = carry_out;
        self.status.set_zn(self.a);
    }

    fn ror_memory(&mut self, addr: u16) {
        let old = self.read(addr);
        let carry_out = old & 0x01 != 0;
        let val = (old >> 1) | ((self.status.c as u8) << 7);
        self.write(addr, val);
        self.status.c = carry_out;
        self.status.set_zn(val);
    }

    // --- Jumps/Calls ---

    fn jmp(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// JSR pushes the address of its own last byte (PC-1 after the
    /// advance) so that RTS can add 1 to the pulled address.
    fn jsr(&mut self, addr: u16) {
        self.push_u16(self.pc.wrapping_sub(1));
        self.pc = addr;
    }

    fn rts(&mut self) {
        self.pc = self.pull_u16().wrapping_add(1);
    }

    // --- Branches ---

    /// Redirect PC for a taken branch. Charges the taken-branch cycle, and
    /// the page-cross add-on when the target page differs from the branch
    /// opcode's own page.
    fn branch_to(&mut self, target: u16) {
        self.branch_taken = true;
        if self.branch_page_cross {
            self.page_crossed = true;
        }
        self.pc = target;
    }

    fn bcc(&mut self, target: u16) {
        if !self.status.c {
            self.branch_to(target);
        }
    }

    fn bcs(&mut self, target: u16) {
        if self.status.c {
            self.branch_to(target);
        }
    }

    fn beq(&mut self, target: u16) {
        if self.status.z {
            self.branch_to(target);
        }
    }

    fn bmi(&mut self, target: u16) {
        if self.status.n {
            self.branch_to(target);
        }
    }

    fn bne(&mut self, target: u16) {
        if !self.status.z {
            self.branch_to(target);
        }
    }

    fn bpl(&mut self, target: u16) {
        if !self.status.n {
            self.branch_to(target);
        }
    }

    fn bvc(&mut self, target: u16) {
        if !self.status.v {
            self.branch_to(target);
        }
    }

    fn bvs(&mut self, target: u16) {
        if self.status.v {
            self.branch_to(target);
        }
    }

    // --- Interrupts/Return ---

    /// BRK: push the address two past the opcode, push P with B set, set
    /// I, and load PC from the IRQ/BRK vector.
    fn brk(&mut self) {
        log(LogCategory::Cpu, LogLevel::Debug, || {
            format!("BRK at PC={:04X}", self.pc.wrapping_sub(1))
        });
        self.push_u16(self.pc.wrapping_add(1));
        self.push(self.status.as_byte() | FLAG_B);
        self.status.i = true;
        self.pc = self.read_u16(IRQ_VECTOR);
    }

    /// RTI pulls P (ignoring pushed bits 4 and 5), then PC low, then PC
    /// high, without the RTS-style increment.
    fn rti(&mut self) {
        let p = self.pull();
        self.status = Status::from_byte(p & !FLAG_B);
        self.pc = self.pull_u16();
    }
}

impl<M: Memory6502> crate::Cpu for Cpu6502<M> {
    type Error = CpuError;

    fn reset(&mut self) {
        Cpu6502::reset(self);
    }

    fn step(&mut self) -> Result<u32, CpuError> {
        Cpu6502::step(self)
    }
}

/// Simple array-based memory implementation for testing
#[derive(Debug)]
pub struct ArrayMemory {
    pub data: [u8; 0x10000],
}

impl ArrayMemory {
    pub fn new() -> Self {
        Self { data: [0; 0x10000] }
    }

    /// Load a program into memory and point the RESET vector at it.
    pub fn load_program(&mut self, offset: u16, program: &[u8]) {
        let off = offset as usize;
        self.data[off..off + program.len()].copy_from_slice(program);
        self.data[RESET_VECTOR as usize] = offset as u8;
        self.data[RESET_VECTOR as usize + 1] = (offset >> 8) as u8;
    }
}

impl Default for ArrayMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for ArrayMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }
}
