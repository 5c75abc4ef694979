use parse_display::{Display, FromStr};

use crate::constants::{self as C, Word};

/// The privilege level the processor runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[display(style = "lowercase")]
pub enum Mode {
    /// Only the user region of memory is reachable
    #[default]
    User,

    /// Set on interrupt entry, cleared on return from interrupt. Everything is reachable.
    Kernel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// Program counter
    pub pc: Word,

    /// Stack pointer, the next free cell of the stack
    pub sp: Word,

    /// Instruction register, the opcode being executed
    pub ir: Word,

    /// Accumulator
    pub ac: Word,

    /// Index register
    pub x: Word,

    /// Index register
    pub y: Word,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            pc: C::word(C::PROGRAM_START),
            sp: C::word(C::USER_STACK_TOP),
            ir: 0,
            ac: 0,
            x: 0,
            y: 0,
        }
    }
}

impl Registers {
    #[must_use]
    pub const fn get(&self, reg: Reg) -> Word {
        match reg {
            Reg::PC => self.pc,
            Reg::SP => self.sp,
            Reg::IR => self.ir,
            Reg::AC => self.ac,
            Reg::X => self.x,
            Reg::Y => self.y,
        }
    }

    pub fn set(&mut self, reg: Reg, value: Word) {
        let target = match reg {
            Reg::PC => &mut self.pc,
            Reg::SP => &mut self.sp,
            Reg::IR => &mut self.ir,
            Reg::AC => &mut self.ac,
            Reg::X => &mut self.x,
            Reg::Y => &mut self.y,
        };
        *target = value;
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "%pc = {} | %sp = {} | %ir = {} | %ac = {} | %x = {} | %y = {}",
            self.pc, self.sp, self.ir, self.ac, self.x, self.y
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr)]
#[display("%{}", style = "lowercase")]
pub enum Reg {
    /// Program counter
    PC,

    /// Stack pointer
    SP,

    /// Instruction register
    IR,

    /// Accumulator
    AC,

    /// Index register
    X,

    /// Index register
    Y,
}
