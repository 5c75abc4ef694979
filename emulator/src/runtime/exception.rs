use parse_display::Display;

use crate::constants::{self as C, Address};

/// The two kinds of interrupts the processor can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Interrupt {
    /// Raised after too many instructions in user mode
    Timer,

    /// Raised on purpose by the `int` instruction
    SysCall,
}

impl Interrupt {
    /// Address of the handler for this interrupt
    #[must_use]
    pub const fn vector(self) -> Address {
        match self {
            Interrupt::Timer => C::TIMER_VECTOR,
            Interrupt::SysCall => C::SYSCALL_VECTOR,
        }
    }
}

/// The kind of memory access being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Access {
    Read,
    Write,
}
