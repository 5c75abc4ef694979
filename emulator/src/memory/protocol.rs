//! The line protocol spoken between the processor and the memory.
//!
//! Every command is a single line, flushed as soon as it is written:
//!   - `r<address>` reads a cell; the memory replies with one line holding its decimal value,
//!   - `w<address> <value>` writes a cell; there is no reply,
//!   - `quit` terminates the memory.

use parse_display::{Display, FromStr};

use crate::constants::{Address, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr)]
pub enum Command {
    #[display("r{0}")]
    Read(Address),

    #[display("w{0} {1}")]
    Write(Address, Word),

    #[display("quit")]
    Quit,
}
