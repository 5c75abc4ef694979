//! The memory side of the machine.
//!
//! The processor only ever talks to memory through the [`MemoryBus`] trait. The memory itself is
//! a [`MemoryStore`], which can either be driven directly in-process, or serve the line protocol
//! described in [`Command`] over a [`Link`](crate::transport::Link), in which case the processor
//! uses a [`RemoteMemory`] to reach it.

use thiserror::Error;

use crate::constants::{Address, Word};
use crate::transport::TransportError;

mod protocol;
mod remote;
mod store;

pub use self::protocol::Command;
pub use self::remote::RemoteMemory;
pub use self::store::{MemoryError, MemoryStore, ServeError, ServeOutcome};

/// Failures on the way between the processor and the memory
#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed reply {reply:?} to `{command}`")]
    MalformedReply { command: Command, reply: String },

    #[error("unexpected reply {line:?} while no read was pending")]
    UnexpectedReply { line: String },

    #[error("the memory was already shut down")]
    Closed,

    #[error(transparent)]
    Store(#[from] MemoryError),
}

/// Access to the memory, as seen from the processor.
///
/// Implementations do not check privileges: the processor validates every address before
/// reaching the bus.
pub trait MemoryBus {
    /// Read the value stored at an address
    ///
    /// # Errors
    ///
    /// Fails if the memory can't be reached or replied with garbage.
    fn read(&mut self, address: Address) -> Result<Word, BusError>;

    /// Store a value at an address
    ///
    /// # Errors
    ///
    /// Fails if the memory can't be reached.
    fn write(&mut self, address: Address, value: Word) -> Result<(), BusError>;

    /// Ask the memory to terminate. A remote memory refuses any further access, an in-process
    /// store keeps its cells readable.
    ///
    /// # Errors
    ///
    /// Fails if the memory can't be reached.
    fn shutdown(&mut self) -> Result<(), BusError>;
}

impl<B: MemoryBus + ?Sized> MemoryBus for Box<B> {
    fn read(&mut self, address: Address) -> Result<Word, BusError> {
        (**self).read(address)
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), BusError> {
        (**self).write(address, value)
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        (**self).shutdown()
    }
}
