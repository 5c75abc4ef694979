use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::{BusError, Command, MemoryBus};
use crate::constants::{Address, Word, MEMORY_SIZE};
use crate::loader::ProgramImage;
use crate::transport::{Link, TransportError};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was invalid
    #[error("invalid address {0}")]
    InvalidAddress(Address),
}

/// Errors which stop the memory from serving requests
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("malformed command {line:?}")]
    MalformedCommand { line: String },

    #[error("could not serve `{command}`")]
    Memory {
        command: Command,
        #[source]
        source: MemoryError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// How serving requests ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// A `quit` command was received
    Quit,

    /// The link closed before any `quit` command
    Disconnected,
}

/// Holds the memory cells of the computer.
///
/// The store is trusted: it does not know anything about privileges, and serves any address
/// within its bounds.
#[derive(Clone)]
pub struct MemoryStore {
    cells: Box<[Word; MEMORY_SIZE]>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            cells: Box::new([0; MEMORY_SIZE]),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("non_zero_cells", &self.dump().count())
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a program image
    ///
    /// # Errors
    ///
    /// Fails if the image has a value outside of memory.
    pub fn from_image(image: &ProgramImage) -> Result<Self, MemoryError> {
        let mut store = Self::new();
        store.load(image)?;
        Ok(store)
    }

    /// Copy a program image into memory
    ///
    /// # Errors
    ///
    /// Fails if the image has a value outside of memory. Values before it are already stored.
    pub fn load(&mut self, image: &ProgramImage) -> Result<(), MemoryError> {
        for (address, value) in image.iter() {
            self.write(address, value)?;
        }
        info!(cells = image.len(), "Program loaded in memory");
        Ok(())
    }

    /// Get the value of a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn read(&self, address: Address) -> Result<Word, MemoryError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Set the value of a cell
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn write(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(MemoryError::InvalidAddress(address))?;
        *cell = value;
        Ok(())
    }

    /// Iterate over all non-zero cells, in address order
    pub fn dump(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, value)| *value != 0)
    }

    /// Handle a single command, returning the reply to send back if any
    ///
    /// # Errors
    ///
    /// It fails if the command refers to an address out of bounds.
    pub fn handle(&mut self, command: Command) -> Result<Option<Word>, MemoryError> {
        match command {
            Command::Read(address) => Self::read(self, address).map(Some),
            Command::Write(address, value) => self.write(address, value).map(|()| None),
            Command::Quit => Ok(None),
        }
    }

    /// Serve commands from a link until a `quit` command is received or the link closes
    ///
    /// # Errors
    ///
    /// Stops on the first command that can't be parsed or served, or if the link fails.
    #[tracing::instrument(skip_all, err)]
    pub fn serve<L: Link>(&mut self, mut link: L) -> Result<ServeOutcome, ServeError> {
        debug!("Serving memory requests");

        while let Some(line) = link.recv_line()? {
            let command: Command = line
                .trim()
                .parse()
                .map_err(|_| ServeError::MalformedCommand { line })?;
            trace!(%command, "Request");

            if command == Command::Quit {
                info!("Memory received quit command");
                return Ok(ServeOutcome::Quit);
            }

            let reply = self
                .handle(command)
                .map_err(|source| ServeError::Memory { command, source })?;
            if let Some(value) = reply {
                link.send_line(&value.to_string())?;
            }
        }

        warn!("Link closed without a quit command");
        Ok(ServeOutcome::Disconnected)
    }
}

impl MemoryBus for MemoryStore {
    fn read(&mut self, address: Address) -> Result<Word, BusError> {
        Ok(Self::read(self, address)?)
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), BusError> {
        Ok(Self::write(self, address, value)?)
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}
