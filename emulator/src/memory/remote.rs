use tracing::{debug, trace};

use super::{BusError, Command, MemoryBus};
use crate::constants::{Address, Word};
use crate::transport::{ChannelLink, Link, TransportError};

/// A memory reached through the line protocol.
///
/// Reads block until the reply arrives, or until the link's bounded wait expires. Writes are
/// fire-and-forget; their ordering relative to later reads is guaranteed by the link.
#[derive(Debug)]
pub struct RemoteMemory {
    link: ChannelLink,
    open: bool,
}

impl RemoteMemory {
    #[must_use]
    pub const fn new(link: ChannelLink) -> Self {
        Self { link, open: true }
    }

    fn send(&mut self, command: Command) -> Result<(), BusError> {
        if !self.open {
            return Err(BusError::Closed);
        }

        trace!(%command, "Memory request");
        self.link.send_line(&command.to_string())?;
        Ok(())
    }
}

impl MemoryBus for RemoteMemory {
    fn read(&mut self, address: Address) -> Result<Word, BusError> {
        // Nothing should be waiting: only reads get a reply, and they are consumed right away
        if let Some(line) = self.link.try_recv_line() {
            return Err(BusError::UnexpectedReply { line });
        }

        let command = Command::Read(address);
        self.send(command)?;

        let reply = self
            .link
            .recv_line()?
            .ok_or(TransportError::Disconnected)?;
        reply
            .trim()
            .parse()
            .map_err(|_| BusError::MalformedReply { command, reply })
    }

    fn write(&mut self, address: Address, value: Word) -> Result<(), BusError> {
        self.send(Command::Write(address, value))
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        if self.open {
            debug!("Asking memory to quit");
            self.send(Command::Quit)?;
            self.open = false;
        }
        Ok(())
    }
}
