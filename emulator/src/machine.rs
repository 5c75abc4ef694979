//! Wires a processor to a memory side, runs it, and shuts everything down in order.

use std::io::Write;
use std::num::NonZeroU32;
use std::process::{Child, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::loader::ProgramImage;
use crate::memory::{
    BusError, MemoryBus, MemoryError, MemoryStore, RemoteMemory, ServeError, ServeOutcome,
};
use crate::runtime::{Computer, ProcessorError, Registers, Status};
use crate::transport::{ChannelLink, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of user instructions allowed between two timer interrupts
    pub timer: NonZeroU32,

    /// How long to wait for the memory to answer a read. `None` waits forever.
    pub reply_timeout: Option<Duration>,

    /// Seed for the `rand` instruction
    pub seed: Option<u64>,

    /// Stop after this many retired instructions
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            timer: NonZeroU32::MIN.saturating_add(99),
            reply_timeout: Some(Duration::from_secs(5)),
            seed: None,
            max_steps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("could not load the program in memory")]
    Load(#[from] MemoryError),

    #[error("could not start the memory")]
    Spawn(#[source] std::io::Error),

    #[error("the memory process has no {0} pipe")]
    MissingPipe(&'static str),
}

/// How the processor stopped
#[derive(Debug)]
pub enum Outcome {
    Halted,
    Faulted(ProcessorError),
    StepLimit(u64),
}

/// How the memory side terminated
#[derive(Debug)]
pub enum MemoryExit {
    /// It acknowledged the quit command
    Clean,

    /// It stopped when the link closed, without a quit command
    Disconnected,

    /// It stopped on an error
    Failed(String),

    /// Exit status of a memory process
    Exited(ExitStatus),
}

impl std::fmt::Display for MemoryExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "exited cleanly"),
            Self::Disconnected => write!(f, "stopped on disconnection"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Exited(status) => write!(f, "{status}"),
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub outcome: Outcome,
    pub registers: Registers,
    pub cycles: u64,
    pub memory: MemoryExit,
}

impl Report {
    /// Process exit code matching the outcome of the run
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match &self.outcome {
            Outcome::Halted => 0,
            Outcome::Faulted(e) if e.is_fault() => 2,
            Outcome::Faulted(ProcessorError::Bus(_)) => 3,
            Outcome::Faulted(_) | Outcome::StepLimit(_) => 1,
        }
    }
}

enum MemorySide {
    Direct,
    Thread(JoinHandle<Result<ServeOutcome, ServeError>>),
    Process {
        child: Child,
        writer: JoinHandle<std::io::Result<()>>,
    },
}

impl MemorySide {
    #[tracing::instrument(skip(self))]
    fn finish(self, stuck: bool) -> MemoryExit {
        match self {
            Self::Direct => MemoryExit::Clean,

            Self::Thread(handle) => match handle.join() {
                Ok(Ok(ServeOutcome::Quit)) => MemoryExit::Clean,
                Ok(Ok(ServeOutcome::Disconnected)) => MemoryExit::Disconnected,
                Ok(Err(e)) => MemoryExit::Failed(e.to_string()),
                Err(_) => MemoryExit::Failed("memory thread panicked".into()),
            },

            Self::Process { mut child, writer } => {
                match writer.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "Could not write to the memory process"),
                    Err(_) => warn!("Memory link writer panicked"),
                }

                if stuck {
                    warn!("Memory process is not answering, killing it");
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "Could not kill the memory process");
                    }
                }

                match child.wait() {
                    Ok(status) => MemoryExit::Exited(status),
                    Err(e) => MemoryExit::Failed(e.to_string()),
                }
            }
        }
    }
}

/// A processor connected to its memory
pub struct Machine {
    computer: Computer<Box<dyn MemoryBus>>,
    memory: MemorySide,
    max_steps: Option<u64>,
}

impl Machine {
    fn with_bus(bus: Box<dyn MemoryBus>, memory: MemorySide, config: &MachineConfig) -> Self {
        let computer = Computer::new(bus, config.timer);
        let computer = match config.seed {
            Some(seed) => computer.with_seed(seed),
            None => computer,
        };

        Self {
            computer,
            memory,
            max_steps: config.max_steps,
        }
    }

    /// Drive the memory in-process, without going through the protocol
    ///
    /// # Errors
    ///
    /// Fails if the image does not fit in memory.
    pub fn direct(image: &ProgramImage, config: &MachineConfig) -> Result<Self, MachineError> {
        let store = MemoryStore::from_image(image)?;
        info!(cells = image.len(), "Memory loaded");
        Ok(Self::with_bus(Box::new(store), MemorySide::Direct, config))
    }

    /// Serve the memory from a separate thread
    ///
    /// # Errors
    ///
    /// Fails if the image does not fit in memory, or if the thread can't be spawned.
    pub fn threaded(image: &ProgramImage, config: &MachineConfig) -> Result<Self, MachineError> {
        let mut store = MemoryStore::from_image(image)?;
        info!(cells = image.len(), "Memory loaded");

        let (cpu, memory) = ChannelLink::pair();
        let handle = std::thread::Builder::new()
            .name("memory".into())
            .spawn(move || store.serve(memory))
            .map_err(MachineError::Spawn)?;

        let bus = RemoteMemory::new(cpu.with_timeout(config.reply_timeout));
        Ok(Self::with_bus(
            Box::new(bus),
            MemorySide::Thread(handle),
            config,
        ))
    }

    /// Serve the memory from a child process, speaking the protocol on its stdin and stdout.
    ///
    /// The command is expected to load the program by itself.
    ///
    /// # Errors
    ///
    /// Fails if the process can't be started.
    pub fn process(
        mut command: std::process::Command,
        config: &MachineConfig,
    ) -> Result<Self, MachineError> {
        debug!(?command, "Spawning memory process");
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(MachineError::Spawn)?;

        let stdin = child.stdin.take().ok_or(MachineError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(MachineError::MissingPipe("stdout"))?;

        let (link, writer) =
            ChannelLink::over_streams(stdout, stdin).map_err(MachineError::Spawn)?;
        info!(pid = child.id(), "Memory process started");

        let bus = RemoteMemory::new(link.with_timeout(config.reply_timeout));
        Ok(Self::with_bus(
            Box::new(bus),
            MemorySide::Process { child, writer },
            config,
        ))
    }

    /// Replace the console the program writes to
    #[must_use]
    pub fn with_console<W: Write + 'static>(mut self, console: W) -> Self {
        self.computer = self.computer.with_console(console);
        self
    }

    /// Run until the processor halts or fails, then shut the memory down
    #[tracing::instrument(skip(self))]
    pub fn run(self) -> Report {
        let Self {
            mut computer,
            memory,
            max_steps,
        } = self;

        info!("Booting");
        let outcome = loop {
            if let Some(limit) = max_steps {
                if computer.cycles >= limit {
                    error!(limit, "Step limit reached");
                    break Outcome::StepLimit(limit);
                }
            }

            match computer.step() {
                Ok(Status::Running) => {}
                Ok(Status::Halted) => break Outcome::Halted,
                Err(e) => {
                    error!(error = %e, "Processor stopped");
                    break Outcome::Faulted(e);
                }
            }
        };

        if let Err(e) = computer.bus_mut().shutdown() {
            warn!(error = %e, "Could not shut down the memory");
        }

        let registers = computer.registers.clone();
        let cycles = computer.cycles;
        info!("Final state {}", registers);

        // Closes the link, so the memory side sees the end of its input
        drop(computer);

        let stuck = matches!(
            outcome,
            Outcome::Faulted(ProcessorError::Bus(BusError::Transport(
                TransportError::Timeout(_)
            )))
        );
        let memory = memory.finish(stuck);
        info!(%memory, "Memory terminated");

        Report {
            outcome,
            registers,
            cycles,
            memory,
        }
    }
}
