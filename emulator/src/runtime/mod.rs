use std::fmt::Debug;
use std::io::Write;
use std::num::NonZeroU32;

use rand::{rngs::StdRng, RngCore, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::constants::{self as C, Address, Word};
use crate::memory::{BusError, MemoryBus};

mod exception;
mod instructions;
mod registers;

pub use self::exception::{Access, Interrupt};
pub use self::instructions::Instruction;
pub use self::registers::{Mode, Reg, Registers};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("protection fault: {access} of address {address} in user mode")]
    ProtectionFault { address: Word, access: Access },

    #[error("{access} of address {address}, outside of memory")]
    AddressOutOfRange { address: Word, access: Access },

    #[error("memory channel failure: {0}")]
    Bus(#[from] BusError),

    #[error("could not write to the console: {0}")]
    Console(#[source] std::io::Error),
}

impl ProcessorError {
    /// Whether this error was caused by the running program, and not by the machine itself
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::ProtectionFault { .. } | Self::AddressOutOfRange { .. }
        )
    }
}

type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// The processor, driving a memory through a [`MemoryBus`]
pub struct Computer<B> {
    pub registers: Registers,
    pub mode: Mode,

    /// Instructions retired in user mode since the last return from interrupt
    pub counter: u32,

    /// Total number of instructions retired
    pub cycles: u64,

    timer: u32,
    status: Status,
    bus: B,
    rng: Box<dyn RngCore>,
    console: Box<dyn Write>,
}

impl<B> Debug for Computer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, mode: {}, counter: {}, status: {:?}, memory: [...] }}",
            self.registers, self.mode, self.counter, self.status
        )
    }
}

impl<B: MemoryBus> Computer<B> {
    /// Create a processor in its boot state.
    ///
    /// A timer interrupt is raised once more than `timer` instructions ran in user mode since
    /// the last return from interrupt.
    #[must_use]
    pub fn new(bus: B, timer: NonZeroU32) -> Self {
        Self {
            registers: Registers::default(),
            mode: Mode::User,
            counter: 0,
            cycles: 0,
            timer: timer.get(),
            status: Status::Running,
            bus,
            rng: Box::new(StdRng::from_entropy()),
            console: Box::new(std::io::stdout()),
        }
    }

    /// Replace the source of randomness
    #[must_use]
    pub fn with_rng<R: RngCore + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Use a deterministic source of randomness
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// Replace the console the `put` instruction writes to
    #[must_use]
    pub fn with_console<W: Write + 'static>(mut self, console: W) -> Self {
        self.console = Box::new(console);
        self
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    #[must_use]
    pub const fn timer(&self) -> u32 {
        self.timer
    }

    #[must_use]
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[must_use]
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Validate an address before accessing it
    fn check(&self, address: Word, access: Access) -> Result<Address> {
        if self.mode == Mode::User && address >= C::word(C::KERNEL_BASE) {
            warn!(address, %access, "Protection fault");
            return Err(ProcessorError::ProtectionFault { address, access });
        }

        Address::try_from(address)
            .ok()
            .filter(|address| *address < C::MEMORY_SIZE)
            .ok_or(ProcessorError::AddressOutOfRange { address, access })
    }

    pub(crate) fn read(&mut self, address: Word) -> Result<Word> {
        let address = self.check(address, Access::Read)?;
        Ok(self.bus.read(address)?)
    }

    pub(crate) fn write(&mut self, address: Word, value: Word) -> Result<()> {
        let address = self.check(address, Access::Write)?;
        Ok(self.bus.write(address, value)?)
    }

    fn jump(&mut self, address: Word) {
        debug!("Jumping to address {}", address);
        self.registers.pc = address;
    }

    fn halt(&mut self) {
        debug!("Halting");
        self.status = Status::Halted;
    }

    /// Read the word at `%pc` and move to the next one
    fn fetch(&mut self) -> Result<Word> {
        let word = self.read(self.registers.pc)?;
        self.registers.pc = self.registers.pc.wrapping_add(1);
        Ok(word)
    }

    #[tracing::instrument(skip(self), err)]
    fn decode_instruction(&mut self) -> Result<Instruction> {
        let opcode = self.fetch()?;
        self.registers.ir = opcode;
        let operand = if Instruction::has_operand(opcode) {
            self.fetch()?
        } else {
            0
        };
        Ok(Instruction::decode(opcode, operand))
    }

    /// Write the accumulator to a console port
    fn put(&mut self, port: Word) -> Result<()> {
        let value = self.registers.ac;
        let res = match port {
            1 => write!(self.console, "{value}"),
            2 => match u32::try_from(value).ok().and_then(char::from_u32) {
                Some(c) => write!(self.console, "{c}"),
                None => {
                    warn!(value, "Not a character, nothing written");
                    Ok(())
                }
            },
            _ => {
                debug!(port, "Write to an unknown port ignored");
                Ok(())
            }
        };

        res.and_then(|()| self.console.flush())
            .map_err(ProcessorError::Console)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn push(&mut self, value: Word) -> Result<()> {
        // Write at the stack pointer
        self.write(self.registers.sp, value)?;

        // And move it down
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn pop(&mut self) -> Result<Word> {
        // First move the SP
        self.registers.sp = self.registers.sp.wrapping_add(1);
        // Then read the value
        let val = self.read(self.registers.sp)?;
        debug!("Popping value: {:?}", val);
        Ok(val)
    }

    /// Enter an interrupt handler.
    ///
    /// Switches to kernel mode and to the system stack, on which the user `%sp` and `%pc` are
    /// saved. Interrupts do not nest: a system call made in kernel mode is ignored.
    ///
    /// # Errors
    ///
    /// Fails if the memory can't be reached to save the registers.
    #[tracing::instrument(skip(self))]
    pub fn interrupt(&mut self, kind: Interrupt) -> Result<()> {
        if self.mode == Mode::Kernel {
            warn!(%kind, "Already in kernel mode, interrupt ignored");
            return Ok(());
        }

        debug!(pc = self.registers.pc, sp = self.registers.sp, "Entering interrupt");
        self.mode = Mode::Kernel;
        let sp = self.registers.sp;
        self.registers.sp = C::word(C::SYSTEM_STACK_TOP);
        self.push(sp)?;
        let pc = self.registers.pc;
        self.push(pc)?;
        self.registers.pc = C::word(kind.vector());
        Ok(())
    }

    /// Leave an interrupt handler, restoring `%pc` and `%sp` from the stack
    ///
    /// # Errors
    ///
    /// Fails if the saved registers can't be read back, for example when `%sp` was moved out of
    /// memory by the handler.
    #[tracing::instrument(skip(self))]
    pub fn return_from_interrupt(&mut self) -> Result<()> {
        self.registers.pc = self.pop()?;
        self.registers.sp = self.pop()?;
        self.mode = Mode::User;
        self.counter = 0;
        debug!(pc = self.registers.pc, sp = self.registers.sp, "Returned from interrupt");
        Ok(())
    }

    /// Run one fetch, execute and interrupt check cycle
    ///
    /// # Errors
    ///
    /// Fails on a protection fault, an access outside of memory, or when the memory can't be
    /// reached. None of these are recoverable.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<Status> {
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }

        let pc = self.registers.pc;
        let instruction = self.decode_instruction()?;
        debug!(pc, "Executing instruction \"{}\"", instruction);
        instruction.execute(self)?;
        self.cycles += 1;

        if self.mode == Mode::User && instruction != Instruction::IRet {
            self.counter = self.counter.saturating_add(1);
        }

        if self.status == Status::Halted {
            info!(cycles = self.cycles, "Halted");
        } else if self.mode == Mode::User && self.counter > self.timer {
            debug!(counter = self.counter, "Timer expired");
            self.interrupt(Interrupt::Timer)?;
        }

        trace!("Register state {}", self.registers);
        Ok(self.status)
    }

    /// Run until the processor halts
    ///
    /// # Errors
    ///
    /// Stops on the first error raised by [`Computer::step`].
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        while self.step()? == Status::Running {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rand::Rng;

    use super::*;
    use crate::loader::ProgramImage;
    use crate::memory::{Command, MemoryStore};
    use crate::transport::TransportError;

    /// A console whose content can be inspected after being handed to the computer
    #[derive(Clone, Default)]
    struct SharedConsole(Rc<RefCell<Vec<u8>>>);

    impl SharedConsole {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedConsole {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn boot(image: &ProgramImage, timer: u32) -> Computer<MemoryStore> {
        let store = MemoryStore::from_image(image).unwrap();
        Computer::new(store, NonZeroU32::new(timer).unwrap())
            .with_seed(0)
            .with_console(std::io::sink())
    }

    fn computer(program: &[Word]) -> Computer<MemoryStore> {
        boot(&ProgramImage::from_words(program), 1000)
    }

    #[test]
    fn load_store_test() {
        let mut computer = computer(&[1, 7, 7, 0, 2, 0, 50]);

        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 7);
        assert_eq!(computer.registers.pc, 2);
        computer.step().unwrap();
        assert_eq!(computer.bus().read(0), Ok(7));
        computer.registers.ac = 0;
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 7);
        assert_eq!(computer.registers.ir, 2);

        assert_eq!(computer.step().unwrap(), Status::Halted);
        assert!(computer.is_halted());
        assert_eq!(computer.cycles, 4);

        // Nothing happens once halted
        assert_eq!(computer.step().unwrap(), Status::Halted);
        assert_eq!(computer.cycles, 4);
    }

    #[test]
    fn addressing_modes_test() {
        let image = ProgramImage::from_words(&[
            3, 100, // ld [[100]]  => [200] = 11
            14, // mov %ac, %x
            4, 90, // ld [90+%x]  => [101] = 22
            16, // mov %ac, %y
            5, 78, // ld [78+%y]  => [100] = 200
            50,
        ])
        .with_segment(100, &[200, 22])
        .with_segment(200, &[11]);
        let mut computer = boot(&image, 1000);

        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 11);
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 22);
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 200);
    }

    #[test]
    fn stack_offset_test() {
        // Push 3 values, then read them back relative to %sp
        let mut computer = computer(&[
            1, 10, 27, // push 10
            1, 20, 27, // push 20
            1, 30, 27, // push 30
            1, 1, 14, // %x = 1
            6,  // ld [%sp+%x+1]
            50,
        ]);
        computer.run().unwrap();

        assert_eq!(computer.registers.sp, 996);
        assert_eq!(computer.registers.ac, 20);
    }

    #[test]
    fn arithmetic_and_moves_test() {
        let mut computer = computer(&[
            1, 5, 14, // %x = 5
            1, 3, 16, // %y = 3
            1, 100, // %ac = 100
            10, // %ac += %x => 105
            11, // %ac += %y => 108
            12, // %ac -= %x => 103
            12, // %ac -= %x => 98
            13, // %ac -= %y => 95
            25, 25, 26, // %x += 1 twice, -= 1 once => 6
            15, // %ac = %x
            50,
        ]);

        for _ in 0..10 {
            computer.step().unwrap();
        }
        assert_eq!(computer.registers.ac, 95);

        computer.run().unwrap();
        assert_eq!(computer.registers.x, 6);
        assert_eq!(computer.registers.y, 3);
        assert_eq!(computer.registers.ac, 6);
    }

    #[test]
    fn stack_pointer_moves_test() {
        let mut computer = computer(&[19, 14, 1, 500, 18, 17, 50]);
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 999);
        computer.step().unwrap();
        assert_eq!(computer.registers.x, 999);
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.sp, 500);
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 0);
    }

    #[test]
    fn arithmetic_wraps_test() {
        let mut computer = computer(&[10, 50]);
        computer.registers.ac = Word::MAX;
        computer.registers.x = 1;
        computer.run().unwrap();
        assert_eq!(computer.registers.ac, Word::MIN);
    }

    #[test]
    fn jumps_test() {
        let mut computer = computer(&[
            21, 6, // jz 6 (taken, %ac = 0)
            1, 1, // (skipped)
            50, 50, //
            1, 4, // %ac = 4
            22, 12, // jnz 12 (taken)
            50, 50, //
            26, // dec %x (%x = -1)
            21, 0, // jz 0 (not taken)
            20, 18, // jmp 18
            50, //
            50,
        ]);
        computer.run().unwrap();

        assert_eq!(computer.registers.pc, 19);
        assert_eq!(computer.registers.ac, 4);
        assert_eq!(computer.registers.x, -1);
        assert_eq!(computer.cycles, 7);
    }

    #[test]
    fn call_test() {
        let image = ProgramImage::from_words(&[
            23, 10, // call 10
            50,
        ])
        .with_segment(10, &[1, 9, 24]);
        let mut computer = boot(&image, 1000);

        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 10);
        assert_eq!(computer.registers.sp, 998);
        assert_eq!(computer.bus().read(999), Ok(2));

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 2);
        assert_eq!(computer.registers.sp, 999);
        assert_eq!(computer.registers.ac, 9);

        assert_eq!(computer.step().unwrap(), Status::Halted);
    }

    #[test]
    fn push_pop_test() {
        let mut computer = computer(&[]);

        for value in [0, 1, -1, 42, Word::MAX] {
            let sp = computer.registers.sp;
            computer.push(value).unwrap();
            assert_eq!(computer.registers.sp, sp - 1);
            assert_eq!(computer.pop().unwrap(), value);
            assert_eq!(computer.registers.sp, sp);
        }

        computer.push(1).unwrap();
        computer.push(2).unwrap();
        assert_eq!(computer.pop().unwrap(), 2);
        assert_eq!(computer.pop().unwrap(), 1);
    }

    #[test]
    fn push_pop_instructions_test() {
        let mut computer = computer(&[1, 8, 27, 1, 0, 28, 50]);
        computer.run().unwrap();
        assert_eq!(computer.registers.ac, 8);
        assert_eq!(computer.registers.sp, 999);
    }

    #[test]
    fn protected_read_test() {
        let mut computer = computer(&[1, 3, 2, 1000, 50]);
        computer.step().unwrap();

        let err = computer.step().unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::ProtectionFault {
                address: 1000,
                access: Access::Read
            }
        ));
        assert!(err.is_fault());
        assert_eq!(computer.registers.ac, 3);
    }

    #[test]
    fn protected_write_test() {
        for address in [1000, 1500, 1999, 2500] {
            let mut computer = computer(&[1, 5, 7, address, 50]);
            computer.step().unwrap();

            let err = computer.step().unwrap_err();
            assert!(matches!(
                err,
                ProcessorError::ProtectionFault { address: a, access: Access::Write } if a == address
            ));
            assert_eq!(computer.bus().dump().collect::<Vec<_>>().len(), 5);
        }
    }

    #[test]
    fn protected_fetch_test() {
        let mut computer = computer(&[20, 1000]);
        computer.step().unwrap();
        assert!(matches!(
            computer.step(),
            Err(ProcessorError::ProtectionFault {
                address: 1000,
                access: Access::Read
            })
        ));
    }

    #[test]
    fn protected_stack_test() {
        // Pushing with the stack pointer in the kernel region
        let mut computer = computer(&[1, 1000, 18, 27, 50]);
        computer.step().unwrap();
        computer.step().unwrap();
        assert!(matches!(
            computer.step(),
            Err(ProcessorError::ProtectionFault {
                address: 1000,
                access: Access::Write
            })
        ));
        assert_eq!(computer.bus().read(1000), Ok(0));
    }

    #[test]
    fn out_of_range_test() {
        let mut computer = computer(&[1, -5, 14, 4, 0, 50]);
        computer.step().unwrap();
        computer.step().unwrap();
        let err = computer.step().unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::AddressOutOfRange {
                address: -5,
                access: Access::Read
            }
        ));
        assert!(err.is_fault());
    }

    #[test]
    fn syscall_test() {
        let image = ProgramImage::from_words(&[
            1, 3, 14, 16, // %ac = %x = %y = 3
            29, // int
            15, // mov %x, %ac
            50,
        ])
        // The handler reads kernel data, and clobbers %x before returning
        .with_segment(1500, &[2, 1700, 14, 30])
        .with_segment(1700, &[77]);
        let mut computer = boot(&image, 1000);

        for _ in 0..4 {
            computer.step().unwrap();
        }
        assert_eq!(computer.mode, Mode::Kernel);
        assert_eq!(computer.registers.pc, 1500);
        assert_eq!(computer.registers.sp, 1997);
        assert_eq!(computer.bus().read(1999), Ok(999));
        assert_eq!(computer.bus().read(1998), Ok(5));

        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 77);
        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.mode, Mode::User);
        assert_eq!(computer.registers.pc, 5);
        assert_eq!(computer.registers.sp, 999);
        assert_eq!(computer.counter, 0);

        computer.run().unwrap();
        assert_eq!(computer.registers.ac, 77);
    }

    #[test]
    fn syscall_ignores_registers_test() {
        for (ac, x, y) in [(0, 0, 0), (-1, 5, 9), (Word::MAX, Word::MIN, 1500)] {
            let mut computer = computer(&[29]);
            computer.registers.ac = ac;
            computer.registers.x = x;
            computer.registers.y = y;

            computer.step().unwrap();
            assert_eq!(computer.mode, Mode::Kernel);
            assert_eq!(computer.registers.pc, 1500);
        }
    }

    #[test]
    fn nested_syscall_test() {
        let image = ProgramImage::from_words(&[29, 50]).with_segment(1500, &[29, 30]);
        let mut computer = boot(&image, 1000);

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 1501);
        assert_eq!(computer.registers.sp, 1997);

        computer.step().unwrap();
        assert_eq!(computer.registers.pc, 1);
        computer.run().unwrap();
    }

    #[test]
    fn interrupt_round_trip_test() {
        for (pc, sp) in [(0, 999), (17, 500), (998, 3)] {
            let image = ProgramImage::from_words(&[]).with_segment(1000, &[30]);
            let mut computer = boot(&image, 1000);
            computer.registers.pc = pc;
            computer.registers.sp = sp;
            computer.counter = 12;

            computer.interrupt(Interrupt::Timer).unwrap();
            assert_eq!(computer.mode, Mode::Kernel);
            assert_eq!(computer.registers.pc, 1000);

            computer.step().unwrap();
            assert_eq!(computer.registers.pc, pc);
            assert_eq!(computer.registers.sp, sp);
            assert_eq!(computer.mode, Mode::User);
            assert_eq!(computer.counter, 0);
        }
    }

    #[test]
    fn timer_test() {
        let image = ProgramImage::from_words(&[1, 1, 1, 2, 1, 3, 1, 4, 50])
            .with_segment(1000, &[30]);
        let mut computer = boot(&image, 2);

        computer.step().unwrap();
        computer.step().unwrap();
        assert_eq!(computer.counter, 2);
        assert_eq!(computer.mode, Mode::User);
        assert_eq!(computer.registers.pc, 4);

        // The third instruction completes, then the interrupt is taken
        computer.step().unwrap();
        assert_eq!(computer.registers.ac, 3);
        assert_eq!(computer.mode, Mode::Kernel);
        assert_eq!(computer.registers.pc, 1000);
        assert_eq!(computer.bus().read(1998), Ok(6));
        assert_eq!(computer.bus().read(1999), Ok(999));

        computer.step().unwrap();
        assert_eq!(computer.mode, Mode::User);
        assert_eq!(computer.registers.pc, 6);
        assert_eq!(computer.counter, 0);

        assert_eq!(computer.step().unwrap(), Status::Running);
        assert_eq!(computer.step().unwrap(), Status::Halted);
        assert_eq!(computer.registers.pc, 9);
        assert_eq!(computer.mode, Mode::User);
    }

    #[test]
    fn timer_not_in_kernel_mode_test() {
        // A long system call never gets interrupted by the timer
        let image = ProgramImage::from_words(&[29, 50])
            .with_segment(1500, &[1, 1, 1, 2, 1, 3, 1, 4, 30]);
        let mut computer = boot(&image, 1);

        computer.run().unwrap();
        assert_eq!(computer.registers.ac, 4);
        assert_eq!(computer.counter, 1);
        assert_eq!(computer.cycles, 7);
    }

    #[test]
    fn undefined_opcode_test() {
        let mut computer = computer(&[42, 0, 1, 5, 50]);
        computer.run().unwrap();
        assert_eq!(computer.registers.ac, 5);
        assert_eq!(computer.cycles, 4);
    }

    #[test]
    fn random_test() {
        let mut computer = computer(&[8, 8, 8, 50]).with_seed(1234);
        let mut expected = StdRng::seed_from_u64(1234);

        for _ in 0..3 {
            computer.step().unwrap();
            let value: Word = expected.gen_range(1..=100);
            assert_eq!(computer.registers.ac, value);
            assert!((1..=100).contains(&computer.registers.ac));
        }
    }

    #[test]
    fn put_test() {
        let console = SharedConsole::default();
        let mut computer = computer(&[
            1, 65, 9, 2, // 'A'
            1, 42, 9, 1, // 42
            9, 3, // unknown port
            1, -4, 9, 1, // -4
            9, 2, // not a character
            1, 10, 9, 2, // '\n'
            50,
        ])
        .with_console(console.clone());

        computer.run().unwrap();
        assert_eq!(console.contents(), "A42-4\n");
    }

    /// A console which refuses every write
    struct ClosedConsole;

    impl Write for ClosedConsole {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn console_error_test() {
        let mut computer = computer(&[1, 7, 9, 1, 50]).with_console(ClosedConsole);
        computer.step().unwrap();

        let err = computer.step().unwrap_err();
        assert!(matches!(err, ProcessorError::Console(_)));
        assert!(!err.is_fault());
        assert!(err
            .to_string()
            .starts_with("could not write to the console: "));
    }

    #[test]
    fn channel_failure_display_test() {
        let timeout = ProcessorError::from(BusError::Transport(TransportError::Timeout(
            Duration::from_millis(200),
        )));
        assert_eq!(
            timeout.to_string(),
            "memory channel failure: no reply after 200ms"
        );

        let malformed = ProcessorError::from(BusError::MalformedReply {
            command: Command::Read(0),
            reply: "r0".into(),
        });
        assert_eq!(
            malformed.to_string(),
            "memory channel failure: malformed reply \"r0\" to `r0`"
        );

        let unexpected = ProcessorError::from(BusError::UnexpectedReply { line: "5".into() });
        assert_eq!(
            unexpected.to_string(),
            "memory channel failure: unexpected reply \"5\" while no read was pending"
        );

        let disconnected = ProcessorError::from(BusError::Transport(TransportError::Disconnected));
        assert_eq!(
            disconnected.to_string(),
            "memory channel failure: the other side of the link hung up"
        );
    }
}
