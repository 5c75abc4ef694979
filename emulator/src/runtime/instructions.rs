use parse_display::Display;
use rand::Rng;
use tracing::{debug, warn};

use super::{exception::Interrupt, registers::Reg, Computer, ProcessorError};
use crate::constants::Word;
use crate::memory::MemoryBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    /// Load a value in the accumulator
    #[display("ld   #{0}")]
    LoadValue(Word),

    /// Load the value at an address
    #[display("ld   [{0}]")]
    LoadAddr(Word),

    /// Load the value at the address stored at an address
    #[display("ld   [[{0}]]")]
    LoadIndirect(Word),

    /// Load the value at an address offset by `%x`
    #[display("ld   [{0}+%x]")]
    LoadIdxX(Word),

    /// Load the value at an address offset by `%y`
    #[display("ld   [{0}+%y]")]
    LoadIdxY(Word),

    /// Load the value `%x` cells above the top of the stack
    #[display("ld   [%sp+%x+1]")]
    LoadSpX,

    /// Store the accumulator at an address
    #[display("st   [{0}]")]
    Store(Word),

    /// Load a random value between 1 and 100 in the accumulator
    #[display("rand")]
    Random,

    /// Write the accumulator to a port: 1 as a number, 2 as a character
    #[display("put  {0}")]
    Put(Word),

    /// Add a register to the accumulator
    #[display("add  {0}")]
    Add(Reg),

    /// Subtract a register from the accumulator
    #[display("sub  {0}")]
    Sub(Reg),

    /// Copy a register to another one
    #[display("mov  {0}, {1}")]
    Move(Reg, Reg),

    /// Unconditional jump
    #[display("jmp  {0}")]
    Jump(Word),

    /// Jump if the accumulator is zero
    #[display("jz   {0}")]
    JumpIfZero(Word),

    /// Jump if the accumulator is not zero
    #[display("jnz  {0}")]
    JumpIfNotZero(Word),

    /// Push `%pc` and go to the given address
    #[display("call {0}")]
    Call(Word),

    /// Return from a `call`
    #[display("ret")]
    Ret,

    #[display("inc  %x")]
    IncX,

    #[display("dec  %x")]
    DecX,

    /// Push the accumulator on the stack
    #[display("push %ac")]
    Push,

    /// Pop the top of the stack into the accumulator
    #[display("pop  %ac")]
    Pop,

    /// Raise a system call interrupt
    #[display("int")]
    Int,

    /// Return from an interrupt
    #[display("iret")]
    IRet,

    /// Stop the processor
    #[display("halt")]
    Halt,

    /// An unknown opcode, executed as a no-op
    #[display("???  ({0})")]
    Undefined(Word),
}

impl Instruction {
    /// Whether an opcode is followed by an operand word
    #[must_use]
    pub const fn has_operand(opcode: Word) -> bool {
        matches!(opcode, 1..=5 | 7 | 9 | 20..=23)
    }

    /// Decode an opcode. The operand is ignored by instructions without one.
    #[must_use]
    pub const fn decode(opcode: Word, operand: Word) -> Self {
        use Instruction::*;

        match opcode {
            1 => LoadValue(operand),
            2 => LoadAddr(operand),
            3 => LoadIndirect(operand),
            4 => LoadIdxX(operand),
            5 => LoadIdxY(operand),
            6 => LoadSpX,
            7 => Store(operand),
            8 => Random,
            9 => Put(operand),
            10 => Add(Reg::X),
            11 => Add(Reg::Y),
            12 => Sub(Reg::X),
            13 => Sub(Reg::Y),
            14 => Move(Reg::AC, Reg::X),
            15 => Move(Reg::X, Reg::AC),
            16 => Move(Reg::AC, Reg::Y),
            17 => Move(Reg::Y, Reg::AC),
            18 => Move(Reg::AC, Reg::SP),
            19 => Move(Reg::SP, Reg::AC),
            20 => Jump(operand),
            21 => JumpIfZero(operand),
            22 => JumpIfNotZero(operand),
            23 => Call(operand),
            24 => Ret,
            25 => IncX,
            26 => DecX,
            27 => Push,
            28 => Pop,
            29 => Int,
            30 => IRet,
            50 => Halt,
            other => Undefined(other),
        }
    }

    /// Execute the instruction
    #[tracing::instrument(skip(computer), level = "trace")]
    pub(crate) fn execute<B: MemoryBus>(
        self,
        computer: &mut Computer<B>,
    ) -> Result<(), ProcessorError> {
        use Instruction::*;

        match self {
            LoadValue(value) => {
                computer.registers.ac = value;
            }

            LoadAddr(address) => {
                computer.registers.ac = computer.read(address)?;
            }

            LoadIndirect(address) => {
                let pointer = computer.read(address)?;
                computer.registers.ac = computer.read(pointer)?;
            }

            LoadIdxX(address) => {
                let address = address.wrapping_add(computer.registers.x);
                computer.registers.ac = computer.read(address)?;
            }

            LoadIdxY(address) => {
                let address = address.wrapping_add(computer.registers.y);
                computer.registers.ac = computer.read(address)?;
            }

            LoadSpX => {
                let address = computer
                    .registers
                    .sp
                    .wrapping_add(computer.registers.x)
                    .wrapping_add(1);
                computer.registers.ac = computer.read(address)?;
            }

            Store(address) => {
                let value = computer.registers.ac;
                computer.write(address, value)?;
            }

            Random => {
                let value = computer.rng.gen_range(1..=100);
                debug!(value, "Random value");
                computer.registers.ac = value;
            }

            Put(port) => computer.put(port)?,

            Add(reg) => {
                let a = computer.registers.ac;
                let b = computer.registers.get(reg);
                let res = a.wrapping_add(b);
                debug!("{} + {} = {}", a, b, res);
                computer.registers.ac = res;
            }

            Sub(reg) => {
                let a = computer.registers.ac;
                let b = computer.registers.get(reg);
                let res = a.wrapping_sub(b);
                debug!("{} - {} = {}", a, b, res);
                computer.registers.ac = res;
            }

            Move(from, to) => {
                let value = computer.registers.get(from);
                computer.registers.set(to, value);
            }

            Jump(address) => computer.jump(address),

            JumpIfZero(address) => {
                if computer.registers.ac == 0 {
                    computer.jump(address);
                }
            }

            JumpIfNotZero(address) => {
                if computer.registers.ac != 0 {
                    computer.jump(address);
                }
            }

            Call(address) => {
                // Push PC
                let pc = computer.registers.pc;
                computer.push(pc)?;

                // Jump
                computer.jump(address);
            }

            Ret => {
                let ret = computer.pop()?; // Pop the return address
                debug!("Returning to {}", ret);
                computer.registers.pc = ret; // and jump to it
            }

            IncX => computer.registers.x = computer.registers.x.wrapping_add(1),

            DecX => computer.registers.x = computer.registers.x.wrapping_sub(1),

            Push => {
                let value = computer.registers.ac;
                computer.push(value)?;
            }

            Pop => {
                computer.registers.ac = computer.pop()?;
            }

            Int => computer.interrupt(Interrupt::SysCall)?,

            IRet => computer.return_from_interrupt()?,

            Halt => computer.halt(),

            Undefined(opcode) => {
                warn!(opcode, "Undefined opcode, ignoring it");
            }
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn operand_test() {
        let with_operand: Vec<Word> = (0..=60).filter(|op| Instruction::has_operand(*op)).collect();
        assert_eq!(with_operand, vec![1, 2, 3, 4, 5, 7, 9, 20, 21, 22, 23]);
    }

    #[test]
    fn decode_test() {
        assert_eq!(Instruction::decode(1, 7), Instruction::LoadValue(7));
        assert_eq!(Instruction::decode(6, 7), Instruction::LoadSpX);
        assert_eq!(Instruction::decode(12, 0), Instruction::Sub(Reg::X));
        assert_eq!(
            Instruction::decode(19, 0),
            Instruction::Move(Reg::SP, Reg::AC)
        );
        assert_eq!(Instruction::decode(30, 0), Instruction::IRet);
        assert_eq!(Instruction::decode(50, 0), Instruction::Halt);
        assert_eq!(Instruction::decode(0, 0), Instruction::Undefined(0));
        assert_eq!(Instruction::decode(31, 0), Instruction::Undefined(31));
        assert_eq!(Instruction::decode(-1, 0), Instruction::Undefined(-1));
    }

    #[test]
    fn display_test() {
        let listing: Vec<String> = [(3, 40), (4, 10), (9, 2), (17, 0), (23, 12), (29, 0), (77, 0)]
            .into_iter()
            .map(|(opcode, operand)| Instruction::decode(opcode, operand).to_string())
            .collect();

        insta::assert_snapshot!(listing.join("\n"), @r"
        ld   [[40]]
        ld   [10+%x]
        put  2
        mov  %y, %ac
        call 12
        int
        ???  (77)
        ");
    }
}
