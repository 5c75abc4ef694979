pub type Address = usize;
pub type Word = i32;

/// Total number of cells in the address space
pub const MEMORY_SIZE: Address = 2000;

/// First address of the kernel region. Everything below is the user region.
pub const KERNEL_BASE: Address = 1000;

/// Entry point of the timer interrupt handler
pub const TIMER_VECTOR: Address = 1000;

/// Entry point of the system call handler
pub const SYSCALL_VECTOR: Address = 1500;

/// Initial stack pointer of the system stack, used on interrupt entry
pub const SYSTEM_STACK_TOP: Address = 1999;

/// Initial stack pointer of the user stack
pub const USER_STACK_TOP: Address = 999;

/// Address of the first instruction executed after boot
pub const PROGRAM_START: Address = 0;

/// Convert an address constant to a register value.
///
/// All addresses of the machine fit in a [`Word`], so this never truncates.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
#[must_use]
pub const fn word(address: Address) -> Word {
    address as Word
}
