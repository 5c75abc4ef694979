pub mod constants;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod runtime;
pub mod transport;

pub use self::{
    loader::ProgramImage,
    machine::{Machine, MachineConfig},
};
