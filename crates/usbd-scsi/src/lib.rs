pub mod commands;
mod emulator;
mod error;

pub use emulator::Emulator;
pub use error::ScsiError;
