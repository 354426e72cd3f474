//! Core emulator primitives and traits.

pub mod cpu_6502;
pub mod logging;

#[cfg(test)]
mod cpu_6502_tests;

/// A CPU-like component that can be stepped; returns cycles consumed.
pub trait Cpu {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to initial power-on state
    fn reset(&mut self);

    /// Execute one instruction (plus any pending interrupt service).
    fn step(&mut self) -> Result<u32, Self::Error>;
}

/// A high-level System trait tying components together.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to initial power-on state
    fn reset(&mut self);

    /// Advance the system by one CPU instruction; returns cycles consumed.
    fn step(&mut self) -> Result<u32, Self::Error>;

    /// Return a JSON snapshot of execution state for debugging.
    fn debug_state(&self) -> serde_json::Value;
}
