//! NES system assembly: CPU, bus, cartridge, and device register windows
//! wired together behind a small high-level API.

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod mappers;
pub mod ppu;

use bus::NesBus;
use cartridge::{Cartridge, CartridgeError};
use ferricom_core::cpu_6502::{Cpu6502, CpuError, Interrupt};
use ferricom_core::System;
use mappers::Mapper;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced by the NES system: cartridge loading and CPU execution.
#[derive(Debug, Error)]
pub enum NesError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error(transparent)]
    Cpu(#[from] CpuError),
}

/// A NES machine. Owns every subsystem; external collaborators (picture,
/// audio, input hosts) reach in through the accessors and the interrupt
/// posting API.
#[derive(Debug)]
pub struct NesSystem {
    cpu: Cpu6502<NesBus>,
}

impl NesSystem {
    /// Build a machine with empty RAM and no cartridge.
    pub fn new() -> Self {
        Self {
            cpu: Cpu6502::new(NesBus::new()),
        }
    }

    /// Parse a cartridge image, build its mapper, and attach it to the bus.
    pub fn insert_cartridge(&mut self, data: &[u8]) -> Result<(), NesError> {
        let cart = Cartridge::from_bytes(data)?;
        let mapper = Mapper::from_cartridge(cart)?;
        self.cpu.memory.attach_mapper(mapper);
        Ok(())
    }

    /// Load a cartridge from an iNES file on disk.
    pub fn load_rom_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), NesError> {
        let cart = Cartridge::from_file(path)?;
        let mapper = Mapper::from_cartridge(cart)?;
        self.cpu.memory.attach_mapper(mapper);
        Ok(())
    }

    /// Apply the power-on RESET: registers to their initial state, PC from
    /// the vector at $FFFC.
    pub fn power_on(&mut self) {
        self.cpu.reset();
    }

    /// Advance the machine by one CPU instruction.
    pub fn step(&mut self) -> Result<u32, NesError> {
        Ok(self.cpu.step()?)
    }

    /// Post a hardware interrupt (NMI from the picture unit once per
    /// frame, IRQ from the audio unit, RESET from the host).
    pub fn request_interrupt(&mut self, kind: Interrupt) {
        self.cpu.request_interrupt(kind);
    }

    /// Nestest-style trace line for the instruction PC points at.
    pub fn trace(&self) -> Result<String, NesError> {
        Ok(self.cpu.trace()?)
    }

    pub fn cpu(&self) -> &Cpu6502<NesBus> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu6502<NesBus> {
        &mut self.cpu
    }

    pub fn bus(&self) -> &NesBus {
        &self.cpu.memory
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.cpu.memory
    }

    /// JSON snapshot of execution state for debugging: registers, cycle
    /// count, and the interrupt vector table as currently mapped.
    pub fn debug_state(&self) -> serde_json::Value {
        let bus = &self.cpu.memory;
        serde_json::json!({
            "cpu": {
                "pc": self.cpu.pc,
                "a": self.cpu.a,
                "x": self.cpu.x,
                "y": self.cpu.y,
                "sp": self.cpu.sp,
                "p": self.cpu.status.as_byte(),
                "cycles": self.cpu.cycles,
            },
            "mapper": bus.mapper().map(|m| m.mapper_number()),
            "vectors": {
                "nmi": bus.read16(0xFFFA),
                "reset": bus.read16(0xFFFC),
                "irq": bus.read16(0xFFFE),
            },
        })
    }
}

impl Default for NesSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for NesSystem {
    type Error = NesError;

    fn reset(&mut self) {
        self.power_on();
    }

    fn step(&mut self) -> Result<u32, NesError> {
        NesSystem::step(self)
    }

    fn debug_state(&self) -> serde_json::Value {
        NesSystem::debug_state(self)
    }
}
