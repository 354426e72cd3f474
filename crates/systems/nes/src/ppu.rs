//! Picture unit register window.
//!
//! The core only needs the PPU's CPU-facing surface: eight registers at
//! $2000..$2007 (mirrored through $3FFF by the bus) and the 256-byte
//! sprite RAM filled by OAM DMA. Rendering, VRAM, and timing live behind
//! this surface and are driven by the host, not the CPU core.

use crate::bus::DeviceRegisters;
use ferricom_core::logging::{log, LogCategory, LogLevel};

pub const PPU_REGISTER_BASE: u16 = 0x2000;
const PPU_REGISTER_COUNT: usize = 8;
const OAM_LEN: usize = 256;

/// CPU-visible PPU register file plus sprite RAM.
#[derive(Debug)]
pub struct PpuRegisters {
    registers: [u8; PPU_REGISTER_COUNT],
    oam: [u8; OAM_LEN],
}

impl PpuRegisters {
    pub fn new() -> Self {
        Self {
            registers: [0; PPU_REGISTER_COUNT],
            oam: [0; OAM_LEN],
        }
    }

    /// Replace all of sprite RAM in one shot (the $4014 DMA path).
    pub fn load_oam(&mut self, data: &[u8; OAM_LEN]) {
        self.oam.copy_from_slice(data);
        log(LogCategory::Ppu, LogLevel::Debug, || {
            "OAM DMA transfer complete".to_string()
        });
    }

    pub fn oam(&self) -> &[u8] {
        &self.oam
    }
}

impl Default for PpuRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegisters for PpuRegisters {
    fn read_register(&self, addr: u16) -> u8 {
        self.registers[(addr - PPU_REGISTER_BASE) as usize % PPU_REGISTER_COUNT]
    }

    fn write_register(&mut self, addr: u16, val: u8) {
        self.registers[(addr - PPU_REGISTER_BASE) as usize % PPU_REGISTER_COUNT] = val;
    }
}
