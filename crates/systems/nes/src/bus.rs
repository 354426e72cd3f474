//! CPU-side memory bus.
//!
//! A flat 16-bit address space routed over three backing stores: 2 KiB of
//! internal RAM (mirrored through $1FFF), memory-mapped device registers
//! (PPU window with 8-byte mirroring, APU/IO window), and cartridge space
//! behind the mapper. Every address is routable; the bus itself never
//! fails. Device side effects belong to the devices, the bus only
//! forwards.

use crate::apu::ApuRegisters;
use crate::mappers::Mapper;
use crate::ppu::{PpuRegisters, PPU_REGISTER_BASE};
use ferricom_core::cpu_6502::Memory6502;
use ferricom_core::logging::{log, LogCategory, LogLevel};

const RAM_LEN: usize = 0x0800;
const RAM_END: u16 = 0x1FFF;
const PPU_WINDOW_END: u16 = 0x3FFF;
const OAM_DMA: u16 = 0x4014;
const IO_WINDOW_END: u16 = 0x4017;
const DISABLED_END: u16 = 0x401F;

/// Memory-mapped device register interface, implemented by the PPU and
/// APU register files and by the cartridge mapper.
pub trait DeviceRegisters {
    /// Read a byte from a device register.
    fn read_register(&self, addr: u16) -> u8;

    /// Write a byte to a device register.
    fn write_register(&mut self, addr: u16, val: u8);
}

/// The NES CPU bus. Owns internal RAM and the attached device register
/// files; the mapper arrives when a cartridge is inserted.
#[derive(Debug)]
pub struct NesBus {
    ram: [u8; RAM_LEN],
    pub ppu: PpuRegisters,
    pub apu: ApuRegisters,
    mapper: Option<Mapper>,
    dma_stall: bool,
}

impl NesBus {
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_LEN],
            ppu: PpuRegisters::new(),
            apu: ApuRegisters::new(),
            mapper: None,
            dma_stall: false,
        }
    }

    /// Attach a cartridge mapper, routing $4020..$FFFF to it.
    pub fn attach_mapper(&mut self, mapper: Mapper) {
        log(LogCategory::Bus, LogLevel::Info, || {
            format!("mapper {} attached", mapper.mapper_number())
        });
        self.mapper = Some(mapper);
    }

    pub fn mapper(&self) -> Option<&Mapper> {
        self.mapper.as_ref()
    }

    /// Little-endian two-byte fetch with 16-bit wraparound.
    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// $4014 write: copy one 256-byte page into PPU sprite RAM. The CPU
    /// picks the stall up through `take_dma_stall`.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let mut buf = [0u8; 256];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read(base.wrapping_add(i as u16));
        }
        self.ppu.load_oam(&buf);
        self.dma_stall = true;
    }
}

impl Default for NesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for NesBus {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            // Internal RAM, mirrored every 2 KiB.
            0x0000..=RAM_END => self.ram[addr as usize % RAM_LEN],
            // PPU registers, mirrored every 8 bytes.
            0x2000..=PPU_WINDOW_END => {
                let reg = PPU_REGISTER_BASE + addr % 8;
                self.ppu.read_register(reg)
            }
            // Controller ports: polled by the host input layer, not here.
            0x4016 | 0x4017 => 0x00,
            0x4000..=0x4015 => self.apu.read_register(addr),
            // Normally-disabled test-mode region.
            0x4018..=DISABLED_END => 0x00,
            // Cartridge space.
            _ => match &self.mapper {
                Some(mapper) => mapper.read_register(addr),
                None => 0x00,
            },
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=RAM_END => self.ram[addr as usize % RAM_LEN] = val,
            0x2000..=PPU_WINDOW_END => {
                let reg = PPU_REGISTER_BASE + addr % 8;
                self.ppu.write_register(reg, val);
            }
            OAM_DMA => self.oam_dma(val),
            // $4016 strobes the controllers; input is handled by the host.
            0x4016 => {}
            0x4000..=IO_WINDOW_END => self.apu.write_register(addr, val),
            0x4018..=DISABLED_END => {}
            _ => {
                if let Some(mapper) = &mut self.mapper {
                    mapper.write_register(addr, val);
                }
            }
        }
    }

    fn take_dma_stall(&mut self) -> bool {
        std::mem::take(&mut self.dma_stall)
    }
}
