//! NES Mapper implementations
//!
//! A mapper decodes addresses in cartridge space ($4020..$FFFF) onto the
//! physical ROM banks it owns. Adding a mapper means adding a variant here
//! and a constructor arm in [`Mapper::from_cartridge`].

mod nrom;

pub use nrom::Nrom;

use crate::bus::DeviceRegisters;
use crate::cartridge::{Cartridge, CartridgeError};

/// Unified mapper enum that dispatches to specific implementations
#[derive(Debug)]
pub enum Mapper {
    Nrom(Nrom),
}

impl Mapper {
    /// Build the mapper variant named by the cartridge header. Mapper
    /// numbers without an implementation are a load-time error.
    pub fn from_cartridge(cart: Cartridge) -> Result<Self, CartridgeError> {
        match cart.mapper {
            0 => Ok(Mapper::Nrom(Nrom::new(cart))),
            n => Err(CartridgeError::UnsupportedMapper { mapper: n }),
        }
    }

    /// iNES mapper number
    pub fn mapper_number(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
        }
    }

    /// Character ROM as seen by the picture unit.
    pub fn chr(&self) -> &[u8] {
        match self {
            Mapper::Nrom(m) => m.chr(),
        }
    }
}

impl DeviceRegisters for Mapper {
    fn read_register(&self, addr: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.read_register(addr),
        }
    }

    fn write_register(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::Nrom(m) => m.write_register(addr, val),
        }
    }
}
