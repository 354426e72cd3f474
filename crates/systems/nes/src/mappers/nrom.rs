use crate::cartridge::{Cartridge, CHR_BANK_LEN, PRG_BANK_LEN};

const PRG_WINDOW_START: u16 = 0x8000;

/// NROM (Mapper 0) - Basic mapper with no banking
///
/// The PRG window at $8000..$FFFF is materialized as a flat 32 KiB image
/// at load time: a single 16 KiB bank appears in both halves, two banks
/// fill it contiguously. Writes into the window are stored back into the
/// image; the hardware has no registers to hit, but storing keeps the
/// cartridge space uniformly readable and writable.
#[derive(Debug)]
pub struct Nrom {
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl Nrom {
    pub fn new(cart: Cartridge) -> Self {
        let mut prg = vec![0u8; PRG_BANK_LEN * 2];
        match cart.prg_rom.len() {
            0 => {}
            PRG_BANK_LEN => {
                // One bank: mirrored at $8000 and $C000.
                prg[..PRG_BANK_LEN].copy_from_slice(&cart.prg_rom);
                prg[PRG_BANK_LEN..].copy_from_slice(&cart.prg_rom);
            }
            _ => {
                // Two banks (or an oversized dump): fill from the bottom.
                let len = cart.prg_rom.len().min(prg.len());
                prg[..len].copy_from_slice(&cart.prg_rom[..len]);
            }
        }

        let mut chr = vec![0u8; CHR_BANK_LEN];
        let len = cart.chr_rom.len().min(chr.len());
        chr[..len].copy_from_slice(&cart.chr_rom[..len]);

        Self { prg, chr }
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        if addr >= PRG_WINDOW_START {
            self.prg[(addr - PRG_WINDOW_START) as usize]
        } else {
            // $4020..$7FFF: no PRG-RAM on this board.
            0x00
        }
    }

    pub fn write_register(&mut self, addr: u16, val: u8) {
        if addr >= PRG_WINDOW_START {
            self.prg[(addr - PRG_WINDOW_START) as usize] = val;
        }
    }

    pub fn chr(&self) -> &[u8] {
        &self.chr
    }
}
