// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::{vec, vec::Vec};

use arm7di::{
    interface::{Bus, RwType},
    Address,
};
use common::BusFault;

use crate::{
    addr::*,
    interrupts::{Interrupts, Lines},
};

/// The largest access any bus master makes.
const MAX_WIDTH: usize = 8;

/// Everything the ARM7 sees: wave memory, the register block and the
/// interrupt controller behind it.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AicaBus {
    pub wave: Vec<u8>,
    /// Backing store of all registers without special behaviour.
    regs: Vec<u8>,
    pub interrupts: Interrupts,
    /// Bit 0 of the ARM reset register; set while the ARM7 is held.
    reset_held: bool,
}

impl AicaBus {
    pub fn new(reset_held: bool) -> Self {
        Self {
            wave: vec![0; WAVE_MEM_LEN as usize],
            regs: vec![0; REGS_LEN as usize],
            interrupts: Interrupts::default(),
            reset_held,
        }
    }

    pub fn reset_held(&self) -> bool {
        self.reset_held
    }

    /// Copy a program or sample data into wave memory.
    pub fn load_wave(&mut self, at: u32, data: &[u8]) -> Result<(), BusFault> {
        let start = at as usize;
        let end = start + data.len();
        if end > self.wave.len() {
            return Err(BusFault {
                addr: at,
                len: data.len() as u32,
                write: true,
            });
        }
        self.wave[start..end].copy_from_slice(data);
        Ok(())
    }

    fn wave_range(&self, addr: u32, len: u32, write: bool) -> Result<(usize, usize), BusFault> {
        let start = (addr - WAVE_MEM_START) as usize;
        let end = start + len as usize;
        if end > self.wave.len() {
            Err(BusFault { addr, len, write })
        } else {
            Ok((start, end))
        }
    }

    fn read_reg_byte(&self, offset: u32) -> u8 {
        let lane = (offset & 3) * 8;
        match offset & !3 {
            INT_ENABLE => (self.interrupts.enable.bits() >> lane) as u8,
            INT_PENDING => (self.interrupts.pending.bits() >> lane) as u8,
            INT_FIQ_SELECT => (self.interrupts.fiq_select.bits() >> lane) as u8,
            ARM_RESET if lane == 0 => self.reset_held as u8,
            _ => self.regs[offset as usize],
        }
    }

    fn write_reg_byte(&mut self, offset: u32, value: u8) {
        let lane = (offset & 3) * 8;
        let replace = |lines: Lines| {
            let bits = (lines.bits() & !(0xFF << lane)) | ((value as u32) << lane);
            Lines::from_bits_retain(bits)
        };
        match offset & !3 {
            INT_ENABLE => self.interrupts.enable = replace(self.interrupts.enable),
            INT_PENDING => self
                .interrupts
                .clear(Lines::from_bits_retain((value as u32) << lane)),
            INT_FIQ_SELECT => self.interrupts.fiq_select = replace(self.interrupts.fiq_select),
            ARM_RESET if lane == 0 => self.reset_held = value & 1 != 0,
            _ => self.regs[offset as usize] = value,
        }
    }

    fn region_fault(addr: u32, len: u32, write: bool) -> BusFault {
        log::debug!(
            "ARM7 {} of {len} bytes at unmapped 0x{addr:08X}",
            if write { "write" } else { "read" }
        );
        BusFault { addr, len, write }
    }
}

impl Bus for AicaBus {
    fn read<T: RwType>(&mut self, addr: Address) -> Result<T, BusFault> {
        let (addr, len) = (addr.0, T::WIDTH);
        match addr {
            WAVE_MEM_START..=0x001F_FFFF => {
                let (start, end) = self.wave_range(addr, len, false)?;
                Ok(T::from_le_slice(&self.wave[start..end]))
            }
            REGS_START..=0x0080_7FFF => {
                let mut buf = [0; MAX_WIDTH];
                for (i, byte) in buf[..len as usize].iter_mut().enumerate() {
                    *byte = self.read_reg_byte((addr + i as u32) & REGS_MASK);
                }
                Ok(T::from_le_slice(&buf[..len as usize]))
            }
            _ => Err(Self::region_fault(addr, len, false)),
        }
    }

    fn write<T: RwType>(&mut self, addr: Address, value: T) -> Result<(), BusFault> {
        let (addr, len) = (addr.0, T::WIDTH);
        match addr {
            WAVE_MEM_START..=0x001F_FFFF => {
                let (start, end) = self.wave_range(addr, len, true)?;
                value.to_le_slice(&mut self.wave[start..end]);
                Ok(())
            }
            REGS_START..=0x0080_7FFF => {
                let mut buf = [0; MAX_WIDTH];
                value.to_le_slice(&mut buf[..len as usize]);
                for (i, byte) in buf[..len as usize].iter().enumerate() {
                    self.write_reg_byte((addr + i as u32) & REGS_MASK, *byte);
                }
                Ok(())
            }
            _ => Err(Self::region_fault(addr, len, true)),
        }
    }

    fn irq_pending(&self) -> bool {
        self.interrupts.irq_pending()
    }

    fn fiq_pending(&self) -> bool {
        self.interrupts.fiq_pending()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wave_memory_is_little_endian() {
        let mut bus = AicaBus::new(false);
        bus.write(Address(0x100), 0x1234_5678u32).unwrap();
        assert_eq!(bus.read::<u8>(Address(0x100)), Ok(0x78));
        assert_eq!(bus.read::<u16>(Address(0x102)), Ok(0x1234));
        bus.write(Address(0x1F_FFF8), 2.5f64).unwrap();
        assert_eq!(bus.read::<f64>(Address(0x1F_FFF8)), Ok(2.5));
    }

    #[test]
    fn accesses_straddling_the_end_fault() {
        let mut bus = AicaBus::new(false);
        assert_eq!(
            bus.read::<u32>(Address(0x1F_FFFE)),
            Err(BusFault {
                addr: 0x1F_FFFE,
                len: 4,
                write: false
            })
        );
        assert_eq!(
            bus.write(Address(0x0100_0000), 1u8),
            Err(BusFault {
                addr: 0x0100_0000,
                len: 1,
                write: true
            })
        );
    }

    #[test]
    fn pending_is_write_one_to_clear() {
        let mut bus = AicaBus::new(false);
        bus.interrupts.raise(Lines::SAMPLE | Lines::TIMER_A);
        assert_eq!(
            bus.read::<u32>(Address(REGS_START + INT_PENDING)),
            Ok((Lines::SAMPLE | Lines::TIMER_A).bits())
        );

        bus.write(Address(REGS_START + INT_PENDING), Lines::SAMPLE.bits())
            .unwrap();
        assert_eq!(bus.interrupts.pending, Lines::TIMER_A);
        // the upper byte lane of the pending register
        bus.write(Address(REGS_START + INT_PENDING + 1), 0u8).unwrap();
        assert_eq!(bus.interrupts.pending, Lines::TIMER_A);
    }

    #[test]
    fn enable_drives_the_lines() {
        let mut bus = AicaBus::new(false);
        bus.interrupts.raise(Lines::SAMPLE);
        assert!(!bus.irq_pending());

        bus.write(Address(REGS_START + INT_ENABLE), Lines::SAMPLE.bits())
            .unwrap();
        assert!(bus.irq_pending());
        bus.write(Address(REGS_START + INT_FIQ_SELECT + 1), 0x04u8)
            .unwrap();
        assert_eq!(bus.interrupts.fiq_select, Lines::SAMPLE);
        assert!(bus.fiq_pending());
        assert!(!bus.irq_pending());
    }

    #[test]
    fn plain_registers_are_mirrored() {
        let mut bus = AicaBus::new(true);
        assert!(bus.reset_held());
        bus.write(Address(REGS_START + 0x10), 0xCAFEu16).unwrap();
        assert_eq!(bus.read::<u16>(Address(REGS_START + 0x10)), Ok(0xCAFE));

        bus.write(Address(REGS_START + ARM_RESET), 0u32).unwrap();
        assert!(!bus.reset_held());
        assert_eq!(bus.read::<u32>(Address(REGS_START + ARM_RESET)), Ok(0));
    }
}
