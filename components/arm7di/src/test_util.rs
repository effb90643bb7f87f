// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::{vec, vec::Vec};

use common::BusFault;

use crate::{
    interface::{Bus, RwType},
    memory::Address,
};

/// Flat 4KiB of memory with manually driven interrupt lines.
pub struct TestBus {
    pub mem: Vec<u8>,
    pub irq: bool,
    pub fiq: bool,
}

impl Default for TestBus {
    fn default() -> Self {
        Self {
            mem: vec![0; 0x1000],
            irq: false,
            fiq: false,
        }
    }
}

impl TestBus {
    pub fn load(&mut self, at: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            let addr = at as usize + i * 4;
            self.mem[addr..addr + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    pub fn word(&self, at: u32) -> u32 {
        u32::from_le_slice(&self.mem[at as usize..at as usize + 4])
    }

    fn range<T: RwType>(&self, addr: Address, write: bool) -> Result<(usize, usize), BusFault> {
        let start = addr.0 as usize;
        let end = start + T::WIDTH as usize;
        if end > self.mem.len() {
            Err(BusFault {
                addr: addr.0,
                len: T::WIDTH,
                write,
            })
        } else {
            Ok((start, end))
        }
    }
}

impl Bus for TestBus {
    fn read<T: RwType>(&mut self, addr: Address) -> Result<T, BusFault> {
        let (start, end) = self.range::<T>(addr, false)?;
        Ok(T::from_le_slice(&self.mem[start..end]))
    }

    fn write<T: RwType>(&mut self, addr: Address, value: T) -> Result<(), BusFault> {
        let (start, end) = self.range::<T>(addr, true)?;
        value.to_le_slice(&mut self.mem[start..end]);
        Ok(())
    }

    fn irq_pending(&self) -> bool {
        self.irq
    }

    fn fiq_pending(&self) -> bool {
        self.fiq
    }
}
