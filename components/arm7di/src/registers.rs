// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{fmt::Display, ops::Index};

use bitmatch::bitmatch;
use common::numutil::NumExt;

use crate::memory::Address;

/// Macro for creating accessors for mode-dependent registers.
macro_rules! mode_reg {
    ($reg:ident, $get:ident, $set:ident) => {
        fn $get(&self) -> u32 {
            self.$reg[self.mode.bank()]
        }

        fn $set(&mut self, val: u32) {
            self.$reg[self.mode.bank()] = val;
        }
    };
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Register(pub u16);

impl Register {
    pub const SP: Register = Register(13);
    pub const LR: Register = Register(14);
    pub const PC: Register = Register(15);

    pub fn is_pc(&self) -> bool {
        self.0 == 15
    }

    pub fn from_rlist(rlist: u16) -> impl DoubleEndedIterator<Item = Register> {
        (0..16).map(Self).filter(move |r| rlist.is_bit(r.0))
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            15 => write!(f, "pc"),
            14 => write!(f, "lr"),
            13 => write!(f, "sp"),
            r => write!(f, "r{r}"),
        }
    }
}

/// A register with values for FIQ and all other modes
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
struct FiqReg {
    reg: u32,
    fiq: u32,
}

/// A register with different values for the different CPU modes.
/// Indexed by [Mode::bank].
type ModeReg = [u32; 6];

/// The register file. `registers` always holds the registers visible
/// in the current mode; banked copies are swapped in and out on
/// mode switches.
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Registers {
    registers: [u32; 16],
    fiqs: [FiqReg; 5],
    sp: ModeReg,
    lr: ModeReg,
    spsr: ModeReg,
    cpsr: u32,
    /// Always matches the mode bits of `cpsr`.
    mode: Mode,
}

impl Registers {
    #[inline]
    pub fn pc(&self) -> Address {
        Address(self.registers[15])
    }

    #[inline]
    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    #[inline]
    pub fn set_lr(&mut self, value: Address) {
        self.registers[14] = value.0;
    }

    #[inline]
    pub fn set_pc(&mut self, value: Address) {
        self.registers[15] = value.0;
    }

    #[inline]
    pub fn bump_pc(&mut self, count: u32) -> Address {
        self.registers[15] = self.registers[15].wrapping_add(count);
        Address(self.registers[15])
    }

    /// Set a register. Setting the PC here does not touch the pipeline.
    #[inline]
    pub fn set(&mut self, reg: Register, value: u32) {
        self.registers[reg.0.us()] = value;
    }

    /// Get a register's value as seen one pipeline stage later (PC will be +12)
    pub fn reg_pc4(&self, reg: Register) -> u32 {
        if reg.is_pc() {
            self.registers[15].wrapping_add(4)
        } else {
            self[reg]
        }
    }

    mode_reg!(sp, cpsr_sp, set_cpsr_sp);
    mode_reg!(lr, cpsr_lr, set_cpsr_lr);

    /// Get the SPSR of the current mode, if it has one.
    pub fn spsr(&self) -> Option<u32> {
        self.mode.has_spsr().then(|| self.spsr[self.mode.bank()])
    }

    /// Set the SPSR of the current mode. Returns false if
    /// the current mode has none.
    pub fn set_spsr(&mut self, value: u32) -> bool {
        let has = self.mode.has_spsr();
        if has {
            self.spsr[self.mode.bank()] = value;
        }
        has
    }

    #[inline]
    pub fn is_flag(&self, flag: Flag) -> bool {
        self.cpsr.is_bit(flag as u16)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, en: bool) {
        self.cpsr = self.cpsr.set_bit(flag as u16, en);
    }

    /// Get the current CPU mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the mode bits inside CPSR.
    pub fn set_mode(&mut self, mode: Mode) {
        self.switch_cpsr((self.cpsr & !0x1F) | mode.to_u32(), mode);
    }

    /// Set the CPSR. This may only change flags; mode changes will not be
    /// handled.
    #[inline]
    pub(crate) fn set_cpsr_flags(&mut self, value: u32) {
        self.cpsr = (value & !0x1F) | (self.cpsr & 0x1F);
    }

    /// Set the CPSR. Needs to consider mode switches, in which case
    /// the current registers need to be copied.
    /// Fails with the offending mode bits if they encode no valid mode.
    pub fn set_cpsr(&mut self, value: u32) -> Result<(), u32> {
        let mode = Mode::get(value & 0x1F).ok_or(value & 0x1F)?;
        self.switch_cpsr(value, mode);
        Ok(())
    }

    fn switch_cpsr(&mut self, value: u32, mode: Mode) {
        for reg in 8..=12 {
            if self.mode == Mode::Fiq {
                self.fiqs[reg - 8].fiq = self.registers[reg];
            } else {
                self.fiqs[reg - 8].reg = self.registers[reg];
            }
        }
        self.set_cpsr_sp(self.registers[13]);
        self.set_cpsr_lr(self.registers[14]);

        self.cpsr = value;
        self.mode = mode;

        for reg in 8..=12 {
            self.registers[reg] = if self.mode == Mode::Fiq {
                self.fiqs[reg - 8].fiq
            } else {
                self.fiqs[reg - 8].reg
            };
        }
        self.registers[13] = self.cpsr_sp();
        self.registers[14] = self.cpsr_lr();
    }
}

/// Execution context of the CPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Mode {
    #[default]
    User,
    Fiq,
    Supervisor,
    Abort,
    Irq,
    Undefined,
    System,
}

impl Mode {
    /// Decode the mode bits of a status register.
    /// The 26-bit modes are treated as their 32-bit counterparts.
    #[bitmatch]
    pub fn get(n: u32) -> Option<Self> {
        #[bitmatch]
        match n {
            "0??00" => Some(Self::User),
            "0??01" => Some(Self::Fiq),
            "0??10" => Some(Self::Irq),
            "0??11" => Some(Self::Supervisor),
            "10000" => Some(Self::User),
            "10001" => Some(Self::Fiq),
            "10010" => Some(Self::Irq),
            "10011" => Some(Self::Supervisor),
            "10111" => Some(Self::Abort),
            "11011" => Some(Self::Undefined),
            "11111" => Some(Self::System),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::User => 0b10000,
            Self::Fiq => 0b10001,
            Self::Irq => 0b10010,
            Self::Supervisor => 0b10011,
            Self::Abort => 0b10111,
            Self::Undefined => 0b11011,
            Self::System => 0b11111,
        }
    }

    /// Index into the banked register arrays. User and System share a bank.
    fn bank(self) -> usize {
        match self {
            Self::User | Self::System => 0,
            Self::Fiq => 1,
            Self::Supervisor => 2,
            Self::Abort => 3,
            Self::Irq => 4,
            Self::Undefined => 5,
        }
    }

    pub fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

/// Flags inside CPSR.
#[derive(Debug, Copy, Clone)]
pub enum Flag {
    Neg = 31,
    Zero = 30,
    Carry = 29,
    Overflow = 28,
    IrqDisable = 7,
    FiqDisable = 6,
}

impl Flag {
    pub fn mask(self) -> u32 {
        1 << self as u32
    }
}

impl Index<Register> for Registers {
    type Output = u32;

    fn index(&self, index: Register) -> &Self::Output {
        &self.registers[index.0.us()]
    }
}
