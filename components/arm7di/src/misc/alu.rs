// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::numutil::NumExt;

use crate::{arm::ArmAluShift, interface::Bus, registers::Flag, Cpu};

/// Barrel shifter, with the semantics of a shift amount taken from a
/// register: 0 leaves the value and carry alone, amounts of 32 and above
/// are well-defined.
/// Returns the result and the carry out; `None` if carry is unaffected.
pub fn shift(value: u32, kind: ArmAluShift, by: u32) -> (u32, Option<bool>) {
    if by == 0 {
        return (value, None);
    }

    match kind {
        ArmAluShift::Lsl => match by {
            1..=31 => (value << by, Some(value.is_bit(32 - by as u16))),
            32 => (0, Some(value.is_bit(0))),
            _ => (0, Some(false)),
        },
        ArmAluShift::Lsr => match by {
            1..=31 => (value >> by, Some(value.is_bit(by as u16 - 1))),
            32 => (0, Some(value.is_bit(31))),
            _ => (0, Some(false)),
        },
        ArmAluShift::Asr => match by {
            1..=31 => (
                ((value as i32) >> by) as u32,
                Some(value.is_bit(by as u16 - 1)),
            ),
            _ => (((value as i32) >> 31) as u32, Some(value.is_bit(31))),
        },
        ArmAluShift::Ror => {
            let res = value.rotate_right(by & 31);
            (res, Some(res.is_bit(31)))
        }
    }
}

impl<S: Bus> Cpu<S> {
    /// Addition
    pub fn add(&mut self, cpsr: bool, rs: u32, rn: u32) -> u32 {
        let res = rs.wrapping_add(rn);
        let carry = (rs as u64) + (rn as u64) > 0xFFFF_FFFF;
        let overflow = (rs as i32).overflowing_add(rn as i32).1;
        self.set_nzcv(cpsr, res, carry, overflow);
        res
    }

    /// Subtraction
    pub fn sub(&mut self, cpsr: bool, rs: u32, rn: u32) -> u32 {
        let res = rs.wrapping_sub(rn);
        let overflow = (rs as i32).overflowing_sub(rn as i32).1;
        self.set_nzcv(cpsr, res, rn <= rs, overflow);
        res
    }

    /// Addition (c -> Carry)
    pub fn adc(&mut self, cpsr: bool, rs: u32, rn: u32, c: bool) -> u32 {
        let res = (rs as u64) + (rn as u64) + (c as u64);
        let overflow = (!(rs ^ rn) & (rn ^ (res as u32))).is_bit(31);
        self.set_nzcv(cpsr, res as u32, res > 0xFFFF_FFFF, overflow);
        res as u32
    }

    /// Subtraction (c -> Carry)
    pub fn sbc(&mut self, cpsr: bool, rs: u32, rn: u32, c: bool) -> u32 {
        self.adc(cpsr, rs, !rn, c)
    }

    /// Result of a logic operation. Carry comes from the shifter.
    pub fn logic(&mut self, cpsr: bool, res: u32, carry: Option<bool>) -> u32 {
        if cpsr {
            self.set_nz(res);
            if let Some(carry) = carry {
                self.regs.set_flag(Flag::Carry, carry);
            }
        }
        res
    }

    pub fn set_nz(&mut self, value: u32) {
        let neg = value & (1 << 31);
        let zero = ((value == 0) as u32) << 30;
        self.regs
            .set_cpsr_flags((self.regs.cpsr() & 0x3FFF_FFFF) | zero | neg);
    }

    fn set_nzcv(&mut self, enable: bool, value: u32, carry: bool, overflow: bool) {
        if enable {
            let neg = value & (1 << 31);
            let zero = ((value == 0) as u32) << 30;
            let carry = (carry as u32) << 29;
            let overflow = (overflow as u32) << 28;
            self.regs.set_cpsr_flags(
                (self.regs.cpsr() & 0x0FFF_FFFF) | zero | neg | carry | overflow,
            );
        }
    }
}
