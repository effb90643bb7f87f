// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::numutil::NumExt;
use num_derive::FromPrimitive;

use crate::registers::Flag;

/// Condition predicate of an instruction, taken from its top 4 bits.
#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    /// Reserved on this core.
    Nv,
}

impl Condition {
    /// Evaluate this predicate against the flags of the given CPSR.
    pub fn holds(self, cpsr: u32) -> bool {
        let eq = cpsr.is_bit(Flag::Zero as u16);
        let cs = cpsr.is_bit(Flag::Carry as u16);
        let mi = cpsr.is_bit(Flag::Neg as u16);
        let vs = cpsr.is_bit(Flag::Overflow as u16);

        let hi = !eq && cs;
        let ge = mi == vs;
        let gt = !eq && ge;

        match self {
            Self::Eq => eq,
            Self::Ne => !eq,
            Self::Cs => cs,
            Self::Cc => !cs,
            Self::Mi => mi,
            Self::Pl => !mi,
            Self::Vs => vs,
            Self::Vc => !vs,
            Self::Hi => hi,
            Self::Ls => !hi,
            Self::Ge => ge,
            Self::Lt => !ge,
            Self::Gt => gt,
            Self::Le => !gt,
            Self::Al => true,
            Self::Nv => false,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Cs => "cs",
            Self::Cc => "cc",
            Self::Mi => "mi",
            Self::Pl => "pl",
            Self::Vs => "vs",
            Self::Vc => "vc",
            Self::Hi => "hi",
            Self::Ls => "ls",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Al => "",
            Self::Nv => "nv",
        }
    }
}
