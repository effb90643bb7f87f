// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

/// An address on the bus. Arithmetic wraps around the 32-bit space.
#[derive(Default, Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Address(pub u32);

impl Address {
    pub const WORD: Address = Address(4);

    pub fn add_rel(self, rel: RelativeOffset) -> Address {
        Address(self.0.wrapping_add_signed(rel.0))
    }

    pub fn add_signed(self, rhs: Address, positive: bool) -> Address {
        if positive {
            self + rhs
        } else {
            self - rhs
        }
    }

    pub fn is_aligned(self, to: u32) -> bool {
        self.0 & (to - 1) == 0
    }
}

impl Add for Address {
    type Output = Address;

    fn add(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Address {
    type Output = Address;

    fn sub(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_sub(rhs.0))
    }
}

impl AddAssign for Address {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Signed offset, as used by branches.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RelativeOffset(pub i32);

impl Display for RelativeOffset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0 >= 0 {
            write!(f, "#0x{:X}", self.0)
        } else {
            write!(f, "#-0x{:X}", self.0.unsigned_abs())
        }
    }
}
