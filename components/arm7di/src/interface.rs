// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::Debug;

use common::BusFault;

use crate::memory::Address;

/// Trait for a system that contains this CPU.
/// The system provides memory and the two interrupt lines.
pub trait Bus: Sized {
    /// Get the value at the given memory address.
    fn read<T: RwType>(&mut self, addr: Address) -> Result<T, BusFault>;
    /// Set the value at the given memory address.
    fn write<T: RwType>(&mut self, addr: Address, value: T) -> Result<(), BusFault>;

    /// Is the normal interrupt line raised?
    /// Polled once per fetch, before the instruction is dispatched.
    fn irq_pending(&self) -> bool;
    /// Is the fast interrupt line raised?
    /// Polled once per fetch, before the instruction is dispatched.
    fn fiq_pending(&self) -> bool;
}

/// Trait for a type that can be read/written over the bus.
/// The CPU itself only uses u8 and u32; other bus masters
/// may also use u16 and floats.
pub trait RwType: Copy + Default + PartialEq + Debug + 'static {
    /// Width in bytes.
    const WIDTH: u32;

    /// Read from a little-endian slice of exactly `WIDTH` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
    /// Write into a little-endian slice of exactly `WIDTH` bytes.
    fn to_le_slice(self, bytes: &mut [u8]);
}

macro_rules! rw_type_impl {
    ($ty:ident, $w:expr) => {
        impl RwType for $ty {
            const WIDTH: u32 = $w;

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0; $w];
                buf.copy_from_slice(bytes);
                $ty::from_le_bytes(buf)
            }

            #[inline]
            fn to_le_slice(self, bytes: &mut [u8]) {
                bytes.copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

rw_type_impl!(u8, 1);
rw_type_impl!(u16, 2);
rw_type_impl!(u32, 4);
rw_type_impl!(f32, 4);
rw_type_impl!(f64, 8);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn little_endian() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0, 0, 0xF0, 0x3F];
        assert_eq!(u32::from_le_slice(&bytes[..4]), 0x1234_5678);
        assert_eq!(u16::from_le_slice(&bytes[2..4]), 0x1234);
        assert_eq!(f64::from_le_slice(&bytes), f64::from_bits(0x3FF0_0000_1234_5678));

        let mut out = [0; 4];
        1.0f32.to_le_slice(&mut out);
        assert_eq!(out, [0, 0, 0x80, 0x3F]);
    }
}
