// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

// Regions, as seen by the ARM7
pub const WAVE_MEM_START: u32 = 0x0000_0000;
pub const WAVE_MEM_LEN: u32 = 0x0020_0000;
pub const REGS_START: u32 = 0x0080_0000;
pub const REGS_LEN: u32 = 0x8000;
pub const REGS_MASK: u32 = REGS_LEN - 1;

// Registers, relative to REGS_START
pub const INT_ENABLE: u32 = 0x2800;
pub const INT_PENDING: u32 = 0x2804;
pub const INT_FIQ_SELECT: u32 = 0x2808;
pub const ARM_RESET: u32 = 0x2C00;
