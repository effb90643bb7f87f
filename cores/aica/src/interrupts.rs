// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use bitflags::bitflags;

bitflags! {
    /// Interrupt sources feeding the ARM7.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct Lines: u32 {
        const EXTERNAL = 1 << 0;
        /// Raised by the host to get the ARM7's attention.
        const HOST     = 1 << 5;
        const TIMER_A  = 1 << 6;
        const TIMER_B  = 1 << 7;
        const TIMER_C  = 1 << 8;
        const MIDI_OUT = 1 << 9;
        const SAMPLE   = 1 << 10;
    }
}

/// The interrupt controller in front of the ARM7.
/// A line is delivered when it is both pending and enabled; it goes to FIQ
/// if selected for that, to IRQ otherwise.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Interrupts {
    pub enable: Lines,
    pub pending: Lines,
    pub fiq_select: Lines,
}

impl Interrupts {
    /// Latch a line as pending. It stays pending until cleared.
    pub fn raise(&mut self, line: Lines) {
        self.pending |= line;
    }

    pub fn clear(&mut self, line: Lines) {
        self.pending &= !line;
    }

    /// Lines that are pending and enabled.
    pub fn active(&self) -> Lines {
        self.pending & self.enable
    }

    pub fn irq_pending(&self) -> bool {
        !(self.active() - self.fiq_select).is_empty()
    }

    pub fn fiq_pending(&self) -> bool {
        self.active().intersects(self.fiq_select)
    }
}
