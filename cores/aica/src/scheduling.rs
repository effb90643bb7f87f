// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{
    components::scheduler::{EventId, Kind},
    Fault,
};
use AicaEvent::*;

use crate::{interrupts::Lines, Aica};

/// All scheduler events on the AICA.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum AicaEvent {
    /// Pause the emulation. Used by `run_for` to advance by a certain
    /// amount.
    #[default]
    PauseEmulation,
    /// One output sample is done.
    SampleTick,
}

impl AicaEvent {
    /// Handle the event by delegating to the appropriate handler.
    pub fn dispatch(self, aica: &mut Aica, id: EventId) -> Result<(), Fault> {
        match self {
            PauseEmulation => aica.ticking = false,
            SampleTick => {
                aica.samples += 1;
                aica.cpu.bus.interrupts.raise(Lines::SAMPLE);
                let next = aica.clock.when(id) + aica.config.sample_interval();
                aica.clock.schedule(id, next)?;
            }
        }
        Ok(())
    }
}

impl Kind for AicaEvent {}

/// Handles of the events the AICA registered with its clock.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Events {
    pub pause: EventId,
    pub sample_tick: EventId,
}
