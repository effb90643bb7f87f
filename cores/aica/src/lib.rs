// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

pub use arm7di;
use arm7di::{
    interface::{Bus, RwType},
    Address, Cpu,
};
use common::{components::scheduler::Clock, BusFault, Fault, Time};
pub use config::{AicaConfig, ARM7_FREQUENCY, SCHED_FREQUENCY};
pub use interrupts::Lines;
pub use memory::AicaBus;
use scheduling::Events;
pub use scheduling::AicaEvent;

pub mod addr;
mod config;
pub mod interrupts;
mod memory;
mod scheduling;

/// The sound processor: an ARM7DI with its wave memory, interrupt
/// controller and clock. Contains all state and is used for system
/// emulation.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Aica {
    pub cpu: Cpu<AicaBus>,
    pub clock: Clock<AicaEvent>,
    events: Events,
    config: AicaConfig,
    /// Samples produced since power on.
    samples: u64,
    /// Cleared by the pause event to end `run_for`.
    ticking: bool,
}

impl Aica {
    pub fn new(config: AicaConfig) -> Result<Self, Fault> {
        let mut clock = Clock::new(config.cpu_scale());
        let events = Events {
            pause: clock.register(AicaEvent::PauseEmulation)?,
            sample_tick: clock.register(AicaEvent::SampleTick)?,
        };
        // The sample tick never stops, so the clock always has a target.
        clock.schedule(events.sample_tick, config.sample_interval())?;

        let mut cpu = Cpu::new(AicaBus::new(config.start_held_in_reset));
        cpu.set_reset_line(config.start_held_in_reset);
        Ok(Self {
            cpu,
            clock,
            events,
            config,
            samples: 0,
            ticking: false,
        })
    }

    /// Run the CPU until the next event is due, then handle every event
    /// that is.
    pub fn advance(&mut self) -> Result<(), Fault> {
        self.cpu
            .run_until_target(&mut self.clock, self.config.cpu_scale())?;
        self.sync_reset_line();

        while let Some(id) = self.clock.pop_due()? {
            self.clock.kind(id).dispatch(self, id)?;
        }
        Ok(())
    }

    /// Advance the system by the given amount of clock ticks.
    /// A fault ends the run; it is logged and returned, the session is
    /// over after that.
    pub fn run_for(&mut self, ticks: Time) -> Result<(), Fault> {
        self.clock.schedule_in(self.events.pause, ticks)?;
        self.ticking = true;
        while self.ticking {
            if let Err(fault) = self.advance() {
                log::error!(
                    "AICA stopped at cycle {}: {fault}",
                    self.clock.cycle_stamp()
                );
                return Err(fault);
            }
        }
        Ok(())
    }

    /// Copy words into wave memory, little-endian.
    pub fn load_program(&mut self, at: u32, words: &[u32]) -> Result<(), BusFault> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.cpu.bus.load_wave(at, &bytes)
    }

    /// Read from the ARM7's address space on behalf of the host.
    pub fn host_read<T: RwType>(&mut self, addr: u32) -> Result<T, BusFault> {
        self.cpu.bus.read(Address(addr))
    }

    /// Write to the ARM7's address space on behalf of the host.
    /// Writes to the reset register take effect immediately.
    pub fn host_write<T: RwType>(&mut self, addr: u32, value: T) -> Result<(), BusFault> {
        self.cpu.bus.write(Address(addr), value)?;
        self.sync_reset_line();
        Ok(())
    }

    /// Latch an interrupt line, as another part of the system would.
    pub fn raise_interrupt(&mut self, line: Lines) {
        self.cpu.bus.interrupts.raise(line);
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn config(&self) -> &AicaConfig {
        &self.config
    }

    fn sync_reset_line(&mut self) {
        let held = self.cpu.bus.reset_held();
        if held == self.cpu.is_enabled() {
            self.cpu.set_reset_line(held);
        }
    }
}
