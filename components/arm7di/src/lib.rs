// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

#![no_std]

extern crate alloc;

pub mod arm;
pub mod condition;
mod exceptions;
pub mod interface;
mod memory;
mod misc;
pub mod registers;
#[cfg(test)]
mod test_util;
pub mod tracing;

use arrayvec::ArrayVec;
use arm::{decode, lookup, ArmInst, DecodedInst, Flow, Op};
use common::{
    components::scheduler::{Clock, Kind},
    Fault, IntegrityFault, Time,
};
pub use exceptions::*;
use interface::Bus;
pub use memory::{Address, RelativeOffset};
pub use misc::alu::shift;
use registers::Registers;

/// Represents the ARM7DI CPU.
/// It is generic over the system it is embedded in; see `interface.rs`.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cpu<S: Bus> {
    pub regs: Registers,
    /// Prefetched words, oldest first.
    pipeline: ArrayVec<u32, 2>,
    pending: Exceptions,
    /// Cleared while the reset line is held.
    enabled: bool,
    /// Instruction currently executing, for fault context.
    current: ArmInst,
    pub bus: S,
}

impl<S: Bus> Cpu<S> {
    /// Power on. All registers start out zero, with reset pending.
    pub fn new(bus: S) -> Self {
        Self {
            regs: Registers::default(),
            pipeline: ArrayVec::new(),
            pending: Exceptions::RESET,
            enabled: true,
            current: ArmInst::default(),
            bus,
        }
    }

    /// Drive the reset line. Releasing it on a held CPU makes reset
    /// pending, so execution resumes at the reset vector.
    pub fn set_reset_line(&mut self, held: bool) {
        if !held && !self.enabled {
            log::debug!("ARM7 leaving reset");
            self.pending |= Exceptions::RESET;
        } else if held && self.enabled {
            log::debug!("ARM7 held in reset");
        }
        self.enabled = !held;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Service exceptions, then move the pipeline along by one word.
    /// Until the pipeline holds 2 words, an idle instruction comes out.
    pub fn fetch(&mut self) -> Result<DecodedInst, Fault> {
        self.check_exceptions();
        let pc = self.regs.pc();

        if self.pipeline.is_full() {
            let inst = self.pipeline.remove(0);
            let next = self.bus.read::<u32>(pc)?;
            self.push_pipeline(next)?;
            decode(inst, pc.0)
        } else {
            let next = self.bus.read::<u32>(pc)?;
            self.push_pipeline(next)?;
            Ok(DecodedInst::IDLE)
        }
    }

    /// Execute a decoded instruction. PC points 8 bytes past it.
    /// Returns the cycles it took, which are also paid when its
    /// condition fails.
    pub fn execute(&mut self, inst: &DecodedInst) -> Result<u32, Fault> {
        if cfg!(debug_assertions) && inst.op != Op::Idle {
            self.revalidate(inst)?;
        }
        if cfg!(feature = "instruction-tracing") && inst.op != Op::Idle {
            self.trace_inst(inst.inst);
        }

        let flow = if inst.cond.holds(self.regs.cpsr()) {
            self.current = inst.inst;
            inst.inst.visit(inst.op, self)?
        } else {
            Flow::Sequential
        };
        if flow == Flow::Sequential {
            self.regs.bump_pc(4);
        }
        Ok(inst.cycles)
    }

    /// Fetch and execute a single instruction. Returns the cycles taken,
    /// 0 if the CPU is held in reset.
    pub fn step(&mut self) -> Result<u32, Fault> {
        if !self.enabled {
            return Ok(0);
        }
        let inst = self.fetch()?;
        self.execute(&inst)
    }

    /// Run until the clock reaches its target stamp. Every instruction
    /// advances the clock by its cycles times `scale`, clamped to the
    /// target so no event is overshot.
    /// A CPU held in reset only lets time pass. A scale of 0 is an
    /// integrity fault.
    pub fn run_until_target<E: Kind>(
        &mut self,
        clock: &mut Clock<E>,
        scale: Time,
    ) -> Result<(), Fault> {
        if scale == 0 {
            return Err(IntegrityFault::ZeroClockScale.into());
        }
        while clock.cycle_stamp() < clock.target_stamp() {
            if !self.enabled {
                clock.advance_to(clock.target_stamp())?;
                break;
            }
            let cycles = self.step()? as Time;
            let stamp = (clock.cycle_stamp() + cycles * scale).min(clock.target_stamp());
            clock.advance_to(stamp)?;
        }
        Ok(())
    }

    /// Discard all prefetched words.
    pub fn flush_pipeline(&mut self) {
        self.pipeline.clear();
    }

    pub fn pipeline_len(&self) -> usize {
        self.pipeline.len()
    }

    fn push_pipeline(&mut self, word: u32) -> Result<(), Fault> {
        self.pipeline
            .try_push(word)
            .map_err(|_| IntegrityFault::PipelineOverfilled.into())
    }

    /// Check that the handler an instruction was decoded to is still the
    /// one the table picks for it.
    fn revalidate(&self, inst: &DecodedInst) -> Result<(), Fault> {
        match lookup(inst.inst.raw()) {
            Some(encoding) if encoding.op == inst.op => Ok(()),
            _ => Err(IntegrityFault::Misdecoded {
                inst: inst.inst.raw(),
                pc: self.regs.pc().0,
            }
            .into()),
        }
    }
}
