// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Faults that end an emulation session.
//! None of these are recoverable: they either point at a bug in the emulator
//! itself, at guest behaviour that is not modelled yet, or at a bus access
//! that hit nothing.

use thiserror::Error;

use crate::Time;

/// A fatal emulation fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The emulator broke one of its own invariants.
    #[error("integrity fault: {0}")]
    Integrity(#[from] IntegrityFault),
    /// The guest did something that is architecturally defined, but not
    /// emulated.
    #[error("unimplemented: {what} (instruction 0x{inst:08X} at pc 0x{pc:08X})")]
    Unimplemented {
        what: &'static str,
        inst: u32,
        pc: u32,
    },
    /// A memory access did not hit any mapped region.
    #[error("bus fault: {0}")]
    Bus(#[from] BusFault),
}

impl Fault {
    pub fn unimplemented(what: &'static str, inst: u32, pc: u32) -> Self {
        Self::Unimplemented { what, inst, pc }
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Self::Unimplemented { .. })
    }
}

/// Self-consistency violations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFault {
    /// An event was scheduled, cancelled or popped after its deadline.
    #[error("event due at cycle {when} handled at cycle {now}")]
    EventInPast { now: Time, when: Time },
    /// An event was scheduled while it was still linked into a list.
    #[error("event {0} is already scheduled")]
    AlreadyScheduled(u16),
    /// An event was cancelled while not linked into any list.
    #[error("event {0} is not scheduled")]
    NotScheduled(u16),
    /// A clock ran out of event handles.
    #[error("too many events registered with one clock")]
    TooManyEvents,
    /// A processor was asked to run on a clock with a scale of 0.
    #[error("clock scale of 0")]
    ZeroClockScale,
    /// Somebody tried to move the cycle stamp backwards.
    #[error("cycle stamp moved backwards from {now} to {to}")]
    TimeReversed { now: Time, to: Time },
    /// A compare-only data processing instruction without the S bit.
    #[error("compare without flag update 0x{inst:08X} at pc 0x{pc:08X}")]
    CompareWithoutFlags { inst: u32, pc: u32 },
    /// A handler got an instruction that does not match its own encoding.
    #[error("instruction 0x{inst:08X} at pc 0x{pc:08X} decoded to the wrong handler")]
    Misdecoded { inst: u32, pc: u32 },
    /// The current mode has no saved status register.
    #[error("no SPSR in mode with cpsr 0x{cpsr:08X}")]
    NoSpsr { cpsr: u32 },
    /// The pipeline contains more entries than it can hold.
    #[error("pipeline overfilled")]
    PipelineOverfilled,
}

/// An access that did not hit any mapped memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("{} of {len} bytes at 0x{addr:08X} out of bounds", if *write { "write" } else { "read" })]
pub struct BusFault {
    pub addr: u32,
    pub len: u32,
    pub write: bool,
}
