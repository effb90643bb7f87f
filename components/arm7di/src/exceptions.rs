// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use bitflags::bitflags;
use common::{Fault, IntegrityFault};

use crate::{
    interface::Bus,
    memory::Address,
    registers::{
        Flag::{FiqDisable, IrqDisable},
        Mode,
    },
    Cpu,
};

bitflags! {
    /// Exceptions waiting to be serviced.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct Exceptions: u8 {
        const RESET          = 1 << 0;
        const DATA_ABORT     = 1 << 1;
        const FIQ            = 1 << 2;
        const IRQ            = 1 << 3;
        const PREFETCH_ABORT = 1 << 4;
        const SWI            = 1 << 5;
    }
}

/// Possible exceptions, in the order they are serviced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    Reset,
    DataAbort,
    Fiq,
    Irq,
    PrefetchAbort,
    Swi,
}

impl Exception {
    pub const PRIORITY: [Exception; 6] = [
        Self::Reset,
        Self::DataAbort,
        Self::Fiq,
        Self::Irq,
        Self::PrefetchAbort,
        Self::Swi,
    ];

    pub fn flag(self) -> Exceptions {
        match self {
            Self::Reset => Exceptions::RESET,
            Self::DataAbort => Exceptions::DATA_ABORT,
            Self::Fiq => Exceptions::FIQ,
            Self::Irq => Exceptions::IRQ,
            Self::PrefetchAbort => Exceptions::PREFETCH_ABORT,
            Self::Swi => Exceptions::SWI,
        }
    }

    /// Vector to set the PC to when this exception occurs.
    pub fn vector(self) -> Address {
        Address(match self {
            Self::Reset => 0x00,
            Self::Swi => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        })
    }

    /// Mode to execute the exception in.
    pub fn mode(self) -> Mode {
        match self {
            Self::Reset | Self::Swi => Mode::Supervisor,
            Self::DataAbort | Self::PrefetchAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Amount subtracted from the PC at service time to form the
    /// link register value.
    /// Exceptions are serviced on the fetch after the instruction that
    /// caused them; only SWI advanced the PC past itself before that.
    fn return_offset(self) -> u32 {
        match self {
            Self::Swi => 8,
            _ => 4,
        }
    }

    /// Is this exception masked under the given CPSR?
    fn is_masked(self, cpsr: u32) -> bool {
        match self {
            Self::Fiq => cpsr & FiqDisable.mask() != 0,
            Self::Irq => cpsr & IrqDisable.mask() != 0,
            _ => false,
        }
    }
}

impl<S: Bus> Cpu<S> {
    /// Mark an exception as pending. It will be serviced on the next fetch,
    /// if nothing of higher priority is pending.
    /// IRQ and FIQ follow the bus interrupt lines instead; raising them here
    /// has no lasting effect.
    pub fn raise_exception(&mut self, kind: Exception) {
        self.pending |= kind.flag();
    }

    pub fn pending_exceptions(&self) -> Exceptions {
        self.pending
    }

    /// Refresh the interrupt lines and service the highest priority
    /// exception that is pending and not masked. At most one exception
    /// is serviced per call.
    pub(crate) fn check_exceptions(&mut self) {
        self.pending.set(Exceptions::IRQ, self.bus.irq_pending());
        self.pending.set(Exceptions::FIQ, self.bus.fiq_pending());
        if self.pending.is_empty() {
            return;
        }

        let cpsr = self.regs.cpsr();
        let serviced = Exception::PRIORITY
            .into_iter()
            .find(|e| self.pending.contains(e.flag()) && !e.is_masked(cpsr));
        if let Some(kind) = serviced {
            self.exception_occured(kind);
        }
    }

    /// An exception occurred, jump to its vector and deal with it.
    fn exception_occured(&mut self, kind: Exception) {
        log::debug!(
            "ARM7 entering {kind:?} exception from pc 0x{:08X}",
            self.regs.pc().0
        );
        let cpsr = self.regs.cpsr();
        let lr = self.regs.pc() - Address(kind.return_offset());

        self.regs.set_mode(kind.mode());
        self.regs.set_spsr(cpsr);
        self.regs.set_lr(lr);

        self.regs.set_flag(IrqDisable, true);
        self.regs.set_flag(FiqDisable, true);

        self.regs.set_pc(kind.vector());
        self.flush_pipeline();
        self.pending.remove(kind.flag());
    }

    /// Get the SPSR of the current mode; having none is an integrity fault.
    pub(crate) fn spsr_or_fault(&self) -> Result<u32, Fault> {
        self.regs.spsr().ok_or(Fault::Integrity(IntegrityFault::NoSpsr {
            cpsr: self.regs.cpsr(),
        }))
    }
}
