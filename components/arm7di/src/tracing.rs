// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::{format, string::String};
use core::fmt::Write;

use crate::{arm::ArmInst, interface::Bus, registers::Register, Cpu};

impl<S: Bus> Cpu<S> {
    /// Log the instruction about to execute, with the register state
    /// before it.
    pub fn trace_inst(&self, inst: ArmInst) {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.trace_line(inst));
        }
    }

    /// One line of trace output: all registers, CPSR, the instruction's
    /// address and its disassembly.
    pub fn trace_line(&self, inst: ArmInst) -> String {
        let mut buf = String::with_capacity(180);
        for reg in Register::from_rlist(u16::MAX) {
            write!(buf, "{:08X} ", self.regs[reg]).ok();
        }
        let cpsr = self.regs.cpsr();
        let addr = self.regs.pc().0.wrapping_sub(8);
        format!("{buf}cpsr: {cpsr:08X} | {addr:08X}: {:08X}: {inst}", inst.raw())
    }
}
