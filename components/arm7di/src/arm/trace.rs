// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::fmt::{Display, Formatter, Result, Write};

use super::{decode::*, ArmInst, ArmVisitor};
use crate::{memory::RelativeOffset, misc::print_op, registers::Register};

impl Display for ArmInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match lookup(self.raw()) {
            Some(encoding) => {
                let cc = self.condition().mnemonic();
                self.visit(encoding.op, &mut ArmFormat { f, cc })
            }
            None => write!(f, "{:08X}??", self.raw()),
        }
    }
}

pub struct ArmFormat<'f1, 'f2> {
    f: &'f1 mut Formatter<'f2>,
    cc: &'static str,
}

impl ArmFormat<'_, '_> {
    fn flags(&mut self, cpsr: bool) -> Result {
        if cpsr {
            self.f.write_char('s')?;
        }
        Ok(())
    }

    /// Write the destination and first operand, which depend on the
    /// kind of data processing operation.
    fn alu_head(&mut self, n: Register, d: Register, op: ArmAluOp, cpsr: bool) -> Result {
        write!(self.f, "{}{}", print_op(op), self.cc)?;
        match op {
            ArmAluOp::Mov | ArmAluOp::Mvn => {
                self.flags(cpsr)?;
                write!(self.f, " {d}, ")
            }
            op if op.is_compare() => write!(self.f, " {n}, "),
            _ => {
                self.flags(cpsr)?;
                write!(self.f, " {d}, {n}, ")
            }
        }
    }

    fn shifted_reg(&mut self, m: Register, kind: ArmAluShift, by: ArmOperandKind) -> Result {
        match by {
            ArmOperandKind::Immediate(0) if kind == ArmAluShift::Lsl => write!(self.f, "{m}"),
            ArmOperandKind::Immediate(0) if kind == ArmAluShift::Ror => write!(self.f, "{m}, rrx"),
            ArmOperandKind::Immediate(0) => write!(self.f, "{m}, {} #32", print_op(kind)),
            ArmOperandKind::Immediate(imm) => write!(self.f, "{m}, {} #{imm}", print_op(kind)),
            ArmOperandKind::Register(reg) => write!(self.f, "{m}, {} {reg}", print_op(kind)),
        }
    }
}

impl ArmVisitor for ArmFormat<'_, '_> {
    type Output = Result;

    fn arm_unknown_opcode(&mut self, inst: ArmInst) -> Result {
        write!(self.f, "{:08X}??", inst.raw())
    }

    fn arm_idle(&mut self) -> Result {
        write!(self.f, "nop")
    }

    fn arm_swi(&mut self) -> Result {
        write!(self.f, "swi{}", self.cc)
    }

    fn arm_b(&mut self, offset: RelativeOffset) -> Result {
        write!(self.f, "b{} {offset}", self.cc)
    }

    fn arm_bl(&mut self, offset: RelativeOffset) -> Result {
        write!(self.f, "bl{} {offset}", self.cc)
    }

    fn arm_alu_reg(
        &mut self,
        n: Register,
        d: Register,
        m: Register,
        op: ArmAluOp,
        shift_kind: ArmAluShift,
        shift_operand: ArmOperandKind,
        cpsr: bool,
    ) -> Result {
        self.alu_head(n, d, op, cpsr)?;
        self.shifted_reg(m, shift_kind, shift_operand)
    }

    fn arm_alu_imm(
        &mut self,
        n: Register,
        d: Register,
        imm: u32,
        imm_ror: u32,
        op: ArmAluOp,
        cpsr: bool,
    ) -> Result {
        self.alu_head(n, d, op, cpsr)?;
        write!(self.f, "#0x{:X}", imm.rotate_right(imm_ror))
    }

    fn arm_mul(
        &mut self,
        n: Register,
        s: Register,
        d: Register,
        m: Register,
        accumulate: bool,
        cpsr: bool,
    ) -> Result {
        write!(self.f, "{}{}", if accumulate { "mla" } else { "mul" }, self.cc)?;
        self.flags(cpsr)?;
        write!(self.f, " {d}, {m}, {s}")?;
        if accumulate {
            write!(self.f, ", {n}")?;
        }
        Ok(())
    }

    fn arm_msr(&mut self, src: ArmOperandKind, flags: bool, ctrl: bool, spsr: bool) -> Result {
        write!(
            self.f,
            "msr{} {}_",
            self.cc,
            if spsr { "spsr" } else { "cpsr" }
        )?;
        if flags {
            self.f.write_char('f')?;
        }
        if ctrl {
            self.f.write_char('c')?;
        }
        match src {
            ArmOperandKind::Immediate(imm) => write!(self.f, ", #0x{imm:X}"),
            ArmOperandKind::Register(reg) => write!(self.f, ", {reg}"),
        }
    }

    fn arm_mrs(&mut self, d: Register, spsr: bool) -> Result {
        write!(
            self.f,
            "mrs{} {d}, {}",
            self.cc,
            if spsr { "spsr" } else { "cpsr" }
        )
    }

    fn arm_ldrstr(
        &mut self,
        n: Register,
        d: Register,
        offset: ArmLdrStrOperandKind,
        config: ArmLdrStrConfig,
    ) -> Result {
        write!(
            self.f,
            "{}{}{} {d}, [{n}",
            if config.load { "ldr" } else { "str" },
            self.cc,
            if config.byte { "b" } else { "" }
        )?;
        if !config.pre {
            self.f.write_char(']')?;
        }

        let sign = if config.up { "" } else { "-" };
        match offset {
            ArmLdrStrOperandKind::Immediate(0) if config.pre => (),
            ArmLdrStrOperandKind::Immediate(imm) => write!(self.f, ", #{sign}0x{imm:X}")?,
            ArmLdrStrOperandKind::ShiftedRegister { base, shift, by } => {
                write!(self.f, ", {sign}")?;
                self.shifted_reg(base, shift, by)?;
            }
        }

        if config.pre {
            self.f.write_char(']')?;
            if config.writeback {
                self.f.write_char('!')?;
            }
        }
        Ok(())
    }

    fn arm_ldmstm(
        &mut self,
        n: Register,
        rlist: u16,
        force_user: bool,
        config: ArmLdmStmConfig,
    ) -> Result {
        let kind = match (config.pre, config.up) {
            (true, true) => "ib",
            (true, false) => "db",
            (false, true) => "ia",
            (false, false) => "da",
        };
        write!(
            self.f,
            "{}{}{kind} {n}",
            if config.load { "ldm" } else { "stm" },
            self.cc
        )?;
        if config.writeback {
            self.f.write_char('!')?;
        }
        self.f.write_str(", {")?;
        for (i, r) in Register::from_rlist(rlist).enumerate() {
            if i != 0 {
                self.f.write_str(", ")?;
            }
            write!(self.f, "{r}")?;
        }
        self.f.write_char('}')?;
        if force_user {
            self.f.write_char('^')?;
        }
        Ok(())
    }

    fn arm_extra_transfer(&mut self, inst: ArmInst) -> Result {
        self.arm_unknown_opcode(inst)
    }
}
