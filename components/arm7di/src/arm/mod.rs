// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::ops::RangeInclusive;

use common::numutil::NumExt;
pub use decode::{
    decode, lookup, ArmAluOp, ArmAluShift, ArmLdmStmConfig, ArmLdrStrConfig,
    ArmLdrStrOperandKind, ArmOperandKind, Encoding, Op, ENCODINGS,
};
use num_traits::FromPrimitive;

use crate::{condition::Condition, memory::RelativeOffset, registers::Register};

mod decode;
mod execute;
mod trace;

/// A raw ARM instruction word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArmInst(u32);

impl ArmInst {
    pub fn of(inst: u32) -> Self {
        Self(inst)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn reg(self, idx: u32) -> Register {
        Register(self.0.bits(idx, 4) as u16)
    }

    pub fn is_bit(self, bit: u16) -> bool {
        self.0.is_bit(bit)
    }

    pub fn condition(self) -> Condition {
        Condition::from_u32(self.bits(28..=31)).unwrap_or(Condition::Nv)
    }

    #[inline]
    pub const fn bits(self, range: RangeInclusive<u32>) -> u32 {
        (self.0 >> *range.start()) & ((1 << ((*range.end() - *range.start()) + 1)) - 1)
    }
}

/// What an instruction did to the program counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next word; PC advances by 4.
    Sequential,
    /// PC was written and the pipeline discarded; PC stays as written.
    Flushed,
}

/// An instruction after decode, ready to execute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedInst {
    pub inst: ArmInst,
    pub cond: Condition,
    pub op: Op,
    /// Base cost in CPU cycles; also paid when the condition fails.
    pub cycles: u32,
}

impl DecodedInst {
    /// What the CPU executes while the pipeline is still filling.
    pub const IDLE: DecodedInst = DecodedInst {
        inst: ArmInst(0),
        cond: Condition::Al,
        op: Op::Idle,
        cycles: 1,
    };
}

/// Everything that consumes decoded ARM instructions: the interpreter and
/// the disassembler. Decoded fields are handed over by [ArmInst::visit].
pub trait ArmVisitor {
    type Output;

    /// Instruction reached a handler that does not fit its encoding.
    fn arm_unknown_opcode(&mut self, inst: ArmInst) -> Self::Output;
    fn arm_idle(&mut self) -> Self::Output;
    fn arm_swi(&mut self) -> Self::Output;

    fn arm_b(&mut self, offset: RelativeOffset) -> Self::Output;
    fn arm_bl(&mut self, offset: RelativeOffset) -> Self::Output;

    #[allow(clippy::too_many_arguments)]
    fn arm_alu_reg(
        &mut self,
        n: Register,
        d: Register,
        m: Register,
        op: ArmAluOp,
        shift_kind: ArmAluShift,
        shift_operand: ArmOperandKind,
        cpsr: bool,
    ) -> Self::Output;
    fn arm_alu_imm(
        &mut self,
        n: Register,
        d: Register,
        imm: u32,
        imm_ror: u32,
        op: ArmAluOp,
        cpsr: bool,
    ) -> Self::Output;
    fn arm_mul(
        &mut self,
        n: Register,
        s: Register,
        d: Register,
        m: Register,
        accumulate: bool,
        cpsr: bool,
    ) -> Self::Output;

    fn arm_msr(&mut self, src: ArmOperandKind, flags: bool, ctrl: bool, spsr: bool)
        -> Self::Output;
    fn arm_mrs(&mut self, d: Register, spsr: bool) -> Self::Output;

    fn arm_ldrstr(
        &mut self,
        n: Register,
        d: Register,
        offset: ArmLdrStrOperandKind,
        config: ArmLdrStrConfig,
    ) -> Self::Output;
    fn arm_ldmstm(
        &mut self,
        n: Register,
        rlist: u16,
        force_user: bool,
        config: ArmLdmStmConfig,
    ) -> Self::Output;
    /// Halfword, signed and swap transfers, which this core does not have.
    fn arm_extra_transfer(&mut self, inst: ArmInst) -> Self::Output;
}
