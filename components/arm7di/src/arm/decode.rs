// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{numutil::U32Ext, Fault};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{ArmInst, ArmVisitor, DecodedInst};
use crate::{condition::Condition, memory::RelativeOffset, registers::Register};

#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq, PartialOrd)]
pub enum ArmAluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl ArmAluOp {
    pub fn should_write(self) -> bool {
        !self.is_compare()
    }

    /// TST, TEQ, CMP and CMN only exist to set flags.
    pub fn is_compare(self) -> bool {
        self >= Self::Tst && self <= Self::Cmn
    }
}

#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmAluShift {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmOperandKind {
    Immediate(u32),
    Register(Register),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArmLdrStrOperandKind {
    Immediate(u32),
    ShiftedRegister {
        base: Register,
        shift: ArmAluShift,
        by: ArmOperandKind,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArmLdrStrConfig {
    pub pre: bool,
    pub up: bool,
    pub byte: bool,
    pub writeback: bool,
    pub load: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArmLdmStmConfig {
    pub pre: bool,
    pub up: bool,
    pub load: bool,
    pub writeback: bool,
}

/// Handler an instruction is dispatched to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Op {
    /// Pipeline fill; never produced by the table.
    Idle,
    Branch,
    Swi,
    SingleTransfer,
    BlockTransfer,
    Mrs,
    MsrRegister,
    MsrImmediate,
    Multiply,
    ExtraTransfer,
    DataProcessing(ArmAluOp),
}

/// One entry of the decode table: `inst & mask == value` selects `op`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub op: Op,
    pub mask: u32,
    pub value: u32,
    pub cycles: u32,
}

impl Encoding {
    pub const fn matches(&self, inst: u32) -> bool {
        inst & self.mask == self.value
    }
}

const fn enc(op: Op, mask: u32, value: u32, cycles: u32) -> Encoding {
    Encoding {
        op,
        mask,
        value,
        cycles,
    }
}

const fn alu(op: ArmAluOp) -> Encoding {
    enc(Op::DataProcessing(op), 0x0DE0_0000, (op as u32) << 21, 3)
}

/// The decode table. Searched top to bottom, first match wins.
/// PSR transfers and multiplies are special encodings inside the data
/// processing space, so they have to come before it.
/// Coprocessor instructions match nothing.
pub const ENCODINGS: [Encoding; 25] = [
    enc(Op::Branch, 0x0E00_0000, 0x0A00_0000, 3),
    enc(Op::Swi, 0x0F00_0000, 0x0F00_0000, 3),
    enc(Op::SingleTransfer, 0x0C00_0000, 0x0400_0000, 3),
    enc(Op::BlockTransfer, 0x0E00_0000, 0x0800_0000, 3),
    enc(Op::Mrs, 0x0FBF_0FFF, 0x010F_0000, 1),
    enc(Op::MsrRegister, 0x0FB0_FFF0, 0x0120_F000, 1),
    enc(Op::MsrImmediate, 0x0FB0_F000, 0x0320_F000, 1),
    enc(Op::Multiply, 0x0FC0_00F0, 0x0000_0090, 4),
    enc(Op::ExtraTransfer, 0x0E00_0090, 0x0000_0090, 3),
    alu(ArmAluOp::And),
    alu(ArmAluOp::Eor),
    alu(ArmAluOp::Sub),
    alu(ArmAluOp::Rsb),
    alu(ArmAluOp::Add),
    alu(ArmAluOp::Adc),
    alu(ArmAluOp::Sbc),
    alu(ArmAluOp::Rsc),
    alu(ArmAluOp::Tst),
    alu(ArmAluOp::Teq),
    alu(ArmAluOp::Cmp),
    alu(ArmAluOp::Cmn),
    alu(ArmAluOp::Orr),
    alu(ArmAluOp::Mov),
    alu(ArmAluOp::Bic),
    alu(ArmAluOp::Mvn),
];

/// Find the table entry responsible for an instruction.
pub fn lookup(inst: u32) -> Option<&'static Encoding> {
    ENCODINGS.iter().find(|e| e.matches(inst))
}

/// Decode an instruction word fetched at `pc`.
pub fn decode(inst: u32, pc: u32) -> Result<DecodedInst, Fault> {
    let Some(encoding) = lookup(inst) else {
        log::error!("ARM7 unknown opcode 0x{inst:08X} at pc 0x{pc:08X}");
        return Err(Fault::unimplemented("unknown opcode", inst, pc));
    };

    let arm = ArmInst::of(inst);
    let cond = arm.condition();
    if cond == Condition::Nv {
        return Err(Fault::unimplemented("nv condition", inst, pc));
    }

    Ok(DecodedInst {
        inst: arm,
        cond,
        op: encoding.op,
        cycles: encoding.cycles,
    })
}

impl ArmInst {
    /// Hand the fields of this instruction to a visitor, as the given
    /// handler interprets them.
    pub fn visit<V: ArmVisitor>(self, op: Op, v: &mut V) -> V::Output {
        let i = self;
        match op {
            Op::Idle => v.arm_idle(),
            Op::Swi => v.arm_swi(),

            Op::Branch => {
                let offset = RelativeOffset(i.0.i24() * 4);
                if i.is_bit(24) {
                    v.arm_bl(offset)
                } else {
                    v.arm_b(offset)
                }
            }

            Op::DataProcessing(alu_op) if i.is_bit(25) => v.arm_alu_imm(
                i.reg(16),
                i.reg(12),
                i.0 & 0xFF,
                i.bits(8..=11) * 2,
                alu_op,
                i.is_bit(20),
            ),
            // Register shift with bit 7 set is multiply/extra transfer space
            Op::DataProcessing(_) if i.is_bit(4) && i.is_bit(7) => v.arm_unknown_opcode(i),
            Op::DataProcessing(alu_op) => {
                let shift_operand = if i.is_bit(4) {
                    ArmOperandKind::Register(i.reg(8))
                } else {
                    ArmOperandKind::Immediate(i.bits(7..=11))
                };
                v.arm_alu_reg(
                    i.reg(16),
                    i.reg(12),
                    i.reg(0),
                    alu_op,
                    i.shift_kind(),
                    shift_operand,
                    i.is_bit(20),
                )
            }

            Op::Multiply => v.arm_mul(
                i.reg(12),
                i.reg(8),
                i.reg(16),
                i.reg(0),
                i.is_bit(21),
                i.is_bit(20),
            ),

            Op::Mrs => v.arm_mrs(i.reg(12), i.is_bit(22)),
            Op::MsrRegister => v.arm_msr(
                ArmOperandKind::Register(i.reg(0)),
                i.is_bit(19),
                i.is_bit(16),
                i.is_bit(22),
            ),
            Op::MsrImmediate => v.arm_msr(
                ArmOperandKind::Immediate((i.0 & 0xFF).rotate_right(i.bits(8..=11) * 2)),
                i.is_bit(19),
                i.is_bit(16),
                i.is_bit(22),
            ),

            Op::SingleTransfer => {
                let offset = if i.is_bit(25) {
                    ArmLdrStrOperandKind::ShiftedRegister {
                        base: i.reg(0),
                        shift: i.shift_kind(),
                        by: if i.is_bit(4) {
                            ArmOperandKind::Register(i.reg(8))
                        } else {
                            ArmOperandKind::Immediate(i.bits(7..=11))
                        },
                    }
                } else {
                    ArmLdrStrOperandKind::Immediate(i.0 & 0xFFF)
                };
                v.arm_ldrstr(
                    i.reg(16),
                    i.reg(12),
                    offset,
                    ArmLdrStrConfig {
                        pre: i.is_bit(24),
                        up: i.is_bit(23),
                        byte: i.is_bit(22),
                        writeback: i.is_bit(21),
                        load: i.is_bit(20),
                    },
                )
            }

            Op::BlockTransfer => v.arm_ldmstm(
                i.reg(16),
                i.0 as u16,
                i.is_bit(22),
                ArmLdmStmConfig {
                    pre: i.is_bit(24),
                    up: i.is_bit(23),
                    load: i.is_bit(20),
                    writeback: i.is_bit(21),
                },
            ),

            Op::ExtraTransfer => v.arm_extra_transfer(i),
        }
    }

    fn shift_kind(self) -> ArmAluShift {
        ArmAluShift::from_u32(self.bits(5..=6)).unwrap_or(ArmAluShift::Lsl)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn op_of(inst: u32) -> Option<Op> {
        lookup(inst).map(|e| e.op)
    }

    #[test]
    fn special_encodings_beat_data_processing() {
        // mrs r0, cpsr / mrs r1, spsr
        assert_eq!(op_of(0xE10F_0000), Some(Op::Mrs));
        assert_eq!(op_of(0xE14F_1000), Some(Op::Mrs));
        // msr cpsr_fc, r0
        assert_eq!(op_of(0xE129_F000), Some(Op::MsrRegister));
        // msr cpsr_f, #0xF0000000
        assert_eq!(op_of(0xE328_F20F), Some(Op::MsrImmediate));
        // mul r0, r1, r2 / mla r0, r1, r2, r3
        assert_eq!(op_of(0xE000_0291), Some(Op::Multiply));
        assert_eq!(op_of(0xE020_3291), Some(Op::Multiply));
        // ldrh r0, [r1]
        assert_eq!(op_of(0xE1D1_00B0), Some(Op::ExtraTransfer));
        // swp r0, r1, [r2]
        assert_eq!(op_of(0xE102_0091), Some(Op::ExtraTransfer));
    }

    #[test]
    fn common_encodings() {
        assert_eq!(op_of(0xEAFF_FFFE), Some(Op::Branch));
        assert_eq!(op_of(0xEB00_0010), Some(Op::Branch));
        assert_eq!(op_of(0xEF00_0000), Some(Op::Swi));
        assert_eq!(op_of(0xE591_0004), Some(Op::SingleTransfer));
        assert_eq!(op_of(0xE7D1_0002), Some(Op::SingleTransfer));
        assert_eq!(op_of(0xE8BD_8001), Some(Op::BlockTransfer));
        assert_eq!(
            op_of(0xE3A0_0001),
            Some(Op::DataProcessing(ArmAluOp::Mov))
        );
        assert_eq!(
            op_of(0xE090_0001),
            Some(Op::DataProcessing(ArmAluOp::Add))
        );
        assert_eq!(
            op_of(0xE151_0002),
            Some(Op::DataProcessing(ArmAluOp::Cmp))
        );
        // tst without S is still data processing, the handler rejects it
        assert_eq!(
            op_of(0xE110_0000 & !(1 << 20)),
            Some(Op::DataProcessing(ArmAluOp::Tst))
        );
    }

    #[test]
    fn coprocessor_is_unknown() {
        // mcr p15, 0, r0, c1, c0, 0
        assert_eq!(op_of(0xEE01_0F10), None);
        // ldc p1, c0, [r0]
        assert_eq!(op_of(0xED90_0100), None);
        assert!(decode(0xEE01_0F10, 0x108)
            .unwrap_err()
            .is_unimplemented());
    }

    #[test]
    fn decode_carries_cost_and_condition() {
        let inst = decode(0x0A00_0001, 0).unwrap();
        assert_eq!(inst.cond, Condition::Eq);
        assert_eq!(inst.op, Op::Branch);
        assert_eq!(inst.cycles, 3);

        let inst = decode(0xE10F_0000, 0).unwrap();
        assert_eq!(inst.cycles, 1);
        let inst = decode(0xE000_0291, 0).unwrap();
        assert_eq!(inst.cycles, 4);
    }

    #[test]
    fn nv_is_unimplemented() {
        let fault = decode(0xF3A0_0001, 0x20).unwrap_err();
        assert_eq!(fault, Fault::unimplemented("nv condition", 0xF3A0_0001, 0x20));
    }

    #[test]
    fn alu_table_follows_opcode_field() {
        for op in 0..16 {
            let inst = 0xE000_0000 | (op << 21) | (1 << 20);
            let expected = ArmAluOp::from_u32(op).unwrap();
            assert_eq!(op_of(inst), Some(Op::DataProcessing(expected)));
        }
    }
}
