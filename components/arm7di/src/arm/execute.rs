// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{numutil::NumExt, Fault, IntegrityFault};

use super::{decode::*, ArmInst, ArmVisitor, Flow};
use crate::{
    exceptions::Exception,
    interface::Bus,
    memory::{Address, RelativeOffset},
    misc::alu,
    registers::{Flag::*, Mode, Register},
    Cpu,
};

type Handled = Result<Flow, Fault>;

impl<S: Bus> Cpu<S> {
    /// Fault for something the guest may do, but that is not emulated.
    fn unimplemented(&self, what: &'static str) -> Fault {
        log::error!(
            "ARM7 unimplemented: {what} (0x{:08X} at pc 0x{:08X})",
            self.current.raw(),
            self.regs.pc().0
        );
        Fault::unimplemented(what, self.current.raw(), self.regs.pc().0)
    }

    /// Write a register; writing PC discards the pipeline.
    fn write_reg(&mut self, reg: Register, value: u32) -> Flow {
        if reg.is_pc() {
            self.jump_to(Address(value))
        } else {
            self.regs.set(reg, value);
            Flow::Sequential
        }
    }

    fn jump_to(&mut self, addr: Address) -> Flow {
        self.regs.set_pc(addr);
        self.flush_pipeline();
        Flow::Flushed
    }

    fn relative_jump(&mut self, offset: RelativeOffset) -> Flow {
        self.jump_to(self.regs.pc().add_rel(offset))
    }

    fn check_alu(&self, d: Register, op: ArmAluOp, cpsr: bool) -> Result<(), Fault> {
        if op.is_compare() && !cpsr {
            return Err(IntegrityFault::CompareWithoutFlags {
                inst: self.current.raw(),
                pc: self.regs.pc().0,
            }
            .into());
        }
        if cpsr && d.is_pc() && op.should_write() {
            return Err(self.unimplemented("flag-setting write to pc"));
        }
        Ok(())
    }

    /// Operand 2 from a register shifted by a 5-bit immediate.
    fn shift_by_imm(
        &self,
        value: u32,
        kind: ArmAluShift,
        by: u32,
    ) -> Result<(u32, Option<bool>), Fault> {
        match (kind, by) {
            (ArmAluShift::Lsl, 0) => Ok((value, None)),
            (_, 0) => Err(self.unimplemented("shift by 32")),
            _ => Ok(alu::shift(value, kind, by)),
        }
    }

    fn alu_inner(
        &mut self,
        op: ArmAluOp,
        a: u32,
        b: u32,
        shift_carry: Option<bool>,
        d: Register,
        cpsr: bool,
    ) -> Handled {
        let c = self.regs.is_flag(Carry);
        let value = match op {
            ArmAluOp::And | ArmAluOp::Tst => self.logic(cpsr, a & b, shift_carry),
            ArmAluOp::Eor | ArmAluOp::Teq => self.logic(cpsr, a ^ b, shift_carry),
            ArmAluOp::Sub | ArmAluOp::Cmp => self.sub(cpsr, a, b),
            ArmAluOp::Rsb => self.sub(cpsr, b, a),
            ArmAluOp::Add | ArmAluOp::Cmn => self.add(cpsr, a, b),
            ArmAluOp::Adc => self.adc(cpsr, a, b, c),
            ArmAluOp::Sbc => self.sbc(cpsr, a, b, c),
            ArmAluOp::Rsc => self.sbc(cpsr, b, a, c),
            ArmAluOp::Orr => self.logic(cpsr, a | b, shift_carry),
            ArmAluOp::Mov => self.logic(cpsr, b, shift_carry),
            ArmAluOp::Bic => self.logic(cpsr, a & !b, shift_carry),
            ArmAluOp::Mvn => self.logic(cpsr, !b, shift_carry),
        };

        if op.should_write() {
            Ok(self.write_reg(d, value))
        } else {
            Ok(Flow::Sequential)
        }
    }
}

impl<S: Bus> ArmVisitor for Cpu<S> {
    type Output = Handled;

    fn arm_unknown_opcode(&mut self, inst: ArmInst) -> Handled {
        Err(IntegrityFault::Misdecoded {
            inst: inst.raw(),
            pc: self.regs.pc().0,
        }
        .into())
    }

    fn arm_idle(&mut self) -> Handled {
        Ok(Flow::Sequential)
    }

    fn arm_swi(&mut self) -> Handled {
        self.raise_exception(Exception::Swi);
        Ok(Flow::Sequential)
    }

    fn arm_b(&mut self, offset: RelativeOffset) -> Handled {
        Ok(self.relative_jump(offset))
    }

    fn arm_bl(&mut self, offset: RelativeOffset) -> Handled {
        self.regs.set_lr(self.regs.pc() - Address::WORD);
        Ok(self.relative_jump(offset))
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
    ) -> Handled {
        self.check_alu(d, op, cpsr)?;
        let (a, (b, carry)) = match shift_operand {
            ArmOperandKind::Immediate(by) => {
                let rm = self.regs[m];
                (self.regs[n], self.shift_by_imm(rm, shift_kind, by)?)
            }
            ArmOperandKind::Register(s) => {
                if s.is_pc() {
                    return Err(self.unimplemented("shift amount from pc"));
                }
                // One more pipeline stage passed while the amount was read
                let a = self.regs.reg_pc4(n);
                let rm = self.regs.reg_pc4(m);
                let by = self.regs[s] & 0xFF;
                (a, alu::shift(rm, shift_kind, by))
            }
        };
        self.alu_inner(op, a, b, carry, d, cpsr)
    }

    fn arm_alu_imm(
        &mut self,
        n: Register,
        d: Register,
        imm: u32,
        imm_ror: u32,
        op: ArmAluOp,
        cpsr: bool,
    ) -> Handled {
        self.check_alu(d, op, cpsr)?;
        let value = imm.rotate_right(imm_ror);
        let carry = (imm_ror != 0).then(|| value.is_bit(31));
        self.alu_inner(op, self.regs[n], value, carry, d, cpsr)
    }

    fn arm_mul(
        &mut self,
        n: Register,
        s: Register,
        d: Register,
        m: Register,
        accumulate: bool,
        cpsr: bool,
    ) -> Handled {
        if d == m {
            return Err(self.unimplemented("multiply with rd equal to rm"));
        }
        if d.is_pc() || m.is_pc() || s.is_pc() || n.is_pc() {
            return Err(self.unimplemented("multiply involving pc"));
        }

        let mut value = self.regs[m].wrapping_mul(self.regs[s]);
        if accumulate {
            value = value.wrapping_add(self.regs[n]);
        }
        self.regs.set(d, value);

        if cpsr {
            self.regs.set_flag(Zero, value == 0);
            self.regs.set_flag(Neg, value.is_bit(31));
            self.regs.set_flag(Carry, false);
        }
        Ok(Flow::Sequential)
    }

    fn arm_msr(&mut self, src: ArmOperandKind, flags: bool, ctrl: bool, spsr: bool) -> Handled {
        let value = match src {
            ArmOperandKind::Immediate(imm) => imm,
            ArmOperandKind::Register(reg) if reg.is_pc() => {
                return Err(self.unimplemented("msr from pc"))
            }
            ArmOperandKind::Register(reg) => self.regs[reg],
        };

        let mut mask = 0u32;
        if flags {
            mask |= 0xFF00_0000;
        }
        if ctrl && (spsr || self.regs.mode() != Mode::User) {
            mask |= 0xFF;
        }

        if spsr {
            let current = self.spsr_or_fault()?;
            self.regs.set_spsr((current & !mask) | (value & mask));
        } else {
            let cpsr = (self.regs.cpsr() & !mask) | (value & mask);
            if self.regs.set_cpsr(cpsr).is_err() {
                return Err(self.unimplemented("invalid processor mode"));
            }
        }
        Ok(Flow::Sequential)
    }

    fn arm_mrs(&mut self, d: Register, spsr: bool) -> Handled {
        if d.is_pc() {
            return Err(self.unimplemented("mrs into pc"));
        }
        let value = if spsr {
            self.spsr_or_fault()?
        } else {
            self.regs.cpsr()
        };
        self.regs.set(d, value);
        Ok(Flow::Sequential)
    }

    fn arm_ldrstr(
        &mut self,
        n: Register,
        d: Register,
        offset: ArmLdrStrOperandKind,
        config: ArmLdrStrConfig,
    ) -> Handled {
        if d.is_pc() {
            return Err(self.unimplemented("load/store with pc as rd"));
        }
        let offset = match offset {
            ArmLdrStrOperandKind::Immediate(imm) => imm,
            ArmLdrStrOperandKind::ShiftedRegister { by: ArmOperandKind::Register(_), .. } => {
                return Err(self.unimplemented("load/store offset shifted by register"))
            }
            ArmLdrStrOperandKind::ShiftedRegister {
                base,
                shift,
                by: ArmOperandKind::Immediate(by),
            } => self.shift_by_imm(self.regs[base], shift, by)?.0,
        };
        if !config.pre && config.writeback {
            return Err(self.unimplemented("post-indexed load/store with W bit"));
        }
        let writeback = config.writeback || !config.pre;
        if writeback && n.is_pc() {
            return Err(self.unimplemented("load/store writeback to pc"));
        }

        let base = Address(self.regs[n]);
        let offset_addr = base.add_signed(Address(offset), config.up);
        let addr = if config.pre { offset_addr } else { base };
        if !config.byte && !addr.is_aligned(4) {
            log::warn!(
                "ARM7 unaligned word {} at {addr} (pc 0x{:08X})",
                if config.load { "load" } else { "store" },
                self.regs.pc().0
            );
        }

        if config.load {
            let value = if config.byte {
                self.bus.read::<u8>(addr)?.u32()
            } else {
                self.bus.read::<u32>(addr)?
            };
            if writeback {
                self.regs.set(n, offset_addr.0);
            }
            self.regs.set(d, value);
        } else {
            let value = self.regs[d];
            if config.byte {
                self.bus.write::<u8>(addr, value.u8())?;
            } else {
                self.bus.write::<u32>(addr, value)?;
            }
            if writeback {
                self.regs.set(n, offset_addr.0);
            }
        }
        Ok(Flow::Sequential)
    }

    fn arm_ldmstm(
        &mut self,
        n: Register,
        rlist: u16,
        force_user: bool,
        config: ArmLdmStmConfig,
    ) -> Handled {
        if force_user {
            return Err(self.unimplemented("user bank block transfer"));
        }
        if n.is_pc() {
            return Err(self.unimplemented("block transfer based on pc"));
        }
        if rlist == 0 {
            return Err(self.unimplemented("block transfer with empty register list"));
        }
        if config.writeback && rlist.is_bit(n.0) {
            return Err(self.unimplemented("block transfer writeback with base in list"));
        }

        let size = Address(rlist.count_ones() * 4);
        let base = Address(self.regs[n]);
        let mut addr = match (config.up, config.pre) {
            (true, false) => base,
            (true, true) => base + Address::WORD,
            (false, false) => base - size + Address::WORD,
            (false, true) => base - size,
        };
        let end = base.add_signed(size, config.up);

        let mut loaded_pc = None;
        for reg in Register::from_rlist(rlist) {
            if config.load {
                let value = self.bus.read::<u32>(addr)?;
                if reg.is_pc() {
                    loaded_pc = Some(value);
                } else {
                    self.regs.set(reg, value);
                }
            } else {
                self.bus.write::<u32>(addr, self.regs.reg_pc4(reg))?;
            }
            addr += Address::WORD;
        }

        if config.writeback {
            self.regs.set(n, end.0);
        }
        match loaded_pc {
            Some(pc) => Ok(self.jump_to(Address(pc))),
            None => Ok(Flow::Sequential),
        }
    }

    fn arm_extra_transfer(&mut self, _inst: ArmInst) -> Handled {
        Err(self.unimplemented("halfword or swap transfer"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{arm::DecodedInst, test_util::TestBus};

    /// A CPU in supervisor mode with PC as if executing at 0x100.
    fn cpu() -> Cpu<TestBus> {
        let mut cpu = Cpu::new(TestBus::default());
        cpu.pending = crate::Exceptions::empty();
        cpu.regs.set_mode(Mode::Supervisor);
        cpu.regs.set_pc(Address(0x108));
        cpu
    }

    fn run(cpu: &mut Cpu<TestBus>, inst: u32) -> Handled {
        let decoded = crate::arm::decode(inst, cpu.regs.pc().0)?;
        cpu.current = decoded.inst;
        decoded.inst.visit(decoded.op, cpu)
    }

    fn reg(r: u16) -> Register {
        Register(r)
    }

    #[test]
    fn branch_forward_and_back() {
        let mut cpu = cpu();
        // b #+0x10
        assert_eq!(run(&mut cpu, 0xEA00_0004), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x118));
        assert_eq!(cpu.pipeline_len(), 0);

        // bl #-8 (branch to self)
        cpu.regs.set_pc(Address(0x208));
        assert_eq!(run(&mut cpu, 0xEBFF_FFFE), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x200));
        assert_eq!(cpu.regs[Register::LR], 0x204);
    }

    #[test]
    fn add_sets_all_flags() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 0xFFFF_FFFF);
        cpu.regs.set(reg(2), 1);
        // adds r0, r1, r2
        assert_eq!(run(&mut cpu, 0xE091_0002), Ok(Flow::Sequential));
        assert_eq!(cpu.regs[reg(0)], 0);
        assert!(cpu.regs.is_flag(Carry));
        assert!(cpu.regs.is_flag(Zero));
        assert!(!cpu.regs.is_flag(Overflow));
        assert!(!cpu.regs.is_flag(Neg));
    }

    #[test]
    fn sub_and_rsb_operand_order() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 10);
        // sub r0, r1, #3
        run(&mut cpu, 0xE241_0003).unwrap();
        assert_eq!(cpu.regs[reg(0)], 7);
        // rsb r0, r1, #3
        run(&mut cpu, 0xE261_0003).unwrap();
        assert_eq!(cpu.regs[reg(0)], (-7i32) as u32);
    }

    #[test]
    fn compare_without_s_is_integrity_fault() {
        let mut cpu = cpu();
        // cmp r1, r2 with S clear
        let fault = run(&mut cpu, 0xE141_0002).unwrap_err();
        assert!(fault.is_integrity());
        assert_eq!(
            fault,
            Fault::Integrity(IntegrityFault::CompareWithoutFlags {
                inst: 0xE141_0002,
                pc: 0x108
            })
        );
    }

    #[test]
    fn every_compare_needs_s() {
        let mut cpu = cpu();
        // tst / teq / cmn r1, r2 with S clear
        for inst in [0xE101_0002, 0xE121_0002, 0xE161_0002] {
            assert_eq!(
                run(&mut cpu, inst),
                Err(Fault::Integrity(IntegrityFault::CompareWithoutFlags { inst, pc: 0x108 }))
            );
        }
        // tst r1, #1 with S clear
        assert!(run(&mut cpu, 0xE301_0001).unwrap_err().is_integrity());
    }

    #[test]
    fn misdecoded_register_shift() {
        let mut cpu = cpu();
        let fault = cpu.visit_as(0xE001_0092, Op::DataProcessing(ArmAluOp::And));
        assert!(fault.unwrap_err().is_integrity());
    }

    #[test]
    fn immediate_rotation_sets_carry() {
        let mut cpu = cpu();
        // movs r0, #0x80000000 (0x02 ror 2)
        run(&mut cpu, 0xE3B0_0102).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x8000_0000);
        assert!(cpu.regs.is_flag(Carry));
        assert!(cpu.regs.is_flag(Neg));

        // movs r0, #1 leaves carry alone
        run(&mut cpu, 0xE3B0_0001).unwrap();
        assert!(cpu.regs.is_flag(Carry));
    }

    #[test]
    fn shift_by_register() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 0x8000_0001);
        cpu.regs.set(reg(2), 0x100);
        // movs r0, r1, lsl r2 (amount 0 after masking: no-op)
        run(&mut cpu, 0xE1B0_0211).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x8000_0001);
        assert!(!cpu.regs.is_flag(Carry));

        cpu.regs.set(reg(2), 1);
        run(&mut cpu, 0xE1B0_0211).unwrap();
        assert_eq!(cpu.regs[reg(0)], 2);
        assert!(cpu.regs.is_flag(Carry));

        // mov r0, pc, lsl r2 sees pc + 12
        cpu.regs.set(reg(2), 0);
        run(&mut cpu, 0xE1A0_021F).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x10C);
    }

    #[test]
    fn zero_immediate_shifts() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 0x1234);
        // mov r0, r1 (lsl #0)
        run(&mut cpu, 0xE1A0_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x1234);
        // mov r0, r1, lsr #32
        let fault = run(&mut cpu, 0xE1A0_0021).unwrap_err();
        assert_eq!(fault, Fault::unimplemented("shift by 32", 0xE1A0_0021, 0x108));
        // mov r0, r1, rrx
        assert!(run(&mut cpu, 0xE1A0_0061).unwrap_err().is_unimplemented());
    }

    #[test]
    fn alu_write_to_pc_flushes() {
        let mut cpu = cpu();
        cpu.regs.set(reg(14), 0x400);
        // mov pc, lr
        assert_eq!(run(&mut cpu, 0xE1A0_F00E), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x400));
        // movs pc, lr
        assert!(run(&mut cpu, 0xE1B0_F00E).unwrap_err().is_unimplemented());
    }

    #[test]
    fn pc_writes_keep_low_bits() {
        let mut cpu = cpu();
        cpu.regs.set(reg(0), 0x103);
        // mov pc, r0
        assert_eq!(run(&mut cpu, 0xE1A0_F000), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x103));

        // add pc, r0, #1
        assert_eq!(run(&mut cpu, 0xE280_F001), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x104));

        cpu.bus.load(0x800, &[0x202]);
        cpu.regs.set(Register::SP, 0x800);
        // ldmia sp, {pc}
        assert_eq!(run(&mut cpu, 0xE89D_8000), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x202));
    }

    #[test]
    fn logic_keeps_overflow() {
        let mut cpu = cpu();
        cpu.regs.set_flag(Overflow, true);
        cpu.regs.set(reg(1), 0xF0);
        // ands r0, r1, #0x0F
        run(&mut cpu, 0xE211_000F).unwrap();
        assert!(cpu.regs.is_flag(Zero));
        assert!(cpu.regs.is_flag(Overflow));
        // teq r1, #0xF0
        run(&mut cpu, 0xE331_00F0).unwrap();
        assert!(cpu.regs.is_flag(Zero));
    }

    #[test]
    fn carry_ops() {
        let mut cpu = cpu();
        cpu.regs.set_flag(Carry, true);
        cpu.regs.set(reg(1), 5);
        // adc r0, r1, #1
        run(&mut cpu, 0xE2A1_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 7);
        // sbc r0, r1, #1
        run(&mut cpu, 0xE2C1_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 4);
        // rsc r0, r1, #10
        run(&mut cpu, 0xE2E1_000A).unwrap();
        assert_eq!(cpu.regs[reg(0)], 5);
    }

    #[test]
    fn multiply() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 6);
        cpu.regs.set(reg(2), 7);
        cpu.regs.set(reg(3), 100);
        cpu.regs.set_flag(Carry, true);
        cpu.regs.set_flag(Overflow, true);
        // muls r0, r1, r2
        run(&mut cpu, 0xE010_0291).unwrap();
        assert_eq!(cpu.regs[reg(0)], 42);
        assert!(!cpu.regs.is_flag(Carry));
        assert!(cpu.regs.is_flag(Overflow));
        // mla r0, r1, r2, r3
        run(&mut cpu, 0xE020_3291).unwrap();
        assert_eq!(cpu.regs[reg(0)], 142);

        // mul r1, r1, r2
        assert!(run(&mut cpu, 0xE001_0291).unwrap_err().is_unimplemented());
        // mul r0, pc, r2
        assert!(run(&mut cpu, 0xE000_029F).unwrap_err().is_unimplemented());
        // mul r0, r1, r2 with the unused rn field set to pc
        assert!(run(&mut cpu, 0xE000_F291).unwrap_err().is_unimplemented());
        // mla r0, r1, r2, pc
        assert!(run(&mut cpu, 0xE020_F291).unwrap_err().is_unimplemented());
    }

    #[test]
    fn status_register_moves() {
        let mut cpu = cpu();
        // msr cpsr_f, #0xF0000000
        run(&mut cpu, 0xE328_F20F).unwrap();
        assert_eq!(cpu.regs.cpsr() >> 28, 0xF);
        // mrs r0, cpsr
        run(&mut cpu, 0xE10F_0000).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0xF000_0013);

        // msr cpsr_c, r1 switches to IRQ mode
        cpu.regs.set(reg(1), 0x92);
        run(&mut cpu, 0xE121_F001).unwrap();
        assert_eq!(cpu.regs.mode(), Mode::Irq);
        assert_eq!(cpu.regs.cpsr(), 0xF000_0092);

        // msr spsr_fc, r1; mrs r2, spsr
        cpu.regs.set(reg(1), 0x1F);
        run(&mut cpu, 0xE169_F001).unwrap();
        run(&mut cpu, 0xE14F_2000).unwrap();
        assert_eq!(cpu.regs[reg(2)], 0x1F);

        // invalid mode bits
        cpu.regs.set(reg(1), 0x15);
        assert!(run(&mut cpu, 0xE121_F001).unwrap_err().is_unimplemented());
    }

    #[test]
    fn user_mode_cannot_change_control() {
        let mut cpu = cpu();
        cpu.regs.set_mode(Mode::User);
        cpu.regs.set(reg(1), 0xF000_00D3);
        // msr cpsr_fc, r1
        run(&mut cpu, 0xE129_F001).unwrap();
        assert_eq!(cpu.regs.mode(), Mode::User);
        assert_eq!(cpu.regs.cpsr(), 0xF000_0010);

        // mrs r0, spsr
        let fault = run(&mut cpu, 0xE14F_0000).unwrap_err();
        assert!(fault.is_integrity());
    }

    #[test]
    fn single_transfers() {
        let mut cpu = cpu();
        cpu.bus.load(0x800, &[0x1122_3344]);
        cpu.regs.set(reg(1), 0x7FC);

        // ldr r0, [r1, #4]!
        run(&mut cpu, 0xE5B1_0004).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x1122_3344);
        assert_eq!(cpu.regs[reg(1)], 0x800);

        // ldrb r0, [r1], #1
        run(&mut cpu, 0xE4D1_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0x44);
        assert_eq!(cpu.regs[reg(1)], 0x801);

        // str r0, [r1, -r2, lsl #2]
        cpu.regs.set(reg(2), 1);
        cpu.regs.set(reg(0), 0xCAFE_BABE);
        cpu.regs.set(reg(1), 0x904);
        run(&mut cpu, 0xE701_0102).unwrap();
        assert_eq!(cpu.bus.word(0x900), 0xCAFE_BABE);
        assert_eq!(cpu.regs[reg(1)], 0x904);

        // strb r0, [r1]
        run(&mut cpu, 0xE5C1_0000).unwrap();
        assert_eq!(cpu.bus.word(0x904), 0xBE);
    }

    #[test]
    fn load_into_base_keeps_loaded_value() {
        let mut cpu = cpu();
        cpu.bus.load(0x800, &[0x55]);
        cpu.regs.set(reg(1), 0x800);
        // ldr r1, [r1], #4
        run(&mut cpu, 0xE491_1004).unwrap();
        assert_eq!(cpu.regs[reg(1)], 0x55);
    }

    #[test]
    fn single_transfer_corner_cases() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 0x800);
        // ldr pc, [r1]
        assert!(run(&mut cpu, 0xE591_F000).unwrap_err().is_unimplemented());
        // ldr r0, [r1, r2, lsl r3]
        assert!(run(&mut cpu, 0xE791_0312).unwrap_err().is_unimplemented());
        // ldrt r0, [r1], #4
        assert!(run(&mut cpu, 0xE4B1_0004).unwrap_err().is_unimplemented());
        // ldr r0, [pc], #4
        assert!(run(&mut cpu, 0xE49F_0004).unwrap_err().is_unimplemented());
        // ldr r0, [pc, #4] is fine
        cpu.bus.load(0x10C, &[0xAB]);
        run(&mut cpu, 0xE59F_0004).unwrap();
        assert_eq!(cpu.regs[reg(0)], 0xAB);
    }

    #[test]
    fn out_of_bounds_is_bus_fault() {
        let mut cpu = cpu();
        cpu.regs.set(reg(1), 0x0100_0000);
        let fault = run(&mut cpu, 0xE591_0000).unwrap_err();
        assert!(matches!(fault, Fault::Bus(b) if b.addr == 0x0100_0000 && b.len == 4));
    }

    #[test]
    fn block_transfers() {
        let mut cpu = cpu();
        for r in 0..4 {
            cpu.regs.set(reg(r), r as u32 + 1);
        }
        cpu.regs.set(Register::SP, 0x800);
        // stmdb sp!, {r0-r3, pc}
        run(&mut cpu, 0xE92D_800F).unwrap();
        assert_eq!(cpu.regs[Register::SP], 0x7EC);
        assert_eq!(cpu.bus.word(0x7EC), 1);
        assert_eq!(cpu.bus.word(0x7F8), 4);
        assert_eq!(cpu.bus.word(0x7FC), 0x10C);

        // ldmia sp!, {r4-r7}
        run(&mut cpu, 0xE8BD_00F0).unwrap();
        assert_eq!(cpu.regs[reg(4)], 1);
        assert_eq!(cpu.regs[reg(7)], 4);
        assert_eq!(cpu.regs[Register::SP], 0x7FC);

        // ldmib r8, {r0} / ldmda r8, {r0}
        cpu.regs.set(reg(8), 0x7F4);
        run(&mut cpu, 0xE998_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 4);
        run(&mut cpu, 0xE818_0001).unwrap();
        assert_eq!(cpu.regs[reg(0)], 3);

        // ldmia sp, {pc}
        assert_eq!(run(&mut cpu, 0xE89D_8000), Ok(Flow::Flushed));
        assert_eq!(cpu.regs.pc(), Address(0x10C));
    }

    #[test]
    fn block_transfer_corner_cases() {
        let mut cpu = cpu();
        cpu.regs.set(Register::SP, 0x800);
        // ldmia sp, {}
        let fault = run(&mut cpu, 0xE89D_0000).unwrap_err();
        assert!(fault.is_unimplemented());
        // ldmia sp!, {r0, sp}
        assert!(run(&mut cpu, 0xE8BD_2001).unwrap_err().is_unimplemented());
        // ldmia sp, {r0}^
        assert!(run(&mut cpu, 0xE8DD_0001).unwrap_err().is_unimplemented());
        // ldmia pc, {r0}
        assert!(run(&mut cpu, 0xE89F_0001).unwrap_err().is_unimplemented());
    }

    #[test]
    fn swi_is_serviced_later() {
        let mut cpu = cpu();
        assert_eq!(run(&mut cpu, 0xEF00_0000), Ok(Flow::Sequential));
        assert!(cpu.pending_exceptions().contains(crate::Exceptions::SWI));
        assert_eq!(cpu.regs.mode(), Mode::Supervisor);
    }

    #[test]
    fn halfword_is_unimplemented() {
        let mut cpu = cpu();
        assert!(run(&mut cpu, 0xE1D1_00B0).unwrap_err().is_unimplemented());
    }

    impl Cpu<TestBus> {
        fn visit_as(&mut self, inst: u32, op: Op) -> Handled {
            let inst = DecodedInst {
                inst: ArmInst::of(inst),
                cond: crate::condition::Condition::Al,
                op,
                cycles: 3,
            };
            self.current = inst.inst;
            inst.inst.visit(inst.op, self)
        }
    }
}
