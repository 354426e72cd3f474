//! Cycle accounting: every populated opcode slot charges its table cost,
//! plus the branch-taken and page-cross add-ons where the rules apply.

use crate::cpu_6502::{AddressingMode, ArrayMemory, Cpu6502, Memory6502, Mnemonic, OPCODES};

fn fresh_cpu() -> Cpu6502<ArrayMemory> {
    let mut mem = ArrayMemory::new();
    mem.load_program(0x8000, &[0x00, 0x10, 0x20]);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset();
    cpu
}

/// Branches taken under the post-reset flag state (only I is set).
fn taken_after_reset(mnemonic: Mnemonic) -> bool {
    matches!(
        mnemonic,
        Mnemonic::Bcc | Mnemonic::Bne | Mnemonic::Bpl | Mnemonic::Bvc
    )
}

#[test]
fn base_cost_matches_the_table_for_every_opcode() {
    for (opcode, entry) in OPCODES.iter().enumerate() {
        let Some(entry) = entry else { continue };

        let mut cpu = fresh_cpu();
        // Operands 0x10 0x20 keep every mode inside its page: no
        // page-cross add-on fires with the index registers at zero.
        cpu.memory.write(0x8000, opcode as u8);

        let mut expected = entry.cycles as u32;
        if entry.mode == AddressingMode::Relative && taken_after_reset(entry.mnemonic) {
            expected += 1;
        }

        let used = cpu.step().unwrap();
        assert_eq!(
            used, expected,
            "opcode {opcode:#04X} ({})",
            entry.mnemonic.as_str()
        );
        assert_eq!(cpu.cycles, expected as u64);
    }
}

#[test]
fn page_cross_add_on_fires_for_indexed_reads() {
    for (opcode, entry) in OPCODES.iter().enumerate() {
        let Some(entry) = entry else { continue };
        if entry.page_cycles == 0 || entry.mode == AddressingMode::Relative {
            continue;
        }

        let mut cpu = fresh_cpu();
        cpu.memory.write(0x8000, opcode as u8);
        // Base 0x2001 plus an index of 0xFF lands at 0x2100: crossed.
        cpu.memory.write(0x8001, 0x01);
        cpu.memory.write(0x8002, 0x20);
        match entry.mode {
            AddressingMode::AbsoluteX => cpu.x = 0xFF,
            AddressingMode::AbsoluteY => cpu.y = 0xFF,
            AddressingMode::IndirectY => {
                // Pointer in the zero page at the first operand byte.
                cpu.memory.write(0x0001, 0x01);
                cpu.memory.write(0x0002, 0x20);
                cpu.y = 0xFF;
            }
            other => panic!("unexpected page-cross mode {other:?} for {opcode:#04X}"),
        }

        let used = cpu.step().unwrap();
        assert_eq!(
            used,
            entry.cycles as u32 + 1,
            "opcode {opcode:#04X} ({}) with a crossed page",
            entry.mnemonic.as_str()
        );
    }
}

#[test]
fn store_indexed_never_pays_the_page_cross() {
    // STA $20FF,X with X=1 crosses a page but costs its flat 5 cycles.
    let mut cpu = fresh_cpu();
    cpu.memory.write(0x8000, 0x9D);
    cpu.memory.write(0x8001, 0xFF);
    cpu.memory.write(0x8002, 0x20);
    cpu.x = 0x01;
    assert_eq!(cpu.step().unwrap(), 5);
}

#[test]
fn rmw_indexed_cost_is_flat() {
    // ASL $20FF,X crosses a page and still costs 7.
    let mut cpu = fresh_cpu();
    cpu.memory.write(0x8000, 0x1E);
    cpu.memory.write(0x8001, 0xFF);
    cpu.memory.write(0x8002, 0x20);
    cpu.x = 0x01;
    assert_eq!(cpu.step().unwrap(), 7);
}

#[test]
fn branch_costs_scale_with_outcome() {
    // Not taken: base cost.
    let mut cpu = fresh_cpu();
    cpu.memory.write(0x8000, 0xF0); // BEQ
    cpu.memory.write(0x8001, 0x05);
    cpu.status.z = false;
    assert_eq!(cpu.step().unwrap(), 2);

    // Taken within the page: base + 1.
    let mut cpu = fresh_cpu();
    cpu.memory.write(0x8000, 0xF0);
    cpu.memory.write(0x8001, 0x05);
    cpu.status.z = true;
    assert_eq!(cpu.step().unwrap(), 3);
    assert_eq!(cpu.pc, 0x8007);

    // Taken across a page: base + 1 + 1.
    let mut cpu = fresh_cpu();
    cpu.memory.write(0x80F0, 0xF0);
    cpu.memory.write(0x80F1, 0x20);
    cpu.pc = 0x80F0;
    cpu.status.z = true;
    assert_eq!(cpu.step().unwrap(), 4);
    assert_eq!(cpu.pc, 0x8112);
}

#[test]
fn cycles_accumulate_across_steps() {
    let mut mem = ArrayMemory::new();
    // LDA #$01; STA $10; NOP
    mem.load_program(0x8000, &[0xA9, 0x01, 0x85, 0x10, 0xEA]);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset();

    cpu.step().unwrap();
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.cycles, 2 + 3 + 2);
}
