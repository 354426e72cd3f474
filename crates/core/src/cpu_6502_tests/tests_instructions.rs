//! Instruction semantics: the Z/N contract for loads and transfers, the
//! compare-carry contract, and the read-modify-write group.

use crate::cpu_6502::{ArrayMemory, Cpu6502, Memory6502};

fn cpu_with_program(program: &[u8]) -> Cpu6502<ArrayMemory> {
    let mut mem = ArrayMemory::new();
    mem.load_program(0x8000, program);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset();
    cpu
}

const PROBE_VALUES: [u8; 5] = [0x00, 0x01, 0x7F, 0x80, 0xFF];

fn assert_zn(cpu: &Cpu6502<ArrayMemory>, val: u8, what: &str) {
    assert_eq!(cpu.status.z, val == 0, "{what}: Z for value {val:#04X}");
    assert_eq!(
        cpu.status.n,
        val & 0x80 != 0,
        "{what}: N for value {val:#04X}"
    );
}

#[test]
fn loads_set_z_and_n_from_the_loaded_value() {
    for &v in &PROBE_VALUES {
        for &(opcode, name) in &[(0xA9u8, "LDA"), (0xA2, "LDX"), (0xA0, "LDY")] {
            let mut cpu = cpu_with_program(&[opcode, v]);
            cpu.step().unwrap();
            assert_zn(&cpu, v, name);
        }
    }
}

#[test]
fn transfers_set_z_and_n_from_the_transferred_value() {
    for &v in &PROBE_VALUES {
        let mut cpu = cpu_with_program(&[0xAA]); // TAX
        cpu.a = v;
        cpu.step().unwrap();
        assert_eq!(cpu.x, v);
        assert_zn(&cpu, v, "TAX");

        let mut cpu = cpu_with_program(&[0xA8]); // TAY
        cpu.a = v;
        cpu.step().unwrap();
        assert_eq!(cpu.y, v);
        assert_zn(&cpu, v, "TAY");

        let mut cpu = cpu_with_program(&[0xBA]); // TSX
        cpu.sp = v;
        cpu.step().unwrap();
        assert_eq!(cpu.x, v);
        assert_zn(&cpu, v, "TSX");

        let mut cpu = cpu_with_program(&[0x8A]); // TXA
        cpu.x = v;
        cpu.step().unwrap();
        assert_eq!(cpu.a, v);
        assert_zn(&cpu, v, "TXA");

        let mut cpu = cpu_with_program(&[0x98]); // TYA
        cpu.y = v;
        cpu.step().unwrap();
        assert_eq!(cpu.a, v);
        assert_zn(&cpu, v, "TYA");
    }
}

#[test]
fn txs_leaves_the_flags_alone() {
    let mut cpu = cpu_with_program(&[0x9A]); // TXS
    cpu.x = 0x00;
    cpu.status.z = false;
    cpu.status.n = true;
    cpu.step().unwrap();
    assert_eq!(cpu.sp, 0x00);
    assert!(!cpu.status.z);
    assert!(cpu.status.n);
}

#[test]
fn pla_sets_z_and_n_from_the_pulled_value() {
    for &v in &PROBE_VALUES {
        let mut cpu = cpu_with_program(&[0x68]); // PLA
        cpu.memory.write(0x01FE, v); // next slot above SP=0xFD
        cpu.step().unwrap();
        assert_eq!(cpu.a, v);
        assert_zn(&cpu, v, "PLA");
    }
}

/// Exhaustive compare contract: C iff reg >= operand (unsigned),
/// Z iff equal, N from bit 7 of the 8-bit difference.
fn check_compare(opcode: u8, set_reg: fn(&mut Cpu6502<ArrayMemory>, u8), name: &str) {
    let mut cpu = cpu_with_program(&[opcode, 0x00]);
    for r in 0..=255u8 {
        for m in 0..=255u8 {
            cpu.pc = 0x8000;
            cpu.memory.write(0x8001, m);
            set_reg(&mut cpu, r);
            cpu.step().unwrap();

            assert_eq!(cpu.status.c, r >= m, "{name} C for r={r} m={m}");
            assert_eq!(cpu.status.z, r == m, "{name} Z for r={r} m={m}");
            assert_eq!(
                cpu.status.n,
                r.wrapping_sub(m) & 0x80 != 0,
                "{name} N for r={r} m={m}"
            );
        }
    }
}

#[test]
fn cmp_carry_zero_negative_contract() {
    check_compare(0xC9, |cpu, v| cpu.a = v, "CMP");
}

#[test]
fn cpx_carry_zero_negative_contract() {
    check_compare(0xE0, |cpu, v| cpu.x = v, "CPX");
}

#[test]
fn cpy_carry_zero_negative_contract() {
    check_compare(0xC0, |cpu, v| cpu.y = v, "CPY");
}

#[test]
fn inc_dec_wrap_and_set_flags() {
    let mut cpu = cpu_with_program(&[0xE6, 0x10]); // INC $10
    cpu.memory.write(0x0010, 0xFF);
    cpu.step().unwrap();
    assert_eq!(cpu.memory.read(0x0010), 0x00);
    assert!(cpu.status.z);

    let mut cpu = cpu_with_program(&[0xC6, 0x10]); // DEC $10
    cpu.memory.write(0x0010, 0x00);
    cpu.step().unwrap();
    assert_eq!(cpu.memory.read(0x0010), 0xFF);
    assert!(cpu.status.n);
}

#[test]
fn register_inc_dec_wrap() {
    let mut cpu = cpu_with_program(&[0xE8]); // INX
    cpu.x = 0xFF;
    cpu.step().unwrap();
    assert_eq!(cpu.x, 0x00);
    assert!(cpu.status.z);

    let mut cpu = cpu_with_program(&[0x88]); // DEY
    cpu.y = 0x00;
    cpu.step().unwrap();
    assert_eq!(cpu.y, 0xFF);
    assert!(cpu.status.n);
}

#[test]
fn bit_pulls_v_and_n_from_memory() {
    let mut cpu = cpu_with_program(&[0x24, 0x10]); // BIT $10
    cpu.memory.write(0x0010, 0xC0);
    cpu.a = 0x0F;
    cpu.step().unwrap();
    assert!(cpu.status.z); // A AND mem == 0
    assert!(cpu.status.v); // bit 6 of mem
    assert!(cpu.status.n); // bit 7 of mem

    let mut cpu = cpu_with_program(&[0x24, 0x10]);
    cpu.memory.write(0x0010, 0x01);
    cpu.a = 0x01;
    cpu.step().unwrap();
    assert!(!cpu.status.z);
    assert!(!cpu.status.v);
    assert!(!cpu.status.n);
}

#[test]
fn sbc_borrow_chain() {
    // 0x00 - 0x01 with carry set: borrows, C clears
    let mut cpu = cpu_with_program(&[0xE9, 0x01]);
    cpu.a = 0x00;
    cpu.status.c = true;
    cpu.step().unwrap();
    assert_eq!(cpu.a, 0xFF);
    assert!(!cpu.status.c);
    assert!(cpu.status.n);

    // 0x80 - 0x01 flips sign: signed overflow
    let mut cpu = cpu_with_program(&[0xE9, 0x01]);
    cpu.a = 0x80;
    cpu.status.c = true;
    cpu.step().unwrap();
    assert_eq!(cpu.a, 0x7F);
    assert!(cpu.status.v);
}

#[test]
fn stack_wraps_at_page_boundaries() {
    // Pushing with SP=0x00 wraps the pointer to 0xFF.
    let mut cpu = cpu_with_program(&[0x48]); // PHA
    cpu.sp = 0x00;
    cpu.a = 0x42;
    cpu.step().unwrap();
    assert_eq!(cpu.memory.read(0x0100), 0x42);
    assert_eq!(cpu.sp, 0xFF);

    // Pulling with SP=0xFF wraps back to 0x00.
    let mut cpu = cpu_with_program(&[0x68]); // PLA
    cpu.sp = 0xFF;
    cpu.memory.write(0x0100, 0x24);
    cpu.step().unwrap();
    assert_eq!(cpu.a, 0x24);
    assert_eq!(cpu.sp, 0x00);
}
