//! Concrete end-to-end instruction scenarios.

use crate::cpu_6502::{ArrayMemory, Cpu6502, CpuError, Interrupt, IRQ_VECTOR, Memory6502};

fn cpu_with_program(program: &[u8]) -> Cpu6502<ArrayMemory> {
    let mut mem = ArrayMemory::new();
    mem.load_program(0x8000, program);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset();
    cpu
}

#[test]
fn asl_accumulator_shifts_out_into_carry() {
    let mut cpu = cpu_with_program(&[0x0A]); // ASL A
    cpu.a = 0xFF;
    cpu.status.c = false;

    let used = cpu.step().unwrap();

    assert_eq!(cpu.a, 0xFE);
    assert!(cpu.status.c);
    assert!(cpu.status.n);
    assert!(!cpu.status.z);
    assert_eq!(used, 2);
}

#[test]
fn rol_memory_rotates_carry_in_and_out() {
    let mut cpu = cpu_with_program(&[0x26, 0x10]); // ROL $10
    cpu.memory.write(0x0010, 0x80);
    cpu.status.c = true;

    let used = cpu.step().unwrap();

    assert_eq!(cpu.memory.read(0x0010), 0x01);
    assert!(cpu.status.c);
    assert!(!cpu.status.n);
    assert!(!cpu.status.z);
    assert_eq!(used, 5);
}

#[test]
fn taken_branch_crossing_a_page_costs_four() {
    let mut cpu = cpu_with_program(&[0xEA]);
    // BEQ +5 sitting at the top of the zero page
    cpu.memory.write(0x00FE, 0xF0);
    cpu.memory.write(0x00FF, 0x05);
    cpu.pc = 0x00FE;
    cpu.status.z = true;

    let used = cpu.step().unwrap();

    assert_eq!(cpu.pc, 0x0105);
    assert_eq!(used, 4); // 2 base + 1 taken + 1 page cross
}

#[test]
fn jsr_pushes_return_address_and_rts_comes_back() {
    let mut cpu = cpu_with_program(&[0x20, 0x34, 0x12]); // JSR $1234
    cpu.memory.write(0x1234, 0x60); // RTS

    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0x1234);
    // High byte pushed first, then low: $80 at $01FD, $02 at $01FC.
    assert_eq!(cpu.memory.read(0x01FD), 0x80);
    assert_eq!(cpu.memory.read(0x01FC), 0x02);
    assert_eq!(cpu.sp, 0xFB);

    cpu.step().unwrap();
    assert_eq!(cpu.pc, 0x8003);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn invalid_opcode_reports_and_charges_nothing() {
    let mut cpu = cpu_with_program(&[0x02]);
    let before = cpu.cycles;

    let err = cpu.step().unwrap_err();

    assert_eq!(
        err,
        CpuError::InvalidOpcode {
            opcode: 0x02,
            pc: 0x8000
        }
    );
    assert_eq!(cpu.cycles, before);
    assert_eq!(cpu.pc, 0x8000);
}

#[test]
fn brk_and_rti_round_trip() {
    let mut cpu = cpu_with_program(&[0x00, 0xEA, 0xEA]); // BRK; NOP; NOP
    cpu.memory.data[IRQ_VECTOR as usize] = 0x00;
    cpu.memory.data[IRQ_VECTOR as usize + 1] = 0x90;
    cpu.memory.data[0x9000] = 0x40; // RTI
    cpu.status.c = true;

    assert_eq!(cpu.step().unwrap(), 7);
    assert_eq!(cpu.pc, 0x9000);
    assert!(cpu.status.i);

    assert_eq!(cpu.step().unwrap(), 6);
    // BRK pushed the address two past the opcode; RTI does not add one.
    assert_eq!(cpu.pc, 0x8002);
    assert!(cpu.status.c); // restored from the pushed P
    assert!(!cpu.status.b); // pushed B bit is not latched
}

#[test]
fn irq_handler_returns_to_the_interrupted_instruction() {
    let mut cpu = cpu_with_program(&[0xEA, 0xEA]); // NOP; NOP
    cpu.memory.data[IRQ_VECTOR as usize] = 0x00;
    cpu.memory.data[IRQ_VECTOR as usize + 1] = 0x90;
    cpu.memory.data[0x9000] = 0x40; // RTI
    cpu.status.i = false;

    cpu.request_interrupt(Interrupt::Irq);
    // Service (7) + the RTI at the handler (6).
    assert_eq!(cpu.step().unwrap(), 13);
    // RTI returns to the instruction that was about to execute.
    assert_eq!(cpu.pc, 0x8000);
    assert!(!cpu.status.i); // I restored from the pushed P

    assert_eq!(cpu.step().unwrap(), 2);
    assert_eq!(cpu.pc, 0x8001);
}

#[test]
fn reset_interrupt_vectors_through_fffc() {
    let mut cpu = cpu_with_program(&[0xEA]);
    cpu.memory.data[0xFFFC] = 0x00;
    cpu.memory.data[0xFFFD] = 0x90;
    cpu.memory.data[0x9000] = 0xEA;

    cpu.request_interrupt(Interrupt::Reset);
    assert_eq!(cpu.step().unwrap(), 9); // 7 service + 2 NOP
    assert_eq!(cpu.pc, 0x9001);
}
