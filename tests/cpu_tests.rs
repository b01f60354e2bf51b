use i8080::{disassemble, Cpu, Exit, Fault, Features, Ports, Status};

#[derive(Default)]
struct Terminal {
    input: u8,
    output: Vec<(u8, u8)>,
}

impl Ports for Terminal {
    fn read_port(&mut self, _port: u8) -> u8 {
        self.input
    }

    fn write_port(&mut self, port: u8, value: u8) {
        self.output.push((port, value));
    }
}

#[test]
fn sum_loop() {
    let program = [
        0x06, 0x0A, // MVI B,0A
        0xAF, // XRA A
        0x80, // ADD B
        0x05, // DCR B
        0xC2, 0x03, 0x00, // JNZ 0003
        0x76, // HLT
    ];
    let mut cpu = Cpu::from_bytes(&program).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    let state = cpu.state();
    assert_eq!(state.a, 55);
    assert_eq!(state.b, 0);
    assert!(state.cc.z);
    assert_eq!(state.pc, 9);
    // MVI, XRA, ten passes of ADD/DCR/JNZ, HLT
    assert_eq!(cpu.steps(), 2 + 30 + 1);
}

#[test]
fn subroutine() {
    let program = [
        0x31, 0x00, 0x01, // LXI SP,0100
        0x3E, 0x03, // MVI A,03
        0xCD, 0x0A, 0x00, // CALL 000A
        0x76, // HLT
        0x00, // NOP
        0x87, // ADD A
        0x87, // ADD A
        0xC9, // RET
    ];
    let mut cpu = Cpu::from_bytes(&program).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    let state = cpu.state();
    assert_eq!(state.a, 12);
    assert_eq!(state.sp, 0x0100);
    assert_eq!(state.read_word(0x00FE), 0x0008);
    assert_eq!(state.pc, 9);
}

#[test]
fn block_copy() {
    let mut program = vec![
        0x21, 0x20, 0x00, // LXI H,0020
        0x11, 0x40, 0x00, // LXI D,0040
        0x0E, 0x04, // MVI C,04
        0x7E, // MOV A,M
        0x12, // STAX D
        0x23, // INX H
        0x13, // INX D
        0x0D, // DCR C
        0xC2, 0x08, 0x00, // JNZ 0008
        0x76, // HLT
    ];
    program.resize(0x20, 0);
    program.extend([0xDE, 0xAD, 0xBE, 0xEF]);

    let mut cpu = Cpu::from_bytes(&program).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    assert_eq!(&cpu.state().memory()[0x40..0x44], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(cpu.state().c, 0);
}

#[test]
fn decimal_addition() {
    // MVI A,38; ADI 45; DAA; HLT
    let mut cpu = Cpu::from_bytes(&[0x3E, 0x38, 0xC6, 0x45, 0x27, 0x76]).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    assert_eq!(cpu.state().a, 0x83);
    assert!(!cpu.state().cc.cy);

    // MVI A,99; ADI 01; DAA; HLT
    let mut cpu = Cpu::from_bytes(&[0x3E, 0x99, 0xC6, 0x01, 0x27, 0x76]).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    assert_eq!(cpu.state().a, 0x00);
    assert!(cpu.state().cc.cy);
    assert!(cpu.state().cc.z);
}

#[test]
fn echo_through_ports() {
    // IN 01; INR A; OUT 02; HLT
    let program = [0xDB, 0x01, 0x3C, 0xD3, 0x02, 0x76];
    let terminal = Terminal {
        input: 0x41,
        ..Default::default()
    };
    let mut cpu = Cpu::from_image(&program, 0, terminal).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    let (state, terminal) = cpu.into_parts();
    assert_eq!(state.a, 0x42);
    assert_eq!(terminal.output, vec![(0x02, 0x42)]);
}

#[test]
fn interrupt_wakes_halt() {
    let program = [
        0x31, 0x00, 0x01, // LXI SP,0100
        0xFB, // EI
        0x76, // HLT
        0x76, // HLT
        0x00, 0x00, // padding up to vector 1
        0x3E, 0x55, // MVI A,55
        0xC9, // RET
    ];
    let mut cpu = Cpu::from_bytes(&program).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::Halted));
    assert_eq!(cpu.state().pc, 5);

    assert!(cpu.interrupt(1));
    assert_eq!(cpu.status(), &Status::Running);
    assert_eq!(cpu.state().pc, 0x08);
    assert!(!cpu.state().int_enable);

    assert_eq!(cpu.run(), Ok(Exit::Halted));
    assert_eq!(cpu.state().a, 0x55);
    assert_eq!(cpu.state().pc, 6);
    assert!(!cpu.interrupt(1));
}

#[test]
fn stepping() {
    let mut cpu = Cpu::from_bytes(&[0x06, 0x1F, 0x0E, 0x2A, 0x00]).unwrap();
    for _ in 0..3 {
        assert_eq!(cpu.step(), &Status::Running);
    }
    assert_eq!(cpu.state().b, 0x1F);
    assert_eq!(cpu.state().c, 0x2A);
    assert_eq!(cpu.state().pc, 5);
    assert!(cpu.at_end());
    assert_eq!(cpu.run(), Ok(Exit::EndOfProgram));
}

#[test]
fn minimal_build() {
    // MVI A,09; DAA
    let mut cpu = Cpu::from_bytes(&[0x3E, 0x09, 0x27])
        .unwrap()
        .with_features(Features::minimal());
    let fault = Fault {
        addr: 2,
        byte: 0x27,
        mnemonic: "DAA",
    };
    assert_eq!(cpu.run(), Err(fault.clone()));
    assert_eq!(cpu.status(), &Status::Faulted(fault.clone()));
    // Faults are terminal
    assert_eq!(cpu.step(), &Status::Faulted(fault));
    assert_eq!(cpu.state().pc, 2);
    assert_eq!(cpu.steps(), 1);
}

#[test]
fn listing_matches_execution() {
    let program = [0x06, 0x0A, 0xAF, 0x80, 0x05, 0xC2, 0x03, 0x00, 0x76];
    let addrs: Vec<u16> = disassemble(&program, 0).map(|record| record.addr).collect();
    assert_eq!(addrs, vec![0, 2, 3, 4, 5, 8]);

    let mut cpu = Cpu::from_bytes(&program).unwrap();
    let mut visited = Vec::new();
    while cpu.status() == &Status::Running && !cpu.at_end() {
        visited.push(cpu.state().pc);
        cpu.step();
    }
    assert!(visited.iter().all(|pc| addrs.contains(pc)));
}

#[test]
fn program_at_high_base() {
    let program = [
        0x3E, 0x07, // MVI A,07
        0xC3, 0x10, 0x00, // JMP 0010
    ];
    let mut cpu = Cpu::from_image(&program, 0x8000, Terminal::default()).unwrap();
    assert_eq!(cpu.run(), Ok(Exit::EndOfProgram));
    assert_eq!(cpu.state().a, 0x07);
    assert_eq!(cpu.state().pc, 0x0010);
    assert_eq!(cpu.steps(), 2);
}
