use chip8::{constants::*, prelude::*};

/// Random source that always yields the same byte.
struct Constant(u8);

impl RandomSource for Constant {
    fn next_byte(&mut self) -> u8 {
        self.0
    }
}

fn load(rom: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::with_devices(Chip8Conf::default(), SilentBeeper, Constant(0x5A));
    vm.load_bytecode(rom).unwrap();
    vm
}

#[test]
#[rustfmt::skip]
fn test_infinite_loop_parks_pc() {
    let mut vm = load(&[
        0x00, 0xE0, // CLS
        0x12, 0x02, // JP 0x202
    ]);

    for _ in 0..100 {
        vm.tick().unwrap();
    }

    assert_eq!(vm.pc(), 0x202);
    assert!(vm.screen().iter().all(|px| *px == 0));
}

#[test]
fn test_jump_to_self() {
    let mut vm = load(&[0x00, 0xE0, 0x12, 0x00]);

    for _ in 0..100 {
        vm.tick().unwrap();
    }

    // Parked on either word of the loop, never drifting.
    assert!(vm.pc() == 0x200 || vm.pc() == 0x202);
    assert!(vm.display().is_blank());

    // An even number of ticks always lands back on the start.
    let mut vm = load(&[0x00, 0xE0, 0x12, 0x00]);
    vm.run_steps(100).unwrap();
    assert_eq!(vm.pc(), MEM_START as u16);
}

#[test]
#[rustfmt::skip]
fn test_key_wait_stalls_until_pressed() {
    let mut vm = load(&[
        0x6A, 0x05, // LD vA, 5
        0xFA, 0x0A, // LD vA, K
    ]);

    vm.tick().unwrap();
    assert_eq!(vm.pc(), 0x202);

    for _ in 0..10 {
        assert_eq!(vm.tick(), Ok(Flow::KeyWait));
        assert_eq!(vm.registers()[0xA], 0x05);
        assert_eq!(vm.pc(), 0x202);
    }

    vm.key_down(0x3).unwrap();
    assert_eq!(vm.tick(), Ok(Flow::Ok));
    assert_eq!(vm.registers()[0xA], 0x03);
    assert_eq!(vm.pc(), 0x204);
}

#[test]
#[rustfmt::skip]
fn test_key_release_before_tick_keeps_waiting() {
    let mut vm = load(&[0xF0, 0x0A]);

    assert_eq!(vm.tick(), Ok(Flow::KeyWait));
    vm.set_key(KeyCode::Key7, true);
    vm.set_key(KeyCode::Key7, false);
    assert_eq!(vm.tick(), Ok(Flow::KeyWait));
    assert!(vm.is_waiting_for_key());
}

#[test]
#[rustfmt::skip]
fn test_draw_font_glyph() {
    let mut vm = load(&[
        0x60, 0x00, // LD v0, 0
        0x61, 0x08, // LD v1, 8
        0xF1, 0x29, // LD F, v1
        0xD0, 0x05, // DRW v0, v0, 5
    ]);
    vm.run_steps(4).unwrap();

    // Glyph "8": F0 90 F0 90 F0
    let expected = [
        "####....",
        "#..#....",
        "####....",
        "#..#....",
        "####....",
    ];
    let dump = vm.dump_display().unwrap();
    for (line, expected) in dump.lines().zip(expected) {
        assert_eq!(&line[..8], expected);
    }
    assert_eq!(vm.registers()[0xF], 0);
}

#[test]
#[rustfmt::skip]
fn test_counting_loop() {
    // Count v0 up to 10 with a subroutine, storing BCD of the result.
    let mut vm = load(&[
        0x60, 0x00, // 200: LD v0, 0
        0x22, 0x0C, // 202: CALL 0x20C
        0x30, 0x0A, // 204: SE v0, 10
        0x12, 0x02, // 206: JP 0x202
        0x12, 0x12, // 208: JP 0x212
        0x00, 0x00, // 20A:
        0x70, 0x01, // 20C: ADD v0, 1
        0x00, 0xEE, // 20E: RET
        0x00, 0x00, // 210:
        0xA3, 0x00, // 212: LD I, 0x300
        0xF0, 0x33, // 214: LD B, v0
        0x12, 0x16, // 216: JP 0x216
    ]);
    vm.run_steps(200).unwrap();

    assert_eq!(vm.registers()[0], 10);
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.pc(), 0x216);
    let ram = vm.memory().as_slice();
    assert_eq!(&ram[0x300..0x303], &[0, 1, 0]);
}

#[test]
fn test_random_byte_is_masked() {
    let mut vm = load(&[0xC4, 0x0F]);
    vm.tick().unwrap();
    assert_eq!(vm.registers()[4], 0x0A);
}

#[test]
fn test_running_off_program_slides_through_zeroes() {
    // Empty memory past the program executes as NOP.
    let mut vm = load(&[0x60, 0x01]);
    vm.run_steps(10).unwrap();
    assert_eq!(vm.pc(), 0x214);
    assert_eq!(vm.registers()[0], 1);
}

#[test]
fn test_fault_fetching_past_memory() {
    // V0 + NNN lands on the last byte, so the fetch straddles the end.
    let mut vm = load(&[0x60, 0x01, 0xBF, 0xFE]);
    vm.run_steps(2).unwrap();
    assert_eq!(vm.pc(), 0xFFF);
    assert_eq!(
        vm.tick(),
        Err(Chip8Error::OutOfBounds { address: MEM_SIZE })
    );
}

#[test]
fn test_reload_clears_previous_program() {
    let mut vm = load(&[0x60, 0x09, 0xA3, 0x00, 0xF0, 0x55]);
    vm.run_steps(3).unwrap();
    vm.key_down(0x1).unwrap();

    vm.load_bytecode(&[0x12, 0x00]).unwrap();
    assert_eq!(vm.pc(), MEM_START as u16);
    assert_eq!(vm.index(), 0);
    assert_eq!(vm.registers(), &[0; REGISTER_COUNT]);
    assert_eq!(vm.memory().as_slice()[0x300], 0);
    assert_eq!(vm.memory().as_slice()[MEM_START + 2], 0);
}
