use std::{cell::Cell, rc::Rc};

use chip8::prelude::*;

/// Beeper that counts how often it was played.
#[derive(Clone, Default)]
struct CountingBeeper(Rc<Cell<usize>>);

impl Beeper for CountingBeeper {
    fn play(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fn load(rom: &[u8]) -> (Chip8Vm, CountingBeeper) {
    let beeper = CountingBeeper::default();
    let mut vm = Chip8Vm::with_devices(
        Chip8Conf::default(),
        beeper.clone(),
        RngSource::seeded(0),
    );
    vm.load_bytecode(rom).unwrap();
    (vm, beeper)
}

#[test]
fn test_sound_timer_beeps_once() {
    // LD v0, 1 ; LD ST, v0
    let (mut vm, beeper) = load(&[0x60, 0x01, 0xF0, 0x18]);
    vm.tick().unwrap();
    assert_eq!(vm.tick(), Ok(Flow::Sound));
    assert_eq!(vm.sound_timer(), 1);

    assert!(vm.tick_timers());
    assert_eq!(beeper.0.get(), 1);
    assert_eq!(vm.sound_timer(), 0);

    assert!(!vm.tick_timers());
    assert_eq!(beeper.0.get(), 1);
}

#[test]
fn test_long_sound_beeps_at_expiry() {
    let (mut vm, beeper) = load(&[0x60, 0x3C, 0xF0, 0x18]);
    vm.run_steps(2).unwrap();

    for _ in 0..59 {
        assert!(!vm.tick_timers());
    }
    assert_eq!(beeper.0.get(), 0);
    assert!(vm.tick_timers());
    assert_eq!(beeper.0.get(), 1);
}

#[test]
#[rustfmt::skip]
fn test_delay_timer_busy_wait() {
    // Classic delay loop: set DT, spin until it reads zero.
    let (mut vm, _) = load(&[
        0x60, 0x05, // 200: LD v0, 5
        0xF0, 0x15, // 202: LD DT, v0
        0xF1, 0x07, // 204: LD v1, DT
        0x31, 0x00, // 206: SE v1, 0
        0x12, 0x04, // 208: JP 0x204
        0x12, 0x0A, // 20A: JP 0x20A
    ]);

    let mut frames = 0;
    while vm.pc() != 0x20A {
        vm.run_steps(10).unwrap();
        vm.tick_timers();
        frames += 1;
        assert!(frames < 100, "delay loop did not terminate");
    }

    assert_eq!(vm.delay_timer(), 0);
    assert!(frames >= 5);
}

#[test]
fn test_timers_do_not_tick_with_instructions() {
    let (mut vm, beeper) = load(&[0x60, 0x02, 0xF0, 0x15, 0xF0, 0x18, 0x12, 0x06]);
    vm.run_steps(100).unwrap();
    assert_eq!(vm.delay_timer(), 2);
    assert_eq!(vm.sound_timer(), 2);
    assert_eq!(beeper.0.get(), 0);
}
