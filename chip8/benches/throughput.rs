use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::prelude::*;

/// Endless loop drawing a sprite, doing arithmetic, and calling a subroutine.
#[rustfmt::skip]
const ROM: &[u8] = &[
    0xA2, 0x14, // 200: LD I, .sprite
    0x60, 0x00, // 202: LD v0, 0
    0x61, 0x00, // 204: LD v1, 0
    0xD0, 0x14, // 206: DRW v0, v1, 4
    0x70, 0x03, // 208: ADD v0, 3
    0x81, 0x04, // 20A: ADD v1, v0
    0x22, 0x10, // 20C: CALL 0x210
    0x12, 0x06, // 20E: JP 0x206
    0x80, 0x16, // 210: SHR v0
    0x00, 0xEE, // 212: RET
    0xF0, 0x90, 0x90, 0xF0, // .sprite
];

fn criterion_benchmark(c: &mut Criterion) {
    let mut vm = Chip8Vm::with_devices(Chip8Conf::default(), SilentBeeper, RngSource::seeded(1));
    vm.load_bytecode(ROM).unwrap();

    c.bench_function("loop bytecode", |b| {
        b.iter(|| {
            let step_count = black_box(1000_usize);
            black_box(vm.run_steps(step_count).unwrap())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
