//! IO device interface
//!
//! Hooks to provide side effects to the virtual machine. The VM owns
//! one of each, injected when it is created.
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Sound output played when the sound timer runs out.
pub trait Beeper {
    /// Trigger the beep.
    ///
    /// Must not block. If a previous beep is still sounding the
    /// implementation may either restart or ignore it.
    fn play(&mut self);
}

/// Beeper that makes no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBeeper;

impl Beeper for SilentBeeper {
    fn play(&mut self) {}
}

impl<F: FnMut()> Beeper for F {
    fn play(&mut self) {
        self()
    }
}

/// Source of random bytes for `Cxnn (RND Vx, byte)`.
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
}

/// Adapter from a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Deterministic sequence, useful for replaying a run.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    #[inline]
    fn next_byte(&mut self) -> u8 {
        (self.0.next_u32() & 0xFF) as u8
    }
}
