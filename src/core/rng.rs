const STATE_INCREMENT: u32 = 0x6D2B_79F5;
const GOLDEN_GAMMA: u32 = 0x9E37_79B9;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Per-problem seed: sequential indices from one base seed stay distinct but
/// reproducible.
pub fn derive_seed(base: u32, problem_index: u32) -> u32 {
    base ^ golden_mix(problem_index.wrapping_add(1))
}

fn golden_mix(x: u32) -> u32 {
    x.wrapping_mul(GOLDEN_GAMMA)
}

/// Counter-based 32-bit generator. Every instance owns its state; the same
/// seed replays the same stream on every platform.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(STATE_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Uniform integer in `[lo, hi]`.
    pub fn rand_int(&mut self, lo: i64, hi: i64) -> i64 {
        let span = (hi - lo + 1) as f64;
        lo + (self.next_f64() * span).floor() as i64
    }

    /// Uniform real in `[lo, hi)`.
    pub fn rand_float(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    pub fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        let idx = self.rand_int(0, options.len() as i64 - 1);
        options[idx as usize]
    }
}
