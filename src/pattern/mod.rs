//! Pattern data - the boolean step matrix, independent of UI and audio

use rand::Rng;

/// Number of steps in one loop of the pattern (a 16th-note grid).
pub const STEP_COUNT: usize = 16;

/// One row per instrument, [`STEP_COUNT`] columns. Dimensions are fixed at
/// construction; cell values are freely mutable, including while the
/// sequencer is running.
#[derive(Debug, Clone)]
pub struct PatternGrid {
    rows: Vec<[bool; STEP_COUNT]>,
}

impl PatternGrid {
    /// Panics if `instruments` is zero.
    pub fn new(instruments: usize) -> Self {
        assert!(instruments >= 1, "pattern needs at least one instrument row");
        Self {
            rows: vec![[false; STEP_COUNT]; instruments],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Panics on an out-of-range row or step; callers own the bounds.
    pub fn get(&self, row: usize, step: usize) -> bool {
        self.rows[row][step]
    }

    /// Panics on an out-of-range row or step; callers own the bounds.
    pub fn toggle(&mut self, row: usize, step: usize) {
        self.rows[row][step] = !self.rows[row][step];
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            *row = [false; STEP_COUNT];
        }
    }

    /// Sets every cell independently to on/off with equal probability.
    pub fn randomize(&mut self) {
        self.randomize_with(&mut rand::rng());
    }

    /// Like [`randomize`](Self::randomize) with a caller-supplied RNG.
    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = rng.random_bool(0.5);
            }
        }
    }
}
