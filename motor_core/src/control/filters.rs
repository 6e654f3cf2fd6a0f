//! First-order exponential smoothing.
//!
//! Zero (or negative) time constant disables the filter: the output follows
//! the input. The first sample after construction or reset primes the state.

/// State of one exponential smoothing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpFilter {
    value: f32,
    primed: bool,
}

impl ExpFilter {
    pub const fn new() -> Self {
        Self {
            value: 0.0,
            primed: false,
        }
    }

    /// Reset to the unprimed state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Last output (0 until primed).
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Feed one sample taken `dt` seconds after the previous one.
    #[inline]
    pub fn update(&mut self, input: f32, tau: f32, dt: f32) -> f32 {
        if !self.primed || tau <= 0.0 || dt <= 0.0 {
            self.value = input;
            self.primed = true;
        } else {
            let alpha = dt / (tau + dt);
            self.value += alpha * (input - self.value);
        }
        self.value
    }
}

/// Filter over a triple of values sharing one time constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpFilter3 {
    pub filters: [ExpFilter; 3],
}

impl ExpFilter3 {
    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(ExpFilter::reset);
    }

    pub fn update(&mut self, input: [f32; 3], tau: f32, dt: f32) -> [f32; 3] {
        let mut out = [0.0; 3];
        for ((o, f), x) in out.iter_mut().zip(self.filters.iter_mut()).zip(input) {
            *o = f.update(x, tau, dt);
        }
        out
    }

    pub fn values(&self) -> [f32; 3] {
        [
            self.filters[0].value(),
            self.filters[1].value(),
            self.filters[2].value(),
        ]
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
