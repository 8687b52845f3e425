//! Small per-sample signal conditioning blocks shared by the receivers

use core::f32::consts::PI;

use num_complex::Complex32;

/// Power ratio to decibels, floored at -120 dB
pub fn power_db(power: f32) -> f32 {
    10.0 * power.max(1e-12).log10()
}

/// Single-pole DC blocking filter, `y[n] = x[n] - x[n-1] + alpha * y[n-1]`
#[derive(Debug, Clone)]
pub struct DcBlocker {
    alpha: f32,
    prev_input: Complex32,
    prev_output: Complex32,
}

impl DcBlocker {
    /// Blocker with pole `alpha`, clamped to `[0.9, 0.99999]`
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.9, 0.99999),
            prev_input: Complex32::new(0.0, 0.0),
            prev_output: Complex32::new(0.0, 0.0),
        }
    }

    /// Filter one sample
    #[inline]
    pub fn process(&mut self, x: Complex32) -> Complex32 {
        let y = x - self.prev_input + self.prev_output * self.alpha;
        self.prev_input = x;
        self.prev_output = y;
        y
    }

    /// Clear the filter memory
    pub fn reset(&mut self) {
        self.prev_input = Complex32::new(0.0, 0.0);
        self.prev_output = Complex32::new(0.0, 0.0);
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(0.999)
    }
}

/// Exponentially averaged received signal power
#[derive(Debug, Clone)]
pub struct SignalLevel {
    alpha: f32,
    power: f32,
}

impl SignalLevel {
    /// Tracker with smoothing factor `alpha` in (0, 1]
    pub fn new(alpha: f32) -> Self {
        Self { alpha: alpha.clamp(1e-6, 1.0), power: 0.0 }
    }

    /// Fold one sample into the average
    #[inline]
    pub fn update(&mut self, x: Complex32) {
        self.power += self.alpha * (x.norm_sqr() - self.power);
    }

    /// Average power, linear
    pub fn power(&self) -> f32 {
        self.power
    }

    /// Average power in dB
    pub fn rssi_db(&self) -> f32 {
        power_db(self.power)
    }

    /// True when the level sits below `squelch_db`
    pub fn is_squelched(&self, squelch_db: Option<f32>) -> bool {
        squelch_db.is_some_and(|level| self.rssi_db() < level)
    }
}

impl Default for SignalLevel {
    fn default() -> Self {
        Self::new(0.01)
    }
}

/// Numerically controlled oscillator used to remove a carrier offset
#[derive(Debug, Clone, Default)]
pub struct Nco {
    phase: f32,
    frequency: f32,
}

impl Nco {
    /// Oscillator at `frequency` radians/sample starting at `phase`
    pub fn new(phase: f32, frequency: f32) -> Self {
        Self { phase: wrap_phase(phase), frequency }
    }

    /// Current phase in radians
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Current frequency in radians/sample
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Shift the phase by `delta` radians
    pub fn adjust_phase(&mut self, delta: f32) {
        self.phase = wrap_phase(self.phase + delta);
    }

    /// Shift the frequency by `delta` radians/sample
    pub fn adjust_frequency(&mut self, delta: f32) {
        self.frequency += delta;
    }

    /// Multiply `x` by the conjugate oscillator output and advance one sample
    #[inline]
    pub fn mix_down(&mut self, x: Complex32) -> Complex32 {
        let y = x * Complex32::from_polar(1.0, -self.phase);
        self.step();
        y
    }

    /// Advance one sample
    #[inline]
    pub fn step(&mut self) {
        self.phase = wrap_phase(self.phase + self.frequency);
    }
}

/// Wrap a phase into `(-pi, pi]`
#[inline]
pub fn wrap_phase(mut phase: f32) -> f32 {
    while phase > PI {
        phase -= 2.0 * PI;
    }
    while phase <= -PI {
        phase += 2.0 * PI;
    }
    phase
}
