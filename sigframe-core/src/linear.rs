//! Single-carrier linear physical layer used by the frame64 and flexible
//! frame families
//!
//! Symbols are sent with rectangular pulses. Every frame opens with a BPSK
//! m-sequence preamble that the receiver correlates against in three
//! segments, so a carrier offset spread over the preamble only costs a
//! little correlation gain and can be read off the phase progression between
//! segments.

use std::collections::VecDeque;

use num_complex::Complex32;

use crate::constants::{DEFAULT_DETECT_THRESHOLD, LINEAR_SAMPLES_PER_SYMBOL, PREAMBLE_MSEQUENCE_ORDER};
use crate::dsp::{power_db, Nco};
use crate::modem::{Modem, ModulationScheme};
use crate::sequence::MSequence;
use crate::sync::{Detection, FrameReceiver, SyncStep};
use crate::Result;

const DETECT_SEGMENTS: usize = 3;

/// Minimum preamble coherence accepted during acquisition
const MIN_SYNC_QUALITY: f32 = 0.5;

/// Decision-directed carrier loop gains (phase, frequency)
const PLL_ALPHA: f32 = 0.05;
const PLL_BETA: f32 = 0.00125;

fn preamble_symbols() -> Result<Vec<f32>> {
    Ok(MSequence::new(PREAMBLE_MSEQUENCE_ORDER)?.antipodal())
}

/// Renders preamble and data symbols into rectangular-pulse samples
#[derive(Debug, Clone)]
pub struct LinearModulator {
    sps: usize,
    preamble: Vec<f32>,
}

impl LinearModulator {
    /// Modulator with the default preamble and samples per symbol
    pub fn new() -> Result<Self> {
        Ok(Self { sps: LINEAR_SAMPLES_PER_SYMBOL, preamble: preamble_symbols()? })
    }

    /// Samples per symbol
    pub fn samples_per_symbol(&self) -> usize {
        self.sps
    }

    /// Number of preamble symbols
    pub fn preamble_len(&self) -> usize {
        self.preamble.len()
    }

    /// Render the preamble followed by `symbols`
    pub fn render(&self, symbols: &[Complex32]) -> Vec<Complex32> {
        let mut out = Vec::with_capacity((self.preamble.len() + symbols.len()) * self.sps);
        let preamble = self.preamble.iter().map(|&p| Complex32::new(p, 0.0));
        for s in preamble.chain(symbols.iter().copied()) {
            out.extend(std::iter::repeat(s).take(self.sps));
        }
        out
    }
}

/// Preamble detector, acquisition and integrate-and-dump demodulator
#[derive(Debug, Clone)]
pub struct LinearReceiver {
    sps: usize,
    preamble: Vec<f32>,
    /// preamble at the sample rate
    reference: Vec<f32>,
    threshold: f32,

    window: VecDeque<Complex32>,
    metric: [f32; 2],
    segments: [Complex32; DETECT_SEGMENTS],
    coarse_cfo: f32,

    sync_buf: Vec<Complex32>,

    nco: Nco,
    gain: f32,
    acc: Complex32,
    count: usize,
    modem: Option<Modem>,
}

impl LinearReceiver {
    /// Receiver for the default preamble
    pub fn new() -> Result<Self> {
        let sps = LINEAR_SAMPLES_PER_SYMBOL;
        let preamble = preamble_symbols()?;
        let reference: Vec<f32> = preamble
            .iter()
            .flat_map(|&p| std::iter::repeat(p).take(sps))
            .collect();
        Ok(Self {
            sps,
            window: VecDeque::with_capacity(reference.len()),
            sync_buf: Vec::with_capacity(reference.len()),
            preamble,
            reference,
            threshold: DEFAULT_DETECT_THRESHOLD,
            metric: [0.0; 2],
            segments: [Complex32::new(0.0, 0.0); DETECT_SEGMENTS],
            coarse_cfo: 0.0,
            nco: Nco::default(),
            gain: 1.0,
            acc: Complex32::new(0.0, 0.0),
            count: 0,
            modem: None,
        })
    }

    fn preamble_samples(&self) -> usize {
        self.reference.len()
    }

    /// Segmented correlation of the window against the preamble
    fn correlate(&self) -> (f32, [Complex32; DETECT_SEGMENTS]) {
        let len = self.reference.len();
        let seg_len = len / DETECT_SEGMENTS;
        let mut segments = [Complex32::new(0.0, 0.0); DETECT_SEGMENTS];
        let mut energy = 0.0f32;
        for (i, (x, r)) in self.window.iter().zip(&self.reference).enumerate() {
            segments[(i / seg_len).min(DETECT_SEGMENTS - 1)] += *x * *r;
            energy += x.norm_sqr();
        }
        if energy <= f32::MIN_POSITIVE {
            return (0.0, segments);
        }
        let magnitude: f32 = segments.iter().map(|c| c.norm()).sum();
        (magnitude / (len as f32 * energy).sqrt(), segments)
    }

    fn segment_cfo(segments: &[Complex32; DETECT_SEGMENTS], seg_len: usize) -> f32 {
        let rotation: Complex32 = segments.windows(2).map(|w| w[1] * w[0].conj()).sum();
        rotation.arg() / seg_len as f32
    }

    fn estimate(&mut self) -> SyncStep {
        let sps = self.sps;
        let mut rotation = Complex32::new(0.0, 0.0);
        let mut derotate = Complex32::new(1.0, 0.0);
        let step = Complex32::from_polar(1.0, -self.coarse_cfo);

        let mut sums = Vec::with_capacity(self.preamble.len());
        for (k, &p) in self.preamble.iter().enumerate() {
            let mut r = Complex32::new(0.0, 0.0);
            for &y in &self.sync_buf[k * sps..(k + 1) * sps] {
                r += y * derotate * p;
                derotate *= step;
            }
            if let Some(prev) = sums.last() {
                rotation += r * Complex32::conj(prev);
            }
            sums.push(r);
        }
        let residual = rotation.arg() / sps as f32;

        let mut coherent = Complex32::new(0.0, 0.0);
        let mut total = 0.0f32;
        for (k, r) in sums.iter().enumerate() {
            coherent += *r * Complex32::from_polar(1.0, -residual * (k * sps) as f32);
            total += r.norm();
        }
        if total <= f32::MIN_POSITIVE || coherent.norm() / total < MIN_SYNC_QUALITY {
            return SyncStep::Lost;
        }

        let g = coherent / (sums.len() * sps) as f32;
        let omega = self.coarse_cfo + residual;
        let theta = g.arg() - residual * (sps - 1) as f32 / 2.0;
        self.gain = g.norm();
        self.nco = Nco::new(theta + omega * self.preamble_samples() as f32, omega);
        self.acc = Complex32::new(0.0, 0.0);
        self.count = 0;
        SyncStep::Locked { rewind: 0 }
    }
}

impl FrameReceiver for LinearReceiver {
    fn history_len(&self) -> usize {
        self.preamble_samples() + 2
    }

    fn detect(&mut self, x: Complex32, _index: u64) -> Option<Detection> {
        let len = self.preamble_samples();
        self.window.push_back(x);
        if self.window.len() > len {
            self.window.pop_front();
        }
        let (metric, segments) = if self.window.len() == len {
            self.correlate()
        } else {
            (0.0, self.segments)
        };

        let [prev2, prev] = self.metric;
        let peak = prev > self.threshold && metric < prev && prev >= prev2;
        let detection = peak.then(|| {
            let denom = prev2 - 2.0 * prev + metric;
            let timing_offset = if denom.abs() > 1e-6 { 0.5 * (prev2 - metric) / denom } else { 0.0 };
            Detection {
                rewind: len + 1,
                metric: prev,
                timing_offset,
                cfo: Self::segment_cfo(&self.segments, len / DETECT_SEGMENTS),
            }
        });

        if let Some(d) = detection {
            self.metric = [0.0; 2];
            self.coarse_cfo = d.cfo;
            self.sync_buf.clear();
        } else {
            self.metric = [prev, metric];
            self.segments = segments;
        }
        detection
    }

    fn synchronize(&mut self, x: Complex32, _index: u64) -> SyncStep {
        self.sync_buf.push(x);
        if self.sync_buf.len() < self.preamble_samples() {
            return SyncStep::Pending;
        }
        self.estimate()
    }

    fn set_modulation(&mut self, scheme: ModulationScheme) {
        if self.modem.as_ref().map(Modem::scheme) != Some(scheme) {
            self.modem = Modem::new(scheme).ok();
        }
    }

    fn demodulate(&mut self, x: Complex32, _index: u64, symbols: &mut Vec<Complex32>) {
        self.acc += self.nco.mix_down(x);
        self.count += 1;
        if self.count < self.sps {
            return;
        }
        let v = self.acc / (self.sps as f32 * self.gain);
        self.acc = Complex32::new(0.0, 0.0);
        self.count = 0;

        if let Some(modem) = &self.modem {
            let error = (v * modem.decision(v).conj()).arg();
            self.nco.adjust_phase(PLL_ALPHA * error);
            self.nco.adjust_frequency(PLL_BETA * error);
        }
        symbols.push(v);
    }

    fn reset(&mut self) {
        self.window.clear();
        self.metric = [0.0; 2];
        self.sync_buf.clear();
        self.acc = Complex32::new(0.0, 0.0);
        self.count = 0;
    }

    fn rssi_db(&self) -> f32 {
        power_db(self.gain * self.gain)
    }

    fn cfo(&self) -> f32 {
        self.nco.frequency()
    }

    fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(samples: &[Complex32], gain: f32, phase: f32, cfo: f32) -> Vec<Complex32> {
        samples
            .iter()
            .enumerate()
            .map(|(n, &x)| x * Complex32::from_polar(gain, phase + cfo * n as f32))
            .collect()
    }

    #[test]
    fn test_detects_preamble_and_estimates_offsets() {
        let modulator = LinearModulator::new().unwrap();
        let data: Vec<Complex32> = (0..40).map(|i| Complex32::new(if i % 3 == 0 { 1.0 } else { -1.0 }, 0.0)).collect();
        let mut tx = vec![Complex32::new(0.0, 0.0); 37];
        tx.extend(modulator.render(&data));
        let rx = channel(&tx, 0.5, 1.1, 0.01);

        let mut receiver = LinearReceiver::new().unwrap();
        let preamble_end = 37 + modulator.preamble_len() * modulator.samples_per_symbol() - 1;
        let mut found = None;
        for (i, &x) in rx.iter().enumerate() {
            if let Some(d) = receiver.detect(x, i as u64) {
                found = Some((i, d));
                break;
            }
        }
        let (index, detection) = found.expect("preamble not detected");
        assert_eq!(index, preamble_end + 1);
        assert!(detection.metric > 0.9);
        assert!((detection.cfo - 0.01).abs() < 2e-3);

        // replay the preamble into acquisition
        let start = index + 1 - detection.rewind;
        assert_eq!(start, 37);
        let mut step = SyncStep::Pending;
        for (i, &x) in rx.iter().enumerate().skip(start) {
            step = receiver.synchronize(x, i as u64);
            if step != SyncStep::Pending {
                break;
            }
        }
        assert_eq!(step, SyncStep::Locked { rewind: 0 });
        assert!((receiver.cfo() - 0.01).abs() < 1e-4);
        assert!((receiver.rssi_db() - power_db(0.25)).abs() < 0.2);

        receiver.set_modulation(ModulationScheme::Psk2);
        let mut symbols = Vec::new();
        for (i, &x) in rx.iter().enumerate().skip(preamble_end + 1) {
            receiver.demodulate(x, i as u64, &mut symbols);
        }
        assert_eq!(symbols.len(), data.len());
        for (got, want) in symbols.iter().zip(&data) {
            assert!((*got - *want).norm() < 0.1, "{got} vs {want}");
        }
    }

    #[test]
    fn test_no_detection_on_silence() {
        let mut receiver = LinearReceiver::new().unwrap();
        for i in 0..1000 {
            assert!(receiver.detect(Complex32::new(0.0, 0.0), i).is_none());
        }
    }
}
