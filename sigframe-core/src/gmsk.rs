//! GMSK frame: continuous-phase binary modulation
//!
//! The frequency pulse is a rectangle of one symbol smoothed by a Gaussian
//! with bandwidth-time product [`GMSK_BT`], spanning
//! `2 * GMSK_FILTER_DELAY + 1` symbols. Every symbol advances the carrier
//! phase by a quarter turn.
//!
//! The receiver works on the output of a frequency discriminator. A carrier
//! offset only adds a constant to that output, so preamble detection uses a
//! Pearson correlation that ignores both offset and scale, and acquisition
//! reads the offset from the mean difference between received and expected
//! preamble symbols.

use core::f32::consts::FRAC_PI_2;
use std::collections::VecDeque;

use num_complex::Complex32;

use crate::constants::{
    DEFAULT_DETECT_THRESHOLD, GMSK_BT, GMSK_FILTER_DELAY, GMSK_SAMPLES_PER_SYMBOL, PREAMBLE_MSEQUENCE_ORDER,
    USER_HEADER_LEN,
};
use crate::dsp::power_db;
use crate::generator::{encode_symbols, FrameGenerator, FrameSamples};
use crate::header::{FlexHeader, FrameProperties};
use crate::modem::{Modem, ModulationScheme};
use crate::packetizer::{Packetizer, PacketizerConfig};
use crate::scheme::{CrcScheme, FecScheme};
use crate::sequence::MSequence;
use crate::sync::{Detection, FrameFormat, FrameListener, FrameReceiver, FrameSync, PayloadLayout, SyncConfig, SyncStep};
use crate::Result;

const LAYOUT: FlexHeader = FlexHeader::without_modulation();
const HEADER: PacketizerConfig = PacketizerConfig::new(LAYOUT.len(), CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None);

/// Largest fraction of preamble symbols allowed to disagree after acquisition
const MAX_PREAMBLE_ERRORS: f32 = 0.125;

/// Sampled frequency pulse, normalized so a whole pulse sums to `k`
fn frequency_pulse(k: usize, m: usize, bt: f32) -> Vec<f32> {
    let sigma = 2f32.ln().sqrt() / (2.0 * core::f32::consts::PI * bt);
    let half = (m * k) as isize;
    let gauss: Vec<f32> = (-half..=half)
        .map(|i| {
            let t = i as f32 / k as f32;
            (-t * t / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let mut pulse = vec![0.0f32; gauss.len() + k - 1];
    for (i, &h) in gauss.iter().enumerate() {
        for p in &mut pulse[i..i + k] {
            *p += h;
        }
    }
    let scale = k as f32 / pulse.iter().sum::<f32>();
    pulse.iter_mut().for_each(|p| *p *= scale);
    pulse
}

/// Instantaneous frequency (in pulse units) of `symbols`, `len` samples long
fn frequency_train(symbols: &[f32], pulse: &[f32], k: usize, len: usize) -> Vec<f32> {
    let mut train = vec![0.0f32; len];
    for (i, &a) in symbols.iter().enumerate() {
        for (j, &g) in pulse.iter().enumerate() {
            if let Some(f) = train.get_mut(i * k + j) {
                *f += a * g;
            }
        }
    }
    train
}

fn preamble_symbols() -> Result<Vec<f32>> {
    Ok(MSequence::new(PREAMBLE_MSEQUENCE_ORDER)?.antipodal())
}

/// Continuous-phase modulator
#[derive(Debug, Clone)]
pub struct GmskModulator {
    k: usize,
    pulse: Vec<f32>,
    preamble: Vec<f32>,
}

impl GmskModulator {
    /// Modulator with the default pulse and preamble
    pub fn new() -> Result<Self> {
        let k = GMSK_SAMPLES_PER_SYMBOL;
        Ok(Self {
            k,
            pulse: frequency_pulse(k, GMSK_FILTER_DELAY, GMSK_BT),
            preamble: preamble_symbols()?,
        })
    }

    /// Render the preamble followed by antipodal `symbols` (+1 for bit 0)
    pub fn render(&self, symbols: &[f32]) -> Vec<Complex32> {
        let all: Vec<f32> = self.preamble.iter().chain(symbols).copied().collect();
        let len = all.len() * self.k + self.pulse.len();
        let train = frequency_train(&all, &self.pulse, self.k, len);

        let step = FRAC_PI_2 / self.k as f32;
        let mut phase = 0.0f32;
        train
            .iter()
            .map(|f| {
                let y = Complex32::from_polar(1.0, phase);
                phase = crate::dsp::wrap_phase(phase + step * f);
                y
            })
            .collect()
    }
}

/// Discriminator-based detector, acquisition and demodulator
#[derive(Debug, Clone)]
pub struct GmskReceiver {
    k: usize,
    delay: usize,
    preamble: Vec<f32>,
    /// expected discriminator sum of each preamble symbol, offset-free
    expected: Vec<f32>,
    /// zero-mean preamble frequency train and its norm
    reference: Vec<f32>,
    reference_norm: f32,
    threshold: f32,

    prev: Complex32,
    window: VecDeque<f32>,
    metric: [f32; 2],

    primed: bool,
    acc: f32,
    count: usize,
    sums: Vec<f32>,
    energy: f32,
    samples: usize,

    omega: f32,
    rssi: f32,
}

impl GmskReceiver {
    /// Receiver for the default pulse and preamble
    pub fn new() -> Result<Self> {
        let k = GMSK_SAMPLES_PER_SYMBOL;
        let delay = GMSK_FILTER_DELAY * k;
        let pulse = frequency_pulse(k, GMSK_FILTER_DELAY, GMSK_BT);
        let preamble = preamble_symbols()?;
        let len = preamble.len() * k;
        let train = frequency_train(&preamble, &pulse, k, len + pulse.len());

        let step = FRAC_PI_2 / k as f32;
        let expected = (0..preamble.len())
            .map(|i| step * train[i * k + delay..i * k + delay + k].iter().sum::<f32>())
            .collect();
        let mean = train[..len].iter().sum::<f32>() / len as f32;
        let reference: Vec<f32> = train[..len].iter().map(|f| f - mean).collect();
        let reference_norm = reference.iter().map(|r| r * r).sum::<f32>().sqrt();

        Ok(Self {
            k,
            delay,
            expected,
            window: VecDeque::with_capacity(len),
            sums: Vec::with_capacity(preamble.len()),
            preamble,
            reference,
            reference_norm,
            threshold: DEFAULT_DETECT_THRESHOLD,
            prev: Complex32::new(0.0, 0.0),
            metric: [0.0; 2],
            primed: false,
            acc: 0.0,
            count: 0,
            energy: 0.0,
            samples: 0,
            omega: 0.0,
            rssi: power_db(0.0),
        })
    }

    fn discriminate(&mut self, x: Complex32) -> f32 {
        let d = (x * self.prev.conj()).arg();
        self.prev = x;
        d
    }

    fn pearson(&self) -> f32 {
        let n = self.window.len() as f32;
        let mean = self.window.iter().sum::<f32>() / n;
        let variance: f32 = self.window.iter().map(|d| (d - mean) * (d - mean)).sum();
        if variance <= 1e-9 || self.reference_norm <= 0.0 {
            return 0.0;
        }
        let dot: f32 = self.window.iter().zip(&self.reference).map(|(d, r)| d * r).sum();
        dot / (variance.sqrt() * self.reference_norm)
    }

    fn estimate(&mut self) -> SyncStep {
        let k = self.k as f32;
        // the last symbols carry inter-symbol interference from the header
        let clean = self.preamble.len() - GMSK_FILTER_DELAY;
        let offset: f32 = self.sums[..clean]
            .iter()
            .zip(&self.expected)
            .map(|(s, e)| s - e)
            .sum();
        self.omega = offset / (clean as f32 * k);

        let errors = self
            .sums
            .iter()
            .zip(&self.preamble)
            .filter(|(s, p)| (**s - k * self.omega) * **p <= 0.0)
            .count();
        if errors as f32 > MAX_PREAMBLE_ERRORS * self.preamble.len() as f32 {
            return SyncStep::Lost;
        }
        self.rssi = power_db(self.energy / self.samples.max(1) as f32);
        self.acc = 0.0;
        self.count = 0;
        SyncStep::Locked { rewind: 0 }
    }
}

impl FrameReceiver for GmskReceiver {
    fn history_len(&self) -> usize {
        self.reference.len() + 2
    }

    fn detect(&mut self, x: Complex32, _index: u64) -> Option<Detection> {
        let d = self.discriminate(x);
        let len = self.reference.len();
        self.window.push_back(d);
        if self.window.len() > len {
            self.window.pop_front();
        }
        let metric = if self.window.len() == len { self.pearson() } else { 0.0 };

        let [prev2, prev] = self.metric;
        if prev > self.threshold && metric < prev && prev >= prev2 {
            let denom = prev2 - 2.0 * prev + metric;
            let timing_offset = if denom.abs() > 1e-6 { 0.5 * (prev2 - metric) / denom } else { 0.0 };
            self.metric = [0.0; 2];
            self.primed = false;
            self.acc = 0.0;
            self.count = 0;
            self.sums.clear();
            self.energy = 0.0;
            self.samples = 0;
            // the peak is one sample back; acquisition starts one sample
            // ahead of the first preamble symbol window to prime the
            // discriminator
            return Some(Detection { rewind: len + 2 - self.delay, metric: prev, timing_offset, cfo: 0.0 });
        }
        self.metric = [prev, metric];
        None
    }

    fn synchronize(&mut self, x: Complex32, _index: u64) -> SyncStep {
        if !self.primed {
            self.prev = x;
            self.primed = true;
            return SyncStep::Pending;
        }
        self.energy += x.norm_sqr();
        self.samples += 1;
        self.acc += self.discriminate(x);
        self.count += 1;
        if self.count == self.k {
            self.sums.push(self.acc);
            self.acc = 0.0;
            self.count = 0;
        }
        if self.sums.len() < self.preamble.len() {
            return SyncStep::Pending;
        }
        self.estimate()
    }

    fn demodulate(&mut self, x: Complex32, _index: u64, symbols: &mut Vec<Complex32>) {
        self.acc += self.discriminate(x);
        self.count += 1;
        if self.count == self.k {
            let value = (self.acc - self.k as f32 * self.omega) / FRAC_PI_2;
            symbols.push(Complex32::new(value, 0.0));
            self.acc = 0.0;
            self.count = 0;
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.metric = [0.0; 2];
        self.primed = false;
        self.acc = 0.0;
        self.count = 0;
        self.sums.clear();
    }

    fn rssi_db(&self) -> f32 {
        self.rssi
    }

    fn cfo(&self) -> f32 {
        self.omega
    }

    fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

/// Header interpretation of the GMSK frame
#[derive(Debug, Clone, Copy, Default)]
pub struct GmskFormat;

impl FrameFormat for GmskFormat {
    fn header_config(&self) -> PacketizerConfig {
        HEADER
    }

    fn header_modulation(&self) -> ModulationScheme {
        ModulationScheme::Psk2
    }

    fn payload_layout(&self, header: &[u8]) -> Option<PayloadLayout> {
        LAYOUT.parse(header, ModulationScheme::Psk2)
    }

    fn user_header<'a>(&self, header: &'a [u8]) -> &'a [u8] {
        &header[..USER_HEADER_LEN.min(header.len())]
    }
}

/// Synchronizer for GMSK frames
pub type GmskFrameSync<L> = FrameSync<GmskReceiver, GmskFormat, L>;

impl<L: FrameListener> FrameSync<GmskReceiver, GmskFormat, L> {
    /// Synchronizer delivering GMSK frames to `listener`
    pub fn gmsk(listener: L) -> Result<Self> {
        Self::with_parts(GmskReceiver::new()?, GmskFormat, listener, SyncConfig::default())
    }
}

/// Generator for GMSK frames
#[derive(Debug)]
pub struct GmskFrameGenerator {
    props: FrameProperties,
    header: Packetizer,
    payload: Packetizer,
    modem: Modem,
    modulator: GmskModulator,
    samples: FrameSamples,
}

impl GmskFrameGenerator {
    /// Generator emitting frames with the protection in `props`; the
    /// modulation field is ignored
    pub fn new(props: FrameProperties) -> Result<Self> {
        let props = FrameProperties { modulation: ModulationScheme::Psk2, ..props };
        props.validate()?;
        Ok(Self {
            props,
            header: Packetizer::new(HEADER)?,
            payload: Packetizer::new(props.packetizer_config(1))?,
            modem: Modem::new(ModulationScheme::Psk2)?,
            modulator: GmskModulator::new()?,
            samples: FrameSamples::default(),
        })
    }

    /// Properties applied to the next assembled frame
    pub fn properties(&self) -> &FrameProperties {
        &self.props
    }
}

impl FrameGenerator for GmskFrameGenerator {
    fn assemble(&mut self, header: &[u8; USER_HEADER_LEN], payload: &[u8]) -> Result<()> {
        let encoded_header = LAYOUT.encode(header, payload.len(), &self.props)?;
        self.payload.reconfigure(self.props.packetizer_config(payload.len()))?;

        let mut symbols = encode_symbols(&mut self.header, &self.modem, &encoded_header)?;
        symbols.extend(encode_symbols(&mut self.payload, &self.modem, payload)?);
        let antipodal: Vec<f32> = symbols.iter().map(|s| s.re).collect();
        self.samples.load(self.modulator.render(&antipodal));
        Ok(())
    }

    fn samples(&self) -> &FrameSamples {
        &self.samples
    }

    fn samples_mut(&mut self) -> &mut FrameSamples {
        &mut self.samples
    }
}
