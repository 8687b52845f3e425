//! OFDM flexible frame
//!
//! ```text
//! | S0 S0 S0 S0 S0 | cp S1 | cp header ... | cp payload ... | taper |
//! ```
//!
//! The S0 section is a symbol using only even subcarriers, so it repeats
//! every half symbol. The receiver runs a Schmidl-Cox detector over it,
//! which also yields the fractional carrier offset. S1 uses every active
//! subcarrier; its position gives fine timing and its spectrum the channel
//! estimate. Data symbols carry pilots for common phase tracking.
//!
//! The header (flexible layout with modulation byte) is BPSK over the data
//! subcarriers; the payload uses the declared modulation. Both start on a
//! symbol boundary and pad their last symbol.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::constants::{
    DEFAULT_DETECT_THRESHOLD, OFDM_DEFAULT_CP_LEN, OFDM_DEFAULT_SUBCARRIERS, OFDM_DEFAULT_TAPER_LEN, USER_HEADER_LEN,
};
use crate::dsp::{power_db, wrap_phase, Nco};
use crate::error::FrameError;
use crate::generator::{encode_symbols, FrameGenerator, FrameSamples};
use crate::header::{FlexHeader, FrameProperties};
use crate::modem::{Modem, ModulationScheme};
use crate::packetizer::{Packetizer, PacketizerConfig};
use crate::scheme::{CrcScheme, FecScheme};
use crate::sequence::MSequence;
use crate::sync::{Detection, FrameFormat, FrameListener, FrameReceiver, FrameSync, PayloadLayout, SyncConfig, SyncStep};
use crate::Result;

const LAYOUT: FlexHeader = FlexHeader::with_modulation();
const HEADER: PacketizerConfig = PacketizerConfig::new(LAYOUT.len(), CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None);
const HEADER_MODULATION: ModulationScheme = ModulationScheme::Psk2;

/// Number of S0 symbol periods (with their prefixes) in the preamble
const S0_SYMBOLS: usize = 2;

/// Extra samples searched on each side of the nominal S1 position
const TIMING_SLACK: usize = 4;

/// Minimum normalized S1 correlation accepted during acquisition
const MIN_S1_CORRELATION: f32 = 0.5;

/// Gain of the pilot-driven carrier frequency correction
const PILOT_FREQUENCY_GAIN: f32 = 0.5;

const PREAMBLE_SEQUENCE_ORDER: u32 = 8;
const PILOT_SEQUENCE_ORDER: u32 = 7;

/// Role of one subcarrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcarrierKind {
    /// Unused
    Null,
    /// Known reference value for phase tracking
    Pilot,
    /// Carries data symbols
    Data,
}

/// OFDM frame geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfdmParams {
    /// Subcarrier count (FFT size)
    pub subcarriers: usize,
    /// Cyclic prefix length in samples
    pub cp_len: usize,
    /// Overlapping taper between symbols in samples, at most `cp_len`
    pub taper_len: usize,
    /// Role of every subcarrier in FFT bin order (bin 0 is DC); generated
    /// from `subcarriers` when absent
    pub allocation: Option<Vec<SubcarrierKind>>,
}

impl Default for OfdmParams {
    fn default() -> Self {
        Self {
            subcarriers: OFDM_DEFAULT_SUBCARRIERS,
            cp_len: OFDM_DEFAULT_CP_LEN,
            taper_len: OFDM_DEFAULT_TAPER_LEN,
            allocation: None,
        }
    }
}

/// Signed frequency index of FFT bin `k`
fn bin_frequency(k: usize, m: usize) -> isize {
    if k < m / 2 {
        k as isize
    } else {
        k as isize - m as isize
    }
}

/// FFT bins in ascending frequency order
fn bins_by_frequency(m: usize) -> impl Iterator<Item = usize> {
    (m / 2..m).chain(0..m / 2)
}

impl OfdmParams {
    /// Parameters with `subcarriers` bins and the default allocation
    pub fn new(subcarriers: usize, cp_len: usize, taper_len: usize) -> Self {
        Self { subcarriers, cp_len, taper_len, allocation: None }
    }

    /// Default allocation for `m` subcarriers
    ///
    /// DC and the outer tenth of the band on each side are nulled; every
    /// eighth active subcarrier, counted from the lowest frequency and
    /// starting with the fifth, is a pilot.
    pub fn default_allocation(m: usize) -> Vec<SubcarrierKind> {
        let guard = m / 10;
        let edge = (m / 2).saturating_sub(guard) as isize;
        let mut allocation = vec![SubcarrierKind::Null; m];
        let mut position = 0usize;
        for k in bins_by_frequency(m) {
            let f = bin_frequency(k, m);
            if f == 0 || f.abs() > edge {
                continue;
            }
            allocation[k] = if position % 8 == 4 { SubcarrierKind::Pilot } else { SubcarrierKind::Data };
            position += 1;
        }
        allocation
    }

    /// The allocation in use
    pub fn allocation(&self) -> Vec<SubcarrierKind> {
        self.allocation
            .clone()
            .unwrap_or_else(|| Self::default_allocation(self.subcarriers))
    }

    /// Samples per OFDM symbol including the cyclic prefix
    pub fn symbol_len(&self) -> usize {
        self.subcarriers + self.cp_len
    }

    /// Number of data subcarriers
    pub fn data_subcarriers(&self) -> usize {
        self.allocation()
            .iter()
            .filter(|k| **k == SubcarrierKind::Data)
            .count()
    }

    /// Check the geometry and allocation
    pub fn validate(&self) -> Result<()> {
        let m = self.subcarriers;
        if m < 8 || m % 2 != 0 {
            return Err(FrameError::InvalidParameter(format!("subcarrier count {m} must be even and at least 8")));
        }
        if self.cp_len > m {
            return Err(FrameError::InvalidParameter(format!("cyclic prefix {} exceeds {m} subcarriers", self.cp_len)));
        }
        if self.taper_len > self.cp_len {
            return Err(FrameError::InvalidParameter(format!(
                "taper {} exceeds cyclic prefix {}",
                self.taper_len, self.cp_len
            )));
        }
        let allocation = self.allocation();
        if allocation.len() != m {
            return Err(FrameError::InvalidParameter(format!(
                "allocation has {} entries for {m} subcarriers",
                allocation.len()
            )));
        }
        let count = |kind| allocation.iter().filter(|k| **k == kind).count();
        if count(SubcarrierKind::Pilot) == 0 {
            return Err(FrameError::InvalidParameter("allocation has no pilot subcarriers".into()));
        }
        if count(SubcarrierKind::Data) == 0 {
            return Err(FrameError::InvalidParameter("allocation has no data subcarriers".into()));
        }
        let even_active = allocation
            .iter()
            .step_by(2)
            .any(|k| *k != SubcarrierKind::Null);
        if !even_active {
            return Err(FrameError::InvalidParameter("allocation has no active even subcarrier".into()));
        }
        Ok(())
    }
}

/// Subcarrier map and preamble symbols derived from [`OfdmParams`]
#[derive(Clone)]
struct SymbolLayout {
    m: usize,
    cp: usize,
    taper: usize,
    pilots: Vec<usize>,
    data: Vec<usize>,
    /// scale of a symbol using every active subcarrier
    scale: f32,
    /// S0 time-domain body
    s0: Vec<Complex32>,
    /// S1 spectrum (+-1 on active bins) and time-domain body
    s1_spectrum: Vec<f32>,
    s1: Vec<Complex32>,
    ifft: Arc<dyn Fft<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for SymbolLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolLayout")
            .field("m", &self.m)
            .field("cp", &self.cp)
            .field("taper", &self.taper)
            .field("pilots", &self.pilots.len())
            .field("data", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl SymbolLayout {
    fn new(params: &OfdmParams) -> Result<Self> {
        params.validate()?;
        let m = params.subcarriers;
        let allocation = params.allocation();

        let mut pilots = Vec::new();
        let mut data = Vec::new();
        let mut active = Vec::new();
        for k in bins_by_frequency(m) {
            match allocation[k] {
                SubcarrierKind::Null => continue,
                SubcarrierKind::Pilot => pilots.push(k),
                SubcarrierKind::Data => data.push(k),
            }
            active.push(k);
        }

        let mut planner = FftPlanner::<f32>::new();
        let ifft = planner.plan_fft_inverse(m);
        let fft = planner.plan_fft_forward(m);

        let mut pn = MSequence::new(PREAMBLE_SEQUENCE_ORDER)?;
        let mut antipodal = || if pn.next_bit() == 0 { 1.0f32 } else { -1.0 };

        let mut s0_spectrum = vec![Complex32::new(0.0, 0.0); m];
        let mut even = 0usize;
        for &k in active.iter().filter(|k| *k % 2 == 0) {
            s0_spectrum[k] = Complex32::new(antipodal(), 0.0);
            even += 1;
        }
        let mut s1_spectrum = vec![0.0f32; m];
        for &k in &active {
            s1_spectrum[k] = antipodal();
        }

        let scale = 1.0 / (active.len() as f32).sqrt();
        let mut layout = Self {
            m,
            cp: params.cp_len,
            taper: params.taper_len,
            pilots,
            data,
            scale,
            s0: Vec::new(),
            s1: Vec::new(),
            s1_spectrum,
            ifft,
            fft,
        };
        layout.s0 = layout.synthesize(s0_spectrum, 1.0 / (even as f32).sqrt());
        let s1 = layout.s1_spectrum.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        layout.s1 = layout.synthesize(s1, scale);
        Ok(layout)
    }

    fn synthesize(&self, mut spectrum: Vec<Complex32>, scale: f32) -> Vec<Complex32> {
        self.ifft.process(&mut spectrum);
        spectrum.iter_mut().for_each(|x| *x *= scale);
        spectrum
    }

    fn symbol_len(&self) -> usize {
        self.m + self.cp
    }

    fn preamble_len(&self) -> usize {
        S0_SYMBOLS * self.symbol_len()
    }

    fn frame_len(&self, data_symbols: usize) -> usize {
        self.preamble_len() + self.symbol_len() * (1 + data_symbols) + self.taper
    }

    fn pilot_sequence() -> Result<MSequence> {
        MSequence::new(PILOT_SEQUENCE_ORDER)
    }
}

/// Renders frames symbol by symbol with overlapping tapers
#[derive(Debug)]
struct OfdmModulator {
    layout: SymbolLayout,
    window: Vec<f32>,
    postfix: Vec<Complex32>,
    pilots: MSequence,
}

impl OfdmModulator {
    fn new(layout: SymbolLayout) -> Result<Self> {
        let taper = layout.taper;
        let window = (0..taper)
            .map(|i| {
                let s = (core::f32::consts::FRAC_PI_2 * (i as f32 + 0.5) / taper as f32).sin();
                s * s
            })
            .collect();
        Ok(Self { window, postfix: vec![Complex32::new(0.0, 0.0); taper], layout, pilots: SymbolLayout::pilot_sequence()? })
    }

    /// Append `prefixed` (already cyclically extended) to `out`, blending its
    /// head with the previous postfix, and keep `postfix` for the next one
    fn emit(&mut self, out: &mut Vec<Complex32>, mut prefixed: Vec<Complex32>, postfix: Vec<Complex32>) {
        for (i, w) in self.window.iter().enumerate() {
            prefixed[i] = prefixed[i] * *w + self.postfix[i] * (1.0 - w);
        }
        out.extend(prefixed);
        self.postfix = postfix;
    }

    fn emit_symbol(&mut self, out: &mut Vec<Complex32>, body: &[Complex32]) {
        let (m, cp) = (self.layout.m, self.layout.cp);
        let prefixed = (0..cp + m).map(|i| body[(i + m - cp) % m]).collect();
        let postfix = body[..self.layout.taper].to_vec();
        self.emit(out, prefixed, postfix);
    }

    /// Render a full frame; `data` holds a whole number of symbols' worth of
    /// data subcarrier values
    fn render(&mut self, data: &[Complex32]) -> Vec<Complex32> {
        let layout = &self.layout;
        let (m, cp, taper) = (layout.m, layout.cp, layout.taper);
        let units = data.len() / layout.data.len();
        let mut out = Vec::with_capacity(layout.frame_len(units));

        self.postfix.fill(Complex32::new(0.0, 0.0));
        self.pilots.reset();

        let preamble = layout.preamble_len();
        let s0: Vec<Complex32> = (0..preamble + taper)
            .map(|t| layout.s0[(t + m - cp) % m])
            .collect();
        let (head, tail) = s0.split_at(preamble);
        self.emit(&mut out, head.to_vec(), tail.to_vec());

        let s1 = self.layout.s1.clone();
        self.emit_symbol(&mut out, &s1);

        for chunk in data.chunks(self.layout.data.len()) {
            let mut spectrum = vec![Complex32::new(0.0, 0.0); m];
            for &k in &self.layout.pilots {
                spectrum[k] = Complex32::new(if self.pilots.next_bit() == 0 { 1.0 } else { -1.0 }, 0.0);
            }
            for (&k, &v) in self.layout.data.iter().zip(chunk) {
                spectrum[k] = v;
            }
            let body = self.layout.synthesize(spectrum, self.layout.scale);
            self.emit_symbol(&mut out, &body);
        }

        for (p, w) in self.postfix.iter().zip(&self.window) {
            out.push(*p * (1.0 - w));
        }
        out
    }
}

/// Plateau of the Schmidl-Cox metric above threshold
#[derive(Debug, Clone, Copy)]
struct Plateau {
    start: u64,
    last: u64,
    peak: f32,
    correlation: Complex32,
}

/// Schmidl-Cox detector, S1 acquisition and per-symbol demodulator
#[derive(Debug)]
pub struct OfdmReceiver {
    layout: SymbolLayout,
    threshold: f32,

    window: VecDeque<Complex32>,
    plateau: Option<Plateau>,

    sync_start: u64,
    sync_buf: Vec<Complex32>,
    nco: Nco,
    gain: Vec<Complex32>,
    rssi: f32,

    symbol: Vec<Complex32>,
    count: usize,
    pilots: MSequence,
    last_phase: f32,
}

impl OfdmReceiver {
    /// Receiver for frames with geometry `params`
    pub fn new(params: &OfdmParams) -> Result<Self> {
        let layout = SymbolLayout::new(params)?;
        let m = layout.m;
        Ok(Self {
            window: VecDeque::with_capacity(m),
            sync_buf: Vec::with_capacity(m + layout.cp + 2 * TIMING_SLACK),
            gain: vec![Complex32::new(1.0, 0.0); m],
            symbol: Vec::with_capacity(m),
            layout,
            threshold: DEFAULT_DETECT_THRESHOLD,
            plateau: None,
            sync_start: 0,
            nco: Nco::default(),
            rssi: power_db(0.0),
            count: 0,
            pilots: SymbolLayout::pilot_sequence()?,
            last_phase: 0.0,
        })
    }

    fn half(&self) -> usize {
        self.layout.m / 2
    }

    /// Delay-and-correlate over the last half symbol
    fn schmidl_cox(&self) -> (f32, Complex32) {
        let half = self.half();
        let mut p = Complex32::new(0.0, 0.0);
        let mut r = 0.0f32;
        for i in 0..half {
            let late = self.window[half + i];
            p += late * self.window[i].conj();
            r += late.norm_sqr();
        }
        if r <= 1e-9 {
            return (0.0, p);
        }
        (p.norm_sqr() / (r * r), p)
    }

    /// First S1 body sample implied by the centre of the metric plateau
    fn nominal_s1(&self, plateau: &Plateau) -> u64 {
        let layout = &self.layout;
        let ahead = (layout.preamble_len() + 2 * layout.cp + 2) as u64;
        let behind = (layout.m + layout.taper) as u64;
        (plateau.start + plateau.last + ahead).saturating_sub(behind) / 2
    }

    fn estimate(&mut self) -> SyncStep {
        let m = self.layout.m;
        let s1_energy: f32 = self.layout.s1.iter().map(|x| x.norm_sqr()).sum();

        let mut best = (0usize, 0.0f32);
        for offset in 0..=self.layout.cp + 2 * TIMING_SLACK {
            let span = &self.sync_buf[offset..offset + m];
            let energy: f32 = span.iter().map(|x| x.norm_sqr()).sum();
            if energy <= 1e-9 {
                continue;
            }
            let c: Complex32 = span.iter().zip(&self.layout.s1).map(|(x, s)| *x * s.conj()).sum();
            let c = c.norm() / (energy * s1_energy).sqrt();
            if c > best.1 {
                best = (offset, c);
            }
        }
        let (offset, correlation) = best;
        if correlation < MIN_S1_CORRELATION {
            #[cfg(feature = "logging")]
            trace!("S1 correlation {:.3} below acquisition limit", correlation);
            return SyncStep::Lost;
        }

        let mut spectrum = self.sync_buf[offset..offset + m].to_vec();
        self.layout.fft.process(&mut spectrum);
        let mut power = 0.0f32;
        let mut active = 0usize;
        for (k, (g, y)) in self.gain.iter_mut().zip(&spectrum).enumerate() {
            let reference = self.layout.s1_spectrum[k];
            if reference == 0.0 {
                *g = Complex32::new(1.0, 0.0);
                continue;
            }
            *g = *y * reference;
            power += g.norm_sqr();
            active += 1;
        }
        // an active subcarrier of a unit-power symbol spans m * scale
        let unit = (m as f32 * self.layout.scale).powi(2);
        self.rssi = power_db(power / (active.max(1) as f32 * unit));

        let omega = self.nco.frequency();
        self.nco = Nco::new(wrap_phase(omega * (offset + m) as f32), omega);
        self.pilots.reset();
        self.symbol.clear();
        self.count = 0;
        self.last_phase = 0.0;

        #[cfg(feature = "logging")]
        debug!("S1 located {} samples into the search window (correlation {:.3})", offset, correlation);

        SyncStep::Locked { rewind: self.layout.cp + 2 * TIMING_SLACK - offset }
    }

    fn demodulate_symbol(&mut self, symbols: &mut Vec<Complex32>) {
        self.layout.fft.process(&mut self.symbol);
        let equalized = |k: usize| {
            let g = self.gain[k];
            if g.norm_sqr() <= 1e-12 {
                Complex32::new(0.0, 0.0)
            } else {
                self.symbol[k] / g
            }
        };

        let mut reference = Complex32::new(0.0, 0.0);
        for &k in &self.layout.pilots {
            let pilot = if self.pilots.next_bit() == 0 { 1.0 } else { -1.0 };
            reference += equalized(k) * pilot;
        }
        let phase = reference.arg();
        let derotate = Complex32::from_polar(1.0, -phase);
        symbols.extend(self.layout.data.iter().map(|&k| equalized(k) * derotate));

        let drift = wrap_phase(phase - self.last_phase);
        self.nco
            .adjust_frequency(PILOT_FREQUENCY_GAIN * drift / self.layout.symbol_len() as f32);
        self.last_phase = phase;
    }
}

impl FrameReceiver for OfdmReceiver {
    fn history_len(&self) -> usize {
        self.layout.preamble_len() + self.layout.symbol_len() + 2 * TIMING_SLACK
    }

    fn detect(&mut self, x: Complex32, index: u64) -> Option<Detection> {
        let m = self.layout.m;
        self.window.push_back(x);
        if self.window.len() > m {
            self.window.pop_front();
        }
        let (metric, correlation) = if self.window.len() == m { self.schmidl_cox() } else { (0.0, Complex32::new(0.0, 0.0)) };

        if metric > self.threshold {
            let plateau = self.plateau.get_or_insert(Plateau { start: index, last: index, peak: 0.0, correlation });
            plateau.last = index;
            if metric > plateau.peak {
                plateau.peak = metric;
                plateau.correlation = correlation;
            }
            return None;
        }

        let plateau = self.plateau.take()?;
        let length = (plateau.last - plateau.start + 1) as usize;
        // shorter than a half symbol cannot be S0; longer than the whole
        // preamble is a periodic interferer
        if length < self.half() || length > self.layout.preamble_len() + m {
            return None;
        }

        let cfo = plateau.correlation.arg() / self.half() as f32;
        let begin = self
            .nominal_s1(&plateau)
            .saturating_sub((self.layout.cp / 2 + TIMING_SLACK) as u64);
        self.sync_start = begin;
        self.sync_buf.clear();
        self.nco = Nco::new(0.0, cfo);
        self.window.clear();

        Some(Detection {
            rewind: (index + 1).saturating_sub(begin) as usize,
            metric: plateau.peak,
            timing_offset: 0.0,
            cfo,
        })
    }

    fn synchronize(&mut self, x: Complex32, index: u64) -> SyncStep {
        if index < self.sync_start {
            return SyncStep::Pending;
        }
        let y = self.nco.mix_down(x);
        self.sync_buf.push(y);
        if self.sync_buf.len() < self.layout.m + self.layout.cp + 2 * TIMING_SLACK {
            return SyncStep::Pending;
        }
        self.estimate()
    }

    fn demodulate(&mut self, x: Complex32, _index: u64, symbols: &mut Vec<Complex32>) {
        let y = self.nco.mix_down(x);
        self.count += 1;
        if self.count <= self.layout.cp {
            return;
        }
        self.symbol.push(y);
        if self.symbol.len() == self.layout.m {
            self.demodulate_symbol(symbols);
            self.symbol.clear();
            self.count = 0;
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.plateau = None;
        self.sync_buf.clear();
        self.symbol.clear();
        self.count = 0;
    }

    fn rssi_db(&self) -> f32 {
        self.rssi
    }

    fn cfo(&self) -> f32 {
        self.nco.frequency()
    }

    fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

/// Header interpretation of the OFDM frame
#[derive(Debug, Clone, Copy, Default)]
pub struct OfdmFormat;

impl FrameFormat for OfdmFormat {
    fn header_config(&self) -> PacketizerConfig {
        HEADER
    }

    fn header_modulation(&self) -> ModulationScheme {
        HEADER_MODULATION
    }

    fn payload_layout(&self, header: &[u8]) -> Option<PayloadLayout> {
        LAYOUT.parse(header, ModulationScheme::Unknown)
    }

    fn user_header<'a>(&self, header: &'a [u8]) -> &'a [u8] {
        &header[..USER_HEADER_LEN.min(header.len())]
    }
}

/// Synchronizer for OFDM frames
pub type OfdmFrameSync<L> = FrameSync<OfdmReceiver, OfdmFormat, L>;

impl<L: FrameListener> FrameSync<OfdmReceiver, OfdmFormat, L> {
    /// Synchronizer delivering OFDM frames with geometry `params` to
    /// `listener`
    pub fn ofdm(params: &OfdmParams, listener: L) -> Result<Self> {
        Self::ofdm_with_config(params, listener, SyncConfig::default())
    }

    /// Synchronizer with explicit tuning
    pub fn ofdm_with_config(params: &OfdmParams, listener: L, config: SyncConfig) -> Result<Self> {
        Self::with_parts(OfdmReceiver::new(params)?, OfdmFormat, listener, config)
    }
}

/// Generator for OFDM frames
#[derive(Debug)]
pub struct OfdmFrameGenerator {
    params: OfdmParams,
    props: FrameProperties,
    header: Packetizer,
    payload: Packetizer,
    header_modem: Modem,
    payload_modem: Modem,
    modulator: OfdmModulator,
    samples: FrameSamples,
}

impl OfdmFrameGenerator {
    /// Generator with geometry `params` emitting payloads with `props`
    pub fn new(params: OfdmParams, props: FrameProperties) -> Result<Self> {
        props.validate()?;
        let layout = SymbolLayout::new(&params)?;
        Ok(Self {
            params,
            props,
            header: Packetizer::new(HEADER)?,
            payload: Packetizer::new(props.packetizer_config(1))?,
            header_modem: Modem::new(HEADER_MODULATION)?,
            payload_modem: Modem::new(props.modulation)?,
            modulator: OfdmModulator::new(layout)?,
            samples: FrameSamples::default(),
        })
    }

    /// Frame geometry
    pub fn params(&self) -> &OfdmParams {
        &self.params
    }

    /// Properties applied to the next assembled frame
    pub fn properties(&self) -> &FrameProperties {
        &self.props
    }

    /// Change the payload properties; takes effect at the next assembly
    pub fn set_properties(&mut self, props: FrameProperties) -> Result<()> {
        props.validate()?;
        if props.modulation != self.payload_modem.scheme() {
            self.payload_modem = Modem::new(props.modulation)?;
        }
        self.props = props;
        Ok(())
    }

    /// Pad `symbols` to a whole number of OFDM symbols
    fn pad(&self, symbols: &mut Vec<Complex32>, modem: &Modem) {
        let per_symbol = self.modulator.layout.data.len();
        let padded = symbols.len().div_ceil(per_symbol) * per_symbol;
        symbols.resize(padded, modem.modulate(0));
    }
}

impl FrameGenerator for OfdmFrameGenerator {
    fn assemble(&mut self, header: &[u8; USER_HEADER_LEN], payload: &[u8]) -> Result<()> {
        let encoded_header = LAYOUT.encode(header, payload.len(), &self.props)?;
        self.payload.reconfigure(self.props.packetizer_config(payload.len()))?;

        let mut symbols = encode_symbols(&mut self.header, &self.header_modem, &encoded_header)?;
        self.pad(&mut symbols, &self.header_modem);
        let mut payload_symbols = encode_symbols(&mut self.payload, &self.payload_modem, payload)?;
        self.pad(&mut payload_symbols, &self.payload_modem);
        symbols.extend(payload_symbols);

        self.samples.load(self.modulator.render(&symbols));

        #[cfg(feature = "logging")]
        debug!(
            "Assembled OFDM frame: {} payload bytes, {} symbols, {} samples",
            payload.len(),
            symbols.len() / self.modulator.layout.data.len(),
            self.samples.len()
        );
        Ok(())
    }

    fn samples(&self) -> &FrameSamples {
        &self.samples
    }

    fn samples_mut(&mut self) -> &mut FrameSamples {
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FrameCollector;

    #[test]
    fn test_default_allocation() {
        let allocation = OfdmParams::default_allocation(64);
        let count = |kind| allocation.iter().filter(|k| **k == kind).count();
        assert_eq!(count(SubcarrierKind::Null), 12);
        assert_eq!(count(SubcarrierKind::Pilot), 6);
        assert_eq!(count(SubcarrierKind::Data), 46);
        assert_eq!(allocation[0], SubcarrierKind::Null);
        assert_eq!(allocation[32], SubcarrierKind::Null);
        assert_eq!(allocation[26], SubcarrierKind::Data);
        assert_eq!(allocation[27], SubcarrierKind::Null);
        assert!(OfdmParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        assert!(OfdmParams::new(63, 16, 4).validate().is_err());
        assert!(OfdmParams::new(64, 80, 4).validate().is_err());
        assert!(OfdmParams::new(64, 8, 12).validate().is_err());

        let mut no_pilots = OfdmParams::default();
        no_pilots.allocation = Some(
            OfdmParams::default_allocation(64)
                .into_iter()
                .map(|k| if k == SubcarrierKind::Pilot { SubcarrierKind::Data } else { k })
                .collect(),
        );
        assert!(matches!(no_pilots.validate(), Err(FrameError::InvalidParameter(_))));

        let mut short = OfdmParams::default();
        short.allocation = Some(vec![SubcarrierKind::Data; 10]);
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_preamble_s0_is_half_periodic() {
        let layout = SymbolLayout::new(&OfdmParams::default()).unwrap();
        for i in 0..32 {
            assert!((layout.s0[i] - layout.s0[i + 32]).norm() < 1e-4);
        }
        let power: f32 = layout.s1.iter().map(|x| x.norm_sqr()).sum::<f32>() / 64.0;
        assert!((power - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_frame_geometry() {
        let props = FrameProperties { crc: CrcScheme::Crc16, fec0: FecScheme::None, fec1: FecScheme::None, modulation: ModulationScheme::Psk2 };
        let mut generator = OfdmFrameGenerator::new(OfdmParams::default(), props).unwrap();
        // 10 bytes + crc16 = 96 bits: 3 symbols; the 272-bit header takes 6
        generator.assemble(&[0; 8], &[0xa5; 10]).unwrap();
        assert_eq!(generator.frame_len(), 160 + 80 * (1 + 6 + 3) + 4);
    }

    #[test]
    fn test_round_trip_with_channel() {
        let props = FrameProperties {
            crc: CrcScheme::Crc32,
            fec0: FecScheme::Hamming128,
            fec1: FecScheme::None,
            modulation: ModulationScheme::Psk4,
        };
        let mut generator = OfdmFrameGenerator::new(OfdmParams::default(), props).unwrap();
        let payload: Vec<u8> = (0..100u8).map(|i| i.wrapping_mul(7)).collect();
        generator.assemble(b"ofdm-hdr", &payload).unwrap();

        let mut tx = vec![Complex32::new(0.0, 0.0); 50];
        tx.extend(generator.generate());
        tx.extend(vec![Complex32::new(0.0, 0.0); 100]);
        let rx: Vec<Complex32> = tx
            .iter()
            .enumerate()
            .map(|(n, &x)| x * Complex32::from_polar(0.6, 0.7 + 0.01 * n as f32))
            .collect();

        let mut sync = OfdmFrameSync::ofdm(&OfdmParams::default(), FrameCollector::default()).unwrap();
        sync.execute(&rx);
        let frames = &sync.listener().frames;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].header_valid && frames[0].payload_valid);
        assert_eq!(&frames[0].header[..], b"ofdm-hdr");
        assert_eq!(&frames[0].payload[..], &payload[..]);
        assert_eq!(frames[0].stats.modulation, ModulationScheme::Psk4);
        assert!((frames[0].stats.rssi_db - power_db(0.36)).abs() < 1.0);
    }
}
