//! Streaming frame synchronizer
//!
//! [`FrameSync`] runs the receive state machine shared by every frame
//! family:
//!
//! ```text
//! DETECT -> SYNC -> RXHEADER -> RXPAYLOAD -> CALLBACK -> RESET -> DETECT
//! ```
//!
//! The physical layer (preamble detector, acquisition stage, demodulator)
//! is supplied by a [`FrameReceiver`], the header interpretation by a
//! [`FrameFormat`], and decoded frames are handed to a [`FrameListener`].
//!
//! Samples are kept in a history ring addressed by absolute stream index so
//! the receiver can step back into samples it already saw. Processing is
//! strictly per sample, which makes the result independent of how the
//! caller splits the stream into chunks.

mod listener;
mod receiver;
mod stats;

pub use listener::{FrameCollector, FrameEvent, FrameListener, FrameQueue, ReceivedFrame};
pub use receiver::{Detection, FrameFormat, FrameReceiver, PayloadLayout, SyncStep};
pub use stats::{FrameSyncCounters, FrameSyncStats};

use std::collections::VecDeque;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::constants::DEFAULT_DETECT_THRESHOLD;
use crate::dsp::{power_db, DcBlocker, SignalLevel};
use crate::modem::{Modem, ModulationScheme};
use crate::packetizer::Packetizer;
use crate::sequence::unwhiten_soft;
use crate::Result;

/// Receive state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Correlating against the preamble
    Detect,
    /// Refining timing, carrier and gain
    Sync,
    /// Demodulating the header
    RxHeader,
    /// Demodulating the payload
    RxPayload,
    /// Delivering a frame to the listener (transient)
    Callback,
    /// Clearing per-frame state (transient)
    Reset,
}

/// What to do when the header fails its integrity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFailurePolicy {
    /// Deliver the attempt with `header_valid == false` and no payload
    Report,
    /// Return to detection without a callback
    Discard,
    /// Demodulate the payload with the last valid (or default) layout and
    /// deliver it with `header_valid == false`
    ContinueWithLast,
}

/// Synchronizer tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Normalized preamble detection threshold
    pub threshold: f32,
    /// Invalid-header handling
    pub header_failure: HeaderFailurePolicy,
    /// Ignore detections while the input level is below this many dB
    pub squelch_db: Option<f32>,
    /// Remove a DC offset from the input before detection
    pub dc_block: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DETECT_THRESHOLD,
            header_failure: HeaderFailurePolicy::Report,
            squelch_db: None,
            dc_block: false,
        }
    }
}

/// Symbols and soft bits accumulated for the header or the payload
#[derive(Debug)]
struct SoftBuffer {
    soft: Vec<u8>,
    filled: usize,
    symbols: usize,
    error_energy: f32,
}

impl SoftBuffer {
    fn new() -> Self {
        Self { soft: Vec::new(), filled: 0, symbols: 0, error_energy: 0.0 }
    }

    fn begin(&mut self, bits: usize) {
        self.soft.clear();
        self.soft.resize(bits, 0);
        self.filled = 0;
        self.symbols = 0;
        self.error_energy = 0.0;
    }

    fn is_full(&self) -> bool {
        self.filled >= self.soft.len()
    }

    /// Soft-demodulate `symbol`; bits past the end are dropped
    fn push(&mut self, modem: &Modem, symbol: Complex32) {
        let mut bits = [0u8; 8];
        let bps = modem.bits_per_symbol();
        modem.demodulate_soft(symbol, &mut bits[..bps]);
        let take = bps.min(self.soft.len() - self.filled);
        self.soft[self.filled..self.filled + take].copy_from_slice(&bits[..take]);
        self.filled += take;
        self.symbols += 1;
        self.error_energy += modem.error_vector(symbol);
    }

    fn evm_db(&self) -> Option<f32> {
        (self.symbols > 0).then(|| power_db(self.error_energy / self.symbols as f32))
    }
}

/// Generic streaming frame synchronizer
///
/// Owns its receiver, format and listener. `execute` never fails on sample
/// content; corrupted or spurious frames surface only through the validity
/// flags of a delivered frame, or not at all.
pub struct FrameSync<R, F, L> {
    receiver: R,
    format: F,
    listener: L,
    config: SyncConfig,
    state: SyncState,

    history: VecDeque<Complex32>,
    /// absolute index of `history[0]`
    base: u64,
    /// absolute index of the next sample to process
    cursor: u64,
    /// first index the detector has not seen yet
    detect_floor: u64,

    dc_blocker: DcBlocker,
    level: SignalLevel,

    header_packetizer: Packetizer,
    header_modem: Modem,
    payload_packetizer: Packetizer,
    payload_modem: Modem,
    layout: Option<PayloadLayout>,
    last_layout: Option<PayloadLayout>,

    symbols: Vec<Complex32>,
    header_soft: SoftBuffer,
    payload_soft: SoftBuffer,
    header: Vec<u8>,
    header_valid: bool,
    payload: Vec<u8>,

    detection: Detection,
    counters: FrameSyncCounters,
}

impl<R, F, L> FrameSync<R, F, L>
where
    R: FrameReceiver,
    F: FrameFormat,
    L: FrameListener,
{
    /// Assemble a synchronizer from its parts
    pub fn with_parts(mut receiver: R, format: F, listener: L, config: SyncConfig) -> Result<Self> {
        let header_config = format.header_config();
        let header_packetizer = Packetizer::new(header_config)?;
        let header_modem = Modem::new(format.header_modulation())?;
        let default = format.default_layout();
        let (payload_packetizer, payload_modem) = match default {
            Some(layout) => (Packetizer::new(layout.config)?, Modem::new(layout.modulation)?),
            None => (Packetizer::new(header_config)?, Modem::new(format.header_modulation())?),
        };
        receiver.set_threshold(config.threshold);

        #[cfg(feature = "logging")]
        debug!(
            "Frame synchronizer ready: {} header bits over {}",
            header_packetizer.encoded_len() * 8,
            format.header_modulation()
        );

        Ok(Self {
            receiver,
            format,
            listener,
            config,
            state: SyncState::Detect,
            history: VecDeque::new(),
            base: 0,
            cursor: 0,
            detect_floor: 0,
            dc_blocker: DcBlocker::default(),
            level: SignalLevel::default(),
            header_packetizer,
            header_modem,
            payload_packetizer,
            payload_modem,
            layout: None,
            last_layout: default,
            symbols: Vec::new(),
            header_soft: SoftBuffer::new(),
            payload_soft: SoftBuffer::new(),
            header: Vec::new(),
            header_valid: false,
            payload: Vec::new(),
            detection: Detection::default(),
            counters: FrameSyncCounters::default(),
        })
    }

    /// Process a chunk of baseband samples of any length
    ///
    /// Frames completed inside the chunk are delivered to the listener
    /// before this returns.
    pub fn execute(&mut self, samples: &[Complex32]) {
        for &x in samples {
            let x = if self.config.dc_block { self.dc_blocker.process(x) } else { x };
            self.level.update(x);
            self.history.push_back(x);

            while self.cursor < self.base + self.history.len() as u64 {
                let index = self.cursor;
                let sample = self.history[(index - self.base) as usize];
                self.cursor += 1;
                self.step(sample, index);
            }
            self.trim_history();
        }
    }

    fn trim_history(&mut self) {
        let keep = self.receiver.history_len() as u64 + 1;
        while self.cursor - self.base > keep {
            self.history.pop_front();
            self.base += 1;
        }
    }

    /// Move the cursor back by `rewind` samples, never past the history
    fn rewind(&mut self, rewind: usize) {
        self.cursor = self.cursor.saturating_sub(rewind as u64).max(self.base);
    }

    fn step(&mut self, x: Complex32, index: u64) {
        match self.state {
            SyncState::Detect => self.step_detect(x, index),
            SyncState::Sync => match self.receiver.synchronize(x, index) {
                SyncStep::Pending => {}
                SyncStep::Locked { rewind } => {
                    self.rewind(rewind);
                    self.begin_header();
                }
                SyncStep::Lost => {
                    #[cfg(feature = "logging")]
                    debug!("Acquisition lost at sample {}", index);
                    self.restart();
                }
            },
            SyncState::RxHeader => {
                self.symbols.clear();
                self.receiver.demodulate(x, index, &mut self.symbols);
                for &symbol in &self.symbols {
                    if self.header_soft.is_full() {
                        break;
                    }
                    self.header_soft.push(&self.header_modem, symbol);
                }
                if self.header_soft.is_full() {
                    self.finish_header();
                }
            }
            SyncState::RxPayload => {
                self.symbols.clear();
                self.receiver.demodulate(x, index, &mut self.symbols);
                for &symbol in &self.symbols {
                    if self.payload_soft.is_full() {
                        break;
                    }
                    self.payload_soft.push(&self.payload_modem, symbol);
                }
                if self.payload_soft.is_full() {
                    self.finish_payload();
                }
            }
            // transient states never persist across samples
            SyncState::Callback | SyncState::Reset => self.restart(),
        }
    }

    fn step_detect(&mut self, x: Complex32, index: u64) {
        // samples replayed after an aborted acquisition were already searched
        if index < self.detect_floor {
            return;
        }
        self.detect_floor = index + 1;

        let Some(detection) = self.receiver.detect(x, index) else {
            return;
        };
        if self.level.is_squelched(self.config.squelch_db) {
            #[cfg(feature = "logging")]
            trace!("Detection at sample {} ignored below squelch", index);
            return;
        }

        #[cfg(feature = "logging")]
        debug!(
            "Preamble detected at sample {} (metric {:.3}, cfo {:.5} rad/sample)",
            index, detection.metric, detection.cfo
        );

        self.counters.detections += 1;
        self.detection = detection;
        self.rewind(detection.rewind);
        self.state = SyncState::Sync;
    }

    fn begin_header(&mut self) {
        self.receiver.set_modulation(self.format.header_modulation());
        self.header_soft.begin(self.header_packetizer.encoded_len() * 8);
        self.state = SyncState::RxHeader;
    }

    fn finish_header(&mut self) {
        unwhiten_soft(&mut self.header_soft.soft);
        self.header.resize(self.header_packetizer.decoded_len(), 0);
        self.header_valid = self
            .header_packetizer
            .decode_soft_into(&self.header_soft.soft, &mut self.header)
            .unwrap_or(false);

        if self.header_valid {
            self.counters.header_valid += 1;
            match self.format.payload_layout(&self.header) {
                Some(layout) => self.begin_payload(layout),
                None => {
                    #[cfg(feature = "logging")]
                    debug!("Header declares an unrealizable payload, discarding");
                    self.counters.discarded += 1;
                    self.restart();
                }
            }
            return;
        }

        self.counters.header_invalid += 1;
        #[cfg(feature = "logging")]
        debug!("Header failed its integrity check ({:?})", self.config.header_failure);

        match self.config.header_failure {
            HeaderFailurePolicy::Discard => self.restart(),
            HeaderFailurePolicy::Report => self.deliver(false),
            HeaderFailurePolicy::ContinueWithLast => match self.last_layout {
                Some(layout) => self.begin_payload(layout),
                None => self.deliver(false),
            },
        }
    }

    fn begin_payload(&mut self, layout: PayloadLayout) {
        let prepared = self
            .payload_packetizer
            .reconfigure(layout.config)
            .and_then(|_| self.prepare_modem(layout.modulation));
        if prepared.is_err() {
            self.counters.discarded += 1;
            self.restart();
            return;
        }

        #[cfg(feature = "logging")]
        trace!(
            "Receiving payload: {} bytes ({} encoded) with {}",
            layout.config.decoded_len,
            self.payload_packetizer.encoded_len(),
            layout.modulation
        );

        if self.header_valid {
            self.last_layout = Some(layout);
        }
        self.layout = Some(layout);
        self.receiver.set_modulation(layout.modulation);
        self.payload_soft.begin(self.payload_packetizer.encoded_len() * 8);
        self.state = SyncState::RxPayload;
    }

    fn prepare_modem(&mut self, scheme: ModulationScheme) -> Result<()> {
        if self.payload_modem.scheme() != scheme {
            self.payload_modem = Modem::new(scheme)?;
        }
        Ok(())
    }

    fn finish_payload(&mut self) {
        unwhiten_soft(&mut self.payload_soft.soft);
        self.payload.resize(self.payload_packetizer.decoded_len(), 0);
        let valid = self
            .payload_packetizer
            .decode_soft_into(&self.payload_soft.soft, &mut self.payload)
            .unwrap_or(false);
        if valid {
            self.counters.payload_valid += 1;
        } else {
            self.counters.payload_invalid += 1;
        }
        self.deliver(valid);
    }

    fn stats(&self) -> FrameSyncStats {
        let payload_evm = self.layout.and_then(|_| self.payload_soft.evm_db());
        let mut stats = FrameSyncStats {
            evm_db: payload_evm.or_else(|| self.header_soft.evm_db()).unwrap_or(0.0),
            rssi_db: self.receiver.rssi_db(),
            cfo: FrameSyncStats::cycles_per_sample(self.receiver.cfo()),
            timing_offset: self.detection.timing_offset,
            ..FrameSyncStats::default()
        };
        if let Some(layout) = self.layout {
            stats.payload_symbols = self.payload_soft.symbols;
            stats.modulation = layout.modulation;
            stats.bps = layout.modulation.bits_per_symbol();
            stats.crc = layout.config.crc;
            stats.fec0 = layout.config.inner_fec;
            stats.fec1 = layout.config.outer_fec;
        }
        stats
    }

    fn deliver(&mut self, payload_valid: bool) {
        self.state = SyncState::Callback;
        let payload: &[u8] = if self.layout.is_some() { &self.payload } else { &[] };
        let frame = ReceivedFrame {
            header: self.format.user_header(&self.header),
            header_valid: self.header_valid,
            payload,
            payload_valid,
            stats: self.stats(),
        };

        #[cfg(feature = "logging")]
        debug!(
            "Frame complete: header {}, payload {} ({} bytes)",
            if frame.header_valid { "valid" } else { "invalid" },
            if frame.payload_valid { "valid" } else { "invalid" },
            frame.payload.len()
        );

        self.listener.on_frame(&frame);
        self.restart();
    }

    /// Clear per-frame state and return to detection
    ///
    /// Signal level and DC blocker state are kept.
    fn restart(&mut self) {
        self.state = SyncState::Reset;
        self.layout = None;
        self.header_valid = false;
        self.header.clear();
        self.payload.clear();
        self.header_soft.begin(0);
        self.payload_soft.begin(0);
        // the detector missed everything consumed while a frame was in flight
        if self.cursor > self.detect_floor {
            self.receiver.reset();
            self.detect_floor = self.cursor;
        }
        self.state = SyncState::Detect;
    }

    /// Abandon any frame in flight and clear all receiver state
    pub fn reset(&mut self) {
        self.restart();
        self.receiver.reset();
        self.dc_blocker.reset();
        self.detect_floor = self.cursor;
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Current configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Replace the configuration; takes effect with the next sample
    pub fn set_config(&mut self, config: SyncConfig) {
        self.receiver.set_threshold(config.threshold);
        self.config = config;
    }

    /// Running frame counters
    pub fn counters(&self) -> &FrameSyncCounters {
        &self.counters
    }

    /// Number of preambles detected so far
    pub fn frames_detected(&self) -> u64 {
        self.counters.detections
    }

    /// Absolute index of the next sample to be processed
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Smoothed input level in dB
    pub fn input_level_db(&self) -> f32 {
        self.level.rssi_db()
    }

    /// The listener
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// The listener, mutably
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Consume the synchronizer, returning the listener
    pub fn into_listener(self) -> L {
        self.listener
    }

    /// The physical-layer receiver
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// The frame format
    pub fn format(&self) -> &F {
        &self.format
    }
}
