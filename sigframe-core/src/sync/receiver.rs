//! Seams between the generic synchronizer and a concrete frame family

use num_complex::Complex32;

use crate::modem::ModulationScheme;
use crate::packetizer::PacketizerConfig;

/// Latched result of a successful preamble detection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Detection {
    /// Number of samples, counting the triggering one, to replay into the
    /// acquisition stage
    pub rewind: usize,
    /// Normalized detection metric at the peak
    pub metric: f32,
    /// Fractional timing offset of the peak in samples
    pub timing_offset: f32,
    /// Coarse carrier offset estimate in radians/sample
    pub cfo: f32,
}

/// Outcome of feeding one sample to the acquisition stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// More samples are needed
    Pending,
    /// Acquisition finished; replay `rewind` already-consumed samples before
    /// the first header sample
    Locked {
        /// Samples to step back before demodulating the header
        rewind: usize,
    },
    /// The reference sequence did not check out; return to detection
    Lost,
}

/// Detector, acquisition stage and demodulator of one physical layer
///
/// Every method receives the absolute index of the sample in the stream.
/// The synchronizer replays samples after a rewind, so indices are not
/// strictly increasing across state changes, but they are within a state.
pub trait FrameReceiver {
    /// Samples the synchronizer keeps behind its cursor for rewinds
    fn history_len(&self) -> usize;

    /// Search for a preamble; called once per sample in the detection state
    fn detect(&mut self, x: Complex32, index: u64) -> Option<Detection>;

    /// Refine timing, carrier and gain on the reference sequence
    fn synchronize(&mut self, x: Complex32, index: u64) -> SyncStep;

    /// Modulation of the symbols produced by the following
    /// [`FrameReceiver::demodulate`] calls
    fn set_modulation(&mut self, _scheme: ModulationScheme) {}

    /// Consume one sample; push any recovered symbols onto `symbols`
    ///
    /// A demodulation unit (one symbol, or one OFDM symbol worth of data
    /// subcarriers) is emitted at once. Symbols beyond what the header
    /// needs are dropped; the payload starts with the next unit.
    fn demodulate(&mut self, x: Complex32, index: u64, symbols: &mut Vec<Complex32>);

    /// Return to the detection state, forgetting any acquired frame
    fn reset(&mut self);

    /// Received signal strength estimated during acquisition, in dB
    fn rssi_db(&self) -> f32;

    /// Carrier offset currently applied, in radians/sample
    fn cfo(&self) -> f32;

    /// Change the detection threshold
    fn set_threshold(&mut self, threshold: f32);
}

/// Payload packetizer configuration and modulation for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLayout {
    /// Payload packetizer configuration
    pub config: PacketizerConfig,
    /// Payload modulation
    pub modulation: ModulationScheme,
}

/// Header protection and interpretation of one frame family
pub trait FrameFormat {
    /// Fixed header packetizer configuration
    fn header_config(&self) -> PacketizerConfig;

    /// Header modulation
    fn header_modulation(&self) -> ModulationScheme;

    /// Payload layout declared by a valid decoded header; `None` when the
    /// declaration cannot be realized
    fn payload_layout(&self, header: &[u8]) -> Option<PayloadLayout>;

    /// Layout assumed when no header ever decoded
    fn default_layout(&self) -> Option<PayloadLayout> {
        None
    }

    /// Part of the decoded header handed to the listener
    fn user_header<'a>(&self, header: &'a [u8]) -> &'a [u8] {
        header
    }
}
