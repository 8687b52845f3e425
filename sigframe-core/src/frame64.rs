//! Fixed-size frame: 8-byte user header and 64-byte payload
//!
//! The header travels as BPSK protected by CRC-16 and Hamming(8,4); the
//! payload as QPSK protected by CRC-24 and the K=7 convolutional code.
//! Nothing in the header describes the payload, so the layout is constant.

use num_complex::Complex32;

use crate::constants::{FRAME64_PAYLOAD_LEN, USER_HEADER_LEN};
use crate::error::FrameError;
use crate::generator::{encode_symbols, FrameGenerator, FrameSamples};
use crate::linear::{LinearModulator, LinearReceiver};
use crate::modem::{Modem, ModulationScheme};
use crate::packetizer::{Packetizer, PacketizerConfig};
use crate::scheme::{CrcScheme, FecScheme};
use crate::sync::{FrameFormat, FrameListener, FrameSync, HeaderFailurePolicy, PayloadLayout, SyncConfig};
use crate::Result;

const HEADER: PacketizerConfig =
    PacketizerConfig::new(USER_HEADER_LEN, CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None);
const HEADER_MODULATION: ModulationScheme = ModulationScheme::Psk2;

const PAYLOAD: PayloadLayout = PayloadLayout {
    config: PacketizerConfig::new(FRAME64_PAYLOAD_LEN, CrcScheme::Crc24, FecScheme::ConvV27, FecScheme::None),
    modulation: ModulationScheme::Psk4,
};

/// Header interpretation of the fixed-size frame
#[derive(Debug, Clone, Copy, Default)]
pub struct Frame64Format;

impl FrameFormat for Frame64Format {
    fn header_config(&self) -> PacketizerConfig {
        HEADER
    }

    fn header_modulation(&self) -> ModulationScheme {
        HEADER_MODULATION
    }

    fn payload_layout(&self, _header: &[u8]) -> Option<PayloadLayout> {
        Some(PAYLOAD)
    }

    fn default_layout(&self) -> Option<PayloadLayout> {
        Some(PAYLOAD)
    }
}

/// Synchronizer for fixed-size frames
pub type Frame64Sync<L> = FrameSync<LinearReceiver, Frame64Format, L>;

impl<L: FrameListener> FrameSync<LinearReceiver, Frame64Format, L> {
    /// Synchronizer delivering fixed-size frames to `listener`
    ///
    /// The payload layout never depends on the header, so an invalid header
    /// still lets the payload through.
    pub fn frame64(listener: L) -> Result<Self> {
        let config = SyncConfig { header_failure: HeaderFailurePolicy::ContinueWithLast, ..SyncConfig::default() };
        Self::with_parts(LinearReceiver::new()?, Frame64Format, listener, config)
    }
}

/// Generator for fixed-size frames
#[derive(Debug)]
pub struct Frame64Generator {
    header: Packetizer,
    payload: Packetizer,
    header_modem: Modem,
    payload_modem: Modem,
    modulator: LinearModulator,
    samples: FrameSamples,
}

impl Frame64Generator {
    /// Create a generator
    pub fn new() -> Result<Self> {
        Ok(Self {
            header: Packetizer::new(HEADER)?,
            payload: Packetizer::new(PAYLOAD.config)?,
            header_modem: Modem::new(HEADER_MODULATION)?,
            payload_modem: Modem::new(PAYLOAD.modulation)?,
            modulator: LinearModulator::new()?,
            samples: FrameSamples::default(),
        })
    }
}

impl FrameGenerator for Frame64Generator {
    fn assemble(&mut self, header: &[u8; USER_HEADER_LEN], payload: &[u8]) -> Result<()> {
        if payload.len() != FRAME64_PAYLOAD_LEN {
            return Err(FrameError::LengthMismatch { expected: FRAME64_PAYLOAD_LEN, actual: payload.len() });
        }
        let mut symbols: Vec<Complex32> = encode_symbols(&mut self.header, &self.header_modem, header)?;
        symbols.extend(encode_symbols(&mut self.payload, &self.payload_modem, payload)?);
        self.samples.load(self.modulator.render(&symbols));
        Ok(())
    }

    fn samples(&self) -> &FrameSamples {
        &self.samples
    }

    fn samples_mut(&mut self) -> &mut FrameSamples {
        &mut self.samples
    }
}
