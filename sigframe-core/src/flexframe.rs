//! Flexible single-carrier frame: the header declares payload length,
//! modulation and protection

use num_complex::Complex32;

#[cfg(feature = "logging")]
use tracing::debug;

use crate::constants::USER_HEADER_LEN;
use crate::generator::{encode_symbols, FrameGenerator, FrameSamples};
use crate::header::{FlexHeader, FrameProperties};
use crate::linear::{LinearModulator, LinearReceiver};
use crate::modem::{Modem, ModulationScheme};
use crate::packetizer::{Packetizer, PacketizerConfig};
use crate::scheme::{CrcScheme, FecScheme};
use crate::sync::{FrameFormat, FrameListener, FrameSync, PayloadLayout, SyncConfig};
use crate::Result;

const LAYOUT: FlexHeader = FlexHeader::with_modulation();
const HEADER: PacketizerConfig = PacketizerConfig::new(LAYOUT.len(), CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None);
const HEADER_MODULATION: ModulationScheme = ModulationScheme::Psk2;

/// Header interpretation of the flexible frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FlexFrameFormat;

impl FrameFormat for FlexFrameFormat {
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

/// Synchronizer for flexible frames
pub type FlexFrameSync<L> = FrameSync<LinearReceiver, FlexFrameFormat, L>;

impl<L: FrameListener> FrameSync<LinearReceiver, FlexFrameFormat, L> {
    /// Synchronizer delivering flexible frames to `listener`
    pub fn flexframe(listener: L) -> Result<Self> {
        Self::flexframe_with_config(listener, SyncConfig::default())
    }

    /// Synchronizer with explicit tuning
    pub fn flexframe_with_config(listener: L, config: SyncConfig) -> Result<Self> {
        Self::with_parts(LinearReceiver::new()?, FlexFrameFormat, listener, config)
    }
}

/// Generator for flexible frames
#[derive(Debug)]
pub struct FlexFrameGenerator {
    props: FrameProperties,
    header: Packetizer,
    payload: Packetizer,
    header_modem: Modem,
    payload_modem: Modem,
    modulator: LinearModulator,
    samples: FrameSamples,
}

impl FlexFrameGenerator {
    /// Generator emitting frames with `props`
    pub fn new(props: FrameProperties) -> Result<Self> {
        props.validate()?;
        Ok(Self {
            props,
            header: Packetizer::new(HEADER)?,
            payload: Packetizer::new(props.packetizer_config(1))?,
            header_modem: Modem::new(HEADER_MODULATION)?,
            payload_modem: Modem::new(props.modulation)?,
            modulator: LinearModulator::new()?,
            samples: FrameSamples::default(),
        })
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
}

impl FrameGenerator for FlexFrameGenerator {
    fn assemble(&mut self, header: &[u8; USER_HEADER_LEN], payload: &[u8]) -> Result<()> {
        let encoded_header = LAYOUT.encode(header, payload.len(), &self.props)?;
        self.payload.reconfigure(self.props.packetizer_config(payload.len()))?;

        let mut symbols: Vec<Complex32> = encode_symbols(&mut self.header, &self.header_modem, &encoded_header)?;
        symbols.extend(encode_symbols(&mut self.payload, &self.payload_modem, payload)?);
        self.samples.load(self.modulator.render(&symbols));

        #[cfg(feature = "logging")]
        debug!(
            "Assembled flexible frame: {} payload bytes, {} samples",
            payload.len(),
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

    fn props(modulation: ModulationScheme) -> FrameProperties {
        FrameProperties { crc: CrcScheme::Crc32, fec0: FecScheme::Hamming74, fec1: FecScheme::None, modulation }
    }

    #[test]
    fn test_header_geometry() {
        assert_eq!(HEADER.decoded_len, 15);
        assert_eq!(HEADER.encoded_len().unwrap(), 34);
    }

    #[test]
    fn test_back_to_back_frames_with_different_modulations() {
        let mut generator = FlexFrameGenerator::new(props(ModulationScheme::Psk2)).unwrap();
        let mut samples = vec![Complex32::new(0.0, 0.0); 50];
        let mut sent = Vec::new();
        for (i, modulation) in [ModulationScheme::Psk8, ModulationScheme::Qam16, ModulationScheme::Ask4]
            .into_iter()
            .enumerate()
        {
            generator.set_properties(props(modulation)).unwrap();
            let payload: Vec<u8> = (0..(20 + 13 * i) as u8).collect();
            generator.assemble(&[i as u8; 8], &payload).unwrap();
            samples.extend(generator.generate());
            samples.extend(vec![Complex32::new(0.0, 0.0); 30]);
            sent.push(payload);
        }

        let mut sync = FlexFrameSync::flexframe(FrameCollector::default()).unwrap();
        sync.execute(&samples);
        let frames = &sync.listener().frames;
        assert_eq!(frames.len(), 3);
        for (i, (frame, payload)) in frames.iter().zip(&sent).enumerate() {
            assert!(frame.header_valid && frame.payload_valid, "frame {i}");
            assert_eq!(&frame.header[..], &[i as u8; 8]);
            assert_eq!(&frame.payload[..], &payload[..]);
        }
        assert_eq!(frames[1].stats.modulation, ModulationScheme::Qam16);
        assert_eq!(frames[1].stats.bps, 4);
        assert_eq!(sync.counters().payload_valid, 3);
    }

    #[test]
    fn test_generator_rejects_unsupported_properties() {
        let bad = FrameProperties { fec1: FecScheme::RsM8, ..props(ModulationScheme::Psk4) };
        assert!(FlexFrameGenerator::new(bad).is_err());
    }
}
