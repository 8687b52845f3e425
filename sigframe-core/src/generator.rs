//! Transmit side: rendered frames streamed out in caller-sized blocks

use num_complex::Complex32;

use crate::bits::to_symbols;
use crate::constants::USER_HEADER_LEN;
use crate::modem::Modem;
use crate::packetizer::Packetizer;
use crate::sequence::whiten;
use crate::Result;

/// Frame generator shared by every frame family
pub trait FrameGenerator {
    /// Render a frame carrying `header` and `payload`
    fn assemble(&mut self, header: &[u8; USER_HEADER_LEN], payload: &[u8]) -> Result<()>;

    /// Rendered samples and read position
    fn samples(&self) -> &FrameSamples;

    /// Rendered samples and read position, mutably
    fn samples_mut(&mut self) -> &mut FrameSamples;

    /// Whether a frame is assembled and not yet fully written
    fn is_assembled(&self) -> bool {
        self.samples().is_pending()
    }

    /// Total frame length in samples (0 before the first assembly)
    fn frame_len(&self) -> usize {
        self.samples().len()
    }

    /// Fill `buf` with the next samples, zero-padding past the end
    ///
    /// Returns true once the last frame sample has been written.
    fn write_samples(&mut self, buf: &mut [Complex32]) -> bool {
        self.samples_mut().write(buf)
    }

    /// All samples of the assembled frame
    fn generate(&self) -> Vec<Complex32> {
        self.samples().as_slice().to_vec()
    }
}

/// Rendered frame plus the position of the next sample to write
#[derive(Debug, Clone, Default)]
pub struct FrameSamples {
    samples: Vec<Complex32>,
    pos: usize,
}

impl FrameSamples {
    /// Replace the rendered frame and rewind
    pub fn load(&mut self, samples: Vec<Complex32>) {
        self.samples = samples;
        self.pos = 0;
    }

    /// Frame length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True before any frame was rendered
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True while unwritten samples remain
    pub fn is_pending(&self) -> bool {
        self.pos < self.samples.len()
    }

    /// The full frame
    pub fn as_slice(&self) -> &[Complex32] {
        &self.samples
    }

    /// Copy the next block into `buf`; true once the frame is exhausted
    pub fn write(&mut self, buf: &mut [Complex32]) -> bool {
        let n = buf.len().min(self.samples.len() - self.pos);
        buf[..n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
        buf[n..].fill(Complex32::new(0.0, 0.0));
        self.pos += n;
        self.pos >= self.samples.len()
    }
}

/// Encode and whiten `msg`, then map it onto `modem` symbols
pub(crate) fn encode_symbols(packetizer: &mut Packetizer, modem: &Modem, msg: &[u8]) -> Result<Vec<Complex32>> {
    let mut encoded = packetizer.encode(msg)?.to_vec();
    whiten(&mut encoded);
    Ok(to_symbols(&encoded, modem.bits_per_symbol())
        .into_iter()
        .map(|s| modem.modulate(s))
        .collect())
}
