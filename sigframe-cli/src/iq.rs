//! Interleaved little-endian `f32` I/Q sample files

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use num_complex::Complex32;

/// Bytes per complex sample
pub const SAMPLE_BYTES: usize = 8;

/// Streams samples into a byte sink
pub struct IqWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> IqWriter<W> {
    /// Wrap `inner`
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Append `samples`
    pub fn write(&mut self, samples: &[Complex32]) -> io::Result<()> {
        for s in samples {
            self.inner.write_all(&s.re.to_le_bytes())?;
            self.inner.write_all(&s.im.to_le_bytes())?;
        }
        self.written += samples.len();
        Ok(())
    }

    /// Append `n` zero samples
    pub fn write_silence(&mut self, n: usize) -> io::Result<()> {
        self.write(&vec![Complex32::new(0.0, 0.0); n])
    }

    /// Samples written so far
    pub fn samples_written(&self) -> usize {
        self.written
    }

    /// Flush and return the sink
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Decode interleaved I/Q bytes
pub fn parse_iq(bytes: &[u8]) -> Result<Vec<Complex32>> {
    if bytes.len() % SAMPLE_BYTES != 0 {
        bail!("I/Q data length {} is not a multiple of {} bytes", bytes.len(), SAMPLE_BYTES);
    }
    Ok(bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|c| {
            let re = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
            let im = f32::from_le_bytes([c[4], c[5], c[6], c[7]]);
            Complex32::new(re, im)
        })
        .collect())
}

/// Read an I/Q file
pub fn read_iq(path: impl AsRef<Path>) -> Result<Vec<Complex32>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read sample file: {}", path.display()))?;
    parse_iq(&bytes).with_context(|| format!("Malformed sample file: {}", path.display()))
}
