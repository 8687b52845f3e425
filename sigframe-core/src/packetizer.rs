//! Packetizer: error detection, two FEC layers and bit interleaving
//!
//! Encoding appends the error-detection key to the message, applies the
//! inner FEC, interleaves the inner codeword bits and finally applies the
//! outer FEC. Decoding runs the inverse chain and reports whether the key
//! still matches; a mismatch never aborts, the (possibly corrupted) message
//! is always returned alongside `valid == false`.

use core::fmt;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::error::FrameError;
use crate::fec::{create_codec, FecCodec};
use crate::interleave::Interleaver;
use crate::scheme::{CrcScheme, FecScheme};
use crate::Result;

/// Decoded length plus the scheme triple protecting it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketizerConfig {
    /// Message length in bytes
    pub decoded_len: usize,
    /// Error-detection key appended to the message
    pub crc: CrcScheme,
    /// FEC applied to message and key
    pub inner_fec: FecScheme,
    /// FEC applied to the interleaved inner codeword
    pub outer_fec: FecScheme,
}

impl PacketizerConfig {
    /// Build a configuration
    pub const fn new(decoded_len: usize, crc: CrcScheme, inner_fec: FecScheme, outer_fec: FecScheme) -> Self {
        Self { decoded_len, crc, inner_fec, outer_fec }
    }

    /// Encoded length for this configuration
    pub fn encoded_len(&self) -> Result<usize> {
        compute_encoded_len(self.decoded_len, self.crc, self.inner_fec, self.outer_fec)
    }
}

/// Result of a packet decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Decoded message, returned even when the key check failed
    pub message: Bytes,
    /// Whether the error-detection key matched
    pub valid: bool,
}

fn check_schemes(crc: CrcScheme, inner: FecScheme, outer: FecScheme) -> Result<()> {
    if crc == CrcScheme::Unknown {
        return Err(FrameError::UnsupportedCrc(crc));
    }
    for fec in [inner, outer] {
        if !fec.is_supported() {
            return Err(FrameError::UnsupportedFec(fec));
        }
    }
    Ok(())
}

/// Encoded length in bytes of a `decoded_len`-byte message
///
/// Matches the length [`Packetizer::encode`] produces for the same schemes.
pub fn compute_encoded_len(
    decoded_len: usize,
    crc: CrcScheme,
    inner: FecScheme,
    outer: FecScheme,
) -> Result<usize> {
    check_schemes(crc, inner, outer)?;
    let keyed_len = decoded_len
        .checked_add(crc.key_len())
        .ok_or_else(|| FrameError::InvalidParameter(format!("{decoded_len}-byte message overflows its key")))?;
    let inner_len = inner.encoded_len(keyed_len)?;
    outer.encoded_len(inner_len)
}

/// Largest decoded length whose encoded length fits in `encoded_len` bytes
///
/// Exact left inverse of [`compute_encoded_len`]: for every `n`,
/// `compute_decoded_len(compute_encoded_len(n))` returns the largest message
/// length sharing that encoded size, which is `n` itself whenever the
/// length law is strictly increasing at `n`. Returns 0 when even an empty
/// message does not fit.
pub fn compute_decoded_len(
    encoded_len: usize,
    crc: CrcScheme,
    inner: FecScheme,
    outer: FecScheme,
) -> Result<usize> {
    check_schemes(crc, inner, outer)?;
    // every supported scheme expands, so the answer is at most encoded_len;
    // lengths whose encoding overflows are too long by definition
    let (mut lo, mut hi) = (0usize, encoded_len);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        match compute_encoded_len(mid, crc, inner, outer) {
            Ok(len) if len <= encoded_len => lo = mid,
            _ => hi = mid - 1,
        }
    }
    Ok(lo)
}

/// Reusable encoder/decoder for one [`PacketizerConfig`]
///
/// Scratch buffers are sized at construction and reused by every call; they
/// only change size through [`Packetizer::reconfigure`].
#[derive(Debug)]
pub struct Packetizer {
    config: PacketizerConfig,
    inner: Box<dyn FecCodec>,
    outer: Box<dyn FecCodec>,
    interleaver: Interleaver,
    encoded_len: usize,
    /// message followed by its key
    keyed: Vec<u8>,
    /// inner codeword
    inner_buf: Vec<u8>,
    /// interleaved inner codeword
    mixed: Vec<u8>,
    /// deinterleaved reliabilities
    soft_inner: Vec<u8>,
}

impl Packetizer {
    /// Create a packetizer, failing on unknown or unsupported schemes
    pub fn new(config: PacketizerConfig) -> Result<Self> {
        let encoded_len = config.encoded_len()?;
        let inner = create_codec(config.inner_fec)?;
        let outer = create_codec(config.outer_fec)?;
        let mut packetizer = Self {
            config,
            inner,
            outer,
            interleaver: Interleaver::new(0),
            encoded_len,
            keyed: Vec::new(),
            inner_buf: Vec::new(),
            mixed: Vec::new(),
            soft_inner: Vec::new(),
        };
        packetizer.resize();

        #[cfg(feature = "logging")]
        debug!(
            "Created packetizer: {} -> {} bytes ({}, {}, {})",
            config.decoded_len, encoded_len, config.crc, config.inner_fec, config.outer_fec
        );

        Ok(packetizer)
    }

    /// Shorthand for [`Packetizer::new`] from individual parameters
    pub fn with_schemes(decoded_len: usize, crc: CrcScheme, inner: FecScheme, outer: FecScheme) -> Result<Self> {
        Self::new(PacketizerConfig::new(decoded_len, crc, inner, outer))
    }

    fn resize(&mut self) {
        let keyed_len = self.config.decoded_len + self.config.crc.key_len();
        // schemes were validated before resize is reached
        let inner_len = self.config.inner_fec.encoded_len(keyed_len).unwrap_or(keyed_len);
        self.interleaver = Interleaver::new(inner_len);
        self.keyed.resize(keyed_len, 0);
        self.inner_buf.resize(inner_len, 0);
        self.mixed.resize(inner_len, 0);
        self.soft_inner.resize(8 * inner_len, 0);
    }

    /// Switch to a new configuration, reusing the scratch storage
    ///
    /// Identical configurations are a no-op. On error the packetizer keeps
    /// its previous configuration.
    pub fn reconfigure(&mut self, config: PacketizerConfig) -> Result<()> {
        if config == self.config {
            return Ok(());
        }
        let encoded_len = config.encoded_len()?;
        let inner = (config.inner_fec != self.config.inner_fec)
            .then(|| create_codec(config.inner_fec))
            .transpose()?;
        let outer = (config.outer_fec != self.config.outer_fec)
            .then(|| create_codec(config.outer_fec))
            .transpose()?;
        if let Some(inner) = inner {
            self.inner = inner;
        }
        if let Some(outer) = outer {
            self.outer = outer;
        }
        self.config = config;
        self.encoded_len = encoded_len;
        self.resize();

        #[cfg(feature = "logging")]
        debug!("Reconfigured packetizer: {} -> {} bytes", config.decoded_len, encoded_len);

        Ok(())
    }

    /// Current configuration
    pub fn config(&self) -> &PacketizerConfig {
        &self.config
    }

    /// Message length in bytes
    pub fn decoded_len(&self) -> usize {
        self.config.decoded_len
    }

    /// Packet length in bytes
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Encode `msg` into `out`
    pub fn encode_into(&mut self, msg: &[u8], out: &mut [u8]) -> Result<()> {
        FrameError::check_len(self.config.decoded_len, msg.len())?;
        FrameError::check_len(self.encoded_len, out.len())?;

        let n = msg.len();
        self.keyed[..n].copy_from_slice(msg);
        self.config.crc.write_key(msg, &mut self.keyed[n..]);
        self.inner.encode(&self.keyed, &mut self.inner_buf);
        self.interleaver.encode(&self.inner_buf, &mut self.mixed);
        self.outer.encode(&self.mixed, out);
        Ok(())
    }

    /// Encode `msg` into a new packet
    pub fn encode(&mut self, msg: &[u8]) -> Result<Bytes> {
        let mut out = BytesMut::zeroed(self.encoded_len);
        self.encode_into(msg, &mut out)?;
        Ok(out.freeze())
    }

    fn finish(&self, out: &mut [u8]) -> bool {
        let n = self.config.decoded_len;
        out.copy_from_slice(&self.keyed[..n]);
        let key = self.config.crc.read_key(&self.keyed[n..]);
        self.config.crc.validate(out, key)
    }

    /// Hard-decision decode of `packet` into `out`; returns the key check result
    pub fn decode_into(&mut self, packet: &[u8], out: &mut [u8]) -> Result<bool> {
        FrameError::check_len(self.encoded_len, packet.len())?;
        FrameError::check_len(self.config.decoded_len, out.len())?;

        self.outer.decode(packet, &mut self.mixed);
        self.interleaver.decode(&self.mixed, &mut self.inner_buf);
        self.inner.decode(&self.inner_buf, &mut self.keyed);
        Ok(self.finish(out))
    }

    /// Hard-decision decode of `packet`
    pub fn decode(&mut self, packet: &[u8]) -> Result<DecodedPacket> {
        let mut out = BytesMut::zeroed(self.config.decoded_len);
        let valid = self.decode_into(packet, &mut out)?;
        Ok(DecodedPacket { message: out.freeze(), valid })
    }

    /// Soft-decision decode of one reliability byte per packet bit into `out`
    ///
    /// Reliabilities flow through the interleaver untouched when the outer
    /// FEC is `None`, so the inner FEC decodes soft; otherwise the outer FEC
    /// decodes soft and the inner one hard.
    pub fn decode_soft_into(&mut self, soft: &[u8], out: &mut [u8]) -> Result<bool> {
        FrameError::check_len(8 * self.encoded_len, soft.len())?;
        FrameError::check_len(self.config.decoded_len, out.len())?;

        if self.config.outer_fec == FecScheme::None {
            self.interleaver.decode_soft(soft, &mut self.soft_inner);
            self.inner.decode_soft(&self.soft_inner, &mut self.keyed);
        } else {
            self.outer.decode_soft(soft, &mut self.mixed);
            self.interleaver.decode(&self.mixed, &mut self.inner_buf);
            self.inner.decode(&self.inner_buf, &mut self.keyed);
        }
        Ok(self.finish(out))
    }

    /// Soft-decision decode of one reliability byte per packet bit
    pub fn decode_soft(&mut self, soft: &[u8]) -> Result<DecodedPacket> {
        let mut out = BytesMut::zeroed(self.config.decoded_len);
        let valid = self.decode_soft_into(soft, &mut out)?;
        Ok(DecodedPacket { message: out.freeze(), valid })
    }

    /// Interleaver sitting between the inner and outer FEC
    pub fn interleaver(&self) -> &Interleaver {
        &self.interleaver
    }
}

impl fmt::Display for Packetizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(f, "packetizer (dec: {} bytes, enc: {} bytes)", c.decoded_len, self.encoded_len)?;
        writeln!(f, "  crc        {:<10} {} bytes", c.crc.name(), c.crc.key_len())?;
        writeln!(f, "  inner fec  {:<10} {} -> {} bytes", c.inner_fec.name(), self.keyed.len(), self.inner_buf.len())?;
        writeln!(f, "  interleave stride {}", self.interleaver.stride())?;
        write!(f, "  outer fec  {:<10} {} -> {} bytes", c.outer_fec.name(), self.mixed.len(), self.encoded_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::unpack_soft;

    fn pattern(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i as u8).wrapping_mul(13).wrapping_add(7)).collect()
    }

    #[test]
    fn test_hamming74_crc32_scenario() {
        let mut q = Packetizer::with_schemes(64, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None).unwrap();
        assert_eq!(q.encoded_len(), 119);
        let msg = pattern(64);
        let packet = q.encode(&msg).unwrap();
        assert_eq!(packet.len(), q.encoded_len());
        let decoded = q.decode(&packet).unwrap();
        assert!(decoded.valid);
        assert_eq!(&decoded.message[..], &msg[..]);
    }

    #[test]
    fn test_unknown_schemes_rejected() {
        assert!(matches!(
            Packetizer::with_schemes(8, CrcScheme::Unknown, FecScheme::None, FecScheme::None),
            Err(FrameError::UnsupportedCrc(_))
        ));
        assert!(matches!(
            Packetizer::with_schemes(8, CrcScheme::Crc8, FecScheme::Unknown, FecScheme::None),
            Err(FrameError::UnsupportedFec(FecScheme::Unknown))
        ));
        assert!(Packetizer::with_schemes(8, CrcScheme::Crc8, FecScheme::None, FecScheme::RsM8).is_err());
    }

    #[test]
    fn test_corruption_reported_not_raised() {
        let mut q = Packetizer::with_schemes(16, CrcScheme::Crc16, FecScheme::None, FecScheme::None).unwrap();
        let msg = pattern(16);
        let mut packet = q.encode(&msg).unwrap().to_vec();
        packet[3] ^= 0x01;
        let decoded = q.decode(&packet).unwrap();
        assert!(!decoded.valid);
        assert_eq!(decoded.message.len(), 16);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let mut q = Packetizer::with_schemes(10, CrcScheme::Crc8, FecScheme::Rep3, FecScheme::None).unwrap();
        assert!(matches!(
            q.encode(&[0u8; 9]),
            Err(FrameError::LengthMismatch { expected: 10, actual: 9 })
        ));
        assert!(q.decode(&[0u8; 5]).is_err());
        assert!(q.decode_soft(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_soft_decode_both_layers() {
        let msg = pattern(40);
        for (inner, outer) in [
            (FecScheme::Hamming128, FecScheme::None),
            (FecScheme::Hamming74, FecScheme::ConvV27),
            (FecScheme::None, FecScheme::Golay2412),
        ] {
            let mut q = Packetizer::with_schemes(40, CrcScheme::Crc24, inner, outer).unwrap();
            let packet = q.encode(&msg).unwrap();
            let mut soft = vec![0u8; packet.len() * 8];
            unpack_soft(&packet, &mut soft);
            let decoded = q.decode_soft(&soft).unwrap();
            assert!(decoded.valid, "{inner}/{outer}");
            assert_eq!(&decoded.message[..], &msg[..]);
        }
    }

    #[test]
    fn test_decoded_len_inverse() {
        let schemes = [
            (CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None),
            (CrcScheme::Crc16, FecScheme::ConvV29, FecScheme::Hamming84),
            (CrcScheme::None, FecScheme::SecDed3932, FecScheme::Rep3),
        ];
        for (crc, inner, outer) in schemes {
            for n in 1..120 {
                let k = compute_encoded_len(n, crc, inner, outer).unwrap();
                assert_eq!(compute_decoded_len(k, crc, inner, outer).unwrap(), n);
            }
        }
        assert_eq!(compute_decoded_len(2, CrcScheme::Crc32, FecScheme::None, FecScheme::None).unwrap(), 0);
    }

    #[test]
    fn test_overflowing_lengths_are_errors() {
        let huge = compute_decoded_len(usize::MAX, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None).unwrap();
        assert!(huge > 0);
        assert!(compute_encoded_len(huge, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None).is_ok());
        assert!(compute_encoded_len(huge + 1, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None).is_err());

        assert!(matches!(
            compute_encoded_len(usize::MAX, CrcScheme::Crc32, FecScheme::None, FecScheme::None),
            Err(FrameError::InvalidParameter(_))
        ));
        assert!(compute_encoded_len(usize::MAX / 4, CrcScheme::Crc32, FecScheme::Rep5, FecScheme::None).is_err());
        assert!(compute_decoded_len(usize::MAX, CrcScheme::Crc16, FecScheme::ConvV39, FecScheme::Golay2412).is_ok());
        assert!(Packetizer::with_schemes(usize::MAX, CrcScheme::Crc8, FecScheme::Rep3, FecScheme::None).is_err());
    }

    #[test]
    fn test_reconfigure() {
        let mut q = Packetizer::with_schemes(20, CrcScheme::Crc32, FecScheme::Hamming84, FecScheme::None).unwrap();
        let first = q.encoded_len();
        let config = *q.config();
        q.reconfigure(config).unwrap();
        assert_eq!(q.encoded_len(), first);

        let bigger = PacketizerConfig::new(100, CrcScheme::Crc16, FecScheme::SecDed7264, FecScheme::Rep3);
        q.reconfigure(bigger).unwrap();
        assert_eq!(q.encoded_len(), bigger.encoded_len().unwrap());
        let msg = pattern(100);
        let packet = q.encode(&msg).unwrap();
        assert!(q.decode(&packet).unwrap().valid);

        let bad = PacketizerConfig::new(10, CrcScheme::Crc16, FecScheme::ConvV615, FecScheme::None);
        assert!(q.reconfigure(bad).is_err());
        assert_eq!(q.config(), &bigger);
    }

    #[test]
    fn test_display_lists_stages() {
        let q = Packetizer::with_schemes(8, CrcScheme::Crc16, FecScheme::Golay2412, FecScheme::Rep3).unwrap();
        let text = q.to_string();
        assert!(text.contains("g2412"));
        assert!(text.contains("rep3"));
    }
}
