//! Self-describing frame header shared by the flexible frame families
//!
//! ```text
//! +------------------+---------+-------------+-----+-----+------+------+
//! | user header (8)  | version | length (BE) | mod | crc | fec0 | fec1 |
//! +------------------+---------+-------------+-----+-----+------+------+
//! ```
//!
//! The GMSK family has a single modulation and omits the `mod` byte.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PAYLOAD_LEN, PROTOCOL_VERSION, USER_HEADER_LEN};
use crate::error::FrameError;
use crate::modem::ModulationScheme;
use crate::packetizer::PacketizerConfig;
use crate::scheme::{CrcScheme, FecScheme};
use crate::sync::PayloadLayout;
use crate::Result;

/// Payload protection and modulation declared by a frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameProperties {
    /// Error-detection scheme
    pub crc: CrcScheme,
    /// Inner FEC scheme
    pub fec0: FecScheme,
    /// Outer FEC scheme
    pub fec1: FecScheme,
    /// Payload modulation
    pub modulation: ModulationScheme,
}

impl Default for FrameProperties {
    fn default() -> Self {
        Self {
            crc: CrcScheme::Crc32,
            fec0: FecScheme::None,
            fec1: FecScheme::Hamming128,
            modulation: ModulationScheme::Psk4,
        }
    }
}

impl FrameProperties {
    /// Reject unknown or unsupported schemes
    pub fn validate(&self) -> Result<()> {
        if self.crc == CrcScheme::Unknown {
            return Err(FrameError::UnsupportedCrc(self.crc));
        }
        for fec in [self.fec0, self.fec1] {
            if !fec.is_supported() {
                return Err(FrameError::UnsupportedFec(fec));
            }
        }
        if self.modulation == ModulationScheme::Unknown {
            return Err(FrameError::UnsupportedModulation(self.modulation));
        }
        Ok(())
    }

    /// Packetizer configuration for a payload of `len` bytes
    pub fn packetizer_config(&self, len: usize) -> PacketizerConfig {
        PacketizerConfig::new(len, self.crc, self.fec0, self.fec1)
    }
}

/// Encoder/parser for the flexible header layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexHeader {
    with_modulation: bool,
}

impl FlexHeader {
    /// Layout carrying a modulation byte
    pub const fn with_modulation() -> Self {
        Self { with_modulation: true }
    }

    /// Layout without a modulation byte
    pub const fn without_modulation() -> Self {
        Self { with_modulation: false }
    }

    /// Decoded header length in bytes
    pub const fn len(&self) -> usize {
        USER_HEADER_LEN + 6 + self.with_modulation as usize
    }

    /// Never empty
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Serialize a header for a `payload_len`-byte payload
    pub fn encode(
        &self,
        user: &[u8; USER_HEADER_LEN],
        payload_len: usize,
        props: &FrameProperties,
    ) -> Result<Vec<u8>> {
        if payload_len == 0 {
            return Err(FrameError::InvalidParameter("payload must not be empty".into()));
        }
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(payload_len, MAX_PAYLOAD_LEN));
        }
        props.validate()?;

        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(user);
        out.push(PROTOCOL_VERSION);
        out.extend_from_slice(&(payload_len as u16).to_be_bytes());
        if self.with_modulation {
            out.push(props.modulation.id());
        }
        out.extend_from_slice(&[props.crc.id(), props.fec0.id(), props.fec1.id()]);
        Ok(out)
    }

    /// Interpret a decoded header; `None` when the declaration is not
    /// realizable (wrong version, empty payload, unknown or unsupported
    /// scheme)
    ///
    /// `default_modulation` is used by layouts without a modulation byte.
    pub fn parse(&self, header: &[u8], default_modulation: ModulationScheme) -> Option<PayloadLayout> {
        if header.len() != self.len() || header[USER_HEADER_LEN] != PROTOCOL_VERSION {
            return None;
        }
        let len = u16::from_be_bytes([header[USER_HEADER_LEN + 1], header[USER_HEADER_LEN + 2]]) as usize;
        let mut pos = USER_HEADER_LEN + 3;
        let modulation = if self.with_modulation {
            pos += 1;
            ModulationScheme::from_id(header[pos - 1])?
        } else {
            default_modulation
        };
        let props = FrameProperties {
            crc: CrcScheme::from_id(header[pos])?,
            fec0: FecScheme::from_id(header[pos + 1])?,
            fec1: FecScheme::from_id(header[pos + 2])?,
            modulation,
        };
        if len == 0 || props.validate().is_err() {
            return None;
        }
        Some(PayloadLayout { config: props.packetizer_config(len), modulation })
    }
}
