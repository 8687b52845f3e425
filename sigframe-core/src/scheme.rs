//! Error-detection and forward-error-correction scheme identifiers
//!
//! Both enumerations carry a stable one-byte identifier (used inside frame
//! headers) and a stable lowercase name (used in configuration files and on
//! the command line). The lookup tables are immutable statics.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Error-detection scheme appended to every packet before FEC encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum CrcScheme {
    /// Invalid sentinel; rejected by every constructor
    Unknown = 0,
    /// No error detection
    None = 1,
    /// 8-bit two's-complement checksum
    Checksum = 2,
    /// CRC-8 (polynomial 0x07)
    Crc8 = 3,
    /// CRC-16 (polynomial 0x8005)
    Crc16 = 4,
    /// CRC-24 (polynomial 0x5D6DCB)
    Crc24 = 5,
    /// CRC-32C (Castagnoli)
    Crc32 = 6,
}

/// Forward error correction scheme identifiers
///
/// Every identifier has a name and a length law. Only a subset have codec
/// implementations; see [`FecScheme::is_supported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum FecScheme {
    /// Invalid sentinel; rejected by every constructor
    Unknown = 0,
    /// No coding
    None = 1,
    /// Repeat every byte three times
    Rep3 = 2,
    /// Repeat every byte five times
    Rep5 = 3,
    /// Hamming (7,4)
    Hamming74 = 4,
    /// Extended Hamming (8,4)
    Hamming84 = 5,
    /// Hamming (12,8)
    Hamming128 = 6,
    /// Extended Golay (24,12)
    Golay2412 = 7,
    /// SEC-DED (22,16)
    SecDed2216 = 8,
    /// SEC-DED (39,32)
    SecDed3932 = 9,
    /// SEC-DED (72,64)
    SecDed7264 = 10,
    /// Convolutional r1/2, K=7
    ConvV27 = 11,
    /// Convolutional r1/2, K=9
    ConvV29 = 12,
    /// Convolutional r1/3, K=9
    ConvV39 = 13,
    /// Convolutional r1/6, K=15
    ConvV615 = 14,
    ConvV27P23 = 15,
    ConvV27P34 = 16,
    ConvV27P45 = 17,
    ConvV27P56 = 18,
    ConvV27P67 = 19,
    ConvV27P78 = 20,
    ConvV29P23 = 21,
    ConvV29P34 = 22,
    ConvV29P45 = 23,
    ConvV29P56 = 24,
    ConvV29P67 = 25,
    ConvV29P78 = 26,
    /// Reed-Solomon over GF(2^8)
    RsM8 = 27,
}

struct CrcEntry {
    scheme: CrcScheme,
    name: &'static str,
    description: &'static str,
}

struct FecEntry {
    scheme: FecScheme,
    name: &'static str,
    description: &'static str,
    /// Nominal code rate as (numerator, denominator)
    rate: (u16, u16),
}

static CRC_SCHEMES: [CrcEntry; 7] = [
    CrcEntry { scheme: CrcScheme::Unknown, name: "unknown", description: "unknown error-detection scheme" },
    CrcEntry { scheme: CrcScheme::None, name: "none", description: "no error-detection" },
    CrcEntry { scheme: CrcScheme::Checksum, name: "checksum", description: "8-bit checksum" },
    CrcEntry { scheme: CrcScheme::Crc8, name: "crc8", description: "8-bit CRC" },
    CrcEntry { scheme: CrcScheme::Crc16, name: "crc16", description: "16-bit CRC" },
    CrcEntry { scheme: CrcScheme::Crc24, name: "crc24", description: "24-bit CRC" },
    CrcEntry { scheme: CrcScheme::Crc32, name: "crc32", description: "32-bit CRC" },
];

static FEC_SCHEMES: [FecEntry; 28] = [
    FecEntry { scheme: FecScheme::Unknown, name: "unknown", description: "unknown", rate: (0, 1) },
    FecEntry { scheme: FecScheme::None, name: "none", description: "none", rate: (1, 1) },
    FecEntry { scheme: FecScheme::Rep3, name: "rep3", description: "repeat(3)", rate: (1, 3) },
    FecEntry { scheme: FecScheme::Rep5, name: "rep5", description: "repeat(5)", rate: (1, 5) },
    FecEntry { scheme: FecScheme::Hamming74, name: "h74", description: "Hamming(7,4)", rate: (4, 7) },
    FecEntry { scheme: FecScheme::Hamming84, name: "h84", description: "Hamming(8,4)", rate: (1, 2) },
    FecEntry { scheme: FecScheme::Hamming128, name: "h128", description: "Hamming(12,8)", rate: (2, 3) },
    FecEntry { scheme: FecScheme::Golay2412, name: "g2412", description: "Golay(24,12)", rate: (1, 2) },
    FecEntry { scheme: FecScheme::SecDed2216, name: "secded2216", description: "SEC-DED(22,16)", rate: (16, 22) },
    FecEntry { scheme: FecScheme::SecDed3932, name: "secded3932", description: "SEC-DED(39,32)", rate: (32, 39) },
    FecEntry { scheme: FecScheme::SecDed7264, name: "secded7264", description: "SEC-DED(72,64)", rate: (64, 72) },
    FecEntry { scheme: FecScheme::ConvV27, name: "v27", description: "convolutional r1/2 K=7", rate: (1, 2) },
    FecEntry { scheme: FecScheme::ConvV29, name: "v29", description: "convolutional r1/2 K=9", rate: (1, 2) },
    FecEntry { scheme: FecScheme::ConvV39, name: "v39", description: "convolutional r1/3 K=9", rate: (1, 3) },
    FecEntry { scheme: FecScheme::ConvV615, name: "v615", description: "convolutional r1/6 K=15", rate: (1, 6) },
    FecEntry { scheme: FecScheme::ConvV27P23, name: "v27p23", description: "convolutional r2/3 K=7 (punctured)", rate: (2, 3) },
    FecEntry { scheme: FecScheme::ConvV27P34, name: "v27p34", description: "convolutional r3/4 K=7 (punctured)", rate: (3, 4) },
    FecEntry { scheme: FecScheme::ConvV27P45, name: "v27p45", description: "convolutional r4/5 K=7 (punctured)", rate: (4, 5) },
    FecEntry { scheme: FecScheme::ConvV27P56, name: "v27p56", description: "convolutional r5/6 K=7 (punctured)", rate: (5, 6) },
    FecEntry { scheme: FecScheme::ConvV27P67, name: "v27p67", description: "convolutional r6/7 K=7 (punctured)", rate: (6, 7) },
    FecEntry { scheme: FecScheme::ConvV27P78, name: "v27p78", description: "convolutional r7/8 K=7 (punctured)", rate: (7, 8) },
    FecEntry { scheme: FecScheme::ConvV29P23, name: "v29p23", description: "convolutional r2/3 K=9 (punctured)", rate: (2, 3) },
    FecEntry { scheme: FecScheme::ConvV29P34, name: "v29p34", description: "convolutional r3/4 K=9 (punctured)", rate: (3, 4) },
    FecEntry { scheme: FecScheme::ConvV29P45, name: "v29p45", description: "convolutional r4/5 K=9 (punctured)", rate: (4, 5) },
    FecEntry { scheme: FecScheme::ConvV29P56, name: "v29p56", description: "convolutional r5/6 K=9 (punctured)", rate: (5, 6) },
    FecEntry { scheme: FecScheme::ConvV29P67, name: "v29p67", description: "convolutional r6/7 K=9 (punctured)", rate: (6, 7) },
    FecEntry { scheme: FecScheme::ConvV29P78, name: "v29p78", description: "convolutional r7/8 K=9 (punctured)", rate: (7, 8) },
    FecEntry { scheme: FecScheme::RsM8, name: "rs8", description: "Reed-Solomon, 223/255", rate: (223, 255) },
];

impl CrcScheme {
    /// Every identifier, `Unknown` first
    pub fn all() -> impl Iterator<Item = CrcScheme> {
        CRC_SCHEMES.iter().map(|e| e.scheme)
    }

    /// Look up a scheme by its wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        CRC_SCHEMES.get(id as usize).map(|e| e.scheme)
    }

    /// Wire identifier
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        CRC_SCHEMES[self as usize].name
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        CRC_SCHEMES[self as usize].description
    }
}

impl FecScheme {
    /// Every identifier, `Unknown` first
    pub fn all() -> impl Iterator<Item = FecScheme> {
        FEC_SCHEMES.iter().map(|e| e.scheme)
    }

    /// Look up a scheme by its wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        FEC_SCHEMES.get(id as usize).map(|e| e.scheme)
    }

    /// Wire identifier
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        FEC_SCHEMES[self as usize].name
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        FEC_SCHEMES[self as usize].description
    }

    /// Nominal code rate (decoded bits per encoded bit)
    pub fn rate(self) -> f32 {
        let (num, den) = FEC_SCHEMES[self as usize].rate;
        num as f32 / den as f32
    }

    /// Whether a codec implementation exists for this scheme
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            FecScheme::None
                | FecScheme::Rep3
                | FecScheme::Rep5
                | FecScheme::Hamming74
                | FecScheme::Hamming84
                | FecScheme::Hamming128
                | FecScheme::Golay2412
                | FecScheme::SecDed2216
                | FecScheme::SecDed3932
                | FecScheme::SecDed7264
                | FecScheme::ConvV27
                | FecScheme::ConvV29
                | FecScheme::ConvV39
        )
    }
}

impl fmt::Display for CrcScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for FecScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrcScheme {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CRC_SCHEMES
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(s))
            .map(|e| e.scheme)
            .ok_or_else(|| FrameError::UnknownSchemeName(s.to_string()))
    }
}

impl FromStr for FecScheme {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FEC_SCHEMES
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(s))
            .map(|e| e.scheme)
            .ok_or_else(|| FrameError::UnknownSchemeName(s.to_string()))
    }
}

impl TryFrom<String> for CrcScheme {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for FecScheme {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CrcScheme> for String {
    fn from(scheme: CrcScheme) -> Self {
        scheme.name().to_string()
    }
}

impl From<FecScheme> for String {
    fn from(scheme: FecScheme) -> Self {
        scheme.name().to_string()
    }
}
