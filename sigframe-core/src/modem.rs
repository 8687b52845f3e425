//! Linear modems: Gray-mapped PSK, ASK and square QAM constellations
//!
//! Constellations are normalized to unit average energy. Soft demodulation
//! uses the max-log approximation and writes one reliability byte per bit,
//! most significant bit first.

use core::f32::consts::PI;
use core::fmt;
use core::str::FromStr;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::Result;

/// Modulation scheme identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum ModulationScheme {
    /// Invalid sentinel
    Unknown = 0,
    /// Binary phase-shift keying
    Psk2 = 1,
    /// Quadrature phase-shift keying
    Psk4 = 2,
    /// 8-PSK
    Psk8 = 3,
    /// 16-PSK
    Psk16 = 4,
    /// Binary amplitude-shift keying
    Ask2 = 5,
    /// 4-level amplitude-shift keying
    Ask4 = 6,
    /// 16-QAM
    Qam16 = 7,
    /// 64-QAM
    Qam64 = 8,
}

static MODULATION_NAMES: [(ModulationScheme, &str, &str); 9] = [
    (ModulationScheme::Unknown, "unknown", "unknown"),
    (ModulationScheme::Psk2, "psk2", "phase-shift keying (2)"),
    (ModulationScheme::Psk4, "psk4", "phase-shift keying (4)"),
    (ModulationScheme::Psk8, "psk8", "phase-shift keying (8)"),
    (ModulationScheme::Psk16, "psk16", "phase-shift keying (16)"),
    (ModulationScheme::Ask2, "ask2", "amplitude-shift keying (2)"),
    (ModulationScheme::Ask4, "ask4", "amplitude-shift keying (4)"),
    (ModulationScheme::Qam16, "qam16", "quadrature amplitude-shift keying (16)"),
    (ModulationScheme::Qam64, "qam64", "quadrature amplitude-shift keying (64)"),
];

impl ModulationScheme {
    /// Every identifier, `Unknown` first
    pub fn all() -> impl Iterator<Item = ModulationScheme> {
        MODULATION_NAMES.iter().map(|e| e.0)
    }

    /// Look up a scheme by its wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        MODULATION_NAMES.get(id as usize).map(|e| e.0)
    }

    /// Wire identifier
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        MODULATION_NAMES[self as usize].1
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        MODULATION_NAMES[self as usize].2
    }

    /// Bits carried per symbol (0 for `Unknown`)
    pub const fn bits_per_symbol(self) -> usize {
        match self {
            ModulationScheme::Unknown => 0,
            ModulationScheme::Psk2 | ModulationScheme::Ask2 => 1,
            ModulationScheme::Psk4 | ModulationScheme::Ask4 => 2,
            ModulationScheme::Psk8 => 3,
            ModulationScheme::Psk16 | ModulationScheme::Qam16 => 4,
            ModulationScheme::Qam64 => 6,
        }
    }
}

impl fmt::Display for ModulationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModulationScheme {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bpsk" => return Ok(ModulationScheme::Psk2),
            "qpsk" => return Ok(ModulationScheme::Psk4),
            _ => {}
        }
        MODULATION_NAMES
            .iter()
            .find(|e| e.1.eq_ignore_ascii_case(s))
            .map(|e| e.0)
            .ok_or_else(|| FrameError::UnknownSchemeName(s.to_string()))
    }
}

impl TryFrom<String> for ModulationScheme {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ModulationScheme> for String {
    fn from(scheme: ModulationScheme) -> Self {
        scheme.name().to_string()
    }
}

fn gray(i: usize) -> usize {
    i ^ (i >> 1)
}

/// Gray-coded pulse-amplitude levels `-(M-1) .. (M-1)` indexed by symbol
fn pam_levels(m: usize) -> Vec<f32> {
    let mut levels = vec![0.0; m];
    for i in 0..m {
        levels[gray(i)] = (2 * i) as f32 - (m - 1) as f32;
    }
    levels
}

/// Symbol mapper/demapper for one [`ModulationScheme`]
#[derive(Debug, Clone)]
pub struct Modem {
    scheme: ModulationScheme,
    bps: usize,
    points: Vec<Complex32>,
    /// soft-decision scale, 1 / (minimum squared distance)
    soft_scale: f32,
}

impl Modem {
    /// Build the constellation for `scheme`
    pub fn new(scheme: ModulationScheme) -> Result<Self> {
        let bps = scheme.bits_per_symbol();
        let m = 1usize << bps;
        let mut points: Vec<Complex32> = match scheme {
            ModulationScheme::Unknown => return Err(FrameError::UnsupportedModulation(scheme)),
            ModulationScheme::Psk2 | ModulationScheme::Psk4 | ModulationScheme::Psk8 | ModulationScheme::Psk16 => {
                let offset = if m == 2 { 0.0 } else { PI / m as f32 };
                let mut points = vec![Complex32::new(0.0, 0.0); m];
                for i in 0..m {
                    points[gray(i)] = Complex32::from_polar(1.0, 2.0 * PI * i as f32 / m as f32 + offset);
                }
                points
            }
            ModulationScheme::Ask2 | ModulationScheme::Ask4 => {
                pam_levels(m).into_iter().map(|a| Complex32::new(a, 0.0)).collect()
            }
            ModulationScheme::Qam16 | ModulationScheme::Qam64 => {
                let side = 1usize << (bps / 2);
                let levels = pam_levels(side);
                (0..m)
                    .map(|s| Complex32::new(levels[s >> (bps / 2)], levels[s & (side - 1)]))
                    .collect()
            }
        };

        let energy = points.iter().map(|p| p.norm_sqr()).sum::<f32>() / m as f32;
        let scale = energy.sqrt().recip();
        for p in points.iter_mut() {
            *p *= scale;
        }
        let mut dmin = f32::MAX;
        for (i, a) in points.iter().enumerate() {
            for b in points.iter().skip(i + 1) {
                dmin = dmin.min((a - b).norm_sqr());
            }
        }

        Ok(Self { scheme, bps, points, soft_scale: dmin.recip() })
    }

    /// Modulation scheme
    pub fn scheme(&self) -> ModulationScheme {
        self.scheme
    }

    /// Bits per symbol
    pub fn bits_per_symbol(&self) -> usize {
        self.bps
    }

    /// Constellation point for `symbol` (low `bps` bits are used)
    pub fn modulate(&self, symbol: u32) -> Complex32 {
        self.points[symbol as usize & (self.points.len() - 1)]
    }

    /// Nearest constellation symbol to `sample`
    pub fn demodulate(&self, sample: Complex32) -> u32 {
        let mut best = (0usize, f32::MAX);
        for (i, p) in self.points.iter().enumerate() {
            let d = (sample - p).norm_sqr();
            if d < best.1 {
                best = (i, d);
            }
        }
        best.0 as u32
    }

    /// Nearest constellation point to `sample`
    pub fn decision(&self, sample: Complex32) -> Complex32 {
        self.points[self.demodulate(sample) as usize]
    }

    /// Squared error between `sample` and the nearest constellation point
    pub fn error_vector(&self, sample: Complex32) -> f32 {
        (sample - self.decision(sample)).norm_sqr()
    }

    /// Max-log soft demodulation; writes `bps` reliability bytes into `soft`
    /// and returns the hard symbol decision
    pub fn demodulate_soft(&self, sample: Complex32, soft: &mut [u8]) -> u32 {
        for (k, out) in soft.iter_mut().enumerate().take(self.bps) {
            let shift = self.bps - 1 - k;
            let (mut d0, mut d1) = (f32::MAX, f32::MAX);
            for (i, p) in self.points.iter().enumerate() {
                let d = (sample - p).norm_sqr();
                if (i >> shift) & 1 == 1 {
                    d1 = d1.min(d);
                } else {
                    d0 = d0.min(d);
                }
            }
            let llr = (d0 - d1) * self.soft_scale;
            *out = (127.5 + 255.0 * llr).clamp(0.0, 255.0) as u8;
        }
        self.demodulate(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> impl Iterator<Item = ModulationScheme> {
        ModulationScheme::all().filter(|s| *s != ModulationScheme::Unknown)
    }

    #[test]
    fn test_unit_energy_and_round_trip() {
        for scheme in supported() {
            let modem = Modem::new(scheme).unwrap();
            let m = 1u32 << modem.bits_per_symbol();
            let energy: f32 = (0..m).map(|s| modem.modulate(s).norm_sqr()).sum::<f32>() / m as f32;
            assert!((energy - 1.0).abs() < 1e-4, "{scheme}");
            for s in 0..m {
                assert_eq!(modem.demodulate(modem.modulate(s)), s, "{scheme}");
            }
        }
    }

    #[test]
    fn test_gray_neighbours_differ_by_one_bit() {
        let modem = Modem::new(ModulationScheme::Psk8).unwrap();
        for s in 0..8u32 {
            let p = modem.modulate(s);
            // the two nearest other points differ in exactly one bit
            let mut others: Vec<(f32, u32)> = (0..8u32)
                .filter(|t| *t != s)
                .map(|t| ((modem.modulate(t) - p).norm_sqr(), t))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (_, t) in &others[..2] {
                assert_eq!((s ^ t).count_ones(), 1);
            }
        }
    }

    #[test]
    fn test_soft_bits_saturate_on_clean_points() {
        for scheme in supported() {
            let modem = Modem::new(scheme).unwrap();
            let bps = modem.bits_per_symbol();
            let mut soft = vec![0u8; bps];
            for s in 0..1u32 << bps {
                modem.demodulate_soft(modem.modulate(s), &mut soft);
                for (k, &v) in soft.iter().enumerate() {
                    let bit = (s >> (bps - 1 - k)) & 1;
                    assert_eq!(v, if bit == 1 { 255 } else { 0 }, "{scheme} symbol {s} bit {k}");
                }
            }
        }
    }

    #[test]
    fn test_soft_bit_is_erasure_on_boundary() {
        let modem = Modem::new(ModulationScheme::Psk2).unwrap();
        let mut soft = [0u8; 1];
        modem.demodulate_soft(Complex32::new(0.0, 0.3), &mut soft);
        assert_eq!(soft[0], 127);
    }

    #[test]
    fn test_names() {
        assert_eq!("qpsk".parse::<ModulationScheme>().unwrap(), ModulationScheme::Psk4);
        assert_eq!("QAM16".parse::<ModulationScheme>().unwrap(), ModulationScheme::Qam16);
        assert_eq!(ModulationScheme::from_id(8), Some(ModulationScheme::Qam64));
        assert!(Modem::new(ModulationScheme::Unknown).is_err());
    }
}
