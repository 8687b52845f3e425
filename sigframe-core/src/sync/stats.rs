//! Per-frame reception statistics

use core::f32::consts::PI;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::modem::ModulationScheme;
use crate::scheme::{CrcScheme, FecScheme};

/// Snapshot of one frame attempt, handed to the listener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSyncStats {
    /// Error vector magnitude of the recovered symbols, dB
    pub evm_db: f32,
    /// Received signal strength, dB
    pub rssi_db: f32,
    /// Carrier frequency offset, cycles/sample
    pub cfo: f32,
    /// Fractional timing offset of the detection peak, samples
    pub timing_offset: f32,
    /// Number of payload symbols recovered
    pub payload_symbols: usize,
    /// Payload modulation
    pub modulation: ModulationScheme,
    /// Payload bits per symbol
    pub bps: usize,
    /// Payload error-detection scheme
    pub crc: CrcScheme,
    /// Payload inner FEC
    pub fec0: FecScheme,
    /// Payload outer FEC
    pub fec1: FecScheme,
}

impl FrameSyncStats {
    pub(crate) fn cycles_per_sample(radians: f32) -> f32 {
        radians / (2.0 * PI)
    }
}

impl Default for FrameSyncStats {
    fn default() -> Self {
        Self {
            evm_db: 0.0,
            rssi_db: 0.0,
            cfo: 0.0,
            timing_offset: 0.0,
            payload_symbols: 0,
            modulation: ModulationScheme::Unknown,
            bps: 0,
            crc: CrcScheme::Unknown,
            fec0: FecScheme::Unknown,
            fec1: FecScheme::Unknown,
        }
    }
}

impl fmt::Display for FrameSyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EVM {:.2} dB, RSSI {:.2} dB, CFO {:.5} cyc/sample, {} symbols {} ({} b/s), {}/{}/{}",
            self.evm_db,
            self.rssi_db,
            self.cfo,
            self.payload_symbols,
            self.modulation,
            self.bps,
            self.crc,
            self.fec0,
            self.fec1
        )
    }
}

/// Running totals kept by a synchronizer across frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSyncCounters {
    /// Preambles detected
    pub detections: u64,
    /// Headers that passed their integrity check
    pub header_valid: u64,
    /// Headers that failed their integrity check
    pub header_invalid: u64,
    /// Payloads that passed their integrity check
    pub payload_valid: u64,
    /// Payloads that failed their integrity check
    pub payload_invalid: u64,
    /// Valid headers declaring an unrealizable payload
    pub discarded: u64,
}

impl FrameSyncCounters {
    /// Fraction of detections that produced a valid payload
    pub fn success_rate(&self) -> f64 {
        if self.detections == 0 {
            0.0
        } else {
            self.payload_valid as f64 / self.detections as f64
        }
    }
}
