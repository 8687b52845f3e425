//! Fuzzing entry points for sigframe-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_packetizer

use num_complex::Complex32;
use sigframe_core::sync::ReceivedFrame;
use sigframe_core::{CrcScheme, FecScheme, FlexFrameSync, GmskFrameSync, OfdmFrameSync, OfdmParams, Packetizer, PacketizerConfig};

/// Decode arbitrary bytes with a configuration taken from the first four
///
/// Byte 0 selects the check, bytes 1 and 2 the inner and outer codes and
/// byte 3 the message length. Unsupported selections are skipped.
pub fn fuzz_packetizer(data: &[u8]) {
    let [crc, inner, outer, len, rest @ ..] = data else {
        return;
    };
    let (Some(crc), Some(inner), Some(outer)) =
        (CrcScheme::from_id(*crc), FecScheme::from_id(*inner), FecScheme::from_id(*outer))
    else {
        return;
    };
    let Ok(mut packetizer) = Packetizer::new(PacketizerConfig::new(*len as usize, crc, inner, outer)) else {
        return;
    };

    // wrong lengths must be reported, never panic
    let _ = packetizer.decode(rest);
    let _ = packetizer.decode_soft(rest);

    let mut packet = rest.to_vec();
    packet.resize(packetizer.encoded_len(), 0);
    if let Ok(decoded) = packetizer.decode(&packet) {
        assert_eq!(decoded.message.len(), *len as usize);
    }
}

/// Interpret byte pairs as signed I/Q samples
fn samples(data: &[u8]) -> Vec<Complex32> {
    data.chunks_exact(2)
        .map(|c| Complex32::new(c[0] as i8 as f32 / 64.0, c[1] as i8 as f32 / 64.0))
        .collect()
}

/// Push arbitrary samples through every synchronizer
pub fn fuzz_sync(data: &[u8]) {
    let input = samples(data);
    let ignore = |_: &ReceivedFrame<'_>| {};

    if let Ok(mut sync) = FlexFrameSync::flexframe(ignore) {
        sync.execute(&input);
    }
    if let Ok(mut sync) = GmskFrameSync::gmsk(ignore) {
        sync.execute(&input);
    }
    if let Ok(mut sync) = OfdmFrameSync::ofdm(&OfdmParams::default(), ignore) {
        sync.execute(&input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_packetizer_empty() {
        fuzz_packetizer(&[]);
    }

    #[test]
    fn test_fuzz_packetizer_random() {
        fuzz_packetizer(&[3, 6, 2, 17, 0x12, 0x34, 0x56, 0x78]);
        fuzz_packetizer(&[4, 11, 1, 255, 0xAA]);
        fuzz_packetizer(&[0xFF; 64]);
    }

    #[test]
    fn test_fuzz_sync_empty() {
        fuzz_sync(&[]);
        fuzz_sync(&[1]);
    }

    #[test]
    fn test_fuzz_sync_random() {
        let data: Vec<u8> = (0..8192u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect();
        fuzz_sync(&data);
        fuzz_sync(&[0x7F; 4096]);
    }
}
