//! Property-based tests for the packetizer laws

use proptest::prelude::*;
use sigframe_core::{
    compute_decoded_len, compute_encoded_len, CrcScheme, FecScheme, Packetizer, PacketizerConfig,
};

fn crc_schemes() -> Vec<CrcScheme> {
    CrcScheme::all().filter(|c| *c != CrcScheme::Unknown).collect()
}

fn fec_schemes() -> Vec<FecScheme> {
    FecScheme::all().filter(|f| f.is_supported()).collect()
}

/// Codes correcting any single bit error in a packet
const SINGLE_ERROR_CORRECTING: [FecScheme; 10] = [
    FecScheme::Rep3,
    FecScheme::Rep5,
    FecScheme::Hamming74,
    FecScheme::Hamming84,
    FecScheme::Hamming128,
    FecScheme::Golay2412,
    FecScheme::SecDed2216,
    FecScheme::SecDed3932,
    FecScheme::SecDed7264,
    FecScheme::ConvV27,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(
        crc in prop::sample::select(crc_schemes()),
        inner in prop::sample::select(fec_schemes()),
        outer in prop::sample::select(fec_schemes()),
        msg in prop::collection::vec(any::<u8>(), 1..96)
    ) {
        let config = PacketizerConfig::new(msg.len(), crc, inner, outer);
        let mut packetizer = Packetizer::new(config).unwrap();
        let encoded = packetizer.encode(&msg).unwrap();
        prop_assert_eq!(encoded.len(), compute_encoded_len(msg.len(), crc, inner, outer).unwrap());

        let decoded = packetizer.decode(&encoded).unwrap();
        prop_assert!(decoded.valid);
        prop_assert_eq!(&decoded.message[..], &msg[..]);

        // hard bits expressed as certain soft bits decode identically
        let soft: Vec<u8> = encoded
            .iter()
            .flat_map(|b| (0..8).rev().map(move |i| if (b >> i) & 1 == 1 { 255 } else { 0 }))
            .collect();
        let decoded = packetizer.decode_soft(&soft).unwrap();
        prop_assert!(decoded.valid);
        prop_assert_eq!(&decoded.message[..], &msg[..]);
    }

    #[test]
    fn prop_length_laws(
        crc in prop::sample::select(crc_schemes()),
        inner in prop::sample::select(fec_schemes()),
        outer in prop::sample::select(fec_schemes()),
        n in 1usize..2000
    ) {
        let k = compute_encoded_len(n, crc, inner, outer).unwrap();
        prop_assert!(k >= n);
        prop_assert!(compute_encoded_len(n + 1, crc, inner, outer).unwrap() >= k);

        let inverse = compute_decoded_len(k, crc, inner, outer).unwrap();
        prop_assert!(inverse >= n);
        prop_assert_eq!(compute_encoded_len(inverse, crc, inner, outer).unwrap(), k);
    }

    #[test]
    fn prop_single_bit_error_is_corrected(
        fec in prop::sample::select(SINGLE_ERROR_CORRECTING.to_vec()),
        msg in prop::collection::vec(any::<u8>(), 1..64),
        position in any::<prop::sample::Index>()
    ) {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(msg.len(), CrcScheme::Crc32, fec, FecScheme::None)).unwrap();
        let mut encoded = packetizer.encode(&msg).unwrap().to_vec();
        let bit = position.index(encoded.len() * 8);
        encoded[bit / 8] ^= 0x80 >> (bit % 8);

        let decoded = packetizer.decode(&encoded).unwrap();
        prop_assert!(decoded.valid);
        prop_assert_eq!(&decoded.message[..], &msg[..]);
    }

    #[test]
    fn prop_uncoded_bit_error_is_detected(
        msg in prop::collection::vec(any::<u8>(), 1..64),
        position in any::<prop::sample::Index>()
    ) {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(msg.len(), CrcScheme::Crc32, FecScheme::None, FecScheme::None)).unwrap();
        let mut encoded = packetizer.encode(&msg).unwrap().to_vec();
        let bit = position.index(encoded.len() * 8);
        encoded[bit / 8] ^= 0x80 >> (bit % 8);
        prop_assert!(!packetizer.decode(&encoded).unwrap().valid);
    }

    #[test]
    fn prop_reconfigure_is_idempotent(
        inner in prop::sample::select(fec_schemes()),
        outer in prop::sample::select(fec_schemes()),
        n in 1usize..300,
        m in 1usize..300
    ) {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(n, CrcScheme::Crc16, FecScheme::None, FecScheme::None)).unwrap();
        let config = PacketizerConfig::new(m, CrcScheme::Crc24, inner, outer);
        packetizer.reconfigure(config).unwrap();
        let first = packetizer.encoded_len();
        packetizer.reconfigure(config).unwrap();
        prop_assert_eq!(packetizer.encoded_len(), first);
        prop_assert_eq!(first, config.encoded_len().unwrap());
        prop_assert_eq!(packetizer.decoded_len(), m);
    }

    #[test]
    fn prop_decode_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(20, CrcScheme::Crc32, FecScheme::ConvV29, FecScheme::Hamming84)).unwrap();
        // wrong sizes are a caller error, never a panic
        let result = packetizer.decode(&data);
        prop_assert!(result.is_ok() == (data.len() == packetizer.encoded_len()));
        let soft = packetizer.decode_soft(&data);
        prop_assert!(soft.is_ok() == (data.len() == 8 * packetizer.encoded_len()));
    }

    #[test]
    fn prop_golay_corrects_three_errors_per_block(
        msg in prop::collection::vec(any::<u8>(), 1..64),
        block in any::<prop::sample::Index>(),
        bits in prop::sample::subsequence((0..24usize).collect::<Vec<_>>(), 1..=3)
    ) {
        let (mut packetizer, mut encoded) = outer_coded(&msg, FecScheme::Golay2412);
        let block = block.index(encoded.len() * 8 / 24);
        flip(&mut encoded, bits.iter().map(|b| 24 * block + b));

        let decoded = packetizer.decode(&encoded).unwrap();
        prop_assert!(decoded.valid);
        prop_assert_eq!(&decoded.message[..], &msg[..]);
    }

    #[test]
    fn prop_golay_four_errors_in_a_block_are_detected(
        msg in prop::collection::vec(any::<u8>(), 1..64),
        block in any::<prop::sample::Index>(),
        bits in prop::sample::subsequence((0..24usize).collect::<Vec<_>>(), 4)
    ) {
        // data bits lead each block; errors confined to parity leave the data intact
        prop_assume!(bits.iter().any(|b| *b < 12));
        let (mut packetizer, mut encoded) = outer_coded(&msg, FecScheme::Golay2412);
        // blocks holding only message and key bits, no zero padding
        let full_blocks = 8 * (msg.len() + CrcScheme::Crc32.key_len()) / 12;
        let block = block.index(full_blocks);
        flip(&mut encoded, bits.iter().map(|b| 24 * block + b));

        prop_assert!(!packetizer.decode(&encoded).unwrap().valid);
    }

    #[test]
    fn prop_rep5_corrects_two_errors_per_bit(
        msg in prop::collection::vec(any::<u8>(), 1..64),
        bit in any::<prop::sample::Index>(),
        copies in prop::sample::subsequence((0..5usize).collect::<Vec<_>>(), 1..=2)
    ) {
        let (mut packetizer, mut encoded) = outer_coded(&msg, FecScheme::Rep5);
        let copy_bits = encoded.len() * 8 / 5;
        let bit = bit.index(copy_bits);
        flip(&mut encoded, copies.iter().map(|c| c * copy_bits + bit));

        let decoded = packetizer.decode(&encoded).unwrap();
        prop_assert!(decoded.valid);
        prop_assert_eq!(&decoded.message[..], &msg[..]);
    }

    #[test]
    fn prop_rep5_three_errors_per_bit_are_detected(
        msg in prop::collection::vec(any::<u8>(), 1..64),
        bit in any::<prop::sample::Index>(),
        copies in prop::sample::subsequence((0..5usize).collect::<Vec<_>>(), 3..=5)
    ) {
        let (mut packetizer, mut encoded) = outer_coded(&msg, FecScheme::Rep5);
        let copy_bits = encoded.len() * 8 / 5;
        let bit = bit.index(copy_bits);
        flip(&mut encoded, copies.iter().map(|c| c * copy_bits + bit));

        prop_assert!(!packetizer.decode(&encoded).unwrap().valid);
    }
}

/// CRC-32 protected packet with `outer` as its only code, so packet bits map
/// straight onto code blocks
fn outer_coded(msg: &[u8], outer: FecScheme) -> (Packetizer, Vec<u8>) {
    let config = PacketizerConfig::new(msg.len(), CrcScheme::Crc32, FecScheme::None, outer);
    let mut packetizer = Packetizer::new(config).unwrap();
    let encoded = packetizer.encode(msg).unwrap().to_vec();
    (packetizer, encoded)
}

fn flip(packet: &mut [u8], bits: impl Iterator<Item = usize>) {
    for bit in bits {
        packet[bit / 8] ^= 0x80 >> (bit % 8);
    }
}
