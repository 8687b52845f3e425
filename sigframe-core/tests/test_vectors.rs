//! Reference vectors for the error-detection keys and the length laws

use sigframe_core::{compute_decoded_len, compute_encoded_len, CrcScheme, FecScheme};

const CHECK: &[u8] = b"123456789";

#[test]
fn test_crc_check_values() {
    assert_eq!(CrcScheme::None.generate_key(CHECK), 0);
    assert_eq!(CrcScheme::Checksum.generate_key(CHECK), 0x23);
    assert_eq!(CrcScheme::Crc8.generate_key(CHECK), 0xf4);
    assert_eq!(CrcScheme::Crc16.generate_key(CHECK), 0xbb3d);
    assert_eq!(CrcScheme::Crc24.generate_key(CHECK), 0x7979bd);
    assert_eq!(CrcScheme::Crc32.generate_key(CHECK), 0xe306_9283);
}

#[test]
fn test_key_is_appended_big_endian() {
    let mut key = [0u8; 4];
    CrcScheme::Crc32.write_key(CHECK, &mut key);
    assert_eq!(hex::encode(key), "e3069283");
    assert_eq!(CrcScheme::Crc32.read_key(&key), 0xe306_9283);

    let mut key = [0u8; 3];
    CrcScheme::Crc24.write_key(CHECK, &mut key);
    assert_eq!(hex::encode(key), "7979bd");
}

#[test]
fn test_encoded_length_vectors() {
    let vectors = [
        (64, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None, 119),
        (8, CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None, 20),
        (15, CrcScheme::Crc16, FecScheme::Hamming84, FecScheme::None, 34),
        (64, CrcScheme::Crc24, FecScheme::ConvV27, FecScheme::None, 136),
        (100, CrcScheme::Crc32, FecScheme::Golay2412, FecScheme::None, 210),
        (10, CrcScheme::Crc8, FecScheme::SecDed7264, FecScheme::Rep3, 39),
        (20, CrcScheme::Checksum, FecScheme::None, FecScheme::Hamming128, 32),
    ];
    for (n, crc, inner, outer, expected) in vectors {
        assert_eq!(compute_encoded_len(n, crc, inner, outer).unwrap(), expected, "{n} {crc} {inner} {outer}");
    }
}

#[test]
fn test_decoded_length_vectors() {
    assert_eq!(compute_decoded_len(119, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None).unwrap(), 64);
    assert_eq!(compute_decoded_len(136, CrcScheme::Crc24, FecScheme::ConvV27, FecScheme::None).unwrap(), 64);
    // nothing fits in fewer bytes than the key
    assert_eq!(compute_decoded_len(3, CrcScheme::Crc32, FecScheme::None, FecScheme::None).unwrap(), 0);
}

#[test]
fn test_unsupported_schemes_are_rejected() {
    assert!(compute_encoded_len(10, CrcScheme::Unknown, FecScheme::None, FecScheme::None).is_err());
    assert!(compute_encoded_len(10, CrcScheme::Crc8, FecScheme::RsM8, FecScheme::None).is_err());
    assert!(compute_encoded_len(10, CrcScheme::Crc8, FecScheme::None, FecScheme::ConvV27P34).is_err());
}

#[test]
fn test_oversized_lengths_are_errors() {
    for (crc, inner, outer) in [
        (CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None),
        (CrcScheme::Crc24, FecScheme::ConvV27, FecScheme::Rep5),
        (CrcScheme::Checksum, FecScheme::Golay2412, FecScheme::SecDed2216),
    ] {
        assert!(compute_encoded_len(usize::MAX, crc, inner, outer).is_err());
        let n = compute_decoded_len(usize::MAX, crc, inner, outer).unwrap();
        assert!(compute_encoded_len(n, crc, inner, outer).is_ok());
        assert!(compute_encoded_len(n + 1, crc, inner, outer).is_err());
    }
    assert_eq!(compute_decoded_len(usize::MAX, CrcScheme::None, FecScheme::None, FecScheme::None).unwrap(), usize::MAX);
}
