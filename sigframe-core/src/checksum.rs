//! Error-detection keys: 8-bit checksum and CRC-8/16/24/32
//!
//! Keys are appended to the message big-endian, most significant byte
//! first, occupying [`CrcScheme::key_len`] bytes.

use crc::{Crc, CRC_16_ARC, CRC_24_FLEXRAY_A, CRC_8_SMBUS};

use crate::scheme::CrcScheme;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);
const CRC24: Crc<u32> = Crc::<u32>::new(&CRC_24_FLEXRAY_A);

impl CrcScheme {
    /// Size of the appended key in bytes
    pub const fn key_len(self) -> usize {
        match self {
            CrcScheme::Unknown | CrcScheme::None => 0,
            CrcScheme::Checksum | CrcScheme::Crc8 => 1,
            CrcScheme::Crc16 => 2,
            CrcScheme::Crc24 => 3,
            CrcScheme::Crc32 => 4,
        }
    }

    /// Compute the key over `msg`
    pub fn generate_key(self, msg: &[u8]) -> u32 {
        match self {
            CrcScheme::Unknown | CrcScheme::None => 0,
            CrcScheme::Checksum => {
                let sum = msg.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
                u32::from((!sum).wrapping_add(1))
            }
            CrcScheme::Crc8 => u32::from(CRC8.checksum(msg)),
            CrcScheme::Crc16 => u32::from(CRC16.checksum(msg)),
            CrcScheme::Crc24 => CRC24.checksum(msg) & 0x00ff_ffff,
            CrcScheme::Crc32 => crc32c::crc32c(msg),
        }
    }

    /// Check `key` against the key computed over `msg`
    pub fn validate(self, msg: &[u8], key: u32) -> bool {
        self.generate_key(msg) == key
    }

    /// Write the key for `msg` into `out` (which must hold `key_len` bytes)
    pub fn write_key(self, msg: &[u8], out: &mut [u8]) {
        let key = self.generate_key(msg);
        let len = self.key_len();
        for (i, byte) in out.iter_mut().take(len).enumerate() {
            *byte = (key >> (8 * (len - 1 - i))) as u8;
        }
    }

    /// Read a big-endian key of `key_len` bytes
    pub fn read_key(self, bytes: &[u8]) -> u32 {
        bytes
            .iter()
            .take(self.key_len())
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lengths() {
        assert_eq!(CrcScheme::None.key_len(), 0);
        assert_eq!(CrcScheme::Checksum.key_len(), 1);
        assert_eq!(CrcScheme::Crc24.key_len(), 3);
        assert_eq!(CrcScheme::Crc32.key_len(), 4);
    }

    #[test]
    fn test_checksum_sums_to_zero() {
        let msg = b"sigframe checksum";
        let key = CrcScheme::Checksum.generate_key(msg) as u8;
        let total = msg.iter().fold(key, |acc, &b| acc.wrapping_add(b));
        assert_eq!(total, 0);
    }

    #[test]
    fn test_known_crc_values() {
        // standard check values over "123456789"
        let check = b"123456789";
        assert_eq!(CrcScheme::Crc8.generate_key(check), 0xf4);
        assert_eq!(CrcScheme::Crc16.generate_key(check), 0xbb3d);
        assert_eq!(CrcScheme::Crc32.generate_key(check), 0xe306_9283);
    }

    #[test]
    fn test_write_and_read_key() {
        let msg = [0x10u8, 0x20, 0x30, 0x40, 0x50];
        for scheme in CrcScheme::all().filter(|s| *s != CrcScheme::Unknown) {
            let mut key = [0u8; 4];
            scheme.write_key(&msg, &mut key);
            let read = scheme.read_key(&key);
            assert!(scheme.validate(&msg, read), "{scheme}");
        }
    }

    #[test]
    fn test_single_bit_flip_detected() {
        let mut msg = vec![0xa5u8; 32];
        for scheme in [CrcScheme::Crc8, CrcScheme::Crc16, CrcScheme::Crc24, CrcScheme::Crc32] {
            let key = scheme.generate_key(&msg);
            msg[7] ^= 0x04;
            assert!(!scheme.validate(&msg, key), "{scheme}");
            msg[7] ^= 0x04;
        }
    }
}
