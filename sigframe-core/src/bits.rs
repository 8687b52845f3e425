//! Bit-level helpers: MSB-first access, packing and soft-bit conversion

use crate::constants::{SOFTBIT_0, SOFTBIT_1, SOFTBIT_ERASURE};

/// Read bit `i` of `bytes`, counting from the MSB of the first byte
#[inline]
pub fn get_bit(bytes: &[u8], i: usize) -> u8 {
    (bytes[i / 8] >> (7 - i % 8)) & 1
}

/// Write bit `i` of `bytes`, counting from the MSB of the first byte
#[inline]
pub fn set_bit(bytes: &mut [u8], i: usize, bit: u8) {
    let mask = 0x80u8 >> (i % 8);
    if bit & 1 == 1 {
        bytes[i / 8] |= mask;
    } else {
        bytes[i / 8] &= !mask;
    }
}

/// Hard decision on a soft bit
#[inline]
pub fn hard_bit(soft: u8) -> u8 {
    u8::from(soft > SOFTBIT_ERASURE)
}

/// Expand packed bytes into one soft byte per bit (0 or 255)
pub fn unpack_soft(bytes: &[u8], soft: &mut [u8]) {
    for (i, s) in soft.iter_mut().enumerate().take(bytes.len() * 8) {
        *s = if get_bit(bytes, i) == 1 { SOFTBIT_1 } else { SOFTBIT_0 };
    }
}

/// Threshold soft bits and pack them MSB-first into `bytes`
pub fn pack_soft(soft: &[u8], bytes: &mut [u8]) {
    bytes.fill(0);
    for (i, &s) in soft.iter().enumerate().take(bytes.len() * 8) {
        if hard_bit(s) == 1 {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
}

/// Sequential MSB-first bit reader; reads past the end return zeros
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Read `n` bits (at most 32) into the low bits of the result
    pub fn read(&mut self, n: usize) -> u32 {
        let total = self.bytes.len() * 8;
        let mut value = 0u32;
        for _ in 0..n {
            let bit = if self.pos < total { get_bit(self.bytes, self.pos) } else { 0 };
            value = (value << 1) | u32::from(bit);
            self.pos += 1;
        }
        value
    }
}

/// Sequential MSB-first bit writer; bits past the end are dropped
pub struct BitWriter<'a> {
    bytes: &'a mut [u8],
    pos: usize,
}

impl<'a> BitWriter<'a> {
    /// Clear `bytes` and start writing at its first bit
    pub fn new(bytes: &'a mut [u8]) -> Self {
        bytes.fill(0);
        Self { bytes, pos: 0 }
    }

    /// Write the low `n` bits of `value`, most significant first
    pub fn write(&mut self, value: u32, n: usize) {
        let total = self.bytes.len() * 8;
        for k in (0..n).rev() {
            if self.pos < total && (value >> k) & 1 == 1 {
                self.bytes[self.pos / 8] |= 0x80 >> (self.pos % 8);
            }
            self.pos += 1;
        }
    }
}

/// Split `bytes` into `bps`-bit symbols, zero-padding the final symbol
pub fn to_symbols(bytes: &[u8], bps: usize) -> Vec<u32> {
    let count = (bytes.len() * 8).div_ceil(bps);
    let mut reader = BitReader::new(bytes);
    (0..count).map(|_| reader.read(bps)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_bit() {
        let mut bytes = [0u8; 2];
        set_bit(&mut bytes, 0, 1);
        set_bit(&mut bytes, 9, 1);
        assert_eq!(bytes, [0x80, 0x40]);
        assert_eq!(get_bit(&bytes, 9), 1);
        set_bit(&mut bytes, 0, 0);
        assert_eq!(bytes[0], 0);
    }

    #[test]
    fn test_hard_bit_splits_at_erasure() {
        assert_eq!(hard_bit(SOFTBIT_0), 0);
        assert_eq!(hard_bit(SOFTBIT_ERASURE), 0);
        assert_eq!(hard_bit(SOFTBIT_ERASURE + 1), 1);
        assert_eq!(hard_bit(SOFTBIT_1), 1);
    }

    #[test]
    fn test_reader_writer() {
        let mut out = [0u8; 3];
        let mut writer = BitWriter::new(&mut out);
        writer.write(0b1011, 4);
        writer.write(0xabc, 12);
        writer.write(0xff, 8);
        writer.write(0x1, 1);
        assert_eq!(out, [0xba, 0xbc, 0xff]);

        let mut reader = BitReader::new(&out);
        assert_eq!(reader.read(4), 0b1011);
        assert_eq!(reader.read(12), 0xabc);
        assert_eq!(reader.read(8), 0xff);
        assert_eq!(reader.read(4), 0);
    }

    #[test]
    fn test_soft_round_trip() {
        let bytes = [0x5a, 0xc3];
        let mut soft = [0u8; 16];
        unpack_soft(&bytes, &mut soft);
        assert_eq!(soft[0], SOFTBIT_0);
        assert_eq!(soft[1], SOFTBIT_1);
        let mut packed = [0u8; 2];
        pack_soft(&soft, &mut packed);
        assert_eq!(packed, bytes);
    }

    #[test]
    fn test_to_symbols_pads() {
        assert_eq!(to_symbols(&[0xe4], 2), vec![3, 2, 1, 0]);
        assert_eq!(to_symbols(&[0xff, 0x80], 3), vec![7, 7, 7, 0, 0, 0]);
    }
}
