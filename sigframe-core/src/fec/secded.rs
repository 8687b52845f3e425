//! Single-error-correcting, double-error-detecting codes (Hsiao construction)
//!
//! Data is split into blocks of 2, 4 or 8 bytes; each block is followed by
//! one parity byte holding 6, 7 or 8 check bits.

use super::FecCodec;
use crate::scheme::FecScheme;

/// SEC-DED (22,16), (39,32) or (72,64)
#[derive(Debug, Clone)]
pub struct SecDed {
    block_bytes: usize,
    parity_mask: u32,
    columns: Vec<u32>,
}

impl SecDed {
    /// Code protecting `block_bytes` (2, 4 or 8) data bytes per parity byte
    pub fn new(block_bytes: usize) -> Self {
        let parity_bits = match block_bytes {
            2 => 6,
            4 => 7,
            _ => 8,
        };
        let block_bytes = block_bytes.clamp(2, 8);
        let mut candidates: Vec<u32> = (1..1u32 << parity_bits)
            .filter(|v| v.count_ones() >= 3 && v.count_ones() % 2 == 1)
            .collect();
        candidates.sort_by_key(|v| (v.count_ones(), *v));
        candidates.truncate(8 * block_bytes);
        Self {
            block_bytes,
            parity_mask: (1 << parity_bits) - 1,
            columns: candidates,
        }
    }

    fn data_word(bytes: &[u8], block_bytes: usize) -> u64 {
        let word = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        word << (8 * (block_bytes - bytes.len()))
    }

    fn parity(&self, word: u64) -> u32 {
        let bits = self.columns.len();
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| (word >> (bits - 1 - i)) & 1 == 1)
            .fold(0, |acc, (_, col)| acc ^ col)
    }

    /// Correct `data` in place given its received parity byte
    fn correct(&self, data: &mut [u8], parity: u8) {
        let word = Self::data_word(data, self.block_bytes);
        let syndrome = (self.parity(word) ^ u32::from(parity)) & self.parity_mask;
        if syndrome == 0 || syndrome.count_ones() % 2 == 0 {
            return;
        }
        if let Some(i) = self.columns.iter().position(|&c| c == syndrome) {
            if i / 8 < data.len() {
                data[i / 8] ^= 0x80 >> (i % 8);
            }
        }
    }
}

impl FecCodec for SecDed {
    fn scheme(&self) -> FecScheme {
        match self.block_bytes {
            2 => FecScheme::SecDed2216,
            4 => FecScheme::SecDed3932,
            _ => FecScheme::SecDed7264,
        }
    }

    fn encode(&self, msg: &[u8], out: &mut [u8]) {
        let mut pos = 0;
        for block in msg.chunks(self.block_bytes) {
            out[pos..pos + block.len()].copy_from_slice(block);
            pos += block.len();
            out[pos] = self.parity(Self::data_word(block, self.block_bytes)) as u8;
            pos += 1;
        }
    }

    fn decode(&self, encoded: &[u8], out: &mut [u8]) {
        for (block, coded) in out
            .chunks_mut(self.block_bytes)
            .zip(encoded.chunks(self.block_bytes + 1))
        {
            let len = block.len();
            block.copy_from_slice(&coded[..len]);
            self.correct(block, coded[len]);
        }
    }
}
