//! Repetition codes: the message is transmitted `copies` times back to back

use super::FecCodec;
use crate::scheme::FecScheme;

/// Repetition code with an odd number of copies
#[derive(Debug, Clone, Copy)]
pub struct Repetition {
    copies: usize,
}

impl Repetition {
    /// Repetition code with `copies` (3 or 5) copies
    pub fn new(copies: usize) -> Self {
        Self { copies }
    }
}

impl FecCodec for Repetition {
    fn scheme(&self) -> FecScheme {
        if self.copies == 5 {
            FecScheme::Rep5
        } else {
            FecScheme::Rep3
        }
    }

    fn encode(&self, msg: &[u8], out: &mut [u8]) {
        for chunk in out.chunks_mut(msg.len().max(1)) {
            chunk.copy_from_slice(&msg[..chunk.len()]);
        }
    }

    fn decode(&self, encoded: &[u8], out: &mut [u8]) {
        let n = out.len();
        let majority = self.copies / 2;
        for (i, byte) in out.iter_mut().enumerate() {
            let mut value = 0u8;
            for bit in 0..8 {
                let mask = 0x80u8 >> bit;
                let ones = (0..self.copies)
                    .filter(|c| encoded[c * n + i] & mask != 0)
                    .count();
                if ones > majority {
                    value |= mask;
                }
            }
            *byte = value;
        }
    }

    fn decode_soft(&self, soft: &[u8], out: &mut [u8]) {
        let bits = out.len() * 8;
        out.fill(0);
        for i in 0..bits {
            let sum: usize = (0..self.copies).map(|c| soft[c * bits + i] as usize).sum();
            // mean reliability above the erasure midpoint decides a 1
            if 2 * sum > 255 * self.copies {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }
    }
}
