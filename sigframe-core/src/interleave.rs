//! Burst-error mitigation: bit-level interleaving of a fixed-size buffer.
//!
//! The interleaver spreads neighbouring bits of an `n`-byte buffer across
//! the whole buffer with a stride permutation `out[j] = in[(j * s) mod 8n]`,
//! where the stride `s` is close to `sqrt(8n)` and coprime with `8n`. A burst
//! hitting contiguous channel bits therefore lands in many different inner
//! codewords once the receiver deinterleaves.
//!
//! The hard variant permutes packed bits; the soft variant permutes one
//! reliability byte per bit. Both share the same permutation.

/// Bit interleaver for buffers of a fixed byte length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interleaver {
    len: usize,
    stride: usize,
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Interleaver {
    /// Interleaver for `len`-byte buffers
    pub fn new(len: usize) -> Self {
        let bits = 8 * len;
        let stride = if bits < 16 {
            1
        } else {
            let mut s = ((bits as f64).sqrt() as usize) | 1;
            while gcd(s, bits) != 1 {
                s += 2;
            }
            s
        };
        Self { len, stride }
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length interleaver
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Permutation stride in bits
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Visit (output index, input index) pairs of the forward permutation
    fn for_each_pair(&self, mut f: impl FnMut(usize, usize)) {
        let bits = 8 * self.len;
        let mut src = 0;
        for dst in 0..bits {
            f(dst, src);
            src += self.stride;
            if src >= bits {
                src -= bits;
            }
        }
    }

    fn permute_bits(&self, input: &[u8], output: &mut [u8], forward: bool) {
        output.fill(0);
        self.for_each_pair(|dst, src| {
            let (from, to) = if forward { (src, dst) } else { (dst, src) };
            if (input[from / 8] >> (7 - from % 8)) & 1 == 1 {
                output[to / 8] |= 0x80 >> (to % 8);
            }
        });
    }

    fn permute_values<T: Copy>(&self, input: &[T], output: &mut [T], forward: bool) {
        self.for_each_pair(|dst, src| {
            if forward {
                output[dst] = input[src];
            } else {
                output[src] = input[dst];
            }
        });
    }

    /// Interleave `input` into `output` (both `len` bytes)
    pub fn encode(&self, input: &[u8], output: &mut [u8]) {
        self.permute_bits(input, output, true);
    }

    /// Undo [`Interleaver::encode`]
    pub fn decode(&self, input: &[u8], output: &mut [u8]) {
        self.permute_bits(input, output, false);
    }

    /// Interleave one soft byte per bit (both `8 * len` bytes)
    pub fn encode_soft(&self, input: &[u8], output: &mut [u8]) {
        self.permute_values(input, output, true);
    }

    /// Undo [`Interleaver::encode_soft`]
    pub fn decode_soft(&self, input: &[u8], output: &mut [u8]) {
        self.permute_values(input, output, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::unpack_soft;
    use rand::{RngCore, SeedableRng};

    #[test]
    fn round_trip_interleave_deinterleave() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(123);
        for len in [1usize, 2, 7, 64, 143, 1000] {
            let mut data = vec![0u8; len];
            rng.fill_bytes(&mut data);

            let interleaver = Interleaver::new(len);
            let mut mixed = vec![0u8; len];
            interleaver.encode(&data, &mut mixed);
            let mut reconstructed = vec![0u8; len];
            interleaver.decode(&mixed, &mut reconstructed);
            assert_eq!(reconstructed, data, "len {len}");
        }
    }

    #[test]
    fn test_stride_is_coprime() {
        for len in 2..300 {
            let interleaver = Interleaver::new(len);
            assert_eq!(gcd(interleaver.stride(), 8 * len), 1, "len {len}");
            assert!(interleaver.stride() > 1);
        }
    }

    #[test]
    fn test_burst_is_spread() {
        let len = 64;
        let interleaver = Interleaver::new(len);
        // a burst of 8 adjacent channel bits
        let mut burst = vec![0u8; len];
        burst[20] = 0xff;
        let mut spread = vec![0u8; len];
        interleaver.decode(&burst, &mut spread);
        let touched = spread.iter().filter(|b| **b != 0).count();
        assert_eq!(touched, 8);
    }

    #[test]
    fn test_soft_matches_hard() {
        let data: Vec<u8> = (0..33u8).map(|i| i.wrapping_mul(29)).collect();
        let interleaver = Interleaver::new(data.len());
        let mut mixed = vec![0u8; data.len()];
        interleaver.encode(&data, &mut mixed);

        let mut soft = vec![0u8; data.len() * 8];
        unpack_soft(&data, &mut soft);
        let mut soft_mixed = vec![0u8; soft.len()];
        interleaver.encode_soft(&soft, &mut soft_mixed);
        let mut expected = vec![0u8; soft.len()];
        unpack_soft(&mixed, &mut expected);
        assert_eq!(soft_mixed, expected);

        let mut restored = vec![0u8; soft.len()];
        interleaver.decode_soft(&soft_mixed, &mut restored);
        assert_eq!(restored, soft);
    }
}
