//! Zero-terminated convolutional codes with soft-decision Viterbi decoding

use super::FecCodec;
use crate::bits::{get_bit, unpack_soft, BitWriter};
use crate::error::FrameError;
use crate::scheme::FecScheme;
use crate::Result;

/// Rate 1/r convolutional code of constraint length K
#[derive(Debug, Clone)]
pub struct ConvolutionalCodec {
    scheme: FecScheme,
    constraint: usize,
    polys: &'static [u32],
}

const V27_POLYS: [u32; 2] = [0x6d, 0x4f];
const V29_POLYS: [u32; 2] = [0x1af, 0x11d];
const V39_POLYS: [u32; 3] = [0x1ed, 0x19b, 0x127];

impl ConvolutionalCodec {
    /// Codec for one of the unpunctured Viterbi schemes
    pub fn new(scheme: FecScheme) -> Result<Self> {
        let (constraint, polys): (usize, &'static [u32]) = match scheme {
            FecScheme::ConvV27 => (7, &V27_POLYS),
            FecScheme::ConvV29 => (9, &V29_POLYS),
            FecScheme::ConvV39 => (9, &V39_POLYS),
            other => return Err(FrameError::UnsupportedFec(other)),
        };
        Ok(Self { scheme, constraint, polys })
    }

    fn states(&self) -> usize {
        1 << (self.constraint - 1)
    }

    /// Output bits for shift register contents `reg` (newest bit in the LSB)
    fn outputs(&self, reg: u32) -> impl Iterator<Item = u8> + '_ {
        self.polys.iter().map(move |p| ((reg & p).count_ones() & 1) as u8)
    }

    fn steps(&self, n: usize) -> usize {
        8 * n + self.constraint - 1
    }

    fn viterbi(&self, soft: &[u8], out: &mut [u8]) {
        let states = self.states();
        let state_mask = (states - 1) as u32;
        let rate = self.polys.len();
        let steps = self.steps(out.len());

        // expected outputs per (state, input) pair
        let branch: Vec<Vec<u8>> = (0..2 * states as u32)
            .map(|reg| self.outputs(reg).collect())
            .collect();

        let mut metrics = vec![u32::MAX; states];
        metrics[0] = 0;
        let mut next = vec![u32::MAX; states];
        let mut decisions = vec![0u8; steps * states];

        for t in 0..steps {
            let symbols = &soft[t * rate..(t + 1) * rate];
            next.fill(u32::MAX);
            for (ns, slot) in next.iter_mut().enumerate() {
                let ns = ns as u32;
                let input = ns & 1;
                for high in 0..2u32 {
                    let ps = (ns >> 1) | (high << (self.constraint - 2));
                    let pm = metrics[ps as usize];
                    if pm == u32::MAX {
                        continue;
                    }
                    let reg = (ps << 1) | input;
                    let cost: u32 = branch[reg as usize]
                        .iter()
                        .zip(symbols)
                        .map(|(&e, &s)| if e == 1 { 255 - u32::from(s) } else { u32::from(s) })
                        .sum();
                    if pm + cost < *slot {
                        *slot = pm + cost;
                        decisions[t * states + ns as usize] = high as u8;
                    }
                }
            }
            core::mem::swap(&mut metrics, &mut next);
        }

        // zero tail forces the final state to 0
        let mut state = 0u32;
        let mut bits = vec![0u8; steps];
        for t in (0..steps).rev() {
            bits[t] = (state & 1) as u8;
            let high = u32::from(decisions[t * states + state as usize]);
            state = ((state >> 1) | (high << (self.constraint - 2))) & state_mask;
        }

        let capacity = 8 * out.len();
        let mut writer = BitWriter::new(out);
        for &bit in bits.iter().take(capacity) {
            writer.write(u32::from(bit), 1);
        }
    }
}

impl FecCodec for ConvolutionalCodec {
    fn scheme(&self) -> FecScheme {
        self.scheme
    }

    fn encode(&self, msg: &[u8], out: &mut [u8]) {
        let state_mask = (self.states() - 1) as u32;
        let mut state = 0u32;
        let mut writer = BitWriter::new(out);
        for t in 0..self.steps(msg.len()) {
            let input = if t < 8 * msg.len() { get_bit(msg, t) } else { 0 };
            let reg = (state << 1) | u32::from(input);
            for bit in self.outputs(reg) {
                writer.write(u32::from(bit), 1);
            }
            state = reg & state_mask;
        }
    }

    fn decode(&self, encoded: &[u8], out: &mut [u8]) {
        let mut soft = vec![0u8; encoded.len() * 8];
        unpack_soft(encoded, &mut soft);
        self.viterbi(&soft, out);
    }

    fn decode_soft(&self, soft: &[u8], out: &mut [u8]) {
        self.viterbi(soft, out);
    }
}
