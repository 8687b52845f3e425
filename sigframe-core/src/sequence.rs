//! Maximal-length sequences and data whitening
//!
//! Preambles, OFDM training symbols and pilots are all derived from
//! m-sequences. The same generator whitens encoded bits before they are
//! modulated so long runs of identical bits never reach the channel.

use crate::constants::SOFTBIT_1;
use crate::error::FrameError;
use crate::Result;

/// Primitive generator polynomials indexed by order, including the x^m term
const GENERATORS: [u32; 16] = [
    0, 0, 0x0007, 0x000b, 0x0013, 0x0025, 0x0043, 0x0089, 0x011d, 0x0211, 0x0409, 0x0805,
    0x1053, 0x201b, 0x402b, 0x8003,
];

/// Seed used for the whitening sequence
const WHITENING_SEED: u32 = 0x5d;

/// Linear-feedback shift register producing a maximal-length sequence
#[derive(Debug, Clone)]
pub struct MSequence {
    order: u32,
    taps: u32,
    mask: u32,
    seed: u32,
    state: u32,
}

impl MSequence {
    /// Generator of order `order` (2..=15) with the default polynomial and a seed of 1
    pub fn new(order: u32) -> Result<Self> {
        Self::with_seed(order, 1)
    }

    /// Generator with an explicit non-zero seed
    pub fn with_seed(order: u32, seed: u32) -> Result<Self> {
        let generator = *GENERATORS
            .get(order as usize)
            .filter(|g| **g != 0)
            .ok_or_else(|| FrameError::InvalidParameter(format!("m-sequence order {order}")))?;
        let mask = (1u32 << order) - 1;
        if seed & mask == 0 {
            return Err(FrameError::InvalidParameter("m-sequence seed must be non-zero".into()));
        }
        Ok(Self::build(order, generator, seed))
    }

    fn build(order: u32, generator: u32, seed: u32) -> Self {
        let mask = (1u32 << order) - 1;
        // recurrence coefficient c_i (tap bit i-1) is generator coefficient x^(m-i)
        let taps = (1..=order)
            .filter(|i| (generator >> (order - i)) & 1 == 1)
            .fold(0u32, |acc, i| acc | 1 << (i - 1));
        Self { order, taps, mask, seed: seed & mask, state: seed & mask }
    }

    /// Sequence period, `2^order - 1`
    pub fn len(&self) -> usize {
        (1usize << self.order) - 1
    }

    /// Always false; an m-sequence has at least three elements
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Produce the next bit
    pub fn next_bit(&mut self) -> u8 {
        let bit = ((self.state & self.taps).count_ones() & 1) as u8;
        self.state = ((self.state << 1) | u32::from(bit)) & self.mask;
        bit
    }

    /// Produce the next byte, MSB first
    pub fn next_byte(&mut self) -> u8 {
        (0..8).fold(0u8, |acc, _| (acc << 1) | self.next_bit())
    }

    /// Restart from the seed
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    /// One full period as antipodal symbols (+1 for bit 0, -1 for bit 1)
    pub fn antipodal(&mut self) -> Vec<f32> {
        self.reset();
        (0..self.len())
            .map(|_| if self.next_bit() == 0 { 1.0 } else { -1.0 })
            .collect()
    }
}

fn whitening_sequence() -> MSequence {
    MSequence::build(8, GENERATORS[8], WHITENING_SEED)
}

/// XOR `bytes` with the whitening sequence; applying it twice restores the input
pub fn whiten(bytes: &mut [u8]) {
    let mut seq = whitening_sequence();
    for byte in bytes.iter_mut() {
        *byte ^= seq.next_byte();
    }
}

/// Undo [`whiten`] on one soft byte per bit by mirroring flipped reliabilities
pub fn unwhiten_soft(soft: &mut [u8]) {
    let mut seq = whitening_sequence();
    for s in soft.iter_mut() {
        if seq.next_bit() == 1 {
            *s = SOFTBIT_1 - *s;
        }
    }
}
