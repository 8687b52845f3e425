//! Block codes packed MSB-first into fixed-size words, and the Hamming family

use core::fmt;

use super::FecCodec;
use crate::bits::{hard_bit, BitReader, BitWriter};
use crate::scheme::FecScheme;

/// A binary block code mapping `data_bits()` to `code_bits()`
pub trait BlockCode: Send + Sync + fmt::Debug {
    /// Scheme identifier
    fn scheme(&self) -> FecScheme;
    /// Message bits per codeword
    fn data_bits(&self) -> usize;
    /// Bits per codeword
    fn code_bits(&self) -> usize;
    /// Encode one message word
    fn encode_word(&self, data: u32) -> u32;
    /// Hard-decision decode of one codeword
    fn decode_word(&self, word: u32) -> u32;
    /// Soft-decision decode of one codeword from `code_bits()` reliabilities
    fn decode_word_soft(&self, soft: &[u8]) -> u32 {
        let word = soft.iter().fold(0u32, |acc, &s| (acc << 1) | u32::from(hard_bit(s)));
        self.decode_word(word)
    }
}

/// Adapts a [`BlockCode`] to byte buffers
///
/// The message bit stream is cut into `data_bits` words (the final word
/// zero-padded) and the codewords are written back to back.
#[derive(Debug)]
pub struct BlockCodec<C> {
    code: C,
}

impl<C: BlockCode> BlockCodec<C> {
    /// Wrap `code`
    pub fn new(code: C) -> Self {
        Self { code }
    }

    fn blocks(&self, n: usize) -> usize {
        (8 * n).div_ceil(self.code.data_bits())
    }
}

impl<C: BlockCode> FecCodec for BlockCodec<C> {
    fn scheme(&self) -> FecScheme {
        self.code.scheme()
    }

    fn encode(&self, msg: &[u8], out: &mut [u8]) {
        let (k, m) = (self.code.data_bits(), self.code.code_bits());
        let mut reader = BitReader::new(msg);
        let mut writer = BitWriter::new(out);
        for _ in 0..self.blocks(msg.len()) {
            writer.write(self.code.encode_word(reader.read(k)), m);
        }
    }

    fn decode(&self, encoded: &[u8], out: &mut [u8]) {
        let (k, m) = (self.code.data_bits(), self.code.code_bits());
        let blocks = self.blocks(out.len());
        let mut reader = BitReader::new(encoded);
        let mut writer = BitWriter::new(out);
        for _ in 0..blocks {
            writer.write(self.code.decode_word(reader.read(m)), k);
        }
    }

    fn decode_soft(&self, soft: &[u8], out: &mut [u8]) {
        let (k, m) = (self.code.data_bits(), self.code.code_bits());
        let blocks = self.blocks(out.len());
        let mut writer = BitWriter::new(out);
        for block in soft.chunks(m).take(blocks) {
            writer.write(self.code.decode_word_soft(block), k);
        }
    }
}

/// Systematic Hamming code, optionally extended with an overall parity bit
///
/// Codeword layout (MSB first): data bits, parity bits, then the overall
/// parity bit for the extended variant. Each data bit contributes its
/// column of the parity-check matrix to the parity bits.
#[derive(Debug, Clone)]
pub struct Hamming {
    scheme: FecScheme,
    data_bits: usize,
    parity_bits: usize,
    extended: bool,
    columns: &'static [u32],
    codebook: Vec<u32>,
}

/// Parity-check columns, indexed from the most significant data bit
const H74_COLUMNS: [u32; 4] = [0b011, 0b101, 0b110, 0b111];
const H128_COLUMNS: [u32; 8] = [
    0b0011, 0b0101, 0b0110, 0b0111, 0b1001, 0b1010, 0b1011, 0b1100,
];

impl Hamming {
    fn build(scheme: FecScheme, parity_bits: usize, extended: bool, columns: &'static [u32]) -> Self {
        let mut code = Self {
            scheme,
            data_bits: columns.len(),
            parity_bits,
            extended,
            columns,
            codebook: Vec::new(),
        };
        code.codebook = (0..1u32 << code.data_bits).map(|d| code.encode_word(d)).collect();
        code
    }

    /// Hamming(7,4)
    pub fn h74() -> Self {
        Self::build(FecScheme::Hamming74, 3, false, &H74_COLUMNS)
    }

    /// Extended Hamming(8,4): corrects one error, detects two
    pub fn h84() -> Self {
        Self::build(FecScheme::Hamming84, 3, true, &H74_COLUMNS)
    }

    /// Hamming(12,8)
    pub fn h128() -> Self {
        Self::build(FecScheme::Hamming128, 4, false, &H128_COLUMNS)
    }

    fn parity(&self, data: u32) -> u32 {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| (data >> (self.data_bits - 1 - i)) & 1 == 1)
            .fold(0, |acc, (_, col)| acc ^ col)
    }
}

impl BlockCode for Hamming {
    fn scheme(&self) -> FecScheme {
        self.scheme
    }

    fn data_bits(&self) -> usize {
        self.data_bits
    }

    fn code_bits(&self) -> usize {
        self.data_bits + self.parity_bits + usize::from(self.extended)
    }

    fn encode_word(&self, data: u32) -> u32 {
        let word = (data << self.parity_bits) | self.parity(data);
        if self.extended {
            (word << 1) | (word.count_ones() & 1)
        } else {
            word
        }
    }

    fn decode_word(&self, word: u32) -> u32 {
        let (body, overall_ok) = if self.extended {
            (word >> 1, word.count_ones() & 1 == 0)
        } else {
            (word, false)
        };
        let parity_mask = (1u32 << self.parity_bits) - 1;
        let data = body >> self.parity_bits;
        let syndrome = self.parity(data) ^ (body & parity_mask);
        if syndrome == 0 || (self.extended && overall_ok) {
            // clean, or an uncorrectable double error
            return data;
        }
        match self.columns.iter().position(|&c| c == syndrome) {
            Some(i) => data ^ (1 << (self.data_bits - 1 - i)),
            None => data,
        }
    }

    fn decode_word_soft(&self, soft: &[u8]) -> u32 {
        // maximum-likelihood: pick the codeword best correlated with the reliabilities
        let n = self.code_bits();
        let mut best = (0u32, 0u32);
        for (data, &codeword) in self.codebook.iter().enumerate() {
            let score: u32 = soft
                .iter()
                .enumerate()
                .map(|(i, &s)| {
                    if (codeword >> (n - 1 - i)) & 1 == 1 {
                        u32::from(s)
                    } else {
                        255 - u32::from(s)
                    }
                })
                .sum();
            if score > best.1 {
                best = (data as u32, score);
            }
        }
        best.0
    }
}
