//! Extended Golay (24,12) code: corrects any three bit errors per codeword

use std::sync::OnceLock;

use super::BlockCode;
use crate::scheme::FecScheme;

/// Parity generator rows, one per data bit from the MSB
const PARITY_ROWS: [u32; 12] = [
    0b1101_1100_0101,
    0b1011_1000_1011,
    0b0111_0001_0111,
    0b1110_0010_1101,
    0b1100_0101_1011,
    0b1000_1011_0111,
    0b0001_0110_1111,
    0b0010_1101_1101,
    0b0101_1011_1001,
    0b1011_0111_0001,
    0b0110_1110_0011,
    0b1111_1111_1110,
];

/// Syndrome -> data error pattern for every error of weight three or less
static SYNDROME_TABLE: OnceLock<Vec<Option<u16>>> = OnceLock::new();

fn parity(data: u32) -> u32 {
    PARITY_ROWS
        .iter()
        .enumerate()
        .filter(|(i, _)| (data >> (11 - i)) & 1 == 1)
        .fold(0, |acc, (_, row)| acc ^ row)
}

fn syndrome(word: u32) -> u32 {
    parity(word >> 12) ^ (word & 0xfff)
}

fn syndrome_table() -> &'static [Option<u16>] {
    SYNDROME_TABLE.get_or_init(|| {
        let mut table = vec![None; 1 << 12];
        table[0] = Some(0);
        let mut insert = |error: u32| {
            let slot = &mut table[syndrome(error) as usize];
            if slot.is_none() {
                *slot = Some((error >> 12) as u16);
            }
        };
        for a in 0..24 {
            insert(1 << a);
            for b in a + 1..24 {
                insert((1 << a) | (1 << b));
                for c in b + 1..24 {
                    insert((1 << a) | (1 << b) | (1 << c));
                }
            }
        }
        table
    })
}

/// The (24,12) extended Golay code, systematic: 12 data bits then 12 parity bits
#[derive(Debug, Clone, Copy, Default)]
pub struct Golay2412;

impl BlockCode for Golay2412 {
    fn scheme(&self) -> FecScheme {
        FecScheme::Golay2412
    }

    fn data_bits(&self) -> usize {
        12
    }

    fn code_bits(&self) -> usize {
        24
    }

    fn encode_word(&self, data: u32) -> u32 {
        let data = data & 0xfff;
        (data << 12) | parity(data)
    }

    fn decode_word(&self, word: u32) -> u32 {
        let data = (word >> 12) & 0xfff;
        match syndrome_table()[syndrome(word & 0xff_ffff) as usize] {
            Some(error) => data ^ u32::from(error),
            None => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_distance_eight() {
        for data in 1..1u32 << 12 {
            assert!(Golay2412.encode_word(data).count_ones() >= 8, "{data:#x}");
        }
    }

    #[test]
    fn test_corrects_three_errors() {
        let code = Golay2412;
        let data = 0xa5c;
        let word = code.encode_word(data);
        for pattern in [0b1u32, 0b1001, 0x80_0001, 0x10_0410, 0xe0_0000, 0x00_0007] {
            assert_eq!(code.decode_word(word ^ pattern), data, "{pattern:#x}");
        }
    }

    #[test]
    fn test_table_is_fully_populated_for_low_weight() {
        let populated = syndrome_table().iter().filter(|s| s.is_some()).count();
        // 1 + 24 + 276 + 2024 distinct cosets
        assert_eq!(populated, 2325);
    }
}
