//! Forward error correction codecs
//!
//! Every supported [`FecScheme`] maps to a [`FecCodec`] implementation. The
//! length law lives on the scheme itself so buffer sizes can be computed
//! without building a codec.

use core::fmt;

use crate::bits::pack_soft;
use crate::error::FrameError;
use crate::scheme::FecScheme;
use crate::Result;

mod conv;
mod golay;
mod hamming;
mod repeat;
mod secded;

pub use conv::ConvolutionalCodec;
pub use golay::Golay2412;
pub use hamming::{BlockCodec, BlockCode, Hamming};
pub use repeat::Repetition;
pub use secded::SecDed;

/// Encoder/decoder for one FEC scheme
///
/// Buffer contract for a message of `n` bytes with `k = scheme().encoded_len(n)`:
/// `encode` reads `n` bytes and writes `k`; `decode` reads `k` and writes `n`;
/// `decode_soft` reads `8 * k` reliability bytes and writes `n`.
pub trait FecCodec: Send + fmt::Debug {
    /// Scheme implemented by this codec
    fn scheme(&self) -> FecScheme;

    /// Encode `msg` into `out`
    fn encode(&self, msg: &[u8], out: &mut [u8]);

    /// Hard-decision decode of `encoded` into `out`
    fn decode(&self, encoded: &[u8], out: &mut [u8]);

    /// Soft-decision decode; one reliability byte per encoded bit
    ///
    /// The default thresholds the reliabilities and decodes hard.
    fn decode_soft(&self, soft: &[u8], out: &mut [u8]) {
        let mut hard = vec![0u8; soft.len() / 8];
        pack_soft(soft, &mut hard);
        self.decode(&hard, out);
    }
}

/// Pass-through codec for [`FecScheme::None`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Uncoded;

impl FecCodec for Uncoded {
    fn scheme(&self) -> FecScheme {
        FecScheme::None
    }

    fn encode(&self, msg: &[u8], out: &mut [u8]) {
        out.copy_from_slice(msg);
    }

    fn decode(&self, encoded: &[u8], out: &mut [u8]) {
        out.copy_from_slice(encoded);
    }
}

/// Build the codec for `scheme`
pub fn create_codec(scheme: FecScheme) -> Result<Box<dyn FecCodec>> {
    let codec: Box<dyn FecCodec> = match scheme {
        FecScheme::None => Box::new(Uncoded),
        FecScheme::Rep3 => Box::new(Repetition::new(3)),
        FecScheme::Rep5 => Box::new(Repetition::new(5)),
        FecScheme::Hamming74 => Box::new(BlockCodec::new(Hamming::h74())),
        FecScheme::Hamming84 => Box::new(BlockCodec::new(Hamming::h84())),
        FecScheme::Hamming128 => Box::new(BlockCodec::new(Hamming::h128())),
        FecScheme::Golay2412 => Box::new(BlockCodec::new(Golay2412)),
        FecScheme::SecDed2216 => Box::new(SecDed::new(2)),
        FecScheme::SecDed3932 => Box::new(SecDed::new(4)),
        FecScheme::SecDed7264 => Box::new(SecDed::new(8)),
        FecScheme::ConvV27 | FecScheme::ConvV29 | FecScheme::ConvV39 => {
            Box::new(ConvolutionalCodec::new(scheme)?)
        }
        other => return Err(FrameError::UnsupportedFec(other)),
    };
    Ok(codec)
}

/// Encoded length of a block code packing `data_bits` into `code_bits`
fn block_len(n: usize, data_bits: usize, code_bits: usize) -> Option<usize> {
    let blocks = n.checked_mul(8)?.div_ceil(data_bits);
    Some(blocks.checked_mul(code_bits)?.div_ceil(8))
}

/// Encoded length of a zero-terminated convolutional code of rate 1/`r`
fn conv_len(n: usize, r: usize, k: usize) -> Option<usize> {
    let steps = n.checked_mul(8)?.checked_add(k - 1)?;
    Some(steps.checked_mul(r)?.div_ceil(8))
}

/// Encoded length of a punctured convolutional code with period `p`
/// emitting `p + 1` bits for every `p` input bits
fn punctured_len(n: usize, p: usize, k: usize) -> Option<usize> {
    let steps = n.checked_mul(8)?.checked_add(k - 1)?;
    Some(steps.checked_mul(p + 1)?.div_ceil(p).div_ceil(8))
}

impl FecScheme {
    /// Encoded length in bytes of an `n`-byte message
    ///
    /// Non-decreasing in `n` for every known scheme (Golay packs 1.5 bytes
    /// per block, so two message lengths can share an encoded length).
    /// Fails for [`FecScheme::Unknown`] and when the length does not fit in
    /// `usize`.
    pub fn encoded_len(self, n: usize) -> Result<usize> {
        let len = match self {
            FecScheme::Unknown => return Err(FrameError::UnsupportedFec(self)),
            FecScheme::None => Some(n),
            FecScheme::Rep3 => n.checked_mul(3),
            FecScheme::Rep5 => n.checked_mul(5),
            FecScheme::Hamming74 => block_len(n, 4, 7),
            FecScheme::Hamming84 => block_len(n, 4, 8),
            FecScheme::Hamming128 => block_len(n, 8, 12),
            FecScheme::Golay2412 => block_len(n, 12, 24),
            FecScheme::SecDed2216 => n.checked_add(n.div_ceil(2)),
            FecScheme::SecDed3932 => n.checked_add(n.div_ceil(4)),
            FecScheme::SecDed7264 => n.checked_add(n.div_ceil(8)),
            FecScheme::ConvV27 => conv_len(n, 2, 7),
            FecScheme::ConvV29 => conv_len(n, 2, 9),
            FecScheme::ConvV39 => conv_len(n, 3, 9),
            FecScheme::ConvV615 => conv_len(n, 6, 15),
            FecScheme::ConvV27P23 => punctured_len(n, 2, 7),
            FecScheme::ConvV27P34 => punctured_len(n, 3, 7),
            FecScheme::ConvV27P45 => punctured_len(n, 4, 7),
            FecScheme::ConvV27P56 => punctured_len(n, 5, 7),
            FecScheme::ConvV27P67 => punctured_len(n, 6, 7),
            FecScheme::ConvV27P78 => punctured_len(n, 7, 7),
            FecScheme::ConvV29P23 => punctured_len(n, 2, 9),
            FecScheme::ConvV29P34 => punctured_len(n, 3, 9),
            FecScheme::ConvV29P45 => punctured_len(n, 4, 9),
            FecScheme::ConvV29P56 => punctured_len(n, 5, 9),
            FecScheme::ConvV29P67 => punctured_len(n, 6, 9),
            FecScheme::ConvV29P78 => punctured_len(n, 7, 9),
            FecScheme::RsM8 => n.div_ceil(223).checked_mul(255),
        };
        len.ok_or_else(|| FrameError::InvalidParameter(format!("{n}-byte message overflows the {self} length")))
    }
}
