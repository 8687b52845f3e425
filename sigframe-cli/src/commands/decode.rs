use anyhow::{bail, Context, Result};
use colored::*;
use sigframe_core::{compute_decoded_len, Packetizer};
use std::fs;
use tracing::{info, warn};

use super::SchemeArgs;

/// Decode a packet file; returns whether the integrity check passed
///
/// With `soft` the input holds one reliability byte per encoded bit. The
/// decoded length defaults to the longest message that fits the input.
pub fn execute(input: &str, output: &str, schemes: &SchemeArgs, length: Option<usize>, soft: bool) -> Result<bool> {
    info!("Decoding {} to {}", input, output);

    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?;
    let encoded_len = if soft {
        if data.len() % 8 != 0 {
            bail!("Soft input length {} is not a whole number of bytes", data.len());
        }
        data.len() / 8
    } else {
        data.len()
    };

    let length = match (length, &schemes.config) {
        (Some(len), _) => Some(len),
        (None, Some(_)) => None,
        (None, None) => {
            let len = compute_decoded_len(encoded_len, schemes.crc, schemes.fec0, schemes.fec1)?;
            if len == 0 {
                bail!("No message fits in {} encoded bytes", encoded_len);
            }
            Some(len)
        }
    };
    let config = schemes.resolve(length)?;
    let expected = config.encoded_len()?;
    if expected != encoded_len {
        bail!(
            "{} bytes of input do not match the {} encoded bytes of a {}-byte message",
            encoded_len,
            expected,
            config.decoded_len
        );
    }

    let mut packetizer = Packetizer::new(config).context("Failed to build packetizer")?;
    let decoded = if soft { packetizer.decode_soft(&data) } else { packetizer.decode(&data) }
        .context("Input does not match the packetizer configuration")?;

    fs::write(output, &decoded.message).with_context(|| format!("Failed to write output file: {}", output))?;

    if decoded.valid {
        println!("{} {} bytes decoded, integrity check passed", "✓".green(), decoded.message.len());
    } else {
        warn!("Integrity check failed for {}", input);
        println!("{} {} bytes decoded, integrity check failed", "✗".red(), decoded.message.len());
    }
    Ok(decoded.valid)
}
