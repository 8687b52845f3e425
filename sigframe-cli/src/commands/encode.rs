use anyhow::{bail, Context, Result};
use sigframe_core::Packetizer;
use std::fs;
use tracing::info;

use super::SchemeArgs;

pub fn execute(input: &str, output: &str, schemes: &SchemeArgs) -> Result<()> {
    info!("Encoding {} to {}", input, output);

    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?;
    if data.is_empty() {
        bail!("Input file is empty: {}", input);
    }

    let config = schemes.resolve(Some(data.len()))?;
    let mut packetizer = Packetizer::new(config).context("Failed to build packetizer")?;
    let encoded = packetizer.encode(&data).context("Failed to encode input")?;

    fs::write(output, &encoded).with_context(|| format!("Failed to write output file: {}", output))?;

    info!("Encoded {} bytes into {} bytes", data.len(), encoded.len());
    println!("{}", packetizer);
    Ok(())
}
