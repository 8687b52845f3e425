//! Subcommand implementations

pub mod decode;
pub mod encode;
pub mod receive;
pub mod schemes;
pub mod transmit;

use anyhow::{Context, Result};
use sigframe_core::{CrcScheme, FecScheme, PacketizerConfig};

use crate::load_json;

/// Packetizer schemes given by name or through a JSON configuration file
#[derive(Debug, Clone, clap::Args)]
pub struct SchemeArgs {
    /// JSON packetizer configuration (overrides the scheme flags)
    #[arg(long)]
    pub config: Option<String>,

    /// Error-detection scheme
    #[arg(long, default_value = "crc32")]
    pub crc: CrcScheme,

    /// Inner FEC scheme
    #[arg(long, default_value = "none")]
    pub fec0: FecScheme,

    /// Outer FEC scheme
    #[arg(long, default_value = "none")]
    pub fec1: FecScheme,
}

impl SchemeArgs {
    /// Configuration for messages of `decoded_len` bytes, or the length in
    /// the configuration file when `decoded_len` is `None`
    pub fn resolve(&self, decoded_len: Option<usize>) -> Result<PacketizerConfig> {
        let mut config = match &self.config {
            Some(path) => load_json::<PacketizerConfig>(path)?,
            None => PacketizerConfig::new(0, self.crc, self.fec0, self.fec1),
        };
        if let Some(len) = decoded_len {
            config.decoded_len = len;
        }
        config.encoded_len().context("Unsupported packetizer schemes")?;
        Ok(config)
    }
}
