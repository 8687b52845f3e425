//! Library entry for sigframe-cli used by integration tests and embedding.

pub mod commands;
pub mod iq;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

// Re-export commands for convenience
pub use commands::*;

/// Frame family selectable on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FrameFamily {
    /// Fixed 8-byte header and 64-byte payload
    Frame64,
    /// Single-carrier frame with a self-describing header
    Flexframe,
    /// Continuous-phase binary frame
    Gmsk,
    /// Multicarrier frame
    Ofdm,
}

/// Read and deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON config: {}", path.display()))
}
