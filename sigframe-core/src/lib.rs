//! # Sigframe Core
//!
//! Packetizer and streaming frame synchronizers for baseband radio links.
//!
//! ## Modules
//!
//! - `scheme`: CRC and FEC scheme registry with stable names
//! - `checksum`, `fec`, `interleave`: the coding layers
//! - `packetizer`: CRC + inner FEC + interleaver + outer FEC pipeline
//! - `modem`: Gray-mapped constellations with soft demodulation
//! - `sync`: the generic frame synchronizer state machine
//! - `frame64`, `flexframe`, `gmsk`, `ofdm`: concrete frame families,
//!   each with a generator and a synchronizer
//!
//! ## Example
//!
//! ```
//! use sigframe_core::{FecScheme, CrcScheme, Packetizer, PacketizerConfig};
//!
//! let config = PacketizerConfig::new(16, CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None);
//! let mut packetizer = Packetizer::new(config).unwrap();
//! let encoded = packetizer.encode(b"sixteen byte msg").unwrap();
//! let decoded = packetizer.decode(&encoded).unwrap();
//! assert!(decoded.valid);
//! assert_eq!(&decoded.message[..], b"sixteen byte msg");
//! ```

#![warn(missing_docs)]

pub mod bits;
pub mod checksum;
pub mod constants;
pub mod dsp;
pub mod error;
pub mod fec;
pub mod flexframe;
pub mod frame64;
pub mod generator;
pub mod gmsk;
pub mod header;
pub mod interleave;
pub mod linear;
pub mod modem;
pub mod ofdm;
pub mod packetizer;
pub mod scheme;
pub mod sequence;
pub mod sync;

// Re-export commonly used types
pub use error::FrameError;
pub use flexframe::{FlexFrameGenerator, FlexFrameSync};
pub use frame64::{Frame64Generator, Frame64Sync};
pub use generator::FrameGenerator;
pub use gmsk::{GmskFrameGenerator, GmskFrameSync};
pub use header::FrameProperties;
pub use modem::{Modem, ModulationScheme};
pub use ofdm::{OfdmFrameGenerator, OfdmFrameSync, OfdmParams, SubcarrierKind};
pub use packetizer::{compute_decoded_len, compute_encoded_len, DecodedPacket, Packetizer, PacketizerConfig};
pub use scheme::{CrcScheme, FecScheme};
pub use sync::{
    FrameCollector, FrameEvent, FrameListener, FrameQueue, FrameSync, FrameSyncCounters, FrameSyncStats,
    HeaderFailurePolicy, ReceivedFrame, SyncConfig, SyncState,
};

/// Result type alias for sigframe operations
pub type Result<T> = core::result::Result<T, FrameError>;
