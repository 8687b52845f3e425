//! Constants shared by the packetizer, the modems and the frame families

/// Soft-bit value for a certain 0
pub const SOFTBIT_0: u8 = 0;

/// Soft-bit value for a certain 1
pub const SOFTBIT_1: u8 = 255;

/// Soft-bit value carrying no information
pub const SOFTBIT_ERASURE: u8 = 127;

/// Length of the opaque application header carried by every frame family
pub const USER_HEADER_LEN: usize = 8;

/// Payload length of the fixed frame64 profile
pub const FRAME64_PAYLOAD_LEN: usize = 64;

/// Version byte written into flexible frame headers
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest payload a flexible header can declare (16-bit length field)
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Default normalized correlation threshold for frame detection
pub const DEFAULT_DETECT_THRESHOLD: f32 = 0.5;

/// Order of the m-sequence used for single-carrier and GMSK preambles (63 symbols)
pub const PREAMBLE_MSEQUENCE_ORDER: u32 = 6;

/// Samples per symbol for the rectangular-pulse single-carrier frames
pub const LINEAR_SAMPLES_PER_SYMBOL: usize = 2;

/// Samples per symbol for GMSK frames
pub const GMSK_SAMPLES_PER_SYMBOL: usize = 4;

/// Bandwidth-time product of the GMSK Gaussian filter
pub const GMSK_BT: f32 = 0.5;

/// Half-length of the GMSK Gaussian filter in symbols
pub const GMSK_FILTER_DELAY: usize = 2;

/// Default OFDM subcarrier count
pub const OFDM_DEFAULT_SUBCARRIERS: usize = 64;

/// Default OFDM cyclic prefix length in samples
pub const OFDM_DEFAULT_CP_LEN: usize = 16;

/// Default OFDM taper length in samples
pub const OFDM_DEFAULT_TAPER_LEN: usize = 4;
