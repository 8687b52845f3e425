use anyhow::{bail, Context, Result};
use sigframe_core::constants::{FRAME64_PAYLOAD_LEN, MAX_PAYLOAD_LEN, USER_HEADER_LEN};
use sigframe_core::{
    CrcScheme, FecScheme, FlexFrameGenerator, Frame64Generator, FrameGenerator, FrameProperties, GmskFrameGenerator,
    ModulationScheme, OfdmFrameGenerator, OfdmParams,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use tracing::{debug, info};

use crate::iq::IqWriter;
use crate::{load_json, FrameFamily};

/// Samples rendered per write
const BLOCK_LEN: usize = 1024;

/// Options of the `transmit` subcommand
#[derive(Debug, Clone, clap::Args)]
pub struct TransmitArgs {
    /// Frame family
    #[arg(long, value_enum, default_value = "flexframe")]
    pub family: FrameFamily,

    /// User header as hex (up to 8 bytes); defaults to the frame counter
    #[arg(long)]
    pub header: Option<String>,

    /// Payload bytes per frame; defaults to the whole input (64 for frame64)
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// JSON frame properties (overrides the scheme flags)
    #[arg(long)]
    pub props: Option<String>,

    /// Payload error-detection scheme
    #[arg(long, default_value = "crc32")]
    pub crc: CrcScheme,

    /// Payload inner FEC scheme
    #[arg(long, default_value = "none")]
    pub fec0: FecScheme,

    /// Payload outer FEC scheme
    #[arg(long, default_value = "h128")]
    pub fec1: FecScheme,

    /// Payload modulation
    #[arg(long, default_value = "qpsk")]
    pub modulation: ModulationScheme,

    /// JSON OFDM parameters
    #[arg(long)]
    pub ofdm: Option<String>,

    /// Zero samples before the first and after every frame
    #[arg(long, default_value = "0")]
    pub pad: usize,
}

impl TransmitArgs {
    fn properties(&self) -> Result<FrameProperties> {
        match &self.props {
            Some(path) => load_json(path),
            None => Ok(FrameProperties { crc: self.crc, fec0: self.fec0, fec1: self.fec1, modulation: self.modulation }),
        }
    }

    fn user_header(&self, counter: u64) -> Result<[u8; USER_HEADER_LEN]> {
        let Some(text) = &self.header else {
            return Ok(counter.to_be_bytes());
        };
        let bytes = hex::decode(text).with_context(|| format!("Invalid header hex: {}", text))?;
        if bytes.len() > USER_HEADER_LEN {
            bail!("Header has {} bytes, at most {} fit", bytes.len(), USER_HEADER_LEN);
        }
        let mut header = [0u8; USER_HEADER_LEN];
        header[..bytes.len()].copy_from_slice(&bytes);
        Ok(header)
    }

    fn frame_size(&self, input_len: usize) -> usize {
        match (self.family, self.frame_size) {
            (FrameFamily::Frame64, _) => FRAME64_PAYLOAD_LEN,
            (_, Some(size)) => size,
            (_, None) => input_len.min(MAX_PAYLOAD_LEN),
        }
    }
}

/// Assemble every frame and stream its samples into `writer`
fn render<G: FrameGenerator, W: Write>(
    generator: &mut G,
    args: &TransmitArgs,
    payloads: &[Vec<u8>],
    writer: &mut IqWriter<W>,
) -> Result<()> {
    let mut block = vec![num_complex::Complex32::new(0.0, 0.0); BLOCK_LEN];
    writer.write_silence(args.pad)?;
    for (i, payload) in payloads.iter().enumerate() {
        let header = args.user_header(i as u64)?;
        generator
            .assemble(&header, payload)
            .with_context(|| format!("Failed to assemble frame {}", i))?;

        let mut remaining = generator.frame_len();
        loop {
            let done = generator.write_samples(&mut block);
            let n = remaining.min(block.len());
            writer.write(&block[..n])?;
            remaining -= n;
            if done {
                break;
            }
        }
        writer.write_silence(args.pad)?;
        debug!("Frame {}: {} payload bytes, {} samples", i, payload.len(), generator.frame_len());
    }
    Ok(())
}

pub fn execute(input: &str, output: &str, args: &TransmitArgs) -> Result<()> {
    info!("Transmitting {} as {:?} frames into {}", input, args.family, output);

    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?;
    if data.is_empty() {
        bail!("Input file is empty: {}", input);
    }
    let size = args.frame_size(data.len());
    if size == 0 {
        bail!("Frame size must be positive");
    }
    let mut payloads: Vec<Vec<u8>> = data.chunks(size).map(<[u8]>::to_vec).collect();
    if args.family == FrameFamily::Frame64 {
        if let Some(last) = payloads.last_mut() {
            last.resize(FRAME64_PAYLOAD_LEN, 0);
        }
    }

    let file = File::create(output).with_context(|| format!("Failed to create output file: {}", output))?;
    let mut writer = IqWriter::new(BufWriter::new(file));

    match args.family {
        FrameFamily::Frame64 => render(&mut Frame64Generator::new()?, args, &payloads, &mut writer)?,
        FrameFamily::Flexframe => render(&mut FlexFrameGenerator::new(args.properties()?)?, args, &payloads, &mut writer)?,
        FrameFamily::Gmsk => render(&mut GmskFrameGenerator::new(args.properties()?)?, args, &payloads, &mut writer)?,
        FrameFamily::Ofdm => {
            let params: OfdmParams = match &args.ofdm {
                Some(path) => load_json(path)?,
                None => OfdmParams::default(),
            };
            let mut generator = OfdmFrameGenerator::new(params, args.properties()?)?;
            render(&mut generator, args, &payloads, &mut writer)?
        }
    }

    let samples = writer.samples_written();
    writer
        .finish()
        .with_context(|| format!("Failed to write output file: {}", output))?;

    info!("Wrote {} frames ({} samples)", payloads.len(), samples);
    Ok(())
}
