use anyhow::{bail, Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use num_complex::Complex32;
use serde::Serialize;
use sigframe_core::sync::{FrameFormat, FrameReceiver};
use sigframe_core::{
    FlexFrameSync, Frame64Sync, FrameCollector, FrameEvent, FrameSync, FrameSyncCounters, FrameSyncStats,
    GmskFrameSync, OfdmFrameSync, OfdmParams, SyncConfig,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{info, warn};

use crate::iq::read_iq;
use crate::{load_json, FrameFamily};

/// Options of the `receive` subcommand
#[derive(Debug, Clone, clap::Args)]
pub struct ReceiveArgs {
    /// Frame family
    #[arg(long, value_enum, default_value = "flexframe")]
    pub family: FrameFamily,

    /// Samples handed to the synchronizer per call
    #[arg(long, default_value = "4096")]
    pub chunk: usize,

    /// JSON synchronizer configuration
    #[arg(long)]
    pub sync_config: Option<String>,

    /// JSON OFDM parameters
    #[arg(long)]
    pub ofdm: Option<String>,

    /// Print one JSON object per frame instead of text
    #[arg(long)]
    pub json: bool,

    /// Write the payloads that passed their integrity check to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    index: usize,
    header: String,
    header_valid: bool,
    payload_len: usize,
    payload_valid: bool,
    payload: String,
    stats: &'a FrameSyncStats,
}

fn report(index: usize, event: &FrameEvent, json: bool) -> Result<()> {
    if json {
        let record = FrameRecord {
            index,
            header: hex::encode(&event.header),
            header_valid: event.header_valid,
            payload_len: event.payload.len(),
            payload_valid: event.payload_valid,
            payload: hex::encode(&event.payload),
            stats: &event.stats,
        };
        println!("{}", serde_json::to_string(&record).context("Failed to serialize frame")?);
        return Ok(());
    }

    let flag = |valid: bool| if valid { "✓".green() } else { "✗".red() };
    println!(
        "Frame {}: header {} {}  payload {} {} bytes",
        index,
        flag(event.header_valid),
        hex::encode(&event.header),
        flag(event.payload_valid),
        event.payload.len()
    );
    println!("         {}", event.stats);
    Ok(())
}

/// Stream `samples` through `sync`, reporting frames as they complete
fn run<R, F>(
    mut sync: FrameSync<R, F, FrameCollector>,
    samples: &[Complex32],
    args: &ReceiveArgs,
    sink: &mut Option<BufWriter<File>>,
) -> Result<FrameSyncCounters>
where
    R: FrameReceiver,
    F: FrameFormat,
{
    if let Some(path) = &args.sync_config {
        sync.set_config(load_json::<SyncConfig>(path)?);
    }

    let bar = if args.progress {
        let bar = ProgressBar::new(samples.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} samples ({eta})")
                .context("Invalid progress template")?,
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut index = 0;
    for chunk in samples.chunks(args.chunk) {
        sync.execute(chunk);
        bar.inc(chunk.len() as u64);
        for event in sync.listener_mut().frames.drain(..) {
            bar.suspend(|| report(index, &event, args.json))?;
            if event.payload_valid {
                if let Some(out) = sink.as_mut() {
                    out.write_all(&event.payload).context("Failed to write payload")?;
                }
            } else {
                warn!("Frame {} payload failed its integrity check", index);
            }
            index += 1;
        }
    }
    bar.finish_and_clear();
    Ok(*sync.counters())
}

pub fn execute(input: &str, args: &ReceiveArgs) -> Result<FrameSyncCounters> {
    info!("Receiving {:?} frames from {}", args.family, input);
    if args.chunk == 0 {
        bail!("Chunk size must be positive");
    }

    let samples = read_iq(input)?;
    info!("Read {} samples", samples.len());

    let mut sink = match &args.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {}", path))?,
        )),
        None => None,
    };

    let collector = FrameCollector::default();
    let counters = match args.family {
        FrameFamily::Frame64 => run(Frame64Sync::frame64(collector)?, &samples, args, &mut sink)?,
        FrameFamily::Flexframe => run(FlexFrameSync::flexframe(collector)?, &samples, args, &mut sink)?,
        FrameFamily::Gmsk => run(GmskFrameSync::gmsk(collector)?, &samples, args, &mut sink)?,
        FrameFamily::Ofdm => {
            let params: OfdmParams = match &args.ofdm {
                Some(path) => load_json(path)?,
                None => OfdmParams::default(),
            };
            run(OfdmFrameSync::ofdm(&params, collector)?, &samples, args, &mut sink)?
        }
    };

    if let Some(mut out) = sink {
        out.flush().context("Failed to flush output file")?;
    }

    if !args.json {
        println!("\n=== Receive Summary ===");
        println!("Detections:        {}", counters.detections);
        println!("Headers valid:     {}", counters.header_valid);
        println!("Headers invalid:   {}", counters.header_invalid);
        println!("Payloads valid:    {}", counters.payload_valid.to_string().green());
        println!("Payloads invalid:  {}", counters.payload_invalid);
        println!("Discarded:         {}", counters.discarded);
    }
    Ok(counters)
}
