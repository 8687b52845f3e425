use anyhow::Result;
use clap::{Parser, Subcommand};
use sigframe_cli::commands::{self, receive::ReceiveArgs, transmit::TransmitArgs, SchemeArgs};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sigframe")]
#[command(about = "Sigframe - Packetizer and baseband frame transceiver", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported integrity, FEC and modulation schemes
    Schemes,

    /// Encode a file into a single packet
    Encode {
        /// Input file (the message)
        #[arg(short, long)]
        input: String,

        /// Output file for the encoded packet
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        schemes: SchemeArgs,
    },

    /// Decode a packet back into its message
    Decode {
        /// Input file (encoded packet or soft bits)
        #[arg(short, long)]
        input: String,

        /// Output file for the decoded message
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        schemes: SchemeArgs,

        /// Decoded message length in bytes
        #[arg(long)]
        length: Option<usize>,

        /// Input holds one soft byte per encoded bit
        #[arg(long)]
        soft: bool,
    },

    /// Frame a file into baseband samples
    Transmit {
        /// Input file (payload data)
        #[arg(short, long)]
        input: String,

        /// Output file for interleaved f32 I/Q samples
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        args: TransmitArgs,
    },

    /// Recover frames from baseband samples
    Receive {
        /// Input file of interleaved f32 I/Q samples
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        args: ReceiveArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Schemes => commands::schemes::execute(),

        Commands::Encode { input, output, schemes } => commands::encode::execute(&input, &output, &schemes),

        Commands::Decode {
            input,
            output,
            schemes,
            length,
            soft,
        } => {
            if !commands::decode::execute(&input, &output, &schemes, length, soft)? {
                std::process::exit(2);
            }
            Ok(())
        }

        Commands::Transmit { input, output, args } => commands::transmit::execute(&input, &output, &args),

        Commands::Receive { input, args } => commands::receive::execute(&input, &args).map(|_| ()),
    }
}
