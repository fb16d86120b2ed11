//! OxiXZ CLI - streaming .xz / .lzma compression
//!
//! Compress, decompress, test and inspect `.xz`, `.lzma` and raw LZMA
//! streams.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{CheckArg, CompressOptions, DecodeFormat, DecompressOptions, EncodeFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxixz")]
#[command(author, version, about = "Streaming .xz / .lzma compression")]
#[command(long_about = "
OxiXZ compresses and decompresses .xz, legacy .lzma and raw LZMA streams.
Use '-' as a file name to read from stdin or write to stdout.

Examples:
  oxixz compress data.bin
  oxixz compress -p 9 -e --check sha256 data.bin
  oxixz compress --format raw --delta 2 samples.pcm -o samples.raw
  oxixz decompress data.bin.xz
  oxixz decompress --format raw --delta 2 samples.raw -o samples.pcm
  oxixz test data.bin.xz
  oxixz info --json data.bin.lzma
  oxixz crc --crc64 data.bin
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// Input file ('-' for stdin)
        input: PathBuf,

        /// Output file ('-' for stdout); defaults to <input>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression preset (0-9)
        #[arg(short, long, default_value_t = oxixz_lzma::PRESET_DEFAULT)]
        preset: u32,

        /// Use the slower extreme variant of the preset
        #[arg(short, long)]
        extreme: bool,

        /// Container format
        #[arg(short, long, value_enum, default_value = "xz")]
        format: EncodeFormat,

        /// Integrity check (xz only)
        #[arg(short = 'C', long, value_enum, default_value = "crc64")]
        check: CheckArg,

        /// Delta filter distance ahead of LZMA2 (xz and raw, 1-256)
        #[arg(long)]
        delta: Option<u32>,

        /// Keep the input file
        #[arg(short, long)]
        keep: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// Input file ('-' for stdin)
        input: PathBuf,

        /// Output file ('-' for stdout); defaults to the input without its
        /// extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Decoder memory limit in bytes
        #[arg(short = 'M', long)]
        memlimit: Option<u64>,

        /// Container format
        #[arg(short, long, value_enum, default_value = "auto")]
        format: DecodeFormat,

        /// Preset the raw stream was compressed with
        #[arg(short, long, default_value_t = oxixz_lzma::PRESET_DEFAULT)]
        preset: u32,

        /// The raw stream used the extreme preset variant
        #[arg(short, long)]
        extreme: bool,

        /// Delta distance the raw stream was compressed with
        #[arg(long)]
        delta: Option<u32>,

        /// Keep the input file
        #[arg(short, long)]
        keep: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test integrity of a compressed file
    #[command(alias = "t")]
    Test {
        /// File to test ('-' for stdin)
        input: PathBuf,
    },

    /// Show information about a compressed file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        input: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Print the CRC-32 (or CRC-64) of a file
    Crc {
        /// File to checksum ('-' for stdin)
        file: PathBuf,

        /// Compute CRC-64 instead of CRC-32
        #[arg(long)]
        crc64: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            preset,
            extreme,
            format,
            check,
            delta,
            keep,
            progress,
        } => commands::cmd_compress(
            &input,
            output.as_deref(),
            &CompressOptions {
                preset,
                extreme,
                format,
                check,
                delta,
                keep,
                progress,
            },
        ),
        Commands::Decompress {
            input,
            output,
            memlimit,
            format,
            preset,
            extreme,
            delta,
            keep,
            progress,
        } => commands::cmd_decompress(
            &input,
            output.as_deref(),
            &DecompressOptions {
                memlimit,
                format,
                preset,
                extreme,
                delta,
                keep,
                progress,
            },
        ),
        Commands::Test { input } => commands::cmd_test(&input),
        Commands::Info { input, json } => commands::cmd_info(&input, json),
        Commands::Crc { file, crc64 } => commands::cmd_crc(&file, crc64),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
