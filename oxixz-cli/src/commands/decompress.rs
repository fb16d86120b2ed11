//! Decompress command implementation.

use super::{DecodeFormat, filter_chain};
use crate::utils::{
    create_output, create_progress_bar, decompressed_name, is_stdio, open_input, remove_partial,
};
use oxixz_lzma::{AutoDecoder, Decoder, DecoderLimits};
use std::io::{self, Read, Write};
use std::path::Path;

/// Settings for `oxixz decompress`.
#[derive(Debug, Clone)]
pub struct DecompressOptions {
    pub memlimit: Option<u64>,
    pub format: DecodeFormat,
    pub preset: u32,
    pub extreme: bool,
    pub delta: Option<u32>,
    pub keep: bool,
    pub progress: bool,
}

pub fn cmd_decompress(
    input: &Path,
    output: Option<&Path>,
    options: &DecompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => decompressed_name(input).ok_or_else(|| {
            format!(
                "{}: unknown suffix, use -o to name the output",
                input.display()
            )
        })?,
    };
    if !is_stdio(&output) && output.exists() {
        return Err(format!("{} already exists", output.display()).into());
    }

    let (reader, len) = open_input(input)?;
    let pb = create_progress_bar(len, options.progress);
    let reader = pb.wrap_read(reader);

    let limits = DecoderLimits::default().with_memlimit(options.memlimit.unwrap_or(u64::MAX));
    let mut decoder: Box<dyn Read> = match options.format {
        DecodeFormat::Auto => Box::new(AutoDecoder::new(reader, limits)?),
        DecodeFormat::Xz => Box::new(Decoder::xz(reader, limits)?),
        DecodeFormat::Lzma => Box::new(Decoder::lzma_alone(reader, limits.memlimit)?),
        DecodeFormat::Raw => {
            let chain = filter_chain(options.preset, options.extreme, options.delta)?;
            Box::new(Decoder::raw(reader, &chain)?)
        }
    };
    log::debug!(
        "decompressing {} -> {} ({:?})",
        input.display(),
        output.display(),
        options.format
    );

    let mut writer = create_output(&output)?;
    let written = match io::copy(&mut decoder, &mut writer) {
        Ok(n) => n,
        Err(e) => {
            drop(writer);
            remove_partial(&output);
            return Err(e.into());
        }
    };
    writer.flush()?;
    pb.finish_and_clear();

    if !is_stdio(&output) {
        println!(
            "{} -> {}: {} bytes",
            input.display(),
            output.display(),
            written
        );
    }

    if !options.keep && !is_stdio(input) {
        std::fs::remove_file(input)?;
    }
    Ok(())
}
