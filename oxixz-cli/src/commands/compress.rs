//! Compress command implementation.

use super::{CheckArg, EncodeFormat, filter_chain, lzma_options};
use crate::utils::{
    compressed_name, create_output, create_progress_bar, is_stdio, open_input, remove_partial,
    savings,
};
use oxixz_lzma::Encoder;
use std::io::{self, Read, Write};
use std::path::Path;

/// Settings for `oxixz compress`.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    pub preset: u32,
    pub extreme: bool,
    pub format: EncodeFormat,
    pub check: CheckArg,
    pub delta: Option<u32>,
    pub keep: bool,
    pub progress: bool,
}

pub fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.delta.is_some() && options.format == EncodeFormat::Lzma {
        return Err("--delta is not supported with --format lzma".into());
    }

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => compressed_name(input, options.format.extension()),
    };
    if !is_stdio(&output) && output.exists() {
        return Err(format!("{} already exists", output.display()).into());
    }

    let (reader, len) = open_input(input)?;
    let writer = create_output(&output)?;

    let mut encoder: Encoder<Box<dyn Write>> = match options.format {
        EncodeFormat::Xz => {
            let chain = filter_chain(options.preset, options.extreme, options.delta)?;
            Encoder::xz(writer, &chain, options.check.into())?
        }
        EncodeFormat::Lzma => {
            Encoder::lzma_alone(writer, &lzma_options(options.preset, options.extreme)?)?
        }
        EncodeFormat::Raw => {
            let chain = filter_chain(options.preset, options.extreme, options.delta)?;
            Encoder::raw(writer, &chain)?
        }
    };
    log::debug!(
        "compressing {} -> {} ({:?}, preset {}{})",
        input.display(),
        output.display(),
        options.format,
        options.preset,
        if options.extreme { "e" } else { "" }
    );

    let pb = create_progress_bar(len, options.progress);
    if let Err(e) = encode_stream(pb.wrap_read(reader), &mut encoder) {
        // Dropping the encoder still writes a trailer; the file goes anyway.
        drop(encoder);
        remove_partial(&output);
        return Err(e);
    }
    let (total_in, total_out) = (encoder.total_in(), encoder.total_out());
    encoder.into_inner()?.flush()?;
    pb.finish_and_clear();

    if !is_stdio(&output) {
        println!(
            "{} -> {}: {} -> {} bytes ({:.1}% saved)",
            input.display(),
            output.display(),
            total_in,
            total_out,
            savings(total_in, total_out)
        );
    }

    if !options.keep && !is_stdio(input) {
        std::fs::remove_file(input)?;
    }
    Ok(())
}

fn encode_stream(
    mut reader: impl Read,
    encoder: &mut Encoder<Box<dyn Write>>,
) -> Result<(), Box<dyn std::error::Error>> {
    io::copy(&mut reader, encoder)?;
    encoder.finish()?;
    Ok(())
}
