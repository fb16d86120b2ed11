//! Info command implementation.

use crate::utils::savings;
use oxixz_lzma::{
    AloneHeader, AutoDecoder, ContainerFormat, DecoderLimits, LZMA_ALONE_HEADER_SIZE,
    StreamHeader, XZ_HEADER_SIZE,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

#[derive(Serialize)]
struct StreamInfo {
    file: String,
    format: &'static str,
    compressed_size: u64,
    decompressed_size: u64,
    savings_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lzma: Option<LzmaInfo>,
}

#[derive(Serialize)]
struct LzmaInfo {
    lc: u32,
    lp: u32,
    pb: u32,
    dict_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared_size: Option<u64>,
}

pub fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let compressed_size = std::fs::metadata(input)?.len();
    let mut reader = BufReader::new(File::open(input)?);

    let mut header = Vec::with_capacity(LZMA_ALONE_HEADER_SIZE);
    (&mut reader)
        .take(LZMA_ALONE_HEADER_SIZE as u64)
        .read_to_end(&mut header)?;

    let format = ContainerFormat::from_magic(&header);
    let (check, lzma) = match format {
        ContainerFormat::Xz => {
            let stream = StreamHeader::parse(&header[..XZ_HEADER_SIZE.min(header.len())])?;
            (Some(stream.check.name()), None)
        }
        ContainerFormat::LzmaAlone => {
            let alone = AloneHeader::parse(&header)?;
            let info = LzmaInfo {
                lc: alone.lc,
                lp: alone.lp,
                pb: alone.pb,
                dict_size: alone.dict_size,
                declared_size: alone.uncompressed_size,
            };
            (None, Some(info))
        }
        ContainerFormat::Unknown => {
            return Err(format!("{}: not an .xz or .lzma file", input.display()).into());
        }
    };

    let source = io::Cursor::new(header).chain(reader);
    let mut decoder = AutoDecoder::new(source, DecoderLimits::default())?;
    let decompressed_size = io::copy(&mut decoder, &mut io::sink())?;
    log::debug!(
        "{}: decoder consumed {} of {} bytes",
        input.display(),
        decoder.total_in(),
        compressed_size
    );

    let info = StreamInfo {
        file: input.display().to_string(),
        format: format.name(),
        compressed_size,
        decompressed_size,
        savings_percent: savings(decompressed_size, compressed_size),
        check,
        lzma,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Stream Information");
    println!("==================");
    println!("File: {}", info.file);
    println!("Format: {}", info.format);
    println!("Compressed size: {} bytes", info.compressed_size);
    println!("Decompressed size: {} bytes", info.decompressed_size);
    if info.decompressed_size > 0 {
        println!("Compression ratio: {:.1}%", info.savings_percent);
    }
    if let Some(check) = info.check {
        println!("Check: {}", check);
    }
    if let Some(lzma) = &info.lzma {
        println!();
        println!("LZMA Properties:");
        println!("  lc/lp/pb: {}/{}/{}", lzma.lc, lzma.lp, lzma.pb);
        println!("  Dictionary size: {} bytes", lzma.dict_size);
        match lzma.declared_size {
            Some(size) => println!("  Declared size: {} bytes", size),
            None => println!("  Declared size: unknown (end marker)"),
        }
    }
    Ok(())
}
