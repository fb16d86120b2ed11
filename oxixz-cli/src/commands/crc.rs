//! CRC command implementation.

use crate::utils::open_input;
use oxixz_core::{Crc32, Crc64};
use oxixz_lzma::BLOCK_SIZE;
use std::io::{ErrorKind, Read};
use std::path::Path;

pub fn cmd_crc(file: &Path, use_crc64: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut reader, _) = open_input(file)?;
    let mut crc32 = Crc32::new();
    let mut crc64 = Crc64::new();
    let mut buf = vec![0u8; BLOCK_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if use_crc64 {
            crc64.update(&buf[..n]);
        } else {
            crc32.update(&buf[..n]);
        }
    }

    let digest = if use_crc64 {
        crc64.hexdigest()
    } else {
        crc32.hexdigest()
    };
    println!("{}  {}", digest, file.display());
    Ok(())
}
