//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Install the `env_logger` backend.
///
/// `RUST_LOG` wins; otherwise the filter is `warn`, `debug` with `-v` and
/// `trace` with `-vv`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: Option<u64>, enable: bool) -> ProgressBar {
    let Some(len) = len.filter(|_| enable) else {
        return ProgressBar::hidden();
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Whether `path` names stdin/stdout.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Open `path` for reading, returning the reader and its length if known.
pub fn open_input(path: &Path) -> io::Result<(Box<dyn Read>, Option<u64>)> {
    if is_stdio(path) {
        return Ok((Box::new(io::stdin().lock()), None));
    }
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    Ok((Box::new(BufReader::new(file)), Some(len)))
}

/// Create `path` for writing.
pub fn create_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdout().lock()));
    }
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

/// Delete a partially written output; stdout is left alone.
pub fn remove_partial(path: &Path) {
    if is_stdio(path) {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("could not remove partial output {}: {}", path.display(), e);
    }
}

/// `<input>.<extension>`, or stdout when reading stdin.
pub fn compressed_name(input: &Path, extension: &str) -> PathBuf {
    if is_stdio(input) {
        return PathBuf::from("-");
    }
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Strip a known compressed extension, or `None` if there is none.
pub fn decompressed_name(input: &Path) -> Option<PathBuf> {
    if is_stdio(input) {
        return Some(PathBuf::from("-"));
    }
    let ext = input.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xz" | "lzma" | "raw" => Some(input.with_extension("")),
        "txz" | "tlz" => Some(input.with_extension("tar")),
        _ => None,
    }
}

/// Space savings in percent.
pub fn savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}
