//! Header discipline for append-only CSV datasets
//!
//! The first writer fixes the header. Every later writer must present the
//! exact same header line or the append is refused.

use crate::error::{HarnessError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Create `path` with `header`, or verify the existing first line matches it
pub fn ensure_header(path: &Path, header: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
    }

    if !path.exists() {
        fs::write(path, format!("{}\n", header)).map_err(|e| HarnessError::io(path, e))?;
        tracing::debug!(path = %path.display(), "Created dataset");
        return Ok(());
    }

    let existing = read_header(path)?;
    if existing != header {
        return Err(HarnessError::SchemaConsistency {
            path: path.to_path_buf(),
            existing,
            expected: header.to_string(),
        });
    }
    Ok(())
}

/// First line of `path` without its line terminator
pub fn read_header(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| HarnessError::io(path, e))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| HarnessError::io(path, e))?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Open an existing dataset for appending
pub fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| HarnessError::io(path, e))
}

/// Append pre-rendered lines and flush
pub fn append_lines<I, S>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut file = open_append(path)?;
    let mut written = 0;
    for line in lines {
        writeln!(file, "{}", line.as_ref()).map_err(|e| HarnessError::io(path, e))?;
        written += 1;
    }
    file.flush().map_err(|e| HarnessError::io(path, e))?;
    Ok(written)
}
