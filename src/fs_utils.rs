//! Filesystem utilities for generation output

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use crate::session::OutputMode;
use crate::writer::Encoding;

/// Create `dir` and any missing ancestors.
///
/// Existing directories are left alone. Missing ancestors are created
/// bottom-up: the parent first, then `dir` itself.
pub fn ensure_directory<P: AsRef<Path>>(dir: P) -> io::Result<()> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    if let Some(parent) = dir.parent() {
        ensure_directory(parent)?;
    }

    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        // Lost a race with another creator; the directory is there now
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Open an output file with the semantics of `mode`.
///
/// `Overwrite` and `Once` truncate, `Append` appends. The file is created
/// when missing.
pub fn open_output<P: AsRef<Path>>(path: P, mode: OutputMode) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);

    match mode {
        OutputMode::Append => options.append(true),
        OutputMode::Overwrite | OutputMode::Once => options.write(true).truncate(true),
    };

    options.open(path)
}

/// Read a text file, decoding it with `encoding`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_text<P: AsRef<Path>>(path: P, encoding: Encoding) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(encoding.decode(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
