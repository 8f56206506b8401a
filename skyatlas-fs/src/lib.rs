//! Capability-based access to source data files and database locations.
//!
//! Every helper resolves an ambient directory once and performs the remaining
//! work relative to it through `cap-std`, so paths containing `..` cannot
//! escape the directory they were resolved from.
#![forbid(unsafe_code)]

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Open a data file for reading.
pub fn open_data_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Return whether `path` names an existing regular file.
///
/// A missing file or a missing parent directory yields `Ok(false)`; other I/O
/// failures are returned.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let Some(name) = path.file_name() else {
        return Ok(false);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent_or_current(path), ambient_authority()) {
        Ok(dir) => dir,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    match dir.metadata(name) {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

/// Create the directory that will contain `path` when it does not exist.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let (base, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

fn parent_or_current(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// Open the root a path is anchored to and return the remainder relative to
/// it. Relative paths are anchored at the current directory.
fn split_root(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let mut components = path.components();
    let base = match components.clone().next() {
        // Windows drive or UNC prefix, optionally followed by a root.
        Some(Utf8Component::Prefix(prefix)) => {
            components.next();
            let mut base = Utf8PathBuf::from(prefix.as_str());
            if matches!(components.clone().next(), Some(Utf8Component::RootDir)) {
                components.next();
                base.push(std::path::MAIN_SEPARATOR_STR);
            }
            base
        }
        Some(Utf8Component::RootDir) => {
            components.next();
            Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR)
        }
        _ => Utf8PathBuf::from("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, components.as_path().to_path_buf()))
}
