//! Shared helpers for the six command drivers: argument/image plumbing
//! that every `src/bin/*.rs` needs, kept thin per the spec's scope (the
//! drivers themselves are out of scope beyond their interface to the
//! core engine).

use crate::error::{io_fatal, CliError};
use crate::image::Image;
use crate::layout::NAME_LEN;
use crate::path;
use std::env;
use std::path::Path;

/// Returns the running binary's name (for error-message prefixes) and the
/// remaining `argv` entries after it, matching the teacher's `utils::args`
/// helper.
pub fn args() -> (String, Vec<String>) {
    let mut it = env::args();
    let bin = it
        .next()
        .map(|p| Path::new(&p).file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or(p))
        .unwrap_or_else(|| "ext2tool".to_string());
    (bin, it.collect())
}

/// Opens the image at `path`, exiting the process with a fatal I/O error
/// on failure (open/mmap failures are not part of the normal error-kind
/// surface; they abort immediately per the spec's error handling design).
pub fn open_image(bin: &str, path: &str) -> Image {
    match Image::open(Path::new(path)) {
        Ok(img) => img,
        Err(e) => io_fatal(bin, format!("cannot open image {path}: {e}")),
    }
}

/// Validates that `name`'s byte length fits in a directory entry.
pub fn check_name_len(name: &[u8]) -> Result<(), CliError> {
    if name.len() > NAME_LEN {
        Err(CliError::NameTooLong)
    } else {
        Ok(())
    }
}

/// Resolves the parent directory and basename for a path that is about to
/// receive a new entry (used by `mkdir`, `cp`, and hard-link creation).
/// Validates: the path is absolute and has a parent, the parent resolves
/// to an existing directory, the basename fits, and no entry with that
/// name already exists in the parent.
pub fn resolve_new_entry(img: &Image, dest: &[u8]) -> Result<(u32, Vec<u8>), CliError> {
    let (parent_path, name) = path::split_parent_and_name(dest).ok_or(CliError::PathInvalid)?;
    check_name_len(name)?;

    let parent = path::resolve(img, parent_path);
    if parent == 0 {
        return Err(CliError::PathInvalid);
    }
    if !crate::inode::is_dir(img.inode(parent)) {
        return Err(CliError::PathInvalid);
    }
    if crate::dirent::find(img, parent, name) != 0 {
        return Err(CliError::AlreadyExists);
    }

    Ok((parent, name.to_vec()))
}
