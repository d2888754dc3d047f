//! `ext2_cp <image> <host_src> <dest_abs>` — copies a file from the host
//! filesystem into the image. Exit 0 / ENOENT / EEXIST / ENAMETOOLONG /
//! ENOSPC. A destination that resolves to a symlink is not a normal error:
//! the spec treats following a symlink as out of scope for this tool, so
//! the process aborts immediately rather than writing through it.

use ext2fs::error::CliError;
use ext2fs::image::Image;
use ext2fs::layout::FT_REG_FILE;
use ext2fs::{bitmap, cli, data, dirent, error, inode, path};
use std::fs;

fn main() {
    let (bin, args) = cli::args();
    let [image_path, host_src, dest] = match &args[..] {
        [a, b, c] => [a, b, c],
        _ => {
            eprintln!("usage: {bin} <image> <host_src> <dest_abs>");
            std::process::exit(1);
        }
    };

    let data = match fs::read(host_src) {
        Ok(d) => d,
        Err(e) => error::fail(&bin, map_read_error(&e)),
    };

    let mut img = cli::open_image(&bin, image_path);
    if let Err(e) = run(&bin, &mut img, host_src, dest.as_bytes(), &data) {
        error::fail(&bin, e);
    }

    if let Err(e) = img.sync() {
        error::io_fatal(&bin, format!("failed to sync image: {e}"));
    }
}

fn map_read_error(_e: &std::io::Error) -> CliError {
    CliError::PathInvalid
}

fn run(bin: &str, img: &mut Image, host_src: &str, dest: &[u8], contents: &[u8]) -> Result<(), CliError> {
    let (parent, name) = resolve_destination(bin, img, host_src, dest)?;

    if contents.len() > data::MAX_FILE_SIZE
        || data::required_block_count(contents.len()) > img.superblock().free_blocks_count as usize
    {
        return Err(CliError::NoSpace);
    }

    let inode_num = bitmap::allocate_inode(img);
    dirent::create(img, parent, inode_num, &name, FT_REG_FILE);
    data::write_file_data(img, inode_num, contents)
}

/// Resolves `dest` to a `(parent_dir, basename)` pair, handling the three
/// cases a copy destination can land in: an existing directory (the host
/// basename is used inside it), an existing non-directory (a conflict), or
/// nothing yet (the usual new-entry validation). A destination that
/// resolves to a symlink aborts the process immediately.
fn resolve_destination(bin: &str, img: &Image, host_src: &str, dest: &[u8]) -> Result<(u32, Vec<u8>), CliError> {
    let existing = path::resolve(img, dest);
    if existing != 0 {
        let target = img.inode(existing);
        if inode::file_type_for_mode(target.mode) == ext2fs::layout::FT_SYMLINK {
            error::io_fatal(bin, format!("destination {:?} is a symlink", String::from_utf8_lossy(dest)));
        }
        if inode::is_dir(target) {
            let basename = std::path::Path::new(host_src)
                .file_name()
                .ok_or(CliError::PathInvalid)?
                .to_string_lossy()
                .into_owned();
            let name = basename.into_bytes();
            cli::check_name_len(&name)?;
            if dirent::find(img, existing, &name) != 0 {
                return Err(CliError::AlreadyExists);
            }
            return Ok((existing, name));
        }
        return Err(CliError::AlreadyExists);
    }

    if path::has_trailing_slash(dest) {
        return Err(CliError::PathInvalid);
    }
    cli::resolve_new_entry(img, dest)
}
