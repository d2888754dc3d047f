//! `ext2_ln <image> [-s] <src_abs> <dest_abs>` — hard or symbolic link.
//! Exit 0 / ENOENT / EISDIR / ENAMETOOLONG / EEXIST.

use ext2fs::error::CliError;
use ext2fs::image::Image;
use ext2fs::layout::FT_SYMLINK;
use ext2fs::{bitmap, cli, data, dirent, error, inode, path};

fn main() {
    let (bin, args) = cli::args();
    if args.is_empty() {
        usage(&bin);
    }
    let image_path = &args[0];
    let rest = &args[1..];
    let (symlink, rest) = match rest.first().map(String::as_str) {
        Some("-s") => (true, &rest[1..]),
        _ => (false, rest),
    };
    let [src, dest] = match rest {
        [a, b] => [a.as_str(), b.as_str()],
        _ => usage(&bin),
    };

    let mut img = cli::open_image(&bin, image_path);
    let result = if symlink {
        run_symlink(&mut img, src, dest.as_bytes())
    } else {
        run_hardlink(&mut img, src.as_bytes(), dest.as_bytes())
    };
    if let Err(e) = result {
        error::fail(&bin, e);
    }

    if let Err(e) = img.sync() {
        error::io_fatal(&bin, format!("failed to sync image: {e}"));
    }
}

fn usage(bin: &str) -> ! {
    eprintln!("usage: {bin} <image> [-s] <src_abs> <dest_abs>");
    std::process::exit(1);
}

fn run_hardlink(img: &mut Image, src: &[u8], dest: &[u8]) -> Result<(), CliError> {
    let src_inode = path::resolve(img, src);
    if src_inode == 0 {
        return Err(CliError::PathInvalid);
    }
    if inode::is_dir(img.inode(src_inode)) {
        return Err(CliError::IsDirectory);
    }

    let (parent, name) = new_entry_dest(img, dest)?;
    let file_type = inode::file_type_for_mode(img.inode(src_inode).mode);
    dirent::create(img, parent, src_inode, &name, file_type);
    Ok(())
}

fn run_symlink(img: &mut Image, target: &str, dest: &[u8]) -> Result<(), CliError> {
    let (parent, name) = new_entry_dest(img, dest)?;
    let inode_num = bitmap::allocate_inode(img);
    dirent::create(img, parent, inode_num, &name, FT_SYMLINK);
    data::write_file_data(img, inode_num, target.as_bytes())
}

/// `resolve_new_entry`, plus the trailing-slash rejection `ln`'s own
/// destinations need: neither a hard link nor a symlink ever creates a
/// directory, so a trailing slash on a not-yet-existing destination can
/// never be satisfied.
fn new_entry_dest(img: &Image, dest: &[u8]) -> Result<(u32, Vec<u8>), CliError> {
    if path::has_trailing_slash(dest) {
        return Err(CliError::PathInvalid);
    }
    cli::resolve_new_entry(img, dest)
}
