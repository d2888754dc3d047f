//! `ext2_restore <image> [-r] <absolute_path>` — recovers a removed entry
//! from the recovery gap left by predecessor coalescing. Exit 0 / ENOENT
//! (also used for a best-effort partial restore) / EISDIR.

use ext2fs::error::CliError;
use ext2fs::image::Image;
use ext2fs::{cli, dirent, error, inode, lifecycle, path};

fn main() {
    let (bin, args) = cli::args();
    if args.is_empty() {
        usage(&bin);
    }
    let image_path = &args[0];
    let rest = &args[1..];
    let (recursive, rest) = match rest.first().map(String::as_str) {
        Some("-r") => (true, &rest[1..]),
        _ => (false, rest),
    };
    let [target] = match rest {
        [a] => [a.as_str()],
        _ => usage(&bin),
    };

    let mut img = cli::open_image(&bin, image_path);
    if let Err(e) = run(&mut img, recursive, target.as_bytes()) {
        error::fail(&bin, e);
    }

    if let Err(e) = img.sync() {
        error::io_fatal(&bin, format!("failed to sync image: {e}"));
    }
}

fn usage(bin: &str) -> ! {
    eprintln!("usage: {bin} <image> [-r] <absolute_path>");
    std::process::exit(1);
}

fn run(img: &mut Image, recursive: bool, target: &[u8]) -> Result<(), CliError> {
    let (parent_path, name) = path::split_parent_and_name(target).ok_or(CliError::PathInvalid)?;
    let parent = path::resolve(img, parent_path);
    if parent == 0 || !inode::is_dir(img.inode(parent)) {
        return Err(CliError::PathInvalid);
    }

    let target_inode = dirent::find_removed(img, parent, name);
    if target_inode == 0 {
        return Err(CliError::PathInvalid);
    }
    if inode::is_dir(img.inode(target_inode)) && !recursive {
        return Err(CliError::IsDirectory);
    }

    match lifecycle::is_recoverable(img, target_inode, true) {
        0 => Err(CliError::PathInvalid),
        1 => {
            dirent::splice_removed(img, parent, name);
            lifecycle::reallocate_resources(img, target_inode);
            Ok(())
        }
        _ => {
            dirent::splice_removed(img, parent, name);
            lifecycle::reallocate_resources(img, target_inode);
            Err(CliError::PartialRestore)
        }
    }
}
