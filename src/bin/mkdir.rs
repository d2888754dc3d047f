//! `ext2_mkdir <image> <absolute_path>` — creates an empty directory.
//! Exit 0 / ENOENT / ENAMETOOLONG / EEXIST.

use ext2fs::error::CliError;
use ext2fs::image::Image;
use ext2fs::layout::FT_DIR;
use ext2fs::{bitmap, cli, dirent, error};

fn main() {
    let (bin, args) = cli::args();
    let [image_path, dest] = match &args[..] {
        [a, b] => [a, b],
        _ => {
            eprintln!("usage: {bin} <image> <absolute_path>");
            std::process::exit(1);
        }
    };

    let mut img = cli::open_image(&bin, image_path);
    if let Err(e) = run(&mut img, dest.as_bytes()) {
        error::fail(&bin, e);
    }

    if let Err(e) = img.sync() {
        error::io_fatal(&bin, format!("failed to sync image: {e}"));
    }
}

fn run(img: &mut Image, dest: &[u8]) -> Result<(), CliError> {
    let (parent, name) = cli::resolve_new_entry(img, dest)?;
    let inode_num = bitmap::allocate_inode(img);
    dirent::create(img, parent, inode_num, &name, FT_DIR);
    Ok(())
}
