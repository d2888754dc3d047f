//! `ext2_checker <image>` — reconciles free counters and repairs the
//! directory tree, always exiting 0.

use ext2fs::{checker, cli, error};

fn main() {
    let (bin, args) = cli::args();
    let Some(image_path) = args.first() else {
        eprintln!("usage: {bin} <image>");
        std::process::exit(1);
    };

    let mut img = cli::open_image(&bin, image_path);
    let fixes = checker::check(&mut img);
    println!("{}", checker::format_report(&fixes));

    if let Err(e) = img.sync() {
        error::io_fatal(&bin, format!("failed to sync image: {e}"));
    }
}
