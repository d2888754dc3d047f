//! Inode initialization and type/mode mapping.
//!
//! Mirrors `init_inode`, `get_imode`, `get_file_type`, and `is_dir` from
//! `ext2_utils.c`.

use crate::image::Image;
use crate::layout::{Inode, FT_DIR, FT_REG_FILE, FT_SYMLINK, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as a 32-bit unix timestamp, matching the
/// original's `time(NULL)` call.
pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Maps a directory-entry file-type code to the corresponding inode mode bits.
pub fn mode_for_file_type(file_type: u8) -> u16 {
    match file_type {
        FT_DIR => S_IFDIR,
        FT_SYMLINK => S_IFLNK,
        _ => S_IFREG,
    }
}

/// Maps an inode's mode bits back to a directory-entry file-type code.
pub fn file_type_for_mode(mode: u16) -> u8 {
    match mode & S_IFMT {
        S_IFDIR => FT_DIR,
        S_IFLNK => FT_SYMLINK,
        _ => FT_REG_FILE,
    }
}

/// Tells whether `inode`'s mode bits mark it a directory.
pub fn is_dir(inode: &Inode) -> bool {
    inode.mode & S_IFMT == S_IFDIR
}

/// Initializes a freshly allocated inode for a new file of `file_type`.
/// Zeroes every field, sets the mode, creation time, and a link count of 1.
/// If the new inode is a directory, bumps the group descriptor's
/// used-directories count.
pub fn init_inode(img: &mut Image, inode_num: u32, file_type: u8) {
    let ts = now();
    {
        let inode = img.inode_mut(inode_num);
        *inode = unsafe { std::mem::zeroed() };
        inode.mode = mode_for_file_type(file_type);
        inode.ctime = ts;
        inode.mtime = ts;
        inode.atime = ts;
        inode.dtime = 0;
        inode.links_count = 1;
    }
    if file_type == FT_DIR {
        img.group_desc_mut().used_dirs_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_mapping_round_trips() {
        for ft in [FT_REG_FILE, FT_DIR, FT_SYMLINK] {
            let mode = mode_for_file_type(ft);
            assert_eq!(file_type_for_mode(mode), ft);
        }
    }

    #[test]
    fn is_dir_checks_type_bits() {
        let mut inode: Inode = unsafe { std::mem::zeroed() };
        inode.mode = S_IFDIR;
        assert!(is_dir(&inode));
        inode.mode = S_IFREG;
        assert!(!is_dir(&inode));
    }
}
