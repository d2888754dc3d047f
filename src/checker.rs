//! Whole-image consistency checker.
//!
//! Mirrors the two-pass checker described in `ext2_checker.c`: first
//! reconciling the free-counter fields against the bitmaps, then walking
//! the directory tree from the root fixing file-type mismatches, missing
//! bitmap bits, and stale deletion times.

use crate::bitmap;
use crate::dirent;
use crate::image::Image;
use crate::inode;
use crate::layout::{BLOCK_SIZE, INDIRECT_BLOCK_IDX, ROOT_INODE};
use crate::lifecycle::{direct_blocks_of, read_indirect_entries};

/// Runs both passes over `img`, mutating it in place, and returns one
/// human-readable line per fix applied (empty if the image was already
/// consistent).
pub fn check(img: &mut Image) -> Vec<String> {
    let mut fixes = Vec::new();
    reconcile_counters(img, &mut fixes);
    walk_entries(img, ROOT_INODE, true, &mut fixes);
    fixes
}

fn reconcile_counters(img: &mut Image, fixes: &mut Vec<String>) {
    let blocks_count = img.superblock().blocks_count as usize;
    let inodes_count = img.superblock().inodes_count as usize;

    let free_blocks = bitmap::count_free(img.block_bitmap(), blocks_count / 8);
    let free_inodes = bitmap::count_free(img.inode_bitmap(), inodes_count / 8);

    if img.superblock().free_blocks_count != free_blocks {
        let diff = (img.superblock().free_blocks_count as i64 - free_blocks as i64).abs();
        img.superblock_mut().free_blocks_count = free_blocks;
        fixes.push(format!("superblock free blocks count off by {diff}, corrected"));
    }
    if img.group_desc().free_blocks_count as u32 != free_blocks {
        let diff = (img.group_desc().free_blocks_count as i64 - free_blocks as i64).abs();
        img.group_desc_mut().free_blocks_count = free_blocks as u16;
        fixes.push(format!("group descriptor free blocks count off by {diff}, corrected"));
    }
    if img.superblock().free_inodes_count != free_inodes {
        let diff = (img.superblock().free_inodes_count as i64 - free_inodes as i64).abs();
        img.superblock_mut().free_inodes_count = free_inodes;
        fixes.push(format!("superblock free inodes count off by {diff}, corrected"));
    }
    if img.group_desc().free_inodes_count as u32 != free_inodes {
        let diff = (img.group_desc().free_inodes_count as i64 - free_inodes as i64).abs();
        img.group_desc_mut().free_inodes_count = free_inodes as u16;
        fixes.push(format!("group descriptor free inodes count off by {diff}, corrected"));
    }
}

/// Walks every entry of `dir_inode`'s direct blocks. `is_first` is true
/// only for the root's own top-level call, where dotted entries are
/// checked (they are the root's only self-representation) but never
/// recursed into. For every other directory, dotted entries are skipped
/// entirely — the parent's non-dotted entry already accounts for them.
fn walk_entries(img: &mut Image, dir_inode: u32, is_first: bool, fixes: &mut Vec<String>) {
    for block_num in dirent::collect_direct_blocks(img, dir_inode) {
        let mut pos = 0usize;
        loop {
            let entry = img.entry(block_num, pos);
            let rec_len = entry.rec_len as usize;
            let inode_num = entry.inode;
            let name_len = entry.name_len;
            let file_type = entry.file_type;
            if rec_len == 0 {
                break;
            }

            if inode_num != 0 {
                let name = img.entry_name(block_num, pos, name_len).to_vec();
                let dotted = name == b"." || name == b"..";
                if is_first || !dotted {
                    check_entry(img, block_num, pos, inode_num, file_type, fixes);
                    if inode::is_dir(img.inode(inode_num)) && !dotted {
                        walk_entries(img, inode_num, false, fixes);
                    }
                }
            }

            if pos + rec_len >= BLOCK_SIZE {
                break;
            }
            pos += rec_len;
        }
    }
}

fn check_entry(
    img: &mut Image,
    block_num: u32,
    pos: usize,
    inode_num: u32,
    file_type: u8,
    fixes: &mut Vec<String>,
) {
    let expected_type = inode::file_type_for_mode(img.inode(inode_num).mode);
    if file_type != expected_type {
        img.entry_mut(block_num, pos).file_type = expected_type;
        fixes.push(format!(
            "directory entry at block {block_num} offset {pos}: file type fixed to match inode {inode_num}"
        ));
    }

    if !bitmap::inode_in_use(img, inode_num) {
        let (byte, bit) = bitmap::bit_index(inode_num);
        img.inode_bitmap_mut()[byte] |= 1 << bit;
        img.superblock_mut().free_inodes_count -= 1;
        img.group_desc_mut().free_inodes_count -= 1;
        fixes.push(format!("inode {inode_num}: missing inode bitmap bit set"));
    }

    if img.inode(inode_num).dtime != 0 {
        img.inode_mut(inode_num).dtime = 0;
        fixes.push(format!("inode {inode_num}: stale nonzero deletion time cleared"));
    }

    for b in direct_blocks_of(img, inode_num) {
        check_block_bit(img, b, fixes);
    }
    let indirect_block_num = img.inode(inode_num).block[INDIRECT_BLOCK_IDX];
    if indirect_block_num != 0 {
        check_block_bit(img, indirect_block_num, fixes);
        for b in read_indirect_entries(img, indirect_block_num) {
            check_block_bit(img, b, fixes);
        }
    }
}

fn check_block_bit(img: &mut Image, block_num: u32, fixes: &mut Vec<String>) {
    if !bitmap::block_in_use(img, block_num) {
        let (byte, bit) = bitmap::bit_index(block_num);
        img.block_bitmap_mut()[byte] |= 1 << bit;
        img.superblock_mut().free_blocks_count -= 1;
        img.group_desc_mut().free_blocks_count -= 1;
        fixes.push(format!("block {block_num}: missing block bitmap bit set"));
    }
}

/// Formats a checker run's fixes the way the `ext2_checker` binary prints
/// them to stdout: one line per fix, or the all-clear message.
pub fn format_report(fixes: &[String]) -> String {
    if fixes.is_empty() {
        "No file system inconsistencies detected!".to_string()
    } else {
        let mut out = String::new();
        for fix in fixes {
            out.push_str(fix);
            out.push('\n');
        }
        out.push_str(&format!("{} fix(es) applied.", fixes.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn fresh_image_has_no_inconsistencies() {
        let mut img = fixture::build();
        assert!(check(&mut img).is_empty());
    }

    #[test]
    fn corrupted_free_blocks_count_is_repaired_and_idempotent() {
        let mut img = fixture::build();
        img.superblock_mut().free_blocks_count += 5;

        let fixes = check(&mut img);
        assert_eq!(fixes.len(), 1);

        let bitmap_free = bitmap::count_free(img.block_bitmap(), (img.superblock().blocks_count / 8) as usize);
        assert_eq!(img.superblock().free_blocks_count, bitmap_free);

        assert!(check(&mut img).is_empty());
    }

    #[test]
    fn missing_inode_bitmap_bit_is_repaired() {
        let mut img = fixture::build();
        let f = bitmap::allocate_inode(&mut img);
        dirent::create(&mut img, ROOT_INODE, f, b"f", crate::layout::FT_REG_FILE);

        // Corrupt: clear the bit we just set, but leave the counters and
        // the directory entry alone, simulating a stray inconsistency.
        let (byte, bit) = bitmap::bit_index(f);
        img.inode_bitmap_mut()[byte] &= !(1 << bit);
        img.superblock_mut().free_inodes_count += 1;
        img.group_desc_mut().free_inodes_count += 1;

        let fixes = check(&mut img);
        assert!(!fixes.is_empty());
        assert!(bitmap::inode_in_use(&img, f));
        assert!(check(&mut img).is_empty());
    }
}
