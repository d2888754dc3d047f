//! Recursive resource lifecycle across directory trees.
//!
//! Mirrors `free_resources`, `reallocate_resources`, and `is_recoverable`
//! from `ext2_utils.c`. Cycles cannot exist in a well-formed tree; the
//! dotted entries ("." and "..") are excluded from recursion explicitly so
//! a directory's self-reference and parent-reference never cause one.

use crate::bitmap;
use crate::image::Image;
use crate::inode::{is_dir, now};
use crate::layout::{BLOCK_SIZE, INDIRECT_BLOCK_IDX, NUM_DIRECT_BLOCKS, PTRS_PER_INDIRECT};

/// Collects `(name, inode_number)` for every live entry across `parent`'s
/// direct blocks.
fn collect_children(img: &Image, parent: u32) -> Vec<(Vec<u8>, u32)> {
    let mut out = Vec::new();
    for block_num in crate::dirent::collect_direct_blocks(img, parent) {
        let mut pos = 0usize;
        loop {
            let entry = img.entry(block_num, pos);
            let rec_len = entry.rec_len as usize;
            let inode_num = entry.inode;
            let name_len = entry.name_len;
            if rec_len == 0 {
                break;
            }
            if inode_num != 0 {
                out.push((img.entry_name(block_num, pos, name_len).to_vec(), inode_num));
            }
            if pos + rec_len >= BLOCK_SIZE {
                break;
            }
            pos += rec_len;
        }
    }
    out
}

/// Reads the nonzero block numbers packed into an indirect block, stopping
/// at the first zero slot (entries are always filled contiguously by the
/// writer).
pub(crate) fn read_indirect_entries(img: &Image, indirect_block_num: u32) -> Vec<u32> {
    let block = img.block(indirect_block_num);
    let mut out = Vec::new();
    for i in 0..PTRS_PER_INDIRECT {
        let off = i * 4;
        let b = u32::from_le_bytes([block[off], block[off + 1], block[off + 2], block[off + 3]]);
        if b == 0 {
            break;
        }
        out.push(b);
    }
    out
}

pub(crate) fn direct_blocks_of(img: &Image, inode_num: u32) -> Vec<u32> {
    img.inode(inode_num).block[0..NUM_DIRECT_BLOCKS]
        .iter()
        .copied()
        .filter(|&b| b != 0)
        .collect()
}

fn is_dotted(name: &[u8]) -> bool {
    name == b"." || name == b".."
}

/// Frees `inode_num` and, if it is a directory, every descendant that is
/// wholly owned by it: non-dotted subdirectories always recurse; plain
/// files recurse only when this is their last link. Dotted entries and
/// extra-linked files just lose one link. Deallocates the inode's own
/// number, its direct blocks, and (if present) its indirect block and the
/// blocks it names — data bytes are left as-is. Finally stamps
/// `deletion_time` and drops the inode's own link count by one.
pub fn free_resources(img: &mut Image, inode_num: u32) {
    if is_dir(img.inode(inode_num)) {
        for (name, child) in collect_children(img, inode_num) {
            let dotted = is_dotted(&name);
            let child_is_dir = is_dir(img.inode(child));
            let child_links = img.inode(child).links_count;
            if !dotted && (child_is_dir || child_links == 1) {
                free_resources(img, child);
            } else {
                img.inode_mut(child).links_count -= 1;
            }
        }
    }

    let direct_blocks = direct_blocks_of(img, inode_num);
    let indirect_block_num = img.inode(inode_num).block[INDIRECT_BLOCK_IDX];

    bitmap::deallocate_inode(img, inode_num);
    for b in direct_blocks {
        bitmap::deallocate_block(img, b);
    }
    if indirect_block_num != 0 {
        for b in read_indirect_entries(img, indirect_block_num) {
            bitmap::deallocate_block(img, b);
        }
        bitmap::deallocate_block(img, indirect_block_num);
    }

    let inode = img.inode_mut(inode_num);
    inode.dtime = now();
    inode.links_count = inode.links_count.saturating_sub(1);
}

/// Restores `inode_num`: reclaims its inode bitmap bit (aborting this
/// subtree if it is already in use elsewhere), then its data blocks,
/// mirroring the structure `free_resources` tore down. Recurses into
/// directories under the same dotted/link-count gating; descendants this
/// call can't reclaim are simply left alone, making this safe to call as
/// a best-effort operation after `is_recoverable` reports a partial tree.
pub fn reallocate_resources(img: &mut Image, inode_num: u32) {
    if !bitmap::try_allocate_inode(img, inode_num) {
        return;
    }

    for b in direct_blocks_of(img, inode_num) {
        bitmap::try_allocate_block(img, b);
    }

    let indirect_block_num = img.inode(inode_num).block[INDIRECT_BLOCK_IDX];
    if indirect_block_num != 0 {
        bitmap::try_allocate_block(img, indirect_block_num);
        for b in read_indirect_entries(img, indirect_block_num) {
            bitmap::try_allocate_block(img, b);
        }
    }

    if is_dir(img.inode(inode_num)) {
        for (name, child) in collect_children(img, inode_num) {
            let dotted = is_dotted(&name);
            if dotted {
                continue;
            }
            let child_is_dir = is_dir(img.inode(child));
            let child_links = img.inode(child).links_count;
            if child_is_dir || child_links == 1 {
                reallocate_resources(img, child);
            } else {
                img.inode_mut(child).links_count += 1;
            }
        }
    }

    img.inode_mut(inode_num).dtime = 0;
    img.inode_mut(inode_num).links_count += 1;
    if is_dir(img.inode(inode_num)) {
        img.group_desc_mut().used_dirs_count += 1;
    }
}

/// Tells whether `inode_num`'s subtree can currently be restored: `1` if
/// its own inode bit and every data block bit are free and (for a
/// directory) every non-dotted child is also recoverable; `0` if `inode_num`
/// itself is blocked and `is_first` is true (nothing could be restored at
/// all); `-1` if some descendant is blocked but `inode_num` itself is free
/// (a partial restore is possible).
pub fn is_recoverable(img: &Image, inode_num: u32, is_first: bool) -> i32 {
    if !own_bits_free(img, inode_num) {
        return if is_first { 0 } else { -1 };
    }

    if is_dir(img.inode(inode_num)) {
        for (name, child) in collect_children(img, inode_num) {
            if is_dotted(&name) {
                continue;
            }
            if is_recoverable(img, child, false) == -1 {
                return -1;
            }
        }
    }

    1
}

fn own_bits_free(img: &Image, inode_num: u32) -> bool {
    if bitmap::inode_in_use(img, inode_num) {
        return false;
    }
    for b in direct_blocks_of(img, inode_num) {
        if bitmap::block_in_use(img, b) {
            return false;
        }
    }
    let indirect_block_num = img.inode(inode_num).block[INDIRECT_BLOCK_IDX];
    if indirect_block_num != 0 {
        if bitmap::block_in_use(img, indirect_block_num) {
            return false;
        }
        for b in read_indirect_entries(img, indirect_block_num) {
            if bitmap::block_in_use(img, b) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirent;
    use crate::fixture;
    use crate::layout::{FT_DIR, FT_REG_FILE, ROOT_INODE};

    #[test]
    fn free_then_reallocate_round_trips_a_leaf_file() {
        let mut img = fixture::build();
        let f = bitmap::allocate_inode(&mut img);
        dirent::create(&mut img, ROOT_INODE, f, b"f", FT_REG_FILE);
        crate::data::write_file_data(&mut img, f, b"payload").unwrap();

        let free_inodes_before = img.superblock().free_inodes_count;
        let free_blocks_before = img.superblock().free_blocks_count;

        free_resources(&mut img, f);
        assert!(!bitmap::inode_in_use(&img, f));
        assert_eq!(is_recoverable(&img, f, true), 1);

        reallocate_resources(&mut img, f);
        assert!(bitmap::inode_in_use(&img, f));
        assert_eq!(img.superblock().free_inodes_count, free_inodes_before);
        assert_eq!(img.superblock().free_blocks_count, free_blocks_before);
        assert_eq!(crate::data::read_file_data(&img, f), b"payload");
    }

    #[test]
    fn removing_a_directory_frees_its_dotted_children_too() {
        let mut img = fixture::build();
        let a = bitmap::allocate_inode(&mut img);
        dirent::create(&mut img, ROOT_INODE, a, b"a", FT_DIR);
        let inodes_before = img.superblock().free_inodes_count;
        let blocks_before = img.superblock().free_blocks_count;

        dirent::remove(&mut img, ROOT_INODE, b"a");

        assert_eq!(img.superblock().free_inodes_count, inodes_before + 1);
        assert_eq!(img.superblock().free_blocks_count, blocks_before + 1);
    }
}
