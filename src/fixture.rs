//! Builds a fresh, self-consistent image in memory for tests.
//!
//! Not one of the six end-user commands — the spec's commands always
//! operate on an already-formatted image — but the unit and integration
//! tests need a starting point without shelling out to a real `mkfs`.
//! Grounded on `mkfs/src/ext2.rs`'s `Ext2Factory::create`, reduced to this
//! crate's fixed parameters: one block group, 1024-byte blocks, 128
//! blocks, 32 inodes.

use crate::bitmap;
use crate::dirent;
use crate::image::Image;
use crate::inode;
use crate::layout::{BLOCK_SIZE, DISK_BLOCKS, DISK_SIZE, FT_DIR, ROOT_INODE, SECTOR_SIZE};
use memmap2::MmapMut;

/// Number of inodes in the fixed fixture layout.
pub const INODES_COUNT: u32 = 32;

/// Highest block number the bitmap addresses. Block 0 (the boot block) is
/// never addressable under the `value - 1` bit convention — bit `i`
/// refers to block `i + 1`, and there is no value `0` — so the logical
/// block count handed to the superblock is one less than the image's
/// physical block count.
pub const BLOCKS_COUNT: u32 = (DISK_BLOCKS - 1) as u32;

const BLOCK_BITMAP_BLOCK: u32 = 3;
const INODE_BITMAP_BLOCK: u32 = 4;
const INODE_TABLE_START: u32 = 5;
const ROOT_DATA_BLOCK: u32 = 9;
/// First block number available to the allocator; blocks 1..=9 are the
/// superblock, group descriptor, both bitmaps, the (4-block) inode table,
/// and the root directory's data block.
const FIRST_FREE_BLOCK: u32 = 10;

/// Builds the in-memory image described above.
pub fn build() -> Image {
    let map = MmapMut::map_anon(DISK_SIZE).expect("anonymous mapping for test fixture");
    let mut img = Image::from_mmap(map);

    {
        let sb = img.superblock_mut();
        *sb = unsafe { std::mem::zeroed() };
        sb.inodes_count = INODES_COUNT;
        sb.blocks_count = BLOCKS_COUNT;
        sb.first_data_block = 1;
        sb.blocks_per_group = BLOCKS_COUNT;
        sb.inodes_per_group = INODES_COUNT;
        sb.magic = 0xEF53;
        sb.rev_level = 0;
    }
    {
        let gd = img.group_desc_mut();
        *gd = unsafe { std::mem::zeroed() };
        gd.block_bitmap = BLOCK_BITMAP_BLOCK;
        gd.inode_bitmap = INODE_BITMAP_BLOCK;
        gd.inode_table = INODE_TABLE_START;
    }

    for block_num in 1..FIRST_FREE_BLOCK {
        let (byte, bit) = bitmap::bit_index(block_num);
        img.block_bitmap_mut()[byte] |= 1 << bit;
    }
    let reserved_blocks = FIRST_FREE_BLOCK - 1;
    img.superblock_mut().free_blocks_count = BLOCKS_COUNT - reserved_blocks;
    img.group_desc_mut().free_blocks_count = (BLOCKS_COUNT - reserved_blocks) as u16;

    for inode_num in 1..=10u32 {
        let (byte, bit) = bitmap::bit_index(inode_num);
        img.inode_bitmap_mut()[byte] |= 1 << bit;
    }
    img.superblock_mut().free_inodes_count = INODES_COUNT - 10;
    img.group_desc_mut().free_inodes_count = (INODES_COUNT - 10) as u16;
    img.group_desc_mut().used_dirs_count = 0;

    inode::init_inode(&mut img, ROOT_INODE, FT_DIR);

    // Wire the root's pre-reserved data block directly (it isn't handed
    // out by the allocator) and seed it with "." as the sole entry, the
    // same shape `dirent::create`'s new-block branch would leave behind.
    {
        let root = img.inode_mut(ROOT_INODE);
        root.block[0] = ROOT_DATA_BLOCK;
        root.size = BLOCK_SIZE as u32;
        root.blocks = (BLOCK_SIZE / SECTOR_SIZE) as u32;
    }
    {
        let entry = img.entry_mut(ROOT_DATA_BLOCK, 0);
        entry.rec_len = BLOCK_SIZE as u16;
        entry.inode = ROOT_INODE;
        entry.name_len = 1;
        entry.file_type = FT_DIR;
    }
    img.write_entry_name(ROOT_DATA_BLOCK, 0, b".");
    img.inode_mut(ROOT_INODE).links_count += 1;

    // ".." splits the slack "." just left behind, via the ordinary entry
    // engine, exactly as it would for any other directory's parent entry.
    dirent::create(&mut img, ROOT_INODE, ROOT_INODE, b"..", FT_DIR);
    img.group_desc_mut().used_dirs_count = 1;

    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_fixture_is_internally_consistent() {
        let img = build();
        assert_eq!(dirent::find(&img, ROOT_INODE, b"."), ROOT_INODE);
        assert_eq!(dirent::find(&img, ROOT_INODE, b".."), ROOT_INODE);
        assert_eq!(img.inode(ROOT_INODE).links_count, 3);

        let free_blocks_by_bitmap =
            bitmap::count_free(img.block_bitmap(), (BLOCKS_COUNT / 8) as usize);
        assert_eq!(img.superblock().free_blocks_count, free_blocks_by_bitmap);

        let free_inodes_by_bitmap =
            bitmap::count_free(img.inode_bitmap(), (INODES_COUNT / 8) as usize);
        assert_eq!(img.superblock().free_inodes_count, free_inodes_by_bitmap);
    }
}
