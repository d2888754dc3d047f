//! Inode data block allocation and the byte-copying write pass.
//!
//! Mirrors the allocation and write passes of `write_to_inode` in
//! `ext2_utils.c`: up to 12 direct blocks, then one singly-indirect block
//! holding up to 256 further block numbers.

use crate::bitmap;
use crate::error::CliError;
use crate::image::Image;
use crate::layout::{BLOCK_SIZE, INDIRECT_BLOCK_IDX, NUM_DIRECT_BLOCKS, PTRS_PER_INDIRECT, SECTOR_SIZE};

/// Largest file this layout can represent: 12 direct blocks plus 256
/// blocks reachable through the single indirect block.
pub const MAX_FILE_SIZE: usize = (NUM_DIRECT_BLOCKS + PTRS_PER_INDIRECT) * BLOCK_SIZE;

/// Rounds `len` bytes up to a whole number of blocks.
fn ceil_division(len: usize, unit: usize) -> usize {
    (len + unit - 1) / unit
}

/// Number of blocks `write_file_data` would need to allocate for a file of
/// `len` bytes, including the indirect pointer block itself when needed.
pub fn required_block_count(len: usize) -> usize {
    let data_blocks = ceil_division(len, BLOCK_SIZE);
    if data_blocks > NUM_DIRECT_BLOCKS {
        data_blocks + 1
    } else {
        data_blocks
    }
}

/// Allocates data blocks for `inode_num` and copies `data` into them,
/// filling direct block slots first and then the singly-indirect block.
/// Rejects `data` that exceeds the representable maximum or the current
/// free-block budget (reserving one block for the indirect pointer block
/// when the file needs it) without allocating anything.
pub fn write_file_data(img: &mut Image, inode_num: u32, data: &[u8]) -> Result<(), CliError> {
    if data.len() > MAX_FILE_SIZE {
        return Err(CliError::NoSpace);
    }
    let needed = required_block_count(data.len());
    if needed > img.superblock().free_blocks_count as usize {
        return Err(CliError::NoSpace);
    }

    let data_blocks = ceil_division(data.len(), BLOCK_SIZE);
    let direct_needed = data_blocks.min(NUM_DIRECT_BLOCKS);

    let mut direct = Vec::with_capacity(direct_needed);
    for _ in 0..direct_needed {
        direct.push(bitmap::allocate_block(img));
    }

    let mut indirect_block_num = 0u32;
    let mut indirect = Vec::new();
    if data_blocks > NUM_DIRECT_BLOCKS {
        indirect_block_num = bitmap::allocate_block(img);
        for _ in 0..(data_blocks - NUM_DIRECT_BLOCKS) {
            indirect.push(bitmap::allocate_block(img));
        }
    }

    let allocated_blocks = direct.len() + indirect.len() + usize::from(indirect_block_num != 0);

    {
        let inode = img.inode_mut(inode_num);
        for (i, &b) in direct.iter().enumerate() {
            inode.block[i] = b;
        }
        if indirect_block_num != 0 {
            inode.block[INDIRECT_BLOCK_IDX] = indirect_block_num;
        }
        inode.size = data.len() as u32;
        inode.blocks = (allocated_blocks * (BLOCK_SIZE / SECTOR_SIZE)) as u32;
    }

    if indirect_block_num != 0 {
        let ib = img.block_mut(indirect_block_num);
        for (i, &b) in indirect.iter().enumerate() {
            let off = i * 4;
            ib[off..off + 4].copy_from_slice(&b.to_le_bytes());
        }
    }

    let mut written = 0usize;
    for &block_num in direct.iter().chain(indirect.iter()) {
        if written >= data.len() {
            break;
        }
        let chunk_len = (data.len() - written).min(BLOCK_SIZE);
        img.block_mut(block_num)[..chunk_len].copy_from_slice(&data[written..written + chunk_len]);
        written += chunk_len;
    }

    Ok(())
}

/// Reads back the full `size` bytes of `inode_num`'s data, in the same
/// direct-then-indirect block order used by the writer. Used by `cp`'s
/// destination-is-directory basename resolution is not part of this; this
/// is purely the data-layout reader counterpart to `write_file_data`,
/// exercised by the restore/round-trip tests.
pub fn read_file_data(img: &Image, inode_num: u32) -> Vec<u8> {
    let inode = img.inode(inode_num);
    let size = inode.size as usize;
    let mut out = Vec::with_capacity(size);

    for i in 0..NUM_DIRECT_BLOCKS {
        if out.len() >= size {
            break;
        }
        let block_num = inode.block[i];
        if block_num == 0 {
            break;
        }
        let remaining = size - out.len();
        let chunk_len = remaining.min(BLOCK_SIZE);
        out.extend_from_slice(&img.block(block_num)[..chunk_len]);
    }

    if out.len() < size {
        let indirect_block_num = img.inode(inode_num).block[INDIRECT_BLOCK_IDX];
        if indirect_block_num != 0 {
            let ib = img.block(indirect_block_num).to_vec();
            for slot in ib.chunks_exact(4) {
                if out.len() >= size {
                    break;
                }
                let block_num = u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
                if block_num == 0 {
                    break;
                }
                let remaining = size - out.len();
                let chunk_len = remaining.min(BLOCK_SIZE);
                out.extend_from_slice(&img.block(block_num)[..chunk_len]);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn round_trips_small_file() {
        let mut img = fixture::build();
        let inode_num = bitmap::allocate_inode(&mut img);
        crate::inode::init_inode(&mut img, inode_num, crate::layout::FT_REG_FILE);
        let data = b"hello, ext2".repeat(100);
        write_file_data(&mut img, inode_num, &data).unwrap();
        assert_eq!(read_file_data(&img, inode_num), data);
    }

    #[test]
    fn rejects_too_large_for_max_size() {
        let mut img = fixture::build();
        let inode_num = bitmap::allocate_inode(&mut img);
        crate::inode::init_inode(&mut img, inode_num, crate::layout::FT_REG_FILE);
        let data = vec![0u8; MAX_FILE_SIZE + 1];
        assert_eq!(write_file_data(&mut img, inode_num, &data), Err(CliError::NoSpace));
    }

    #[test]
    fn required_block_count_reserves_indirect_block() {
        assert_eq!(required_block_count(BLOCK_SIZE * 12), 12);
        assert_eq!(required_block_count(BLOCK_SIZE * 12 + 1), 14);
    }
}
