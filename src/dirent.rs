//! Packed variable-length directory entry engine.
//!
//! Mirrors `find_entry`, `create_entry`, `remove_entry`, and
//! `find_removed_entry` from `ext2_utils.c`: entries are walked within a
//! directory's direct blocks by `rec_len`, insertion splits the last
//! entry's slack, and removal either zeros a first-in-block entry's inode
//! field or coalesces into the predecessor's `rec_len`, leaving a
//! recoverable gap.

use crate::image::Image;
use crate::layout::{pad_rec_len, DirEntryHeader, BLOCK_SIZE, FT_DIR, NUM_DIRECT_BLOCKS, SECTOR_SIZE};
use std::mem::size_of;

/// Collects the non-zero direct block numbers of `inode_num`, in order,
/// stopping at the first zero pointer.
pub(crate) fn collect_direct_blocks(img: &Image, inode_num: u32) -> Vec<u32> {
    let inode = img.inode(inode_num);
    inode
        .block
        .iter()
        .take(NUM_DIRECT_BLOCKS)
        .copied()
        .take_while(|&b| b != 0)
        .collect()
}

/// Finds `name` among `parent`'s live entries; returns the inode number or
/// `0` if absent.
pub fn find(img: &Image, parent: u32, name: &[u8]) -> u32 {
    for block_num in collect_direct_blocks(img, parent) {
        let mut pos = 0usize;
        loop {
            let entry = img.entry(block_num, pos);
            let rec_len = entry.rec_len as usize;
            let inode_num = entry.inode;
            let name_len = entry.name_len;
            if rec_len == 0 {
                break;
            }
            if inode_num != 0 && name_len as usize == name.len() {
                let entry_name = img.entry_name(block_num, pos, name_len);
                if entry_name == name {
                    return inode_num;
                }
            }
            if pos + rec_len >= BLOCK_SIZE {
                break;
            }
            pos += rec_len;
        }
    }
    0
}

/// Returns the byte offset of the last (rec_len-closing) entry in
/// `block_num`.
fn last_entry_pos(img: &Image, block_num: u32) -> usize {
    let mut pos = 0usize;
    loop {
        let rec_len = img.entry(block_num, pos).rec_len as usize;
        if pos + rec_len >= BLOCK_SIZE || rec_len == 0 {
            return pos;
        }
        pos += rec_len;
    }
}

/// Creates a directory entry named `name` in `parent` pointing at
/// `inode_num`, typed `file_type`. Initializes `inode_num` if it is not
/// already live, otherwise bumps its link count. Recursively creates the
/// "." and ".." entries when `file_type` is a directory and `name` is
/// neither dotted entry.
///
/// Aborts the process if the directory has no slack to split and no free
/// direct block pointer slot remains; the spec leaves this case undefined
/// and requires treating it as fatal.
pub fn create(img: &mut Image, parent: u32, inode_num: u32, name: &[u8], file_type: u8) {
    let name_needed = pad_rec_len(size_of::<DirEntryHeader>() + name.len());
    let direct_blocks = collect_direct_blocks(img, parent);

    let mut placed: Option<(u32, usize)> = None;
    for block_num in &direct_blocks {
        let block_num = *block_num;
        let last_pos = last_entry_pos(img, block_num);
        let prev = img.entry(block_num, last_pos);
        let prev_name_len = prev.name_len;
        let prev_rec_len = prev.rec_len as usize;
        let prev_actual = pad_rec_len(size_of::<DirEntryHeader>() + prev_name_len as usize);
        let slack = prev_rec_len.saturating_sub(prev_actual);
        if name_needed <= slack {
            img.entry_mut(block_num, last_pos).rec_len = prev_actual as u16;
            let new_pos = last_pos + prev_actual;
            img.entry_mut(block_num, new_pos).rec_len = slack as u16;
            placed = Some((block_num, new_pos));
            break;
        }
    }

    let (block_num, pos) = match placed {
        Some(p) => p,
        None => {
            let k = direct_blocks.len();
            if k >= NUM_DIRECT_BLOCKS {
                eprintln!("fatal: directory inode {inode_num} has no room for a new entry");
                std::process::exit(1);
            }
            let new_block = crate::bitmap::allocate_block(img);
            {
                let inode = img.inode_mut(parent);
                inode.size += BLOCK_SIZE as u32;
                inode.blocks += (BLOCK_SIZE / SECTOR_SIZE) as u32;
                inode.block[k] = new_block;
            }
            let entry = img.entry_mut(new_block, 0);
            entry.rec_len = BLOCK_SIZE as u16;
            entry.inode = 0;
            entry.name_len = 0;
            entry.file_type = 0;
            (new_block, 0)
        }
    };

    {
        let entry = img.entry_mut(block_num, pos);
        entry.inode = inode_num;
        entry.name_len = name.len() as u8;
        entry.file_type = file_type;
    }
    img.write_entry_name(block_num, pos, name);

    let already_live = img.inode(inode_num).links_count != 0;
    if !already_live {
        crate::inode::init_inode(img, inode_num, file_type);
    } else {
        img.inode_mut(inode_num).links_count += 1;
    }

    if file_type == FT_DIR && name != b"." && name != b".." {
        create(img, inode_num, inode_num, b".", FT_DIR);
        create(img, inode_num, parent, b"..", FT_DIR);
    }
}

/// Removes `name` from `parent`. Returns `true` if found and removed.
///
/// A first-in-block match only has its `inode` field zeroed (unrecoverable
/// by design). Any other match has its record length folded into the
/// preceding entry's `rec_len` (predecessor coalescing), leaving its
/// header and name intact in the new slack — the recovery gap.
///
/// After unlinking, runs the usual link-count/lifecycle bookkeeping:
/// directories always free their resources recursively; files with a
/// single remaining link do too; files with more links just lose one.
pub fn remove(img: &mut Image, parent: u32, name: &[u8]) -> bool {
    for block_num in collect_direct_blocks(img, parent) {
        let mut pos = 0usize;
        let mut prev_pos: Option<usize> = None;
        loop {
            let entry = img.entry(block_num, pos);
            let rec_len = entry.rec_len as usize;
            let inode_num = entry.inode;
            let name_len = entry.name_len;
            if rec_len == 0 {
                break;
            }
            let at_end = pos + rec_len >= BLOCK_SIZE;

            if inode_num != 0 && name_len as usize == name.len() {
                let entry_name = img.entry_name(block_num, pos, name_len).to_vec();
                if entry_name == name {
                    match prev_pos {
                        None => {
                            img.entry_mut(block_num, pos).inode = 0;
                        }
                        Some(prev) => {
                            let prev_rec_len = img.entry(block_num, prev).rec_len as usize;
                            img.entry_mut(block_num, prev).rec_len = (prev_rec_len + rec_len) as u16;
                        }
                    }
                    finish_unlink(img, inode_num);
                    return true;
                }
            }

            prev_pos = Some(pos);
            if at_end {
                break;
            }
            pos += rec_len;
        }
    }
    false
}

fn finish_unlink(img: &mut Image, inode_num: u32) {
    let is_directory = crate::inode::is_dir(img.inode(inode_num));
    if is_directory {
        img.group_desc_mut().used_dirs_count -= 1;
        crate::lifecycle::free_resources(img, inode_num);
    } else if img.inode(inode_num).links_count == 1 {
        crate::lifecycle::free_resources(img, inode_num);
    } else {
        img.inode_mut(inode_num).links_count -= 1;
    }
}

/// Location of a removed directory entry found inside a recovery gap.
struct RemovedLocation {
    block_num: u32,
    /// Offset of the intact entry immediately preceding the gap.
    intact_pos: usize,
    /// Offset of the removed entry's header within the gap.
    header_pos: usize,
    /// End of the intact entry's current `rec_len` span (gap close point).
    gap_end: usize,
    inode_num: u32,
}

/// Walks the intact entry chain of `parent`'s direct blocks; inside each
/// intact entry's gap, walks deleted headers by `PAD(8 + name_len)`
/// stepping looking for `name`. Returns the first match.
fn locate_removed(img: &Image, parent: u32, name: &[u8]) -> Option<RemovedLocation> {
    for block_num in collect_direct_blocks(img, parent) {
        let mut pos = 0usize;
        loop {
            let entry = img.entry(block_num, pos);
            let rec_len = entry.rec_len as usize;
            let name_len = entry.name_len;
            if rec_len == 0 {
                break;
            }
            let actual = pad_rec_len(size_of::<DirEntryHeader>() + name_len as usize);
            let gap_end = pos + rec_len;
            let mut gap_pos = pos + actual;

            while gap_pos + size_of::<DirEntryHeader>() <= gap_end {
                let dentry = img.entry(block_num, gap_pos);
                let d_inode = dentry.inode;
                let d_name_len = dentry.name_len;
                if d_inode != 0 && d_name_len as usize == name.len() {
                    let ename = img.entry_name(block_num, gap_pos, d_name_len);
                    if ename == name {
                        return Some(RemovedLocation {
                            block_num,
                            intact_pos: pos,
                            header_pos: gap_pos,
                            gap_end,
                            inode_num: d_inode,
                        });
                    }
                }
                let d_actual = pad_rec_len(size_of::<DirEntryHeader>() + d_name_len as usize);
                if d_actual == 0 {
                    break;
                }
                gap_pos += d_actual;
            }

            if gap_end >= BLOCK_SIZE {
                break;
            }
            pos = gap_end;
        }
    }
    None
}

/// Finds a previously-removed entry named `name` under `parent` without
/// mutating anything. Returns the inode number it pointed at, or `0` if no
/// such recoverable entry exists.
pub fn find_removed(img: &Image, parent: u32, name: &[u8]) -> u32 {
    locate_removed(img, parent, name)
        .map(|loc| loc.inode_num)
        .unwrap_or(0)
}

/// Splices a previously-removed entry named `name` back into the intact
/// chain under `parent`, undoing predecessor coalescing. Returns the
/// inode number the restored entry points at, or `None` if not found.
///
/// Callers are expected to have already checked recoverability (bitmap
/// bits still free) before calling this — it only fixes up the directory
/// structure, not the inode/block bitmaps.
pub fn splice_removed(img: &mut Image, parent: u32, name: &[u8]) -> Option<u32> {
    let loc = locate_removed(img, parent, name)?;
    let intact_actual = loc.header_pos - loc.intact_pos;
    img.entry_mut(loc.block_num, loc.intact_pos).rec_len = intact_actual as u16;
    img.entry_mut(loc.block_num, loc.header_pos).rec_len = (loc.gap_end - loc.header_pos) as u16;
    Some(loc.inode_num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn create_then_find_round_trips() {
        let mut img = fixture::build();
        let inode_num = crate::bitmap::allocate_inode(&mut img);
        create(&mut img, crate::layout::ROOT_INODE, inode_num, b"hello", crate::layout::FT_REG_FILE);
        assert_eq!(find(&img, crate::layout::ROOT_INODE, b"hello"), inode_num);
        assert_eq!(find(&img, crate::layout::ROOT_INODE, b"missing"), 0);
    }

    #[test]
    fn remove_then_find_removed_recovers_inode() {
        let mut img = fixture::build();
        let inode_num = crate::bitmap::allocate_inode(&mut img);
        create(&mut img, crate::layout::ROOT_INODE, inode_num, b"a", crate::layout::FT_REG_FILE);
        // Push a second entry so "a" is not first-in-block.
        let inode_b = crate::bitmap::allocate_inode(&mut img);
        create(&mut img, crate::layout::ROOT_INODE, inode_b, b"b", crate::layout::FT_REG_FILE);

        assert!(remove(&mut img, crate::layout::ROOT_INODE, b"b"));
        assert_eq!(find(&img, crate::layout::ROOT_INODE, b"b"), 0);
        assert_eq!(find_removed(&img, crate::layout::ROOT_INODE, b"b"), inode_b);
    }

    #[test]
    fn first_in_block_entry_is_never_a_removed_candidate() {
        let mut img = fixture::build();
        // "." is always first-in-block; it is unrecoverable by construction,
        // independent of whether it is ever actually removed.
        assert_eq!(find_removed(&img, crate::layout::ROOT_INODE, b"."), 0);
    }
}
