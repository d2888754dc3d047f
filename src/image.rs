//! Memory-mapped access to the disk image.
//!
//! Mirrors `init_disk`/`get_super_block`/`get_group_desc`/`get_inode`/
//! `get_entry`/`get_block` from the original `ext2_utils.c`: one mapping for
//! the whole process lifetime, with typed accessors computing pointers from
//! block numbers. `memmap2` replaces the raw `libc::mmap` call the original
//! makes; the rest of the addressing arithmetic is unchanged.

use crate::layout::{
    DirEntryHeader, GroupDesc, Inode, Superblock, BLOCK_SIZE, DISK_SIZE, GROUP_DESC_BLOCK,
    SUPERBLOCK_BLOCK,
};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io;
use std::mem::size_of;
use std::path::Path;

/// A memory-mapped ext2 image.
///
/// All accessors return raw pointers derived from the mapping's base
/// address; callers dereference them directly, just as the C original
/// indexes `disk` with casts. This is unsafe in the strict sense but the
/// whole point of the tool is that it owns the mapping exclusively for the
/// command's lifetime (see the concurrency model in the spec).
pub struct Image {
    map: MmapMut,
}

impl Image {
    /// Opens `path` read/write and maps it entirely into memory.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len < DISK_SIZE as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("image too small: expected at least {DISK_SIZE} bytes, got {len}"),
            ));
        }
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { map })
    }

    /// Wraps an already-mapped buffer. Used by the fixture builder and by
    /// tests that construct an image directly in memory.
    pub fn from_mmap(map: MmapMut) -> Self {
        Self { map }
    }

    /// Flushes pending writes back to the backing file.
    pub fn sync(&self) -> io::Result<()> {
        self.map.flush()
    }

    #[inline]
    fn base_mut(&mut self) -> *mut u8 {
        self.map.as_mut_ptr()
    }

    #[inline]
    fn base(&self) -> *const u8 {
        self.map.as_ptr()
    }

    /// Returns a pointer to the start of block `num` (1-indexed, same
    /// convention as the rest of the engine: block 0 is the boot block).
    #[inline]
    pub fn block_ptr(&self, num: u32) -> *const u8 {
        unsafe { self.base().add(num as usize * BLOCK_SIZE) }
    }

    #[inline]
    pub fn block_ptr_mut(&mut self, num: u32) -> *mut u8 {
        unsafe { self.base_mut().add(num as usize * BLOCK_SIZE) }
    }

    /// Returns the raw bytes of block `num`.
    pub fn block(&self, num: u32) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.block_ptr(num), BLOCK_SIZE) }
    }

    pub fn block_mut(&mut self, num: u32) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.block_ptr_mut(num), BLOCK_SIZE) }
    }

    pub fn superblock(&self) -> &Superblock {
        unsafe { &*(self.block_ptr(SUPERBLOCK_BLOCK as u32) as *const Superblock) }
    }

    pub fn superblock_mut(&mut self) -> &mut Superblock {
        unsafe { &mut *(self.block_ptr_mut(SUPERBLOCK_BLOCK as u32) as *mut Superblock) }
    }

    pub fn group_desc(&self) -> &GroupDesc {
        unsafe { &*(self.block_ptr(GROUP_DESC_BLOCK as u32) as *const GroupDesc) }
    }

    pub fn group_desc_mut(&mut self) -> &mut GroupDesc {
        unsafe { &mut *(self.block_ptr_mut(GROUP_DESC_BLOCK as u32) as *mut GroupDesc) }
    }

    pub fn block_bitmap(&self) -> &[u8] {
        let block = self.group_desc().block_bitmap;
        self.block(block)
    }

    pub fn block_bitmap_mut(&mut self) -> &mut [u8] {
        let block = self.group_desc().block_bitmap;
        self.block_mut(block)
    }

    pub fn inode_bitmap(&self) -> &[u8] {
        let block = self.group_desc().inode_bitmap;
        self.block(block)
    }

    pub fn inode_bitmap_mut(&mut self) -> &mut [u8] {
        let block = self.group_desc().inode_bitmap;
        self.block_mut(block)
    }

    /// Returns a pointer to the start of the inode table.
    fn inode_table_ptr(&self) -> *const u8 {
        let block = self.group_desc().inode_table;
        self.block_ptr(block)
    }

    fn inode_table_ptr_mut(&mut self) -> *mut u8 {
        let block = self.group_desc().inode_table;
        self.block_ptr_mut(block)
    }

    /// Returns a reference to inode number `num` (1-indexed).
    pub fn inode(&self, num: u32) -> &Inode {
        let offset = (num as usize - 1) * size_of::<Inode>();
        unsafe { &*(self.inode_table_ptr().add(offset) as *const Inode) }
    }

    pub fn inode_mut(&mut self, num: u32) -> &mut Inode {
        let offset = (num as usize - 1) * size_of::<Inode>();
        unsafe { &mut *(self.inode_table_ptr_mut().add(offset) as *mut Inode) }
    }

    /// Returns a reference to the directory entry header at `block_num`,
    /// byte offset `pos` within that block.
    pub fn entry(&self, block_num: u32, pos: usize) -> &DirEntryHeader {
        unsafe { &*(self.block_ptr(block_num).add(pos) as *const DirEntryHeader) }
    }

    pub fn entry_mut(&mut self, block_num: u32, pos: usize) -> &mut DirEntryHeader {
        unsafe { &mut *(self.block_ptr_mut(block_num).add(pos) as *mut DirEntryHeader) }
    }

    /// Returns the name bytes of the entry at `block_num`/`pos`, given its
    /// already-read `name_len`.
    pub fn entry_name(&self, block_num: u32, pos: usize, name_len: u8) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self.block_ptr(block_num).add(pos + size_of::<DirEntryHeader>()),
                name_len as usize,
            )
        }
    }

    /// Writes `name` into the entry at `block_num`/`pos`. The caller must
    /// have already set `name_len` in the entry header.
    pub fn write_entry_name(&mut self, block_num: u32, pos: usize, name: &[u8]) {
        unsafe {
            let dst = self.block_ptr_mut(block_num).add(pos + size_of::<DirEntryHeader>());
            std::ptr::copy_nonoverlapping(name.as_ptr(), dst, name.len());
        }
    }
}
