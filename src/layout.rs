//! On-disk structures and constants for the single-group, 1024-byte-block
//! ext2 image this crate manipulates.
//!
//! Struct layouts follow the real ext2 revision-0 on-disk format (see
//! `mkfs/src/ext2.rs` in the wider Maestro tooling for the same fields laid
//! out for an arbitrary number of groups and block sizes); here the shapes
//! are specialized to exactly one block group and a 1024-byte block size,
//! since that is the only configuration this tool ever reads or writes.

use std::mem::size_of;

/// Number of blocks in the image.
pub const DISK_BLOCKS: usize = 128;
/// Size of a block in bytes. Fixed; this tool does not support other sizes.
pub const BLOCK_SIZE: usize = 1024;
/// Total size of the image in bytes.
pub const DISK_SIZE: usize = DISK_BLOCKS * BLOCK_SIZE;
/// Size of a disk sector, used for the inode's `blocks` (512-byte units) field.
pub const SECTOR_SIZE: usize = 512;

/// Number of direct block pointers in an inode.
pub const NUM_DIRECT_BLOCKS: usize = 12;
/// Index of the singly-indirect block pointer in `Inode::block`.
pub const INDIRECT_BLOCK_IDX: usize = 12;
/// Number of 32-bit block numbers that fit in one indirect block.
pub const PTRS_PER_INDIRECT: usize = BLOCK_SIZE / size_of::<u32>();

/// The root inode's number.
pub const ROOT_INODE: u32 = 2;
/// The first inode number the allocator may hand out; 1..=10 are reserved.
pub const FIRST_ALLOCATABLE_INODE: u32 = 12;

/// Maximum length of a directory entry's name, in bytes.
pub const NAME_LEN: usize = 255;

/// Directory entry file type: regular file.
pub const FT_REG_FILE: u8 = 1;
/// Directory entry file type: directory.
pub const FT_DIR: u8 = 2;
/// Directory entry file type: symbolic link.
pub const FT_SYMLINK: u8 = 7;

/// Inode mode bits: regular file.
pub const S_IFREG: u16 = 0x8000;
/// Inode mode bits: directory.
pub const S_IFDIR: u16 = 0x4000;
/// Inode mode bits: symbolic link.
pub const S_IFLNK: u16 = 0xA000;
/// Mask isolating the type bits of an inode's mode.
pub const S_IFMT: u16 = 0xF000;

/// Block number of the superblock.
pub const SUPERBLOCK_BLOCK: usize = 1;
/// Block number of the (sole) group descriptor.
pub const GROUP_DESC_BLOCK: usize = 2;

/// Rounds `len` up to the next multiple of 4, matching `PAD_REC_LEN` in the
/// original directory entry packing scheme.
pub const fn pad_rec_len(len: usize) -> usize {
    (len + 3) & !3
}

/// The ext2 superblock. Only the fields this tool reads or writes are given
/// real names; the rest of the real on-disk layout is preserved as padding
/// so the image stays a well-formed revision-0, single-group ext2 image.
#[repr(C, packed)]
pub struct Superblock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub r_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    pub mtime: u32,
    pub wtime: u32,
    pub mnt_count: u16,
    pub max_mnt_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,
    _rest: [u8; 940],
}

const _: () = assert!(size_of::<Superblock>() == BLOCK_SIZE);

/// The (sole) block group descriptor.
#[repr(C, packed)]
pub struct GroupDesc {
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
    pub inode_table: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
    pub pad: u16,
    _reserved: [u8; 12],
}

const _: () = assert!(size_of::<GroupDesc>() == 32);

/// A single inode. The field layout matches the real ext2 revision-0
/// 128-byte inode.
#[repr(C, packed)]
pub struct Inode {
    pub mode: u16,
    pub uid: u16,
    pub size: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub atime: u32,
    pub dtime: u32,
    pub gid: u16,
    pub links_count: u16,
    pub blocks: u32,
    pub flags: u32,
    pub osd1: u32,
    pub block: [u32; 15],
    pub generation: u32,
    pub file_acl: u32,
    pub dir_acl: u32,
    pub faddr: u32,
    pub osd2: [u8; 12],
}

const _: () = assert!(size_of::<Inode>() == 128);

/// Header of a packed, variable-length directory entry. The name bytes
/// (`name_len` of them, not null-terminated) follow immediately after.
#[repr(C, packed)]
pub struct DirEntryHeader {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
}

const _: () = assert!(size_of::<DirEntryHeader>() == 8);
