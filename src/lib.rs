//! Offline manipulator and consistency checker for a single-group ext2
//! image held in a fixed-size file.
//!
//! This crate is the shared engine behind the six command binaries
//! (`ext2_mkdir`, `ext2_cp`, `ext2_ln`, `ext2_rm`, `ext2_restore`,
//! `ext2_checker`): the memory-mapped layout accessor, the bitmap
//! allocator, the directory entry engine, the inode data writer, the path
//! resolver, the recursive link-count/resource lifecycle, and the
//! consistency checker.

pub mod bitmap;
pub mod checker;
pub mod cli;
pub mod data;
pub mod dirent;
pub mod error;
pub mod image;
pub mod inode;
pub mod layout;
pub mod lifecycle;
pub mod fixture;
pub mod path;
