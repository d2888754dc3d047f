//! End-to-end scenarios exercised against `fixture::build()`, covering the
//! same ground the six command binaries each cover individually: creating
//! and removing directories, copying files across the direct/indirect
//! block boundary, hard and symbolic links, delete-then-restore, and
//! checker idempotence after corruption.

use ext2fs::layout::{FT_DIR, FT_REG_FILE, ROOT_INODE};
use ext2fs::{bitmap, checker, data, dirent, fixture, inode, lifecycle, path};

#[test]
fn mkdir_then_rm_round_trips_through_the_checker() {
    let mut img = fixture::build();
    let free_inodes_before = img.superblock().free_inodes_count;
    let free_blocks_before = img.superblock().free_blocks_count;

    let d = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, d, b"sub", FT_DIR);
    assert_eq!(path::resolve(&img, b"/sub"), d);
    assert!(checker::check(&mut img).is_empty());

    assert!(dirent::remove(&mut img, ROOT_INODE, b"sub"));
    assert_eq!(path::resolve(&img, b"/sub"), 0);
    assert!(checker::check(&mut img).is_empty());

    assert_eq!(img.superblock().free_inodes_count, free_inodes_before);
    assert_eq!(img.superblock().free_blocks_count, free_blocks_before);
}

#[test]
fn cp_sized_file_stays_within_direct_blocks() {
    let mut img = fixture::build();
    let contents = vec![b'x'; 1500];
    assert!(data::required_block_count(contents.len()) <= 12);

    let f = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, f, b"small", FT_REG_FILE);
    data::write_file_data(&mut img, f, &contents).unwrap();

    assert_eq!(img.inode(f).block[12], 0, "no indirect block needed for 1500 bytes");
    assert_eq!(data::read_file_data(&img, f), contents);
    assert!(checker::check(&mut img).is_empty());
}

#[test]
fn cp_large_file_spills_into_the_indirect_block() {
    let mut img = fixture::build();
    let contents = vec![b'y'; 20_000];
    let needed = data::required_block_count(contents.len());
    assert!(needed > 12, "20000 bytes must need the indirect block");

    let f = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, f, b"large", FT_REG_FILE);
    data::write_file_data(&mut img, f, &contents).unwrap();

    assert_ne!(img.inode(f).block[12], 0, "indirect block pointer must be set");
    assert_eq!(data::read_file_data(&img, f), contents);
    assert!(checker::check(&mut img).is_empty());
}

#[test]
fn hardlink_then_rm_one_name_keeps_the_data_reachable() {
    let mut img = fixture::build();
    let f = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, f, b"orig", FT_REG_FILE);
    data::write_file_data(&mut img, f, b"shared").unwrap();

    dirent::create(&mut img, ROOT_INODE, f, b"alias", FT_REG_FILE);
    assert_eq!(img.inode(f).links_count, 2);

    assert!(dirent::remove(&mut img, ROOT_INODE, b"orig"));
    assert!(bitmap::inode_in_use(&img, f), "second link keeps the inode alive");
    assert_eq!(img.inode(f).links_count, 1);
    assert_eq!(data::read_file_data(&img, f), b"shared");

    assert!(dirent::remove(&mut img, ROOT_INODE, b"alias"));
    assert!(!bitmap::inode_in_use(&img, f), "last link frees the inode");
}

#[test]
fn cp_rm_restore_round_trips_a_file() {
    let mut img = fixture::build();
    let f = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, f, b"doc", FT_REG_FILE);
    data::write_file_data(&mut img, f, b"recoverable contents").unwrap();

    let inodes_before = img.superblock().free_inodes_count;
    let blocks_before = img.superblock().free_blocks_count;

    assert!(dirent::remove(&mut img, ROOT_INODE, b"doc"));
    assert_eq!(path::resolve(&img, b"/doc"), 0);
    assert_eq!(dirent::find_removed(&img, ROOT_INODE, b"doc"), f);
    assert_eq!(lifecycle::is_recoverable(&img, f, true), 1);

    dirent::splice_removed(&mut img, ROOT_INODE, b"doc");
    lifecycle::reallocate_resources(&mut img, f);

    assert_eq!(path::resolve(&img, b"/doc"), f);
    assert_eq!(data::read_file_data(&img, f), b"recoverable contents");
    assert_eq!(img.superblock().free_inodes_count, inodes_before);
    assert_eq!(img.superblock().free_blocks_count, blocks_before);
    assert!(checker::check(&mut img).is_empty());
}

#[test]
fn checker_repairs_a_corrupted_superblock_and_is_idempotent() {
    let mut img = fixture::build();
    let f = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, f, b"f", FT_REG_FILE);

    img.superblock_mut().free_blocks_count += 3;
    img.superblock_mut().free_inodes_count += 2;

    let fixes = checker::check(&mut img);
    assert!(!fixes.is_empty());
    assert!(checker::check(&mut img).is_empty(), "second pass must find nothing left to fix");
}

#[test]
fn bitmap_counters_agree_with_superblock_after_mixed_operations() {
    let mut img = fixture::build();
    let a = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, a, b"a", FT_DIR);
    let b = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, a, b, b"b", FT_REG_FILE);
    data::write_file_data(&mut img, b, &vec![0u8; 5000]).unwrap();
    dirent::remove(&mut img, a, b"b");

    let free_blocks =
        bitmap::count_free(img.block_bitmap(), (img.superblock().blocks_count / 8) as usize);
    let free_inodes =
        bitmap::count_free(img.inode_bitmap(), (img.superblock().inodes_count / 8) as usize);
    assert_eq!(img.superblock().free_blocks_count, free_blocks);
    assert_eq!(img.superblock().free_inodes_count, free_inodes);
}

#[test]
fn trailing_slash_on_a_new_link_destination_is_rejected_before_creation() {
    // Mirrors the guard `ext2_ln` applies in front of `cli::resolve_new_entry`
    // for both hard and symbolic links: a destination that doesn't exist yet
    // and ends in a trailing slash asserts "this must be a directory", which
    // neither kind of link ever creates.
    let img = fixture::build();
    let dest = b"/newlink/";
    assert!(path::has_trailing_slash(dest));

    // Without that guard the shared helper alone would happily hand back a
    // parent/name pair (it tolerates and strips the trailing slash), which
    // is exactly the gap being closed: the guard must run before this call.
    let (parent, name) = ext2fs::cli::resolve_new_entry(&img, dest).unwrap();
    assert_eq!(parent, ROOT_INODE);
    assert_eq!(name, b"newlink");
}

#[test]
fn a_new_directory_is_its_own_dot_and_its_parents_dotdot() {
    let mut img = fixture::build();
    let a = bitmap::allocate_inode(&mut img);
    dirent::create(&mut img, ROOT_INODE, a, b"a", FT_DIR);

    assert_eq!(dirent::find(&img, a, b"."), a);
    assert_eq!(dirent::find(&img, a, b".."), ROOT_INODE);
    assert!(inode::is_dir(img.inode(a)));
}
