//! Absolute path resolution, segment by segment, via the directory entry
//! engine. Mirrors `get_inode_at_path` from `ext2_utils.c`.

use crate::dirent;
use crate::image::Image;
use crate::inode::is_dir;
use crate::layout::ROOT_INODE;

/// Resolves an absolute path to an inode number, or `0` if any component
/// is missing, any non-final component is not a directory, or the path
/// does not start with `/`.
pub fn resolve(img: &Image, path: &[u8]) -> u32 {
    if path.first() != Some(&b'/') {
        return 0;
    }

    let mut current = ROOT_INODE;
    let mut rest = trim_leading_slashes(path);

    while !rest.is_empty() {
        let (segment, after) = split_segment(rest);
        if segment.is_empty() {
            break;
        }

        if !after.is_empty() && !is_dir(img.inode(current)) {
            return 0;
        }

        let next = dirent::find(img, current, segment);
        if next == 0 {
            return 0;
        }
        current = next;
        rest = trim_leading_slashes(after);
    }

    current
}

/// Splits `path` into `(parent_dir, basename)`. `path` must be absolute.
/// A trailing slash is stripped before splitting: `/a/b/` and `/a/b` split
/// the same way. Returns `None` if `path` has no parent component (i.e. is
/// just `/`).
pub fn split_parent_and_name(path: &[u8]) -> Option<(&[u8], &[u8])> {
    if path.first() != Some(&b'/') {
        return None;
    }
    let trimmed = strip_trailing_slashes(path);
    if trimmed.len() <= 1 {
        return None;
    }
    let last_slash = trimmed.iter().rposition(|&b| b == b'/')?;
    let parent = if last_slash == 0 { &trimmed[..1] } else { &trimmed[..last_slash] };
    let name = &trimmed[last_slash + 1..];
    if name.is_empty() {
        return None;
    }
    Some((parent, name))
}

/// Tells whether `path` ends in a trailing slash (ignoring a path that is
/// exactly `/`).
pub fn has_trailing_slash(path: &[u8]) -> bool {
    path.len() > 1 && path.last() == Some(&b'/')
}

fn trim_leading_slashes(path: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < path.len() && path[i] == b'/' {
        i += 1;
    }
    &path[i..]
}

fn strip_trailing_slashes(path: &[u8]) -> &[u8] {
    let mut end = path.len();
    while end > 1 && path[end - 1] == b'/' {
        end -= 1;
    }
    &path[..end]
}

/// Splits off the next `/`-delimited segment, returning `(segment, rest)`.
fn split_segment(path: &[u8]) -> (&[u8], &[u8]) {
    match path.iter().position(|&b| b == b'/') {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirent as de;
    use crate::fixture;
    use crate::layout::FT_DIR;

    #[test]
    fn resolves_root() {
        let img = fixture::build();
        assert_eq!(resolve(&img, b"/"), ROOT_INODE);
    }

    #[test]
    fn rejects_relative_paths() {
        let img = fixture::build();
        assert_eq!(resolve(&img, b"a/b"), 0);
    }

    #[test]
    fn resolves_nested_directory() {
        let mut img = fixture::build();
        let a = crate::bitmap::allocate_inode(&mut img);
        de::create(&mut img, ROOT_INODE, a, b"a", FT_DIR);
        let b = crate::bitmap::allocate_inode(&mut img);
        de::create(&mut img, a, b, b"b", FT_DIR);

        assert_eq!(resolve(&img, b"/a"), a);
        assert_eq!(resolve(&img, b"/a/b"), b);
        assert_eq!(resolve(&img, b"/a/b/"), b);
        assert_eq!(resolve(&img, b"/a/missing"), 0);
    }

    #[test]
    fn non_final_component_through_a_file_is_rejected_but_final_lookup_still_runs() {
        let mut img = fixture::build();
        let f = crate::bitmap::allocate_inode(&mut img);
        de::create(&mut img, ROOT_INODE, f, b"f", crate::layout::FT_REG_FILE);

        // "f" is the final segment here, so no is_dir check fires on it.
        assert_eq!(resolve(&img, b"/f"), f);

        // "f" is a non-final segment now: the spec only requires the
        // is_dir check when a remainder exists, so this still ends up
        // calling dirent::find against f's (empty) data rather than
        // short-circuiting before it, and finds nothing either way.
        assert_eq!(resolve(&img, b"/f/x"), 0);
    }

    #[test]
    fn split_parent_and_name_handles_root_level_and_nested() {
        assert_eq!(split_parent_and_name(b"/f"), Some((&b"/"[..], &b"f"[..])));
        assert_eq!(split_parent_and_name(b"/a/b"), Some((&b"/a"[..], &b"b"[..])));
        assert_eq!(split_parent_and_name(b"/a/b/"), Some((&b"/a"[..], &b"b"[..])));
        assert_eq!(split_parent_and_name(b"/"), None);
        assert_eq!(split_parent_and_name(b"relative"), None);
    }

    #[test]
    fn trailing_slash_detection() {
        assert!(has_trailing_slash(b"/a/"));
        assert!(!has_trailing_slash(b"/a"));
        assert!(!has_trailing_slash(b"/"));
    }
}
