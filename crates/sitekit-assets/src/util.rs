//! Filesystem helpers shared by the transforms.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Write an artifact via a temp file and rename.
///
/// A partially written artifact is never visible at its final path: readers
/// either see the previous version or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Copy a single file into a directory, creating it as needed.
pub fn copy_into(src: &Path, dest_dir: &Path) -> io::Result<()> {
    let file_name = src
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let contents = fs::read(src)?;
    write_atomic(&dest_dir.join(file_name), &contents)
}

/// Recursively copy a directory tree, preserving relative structure.
///
/// Returns the number of files copied. A missing source tree copies nothing.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        let contents = fs::read(entry.path())?;
        write_atomic(&dest.join(rel), &contents)?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_atomically_and_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/out.css");

        write_atomic(&path, b"body{}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"body{}");
        // No temp file left behind
        assert!(!path.with_file_name("out.css.tmp").exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn copies_tree_preserving_structure() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("fonts");
        fs::create_dir_all(src.join("roboto")).unwrap();
        fs::write(src.join("roboto/roboto.woff2"), b"font").unwrap();
        fs::write(src.join("readme.txt"), b"hi").unwrap();

        let dest = dir.path().join("dist/fonts");
        let copied = copy_tree(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert!(dest.join("roboto/roboto.woff2").exists());
        assert!(dest.join("readme.txt").exists());
    }

    #[test]
    fn missing_tree_copies_nothing() {
        let dir = tempdir().unwrap();
        let copied = copy_tree(&dir.path().join("nope"), &dir.path().join("out")).unwrap();
        assert_eq!(copied, 0);
    }
}
