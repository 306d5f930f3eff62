//! Filesystem utilities.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Recursively copy `src` on top of `dst`, overwriting existing paths.
///
/// Top-level entries whose file name appears in `exclude` are skipped.
/// Existing files in `dst` lose to the copied content; directories are
/// merged rather than replaced.
pub fn overlay_dir(src: &Path, dst: &Path, exclude: &[&str]) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if exclude.iter().any(|e| name.to_string_lossy() == *e) {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(&name);

        if entry.file_type()?.is_dir() {
            overlay_dir(&src_path, &dst_path, &[])?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Recursively move the contents of `src` into `dst`, merging directories
/// and overwriting files. `src` itself is left in place (empty).
pub fn merge_move_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            merge_move_dir(&src_path, &dst_path)?;
            fs::remove_dir(&src_path).with_context(|| {
                format!("failed to remove directory: {}", src_path.display())
            })?;
        } else {
            move_file(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Move a file, falling back to copy-and-delete when `rename` crosses a
/// filesystem boundary.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst).with_context(|| {
            format!("failed to move {} to {}", src.display(), dst.display())
        })?;
        fs::remove_file(src)
            .with_context(|| format!("failed to remove file: {}", src.display()))?;
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();
        fs::write(src.join("nested/inner.txt"), "inner").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file.txt")).unwrap(), "content");
        assert_eq!(
            fs::read_to_string(dst.join("nested/inner.txt")).unwrap(),
            "inner"
        );
    }

    #[test]
    fn test_overlay_dir_overwrites_and_excludes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("extra");
        let dst = tmp.path().join("tree");

        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("foo.txt"), "overlay").unwrap();
        fs::write(src.join("skipme.repos"), "manifest").unwrap();
        fs::write(dst.join("foo.txt"), "original").unwrap();

        overlay_dir(&src, &dst, &["skipme.repos"]).unwrap();

        assert_eq!(fs::read_to_string(dst.join("foo.txt")).unwrap(), "overlay");
        assert!(!dst.join("skipme.repos").exists());
    }

    #[test]
    fn test_merge_move_dir() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("from");
        let dst = tmp.path().join("to");

        fs::create_dir_all(src.join("sub")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.h"), "a").unwrap();
        fs::write(src.join("sub/b.h"), "b").unwrap();
        fs::write(dst.join("a.h"), "stale").unwrap();

        merge_move_dir(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.h")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("sub/b.h")).unwrap(), "b");
        assert!(fs::read_dir(&src).unwrap().next().is_none());
    }

    #[test]
    fn test_move_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.bin");
        let dst = tmp.path().join("out/b.bin");
        fs::write(&src, "data").unwrap();

        move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "data");
    }
}
