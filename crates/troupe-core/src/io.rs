use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting registry files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a JSON file, returning `None` when it does not exist. Malformed
/// JSON is an error, not a default.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Atomically write a value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    atomic_write(path, &data)
}

/// Resolve `path` through a symlink if it is one. Relative link targets
/// are resolved against the link's parent directory.
pub fn resolve_symlink(path: &Path) -> Result<PathBuf> {
    let meta = std::fs::symlink_metadata(path)?;
    if !meta.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }
    let target = std::fs::read_link(path)?;
    let resolved = if target.is_absolute() {
        target
    } else {
        path.parent().unwrap_or(Path::new(".")).join(target)
    };
    Ok(std::fs::canonicalize(resolved)?)
}

/// Recursively copy a directory, following symlinked entries so the copy
/// holds real files. The source is never modified.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = resolve_symlink(&entry.path())?;
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Create a directory symlink at `link` pointing to `target`.
#[cfg(unix)]
pub fn symlink_dir(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(windows)]
pub fn symlink_dir(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_dir(target, link)?;
    Ok(())
}

/// Remove every symlink entry directly under `dir`, leaving regular files
/// and directories alone. Returns the number removed.
pub fn remove_symlinks_in(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().symlink_metadata()?.file_type().is_symlink() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/data.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn read_json_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let got: Option<serde_json::Value> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn read_json_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let got: crate::error::Result<Option<serde_json::Value>> = read_json(&path);
        assert!(got.is_err());
    }

    #[test]
    fn copy_dir_preserves_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("SKILL.md"), "# skill").unwrap();
        std::fs::write(src.join("nested/helper.py"), "pass").unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("SKILL.md")).unwrap(), "# skill");
        assert!(dst.join("nested/helper.py").exists());
        assert!(src.join("SKILL.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_dir_follows_relative_symlinks() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("file.txt"), "content").unwrap();

        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink("../real/file.txt", src.join("link.txt")).unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        let copied = dst.join("link.txt");
        assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "content");
    }

    #[cfg(unix)]
    #[test]
    fn remove_symlinks_leaves_real_entries() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        let managed = dir.path().join("managed");
        std::fs::create_dir_all(&managed).unwrap();
        std::os::unix::fs::symlink(&target, managed.join("linked")).unwrap();
        std::fs::write(managed.join("own-file"), "keep me").unwrap();

        let removed = remove_symlinks_in(&managed).unwrap();
        assert_eq!(removed, 1);
        assert!(!managed.join("linked").exists());
        assert!(managed.join("own-file").exists());
    }
}
