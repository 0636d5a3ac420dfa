//! Small filesystem and URL helpers.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ConfdResult, ConfdResultExt};

/// Recursively delete a directory, per-entry. A failure here is meant
/// to propagate: the caller treats a half-deleted directory as
/// poisoned.
pub fn remove_dir_all<P: AsRef<Path>>(p: P) -> ConfdResult<()> {
    remove_dir_all_inner(p.as_ref())
}

fn remove_dir_all_inner(p: &Path) -> ConfdResult<()> {
    let meta = match p.symlink_metadata() {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).chain_err(|| format!("failed to stat `{}`", p.display())),
    };
    if meta.file_type().is_symlink() {
        return remove_file(p);
    }
    let entries = fs::read_dir(p).chain_err(|| format!("failed to read directory `{}`", p.display()))?;
    for entry in entries {
        let entry = entry.chain_err(|| format!("failed to read entry in `{}`", p.display()))?;
        let path = entry.path();
        if entry
            .file_type()
            .chain_err(|| format!("failed to stat `{}`", path.display()))?
            .is_dir()
        {
            remove_dir_all_inner(&path)?;
        } else {
            remove_file(&path)?;
        }
    }
    fs::remove_dir(p).chain_err(|| format!("failed to remove directory `{}`", p.display()))?;
    Ok(())
}

pub fn remove_file<P: AsRef<Path>>(p: P) -> ConfdResult<()> {
    let p = p.as_ref();
    match fs::remove_file(p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).chain_err(|| format!("failed to remove file `{}`", p.display())),
    }
}

pub fn create_dir_all<P: AsRef<Path>>(p: P) -> ConfdResult<()> {
    let p = p.as_ref();
    fs::create_dir_all(p).chain_err(|| format!("failed to create directory `{}`", p.display()))
}

/// Converts a string or path into a parsed `url::Url`.
pub trait ToUrl {
    fn to_url(self) -> ConfdResult<url::Url>;
}

impl ToUrl for &str {
    fn to_url(self) -> ConfdResult<url::Url> {
        url::Url::parse(self).chain_err(|| format!("invalid url `{self}`"))
    }
}

impl ToUrl for &Path {
    fn to_url(self) -> ConfdResult<url::Url> {
        url::Url::from_file_path(self)
            .map_err(|()| anyhow::anyhow!("invalid path url `{}`", self.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn remove_dir_all_handles_missing_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(remove_dir_all(&missing).is_ok());
    }

    #[test]
    fn remove_dir_all_removes_nested_contents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        create_dir_all(&nested).unwrap();
        fs::write(nested.join("file.txt"), b"hi").unwrap();
        remove_dir_all(dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn str_to_url_rejects_garbage() {
        assert!("not a url".to_url().is_err());
        assert!("https://example.invalid/repo.git".to_url().is_ok());
    }
}
