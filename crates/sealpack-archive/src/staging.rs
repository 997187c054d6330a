//! Temporary staging files.
//!
//! Every pipeline call stages plaintext (encrypt) or decrypted output
//! (decrypt) through its own uniquely named file under a staging root. Names
//! are UUID v4, so concurrent calls never collide and no locking is needed.
//!
//! Layout: `{root}/{uuid}.staging`. The process-wide root is
//! `{system temp}/sealpack`, created on first use and never removed here.
//!
//! On Unix the root is kept at mode 0700 and staging files are created
//! exclusively at mode 0600. An entry already sitting at a staging path
//! (a planted file or symlink) is refused, never followed or truncated.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};
use uuid::Uuid;

static GLOBAL_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Mode of the staging root (Unix).
pub const ROOT_PERMISSIONS: u32 = 0o700;

/// Mode of each staging file (Unix).
pub const FILE_PERMISSIONS: u32 = 0o600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StagingArea { root: root.into() }
    }

    /// The process-wide staging area.
    pub fn global() -> Self {
        let root = GLOBAL_ROOT.get_or_init(|| std::env::temp_dir().join("sealpack"));
        StagingArea { root: root.clone() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a fresh, collision-resistant path under the root, creating the
    /// root (and its parents) if absent. The file itself is not created.
    pub fn create_temporary_file_path(&self) -> io::Result<PathBuf> {
        self.ensure_root()?;
        Ok(self.root.join(format!("{}.staging", Uuid::new_v4())))
    }

    fn ensure_root(&self) -> io::Result<()> {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(ROOT_PERMISSIONS);
        }
        builder.create(&self.root)?;

        let meta = std::fs::symlink_metadata(&self.root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("staging root {} is not a directory", self.root.display()),
            ));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o777 != ROOT_PERMISSIONS {
                std::fs::set_permissions(
                    &self.root,
                    std::fs::Permissions::from_mode(ROOT_PERMISSIONS),
                )?;
            }
        }
        Ok(())
    }

    /// Allocate a path wrapped in a guard that deletes it when dropped.
    pub fn stage(&self) -> io::Result<StagedFile> {
        let path = self.create_temporary_file_path()?;
        debug!(path = %path.display(), "staging file allocated");
        Ok(StagedFile { path, armed: true })
    }
}

/// Remove `path`; a file that is already gone is not an error.
pub fn delete_file(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A staging path owned by one pipeline call.
///
/// Deleted on drop (best-effort), so every early return cleans up after
/// itself. Call [`StagedFile::remove`] on the normal path to observe the
/// result.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file for reading and writing. Fails if anything already
    /// exists at the path.
    pub fn create(&self) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(FILE_PERMISSIONS);
        }
        opts.open(&self.path)
    }

    pub fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        delete_file(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = delete_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    #[test]
    fn test_creates_root_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path().join("a/b/c"));
        let path = area.create_temporary_file_path().unwrap();
        assert!(area.root().is_dir());
        assert_eq!(path.parent(), Some(area.root()));
        assert!(!path.exists(), "only the path is allocated");
    }

    #[test]
    fn test_names_are_unique_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let area = area.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| area.create_temporary_file_path().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for p in h.join().unwrap() {
                assert!(seen.insert(p), "duplicate staging path");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        delete_file(&dir.path().join("never-created")).unwrap();
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"x").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path());
        let staged = area.stage().unwrap();
        let path = staged.path().to_path_buf();
        staged.create().unwrap().write_all(b"plaintext").unwrap();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_explicit_remove() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagingArea::new(dir.path()).stage().unwrap();
        staged.create().unwrap().write_all(b"plaintext").unwrap();
        let path = staged.path().to_path_buf();
        staged.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagingArea::new(dir.path().join("staging")).stage().unwrap();
        std::fs::write(staged.path(), b"planted").unwrap();

        let err = staged.create().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"planted");
    }

    #[cfg(unix)]
    #[test]
    fn test_create_refuses_planted_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("precious");
        std::fs::write(&target, b"precious").unwrap();

        let staged = StagingArea::new(dir.path().join("staging")).stage().unwrap();
        std::os::unix::fs::symlink(&target, staged.path()).unwrap();

        assert!(staged.create().is_err());
        assert_eq!(std::fs::read(&target).unwrap(), b"precious");
    }

    #[cfg(unix)]
    #[test]
    fn test_root_and_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(dir.path().join("staging"));
        let staged = area.stage().unwrap();
        drop(staged.create().unwrap());

        let root_mode = std::fs::metadata(area.root()).unwrap().permissions().mode();
        assert_eq!(root_mode & 0o777, ROOT_PERMISSIONS);
        let file_mode = std::fs::metadata(staged.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, FILE_PERMISSIONS);
    }

    #[cfg(unix)]
    #[test]
    fn test_loose_root_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("staging");
        std::fs::create_dir(&root).unwrap();
        std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o777)).unwrap();

        StagingArea::new(&root).create_temporary_file_path().unwrap();
        let mode = std::fs::metadata(&root).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ROOT_PERMISSIONS);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let err = StagingArea::new(&link).create_temporary_file_path().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_global_root_is_stable() {
        assert_eq!(StagingArea::global(), StagingArea::global());
        assert!(StagingArea::global().root().ends_with("sealpack"));
    }
}
