use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::Fingerprint;

/// Name of the per-family alias pointing at the latest published artifact.
pub const CURRENT_LINK: &str = "current";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Artifact directory does not exist: {0}")]
    MissingArtifactDir(String),
    #[error("Artifact path has no parent directory: {0}")]
    NoParent(String),
    #[error("Artifact path has no filename: {0}")]
    NoFileName(String),
}

/// Final on-disk location of a task's artifact.
///
/// Existence of this path is the sole cache-hit signal; no manifest is
/// consulted. The file only ever becomes visible through [`publish`], which
/// renames a same-volume scratch file into place, so a reader sees either
/// no artifact or a complete one, never a partial write.
///
/// [`publish`]: OutputTarget::publish
#[derive(Debug, Clone)]
pub struct OutputTarget {
    path: PathBuf,
}

impl OutputTarget {
    /// `<family_dir>/<fingerprint>.<ext>`
    pub fn new(family_dir: &Path, fingerprint: &Fingerprint, ext: &str) -> Self {
        Self {
            path: family_dir.join(format!("{fingerprint}.{ext}")),
        }
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the artifact is already present and complete.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Atomically move a scratch file into the final location.
    ///
    /// A missing artifact directory is a configuration error; we refuse to
    /// create directory structure from here.
    pub fn publish(&self, scratch: tempfile::TempPath) -> Result<()> {
        let dir = self.parent()?;
        if !dir.is_dir() {
            return Err(Error::MissingArtifactDir(dir.display().to_string()).into());
        }
        scratch
            .persist(&self.path)
            .with_context(|| format!("publishing artifact {:?}", self.path))?;
        log::info!("published {:?}", self.path);
        Ok(())
    }

    pub fn open_for_read(&self) -> Result<File> {
        File::open(&self.path).with_context(|| format!("opening artifact {:?}", self.path))
    }

    pub fn open_for_write(&self) -> Result<File> {
        let dir = self.parent()?;
        if !dir.is_dir() {
            return Err(Error::MissingArtifactDir(dir.display().to_string()).into());
        }
        File::create(&self.path).with_context(|| format!("creating artifact {:?}", self.path))
    }

    /// Repoint the family's `current` symlink at this artifact.
    ///
    /// The replacement is itself atomic: we write a staging link and rename
    /// it over the old one, so a concurrent reader never sees a missing alias.
    /// The link target is relative, so the data dir can be relocated.
    pub fn point_current(&self) -> Result<()> {
        let dir = self.parent()?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::NoFileName(self.path.display().to_string()))?;

        let link = dir.join(CURRENT_LINK);
        let staging = dir.join(format!(".{CURRENT_LINK}.staging"));

        // a stale staging link may survive an interrupted earlier run:
        match fs::remove_file(&staging) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        symlink(file_name.as_ref(), &staging)?;
        fs::rename(&staging, &link)
            .with_context(|| format!("repointing {CURRENT_LINK} alias in {dir:?}"))?;
        log::debug!("{CURRENT_LINK} -> {file_name:?} in {dir:?}");
        Ok(())
    }

    fn parent(&self) -> Result<&Path, Error> {
        self.path
            .parent()
            .ok_or_else(|| Error::NoParent(self.path.display().to_string()))
    }
}

/// Symlink the given `link` to `tgt`; works for unix and windows.
fn symlink(tgt: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(tgt, link)
        .with_context(|| format!("symlinking {link:?} to {tgt:?}"))?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(tgt, link)
        .with_context(|| format!("symlinking {link:?} to {tgt:?}"))?;

    Ok(())
}
