use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Specified data directory \"{0}\" is not a directory")]
    NotDirectory(String),
}

/// Layout of the data directory: one artifact dir per task family, each
/// holding `<fingerprint>.<ext>` artifacts and a `current` alias.
///
/// Directory creation happens here, before a run starts; artifact files
/// themselves are only ever written through task publication, and publishing
/// treats a missing family dir as a configuration error.
#[derive(Debug)]
pub struct Fs {
    /// the directory we are allowed to modify
    data_dir: PathBuf,
    /// if true, prevents all destructive operations
    dry_run: bool,
}

impl Fs {
    pub fn new(data_dir: &Path, dry_run: bool) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            dry_run,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Check whether the data dir exists, and create it if not.
    pub fn ensure_data_dir_exists(&mut self, verbose: bool) -> Result<()> {
        if !self.data_dir.exists() {
            if self.dry_run {
                eprintln!("Dry run. Not creating data directory {:?}", self.data_dir);
                return Ok(());
            }
            eprintln!("Data directory {:?} doesn't exist. Creating.", self.data_dir);
            fs::create_dir_all(&self.data_dir).context("creating data directory")?;
        } else if !self.data_dir.is_dir() {
            return Err(Error::NotDirectory(self.data_dir.display().to_string()).into());
        } else if verbose {
            eprintln!(
                "Data directory {:?} already exists. Not creating.",
                self.data_dir
            );
        }

        self.data_dir = self.data_dir.canonicalize()?;
        Ok(())
    }

    /// $DATA/family
    pub fn family_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(family)
    }

    /// Create the artifact dir for every family in the graph ahead of the
    /// run, so publication never has to create structure.
    pub fn create_family_dirs(&self, families: &[&'static str]) -> Result<()> {
        if self.dry_run {
            log::debug!("dry run; not creating family dirs");
            return Ok(());
        }
        for family in families {
            fs::create_dir_all(self.family_dir(family))
                .with_context(|| format!("creating artifact dir for family \"{family}\""))?;
        }
        Ok(())
    }
}
