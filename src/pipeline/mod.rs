//!
//! The citation statistics DAG.
//!
//! Leaf tasks model the external producers (the raw citations dump and the
//! date-partitioned identifier mapping); derived tasks are shell pipelines
//! over those artifacts, with the sortedness preconditions of the merge
//! steps guaranteed structurally by the dependency edges:
//!
//! ```text
//! citations ----> source-doi --\
//!     |                         +--> unique-doi --\
//!     +--------> target-doi ---/                   +--> common-doi
//!     |              |                            /
//!     |              v              index-mapped-doi
//!     |         cited-count                |
//!     |                                id-mapping
//! ```

/// leaf tasks provided by external producers
mod inputs;

/// derived statistics tasks
mod stats;
pub use stats::{CitedCount, CommonDoi, IndexMappedDoi, SourceDoi, TargetDoi, UniqueDoi};

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use engine::{Fingerprint, OutputTarget, TaskRef};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown task \"{0}\"")]
    UnknownTask(String),
}

/// Task names accepted by `--task`.
pub const KNOWN_TASKS: &[&str] = &[
    "source-doi",
    "target-doi",
    "cited-count",
    "unique-doi",
    "index-mapped-doi",
    "common-doi",
];

/// Artifact extension shared by the list-producing tasks: tab-separated
/// values, zstd-compressed.
const EXT: &str = "tsv.zst";

/// Configuration every pipeline task carries.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// root of the artifact directories
    pub data_dir: PathBuf,
    /// source URL of the raw citations dump; fingerprints every task derived
    /// from it
    pub citations_url: String,
    /// date partition of the identifier mapping
    pub date: NaiveDate,
}

impl PipelineConfig {
    fn family_dir(&self, family: &str) -> PathBuf {
        self.data_dir.join(family)
    }

    /// Target for tasks whose only logical input is the citations dump.
    fn url_target(&self, family: &str) -> OutputTarget {
        OutputTarget::new(
            &self.family_dir(family),
            &Fingerprint::of(&[&self.citations_url]),
            EXT,
        )
    }

    /// Target for tasks keyed by the mapping date alone.
    fn date_target(&self, family: &str, ext: &str) -> OutputTarget {
        OutputTarget::new(
            &self.family_dir(family),
            &Fingerprint::literal(&self.date.to_string()),
            ext,
        )
    }
}

/// Construct the requested terminal task.
pub fn terminal_task(name: &str, config: &PipelineConfig) -> Result<TaskRef, Error> {
    let config = config.clone();
    let task: TaskRef = match name {
        "source-doi" => Arc::new(SourceDoi::new(config)),
        "target-doi" => Arc::new(TargetDoi::new(config)),
        "cited-count" => Arc::new(CitedCount::new(config)),
        "unique-doi" => Arc::new(UniqueDoi::new(config)),
        "index-mapped-doi" => Arc::new(IndexMappedDoi::new(config)),
        "common-doi" => Arc::new(CommonDoi::new(config)),
        _ => return Err(Error::UnknownTask(name.to_owned())),
    };
    Ok(task)
}
