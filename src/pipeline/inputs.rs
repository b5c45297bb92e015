use anyhow::Result;
use engine::{Fingerprint, Inputs, OutputTarget, Task};

use super::PipelineConfig;

/// The raw citations dump: one zstd-compressed CSV of
/// (edge id, source DOI, target DOI) records.
///
/// Produced out of band by the dump fetcher; this task only anchors the
/// dependency graph. Once the artifact is in place every run is a cache hit,
/// and a run without it fails naming the expected path.
pub struct CitationsFile {
    config: PipelineConfig,
}

impl CitationsFile {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for CitationsFile {
    fn family(&self) -> &'static str {
        "citations"
    }

    fn output(&self) -> OutputTarget {
        OutputTarget::new(
            &self.config.family_dir(self.family()),
            &Fingerprint::of(&[&self.config.citations_url]),
            "csv.zst",
        )
    }

    fn run(&self, _inputs: &Inputs) -> Result<()> {
        anyhow::bail!(
            "citations dump not found at {}; fetch {} and place it there",
            self.output().path().display(),
            self.config.citations_url,
        )
    }

    /// External input; the alias is the producer's business.
    fn on_success(&self) -> Result<()> {
        Ok(())
    }
}

/// The catalog identifier mapping for one date: zstd-compressed TSV whose
/// second column is a catalog-mapped DOI. Produced by the external mapping
/// producer, date-partitioned.
pub struct IdMappingFile {
    config: PipelineConfig,
}

impl IdMappingFile {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for IdMappingFile {
    fn family(&self) -> &'static str {
        "id-mapping"
    }

    fn name(&self) -> String {
        format!("{}[{}]", self.family(), self.config.date)
    }

    fn output(&self) -> OutputTarget {
        self.config.date_target(self.family(), "tsv.zst")
    }

    fn run(&self, _inputs: &Inputs) -> Result<()> {
        anyhow::bail!(
            "identifier mapping for {} not found at {}; run the mapping producer first",
            self.config.date,
            self.output().path().display(),
        )
    }

    fn on_success(&self) -> Result<()> {
        Ok(())
    }
}
