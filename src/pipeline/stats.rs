//!
//! Shell recipes for the derived statistics, kept deliberately as external
//! streaming pipelines: the corpus has hundreds of millions of rows, so
//! every step decompresses, transforms and recompresses as a stream and the
//! heavy sorting is `sort`'s disk-backed external merge. `LC_ALL=C` pins the
//! collation the merge steps rely on.

use std::sync::Arc;

use anyhow::Result;
use engine::{shellout, Fingerprint, Inputs, OutputTarget, Requires, Task};

use super::inputs::{CitationsFile, IdMappingFile};
use super::PipelineConfig;

const SOURCE_DOI_CMD: &str = "zstdcat -T0 {input} \
    | LC_ALL=C cut -d, -f2 \
    | LC_ALL=C tr '[:upper:]' '[:lower:]' \
    | LC_ALL=C sort -S25% \
    | zstd -c -T0 > {output}";

const TARGET_DOI_CMD: &str = "zstdcat -T0 {input} \
    | LC_ALL=C cut -d, -f3 \
    | LC_ALL=C tr '[:upper:]' '[:lower:]' \
    | LC_ALL=C sort -S25% \
    | zstd -c -T0 > {output}";

const CITED_COUNT_CMD: &str = "zstdcat -T0 {input} \
    | LC_ALL=C uniq -c \
    | LC_ALL=C sort -S25% -nr \
    | LC_ALL=C sed -e 's@^[ ]*@@;s@ @\\t@' \
    | zstd -c -T0 > {output}";

const UNIQUE_DOI_CMD: &str = "LC_ALL=C sort -u -S25% \
    <(zstdcat -T0 {s} | LC_ALL=C uniq) \
    <(zstdcat -T0 {t} | LC_ALL=C uniq) \
    | zstd -c -T0 > {output}";

const INDEX_MAPPED_CMD: &str = "zstdcat -T0 {input} \
    | LC_ALL=C cut -f2 \
    | LC_ALL=C tr '[:upper:]' '[:lower:]' \
    | LC_ALL=C sort -u -S25% \
    | zstd -c -T0 > {output}";

const COMMON_DOI_CMD: &str = "LC_ALL=C comm -12 \
    <(zstdcat -T0 {index}) \
    <(zstdcat -T0 {citations}) \
    | zstd -c -T0 > {output}";

/// DOIs that are the source of a citation edge; lowercased and sorted.
pub struct SourceDoi {
    config: PipelineConfig,
}

impl SourceDoi {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for SourceDoi {
    fn family(&self) -> &'static str {
        "source-doi"
    }

    fn requires(&self) -> Requires {
        Requires::One(Arc::new(CitationsFile::new(self.config.clone())))
    }

    fn output(&self) -> OutputTarget {
        self.config.url_target(self.family())
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            SOURCE_DOI_CMD,
            &[("input", inputs.sole()?)],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}

/// DOIs that are the target of a citation edge; lowercased and sorted.
pub struct TargetDoi {
    config: PipelineConfig,
}

impl TargetDoi {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for TargetDoi {
    fn family(&self) -> &'static str {
        "target-doi"
    }

    fn requires(&self) -> Requires {
        Requires::One(Arc::new(CitationsFile::new(self.config.clone())))
    }

    fn output(&self) -> OutputTarget {
        self.config.url_target(self.family())
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            TARGET_DOI_CMD,
            &[("input", inputs.sole()?)],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}

/// Two-column table of inbound link count and DOI, sorted descending by
/// count. The input is already sorted, so `uniq -c` counts full runs.
pub struct CitedCount {
    config: PipelineConfig,
}

impl CitedCount {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for CitedCount {
    fn family(&self) -> &'static str {
        "cited-count"
    }

    fn requires(&self) -> Requires {
        Requires::One(Arc::new(TargetDoi::new(self.config.clone())))
    }

    fn output(&self) -> OutputTarget {
        self.config.url_target(self.family())
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            CITED_COUNT_CMD,
            &[("input", inputs.sole()?)],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}

/// Every DOI appearing in the citation dataset, deduplicated union of the
/// source and target lists.
pub struct UniqueDoi {
    config: PipelineConfig,
}

impl UniqueDoi {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for UniqueDoi {
    fn family(&self) -> &'static str {
        "unique-doi"
    }

    fn requires(&self) -> Requires {
        Requires::Named(vec![
            (
                "s".to_owned(),
                Arc::new(SourceDoi::new(self.config.clone())) as _,
            ),
            (
                "t".to_owned(),
                Arc::new(TargetDoi::new(self.config.clone())) as _,
            ),
        ])
    }

    fn output(&self) -> OutputTarget {
        self.config.url_target(self.family())
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            UNIQUE_DOI_CMD,
            &[("s", inputs.named("s")?), ("t", inputs.named("t")?)],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}

/// Unique DOIs that have a mapping to a catalog identifier; sorted.
pub struct IndexMappedDoi {
    config: PipelineConfig,
}

impl IndexMappedDoi {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for IndexMappedDoi {
    fn family(&self) -> &'static str {
        "index-mapped-doi"
    }

    fn name(&self) -> String {
        format!("{}[{}]", self.family(), self.config.date)
    }

    fn requires(&self) -> Requires {
        Requires::One(Arc::new(IdMappingFile::new(self.config.clone())))
    }

    fn output(&self) -> OutputTarget {
        self.config.date_target(self.family(), super::EXT)
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            INDEX_MAPPED_CMD,
            &[("input", inputs.sole()?)],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}

/// Intersection of the citation corpus DOI list and the index-mapped DOI
/// list.
///
/// `comm -12` requires both inputs sorted and deduplicated; that holds by
/// construction because both dependencies publish sorted, deduplicated
/// lists. The scheduler preserves the ordering through the dependency
/// edges, there is no re-check here.
pub struct CommonDoi {
    config: PipelineConfig,
}

impl CommonDoi {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Task for CommonDoi {
    fn family(&self) -> &'static str {
        "common-doi"
    }

    fn name(&self) -> String {
        format!("{}[{}]", self.family(), self.config.date)
    }

    fn requires(&self) -> Requires {
        Requires::Named(vec![
            (
                "index".to_owned(),
                Arc::new(IndexMappedDoi::new(self.config.clone())) as _,
            ),
            (
                "citations".to_owned(),
                Arc::new(UniqueDoi::new(self.config.clone())) as _,
            ),
        ])
    }

    fn output(&self) -> OutputTarget {
        // keyed by both logical inputs: the dump URL and the mapping date
        OutputTarget::new(
            &self.config.family_dir(self.family()),
            &Fingerprint::of(&[
                self.config.citations_url.as_str(),
                &self.config.date.to_string(),
            ]),
            super::EXT,
        )
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let scratch = shellout(
            COMMON_DOI_CMD,
            &[
                ("index", inputs.named("index")?),
                ("citations", inputs.named("citations")?),
            ],
            &self.config.family_dir(self.family()),
        )?;
        self.output().publish(scratch)
    }
}
