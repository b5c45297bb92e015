use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use citegraph::{App, Args};
use engine::{shellout, Fingerprint, Graph, Inputs, OutputTarget, Requires, Scheduler, Task, TaskRef};

fn basic_args(data_dir: String) -> Args {
    Args {
        task: String::from("common-doi"),
        date: Some(String::from("2022-02-02")),
        data_dir,
        url: String::from("https://example.com/dump.csv.zst"),
        jobs: 2,
        list: false,
        yes: true,
        verbose: 1,
        dry_run: false,
    }
}

fn stringify_dir(dir: &tempfile::TempDir) -> String {
    dir.path().to_str().unwrap().to_owned()
}

#[test]
fn test_dry_run_prints_plan_and_executes_nothing() -> Result<()> {
    let output = tempdir()?;
    let mut args = basic_args(stringify_dir(&output));
    args.dry_run = true;

    let settings = args.try_into()?;
    App::new(settings).run()?;

    // dry run creates no artifact dirs and no artifacts:
    assert_eq!(fs::read_dir(output.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_run_without_external_inputs_reports_root_cause() -> Result<()> {
    let output = tempdir()?;
    let args = basic_args(stringify_dir(&output));

    let err = App::new(args.try_into()?).run().unwrap_err();
    // both leaves are missing; the mapping is resolved first, so it is the
    // reported root cause:
    assert!(err.to_string().contains("root cause"));
    assert!(err.to_string().contains("id-mapping[2022-02-02]"));

    // family dirs exist, but nothing was published:
    let citations_dir = output.path().join("citations");
    assert!(citations_dir.is_dir());
    assert_eq!(fs::read_dir(&citations_dir)?.count(), 0);
    Ok(())
}

#[test]
fn test_unknown_task_is_rejected_before_running() {
    let output = tempdir().unwrap();
    let mut args = basic_args(stringify_dir(&output));
    args.task = String::from("inbound-stats");

    let err = citegraph::Settings::try_from(args).unwrap_err();
    assert!(err.to_string().contains("unknown task"));
}

// The scenario tests below run the real engine against the same recipes the
// pipeline uses, minus the zstd wrapping, so they only need coreutils.

struct ShellTask {
    family: &'static str,
    template: &'static str,
    deps: Vec<(&'static str, TaskRef)>,
    dir: PathBuf,
}

impl ShellTask {
    fn new(
        data_dir: &Path,
        family: &'static str,
        template: &'static str,
        deps: Vec<(&'static str, TaskRef)>,
    ) -> TaskRef {
        let dir = data_dir.join(family);
        fs::create_dir_all(&dir).unwrap();
        Arc::new(Self {
            family,
            template,
            deps,
            dir,
        })
    }

    /// Leaf standing in for an external producer: its artifact is written
    /// up front, so it is always a cache hit.
    fn provided(data_dir: &Path, family: &'static str, content: &str) -> TaskRef {
        let task = Self::new(data_dir, family, "", Vec::new());
        fs::write(task.output().path(), content).unwrap();
        task
    }
}

impl Task for ShellTask {
    fn family(&self) -> &'static str {
        self.family
    }

    fn requires(&self) -> Requires {
        if self.deps.is_empty() {
            Requires::None
        } else {
            Requires::Named(
                self.deps
                    .iter()
                    .map(|(name, task)| (name.to_string(), Arc::clone(task)))
                    .collect(),
            )
        }
    }

    fn output(&self) -> OutputTarget {
        OutputTarget::new(&self.dir, &Fingerprint::of(&[self.family]), "tsv")
    }

    fn run(&self, inputs: &Inputs) -> Result<()> {
        let mut bound: Vec<(&str, &Path)> = Vec::with_capacity(self.deps.len());
        for (name, _) in &self.deps {
            bound.push((*name, inputs.named(name)?));
        }
        let scratch = shellout(self.template, &bound, &self.dir)?;
        self.output().publish(scratch)
    }
}

const SOURCE_CMD: &str =
    "LC_ALL=C cut -d, -f2 {input} | LC_ALL=C tr '[:upper:]' '[:lower:]' | LC_ALL=C sort > {output}";
const TARGET_CMD: &str =
    "LC_ALL=C cut -d, -f3 {input} | LC_ALL=C tr '[:upper:]' '[:lower:]' | LC_ALL=C sort > {output}";
const UNIQUE_CMD: &str =
    "LC_ALL=C sort -u <(LC_ALL=C uniq {s}) <(LC_ALL=C uniq {t}) > {output}";
const INDEX_MAPPED_CMD: &str =
    "LC_ALL=C cut -f2 {index} | LC_ALL=C tr '[:upper:]' '[:lower:]' | LC_ALL=C sort -u > {output}";
const COMMON_CMD: &str = "LC_ALL=C comm -12 {index} {citations} > {output}";
const CITED_COUNT_CMD: &str =
    "LC_ALL=C uniq -c {input} | LC_ALL=C sort -nr | LC_ALL=C sed -e 's@^[ ]*@@;s@ @\\t@' > {output}";

fn read(task: &TaskRef) -> String {
    fs::read_to_string(task.output().path()).unwrap()
}

#[test]
fn test_scenario_doi_lists_and_overlap() -> Result<()> {
    let data = tempdir()?;
    let data = data.path();

    // two citation edges: (id, source, target)
    let raw = ShellTask::provided(data, "citations", "1,A/1,B/1\n2,B/1,C/1\n");
    let source = ShellTask::new(data, "source-doi", SOURCE_CMD, vec![("input", raw.clone())]);
    let target = ShellTask::new(data, "target-doi", TARGET_CMD, vec![("input", raw)]);
    let unique = ShellTask::new(
        data,
        "unique-doi",
        UNIQUE_CMD,
        vec![("s", source.clone()), ("t", target.clone())],
    );

    // identifier mapping rows whose second column is a DOI:
    let mapping = ShellTask::provided(data, "id-mapping", "r1\tB/1\tx\nr2\tD/9\tx\n");
    let index_mapped = ShellTask::new(
        data,
        "index-mapped-doi",
        INDEX_MAPPED_CMD,
        vec![("index", mapping)],
    );
    let common = ShellTask::new(
        data,
        "common-doi",
        COMMON_CMD,
        vec![("index", index_mapped.clone()), ("citations", unique.clone())],
    );

    let graph = Graph::resolve(common.clone())?;
    let report = Scheduler::new(2).run(&graph);
    assert!(report.is_success(), "{:?}", report.first_failure());

    // scenario A: normalized source, target and unique lists
    assert_eq!(read(&source), "a/1\nb/1\n");
    assert_eq!(read(&target), "b/1\nc/1\n");
    assert_eq!(read(&unique), "a/1\nb/1\nc/1\n");

    // scenario B: index-mapped list and the overlap
    assert_eq!(read(&index_mapped), "b/1\nd/9\n");
    assert_eq!(read(&common), "b/1\n");

    // every derived family now has a current alias:
    for family in ["source-doi", "target-doi", "unique-doi", "index-mapped-doi", "common-doi"] {
        assert!(data.join(family).join("current").is_symlink());
    }
    Ok(())
}

#[test]
fn test_scenario_cited_count_orders_by_inbound_links() -> Result<()> {
    let data = tempdir()?;
    let data = data.path();

    let target = ShellTask::provided(data, "target-doi", "b/1\nb/1\nc/1\n");
    let count = ShellTask::new(
        data,
        "cited-count",
        CITED_COUNT_CMD,
        vec![("input", target)],
    );

    let graph = Graph::resolve(count.clone())?;
    assert!(Scheduler::new(1).run(&graph).is_success());

    assert_eq!(read(&count), "2\tb/1\n1\tc/1\n");
    Ok(())
}

#[test]
fn test_rerun_is_idempotent_end_to_end() -> Result<()> {
    let data = tempdir()?;
    let data = data.path();

    let raw = ShellTask::provided(data, "citations", "1,A/1,B/1\n");
    let source = ShellTask::new(data, "source-doi", SOURCE_CMD, vec![("input", raw.clone())]);

    let graph = Graph::resolve(source.clone())?;
    assert!(Scheduler::new(1).run(&graph).is_success());
    let first_mtime = fs::metadata(source.output().path())?.modified()?;

    // second run must not rewrite the artifact:
    let source_again = ShellTask::new(data, "source-doi", SOURCE_CMD, vec![("input", raw)]);
    let graph = Graph::resolve(source_again)?;
    let report = Scheduler::new(1).run(&graph);
    assert!(report.is_success());

    assert_eq!(
        fs::metadata(source.output().path())?.modified()?,
        first_mtime,
    );
    Ok(())
}
