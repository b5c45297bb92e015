use anyhow::{Context, Result};
use colored::Colorize;

use engine::{Graph, Outcome, Plan, RunReport, Scheduler};

use crate::fs::Fs;
use crate::pipeline::{self, PipelineConfig};
use crate::settings::Settings;
use crate::ui::Ui;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Pipeline run failed; root cause was task \"{0}\"")]
    RunFailed(String),
}

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// Filesystem interface
    fs: Fs,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let fs = Fs::new(&settings.data_dir, settings.dry_run);
        let ui = Ui::new(&settings);
        Self { settings, fs, ui }
    }

    /// Run the app, using settings to determine which terminal task to run.
    pub fn run(mut self) -> Result<()> {
        if self.settings.list {
            for name in pipeline::KNOWN_TASKS {
                println!("{name}");
            }
            return Ok(());
        }

        self.ui
            .verbose_msg(&format!("Using data directory {:?}", self.settings.data_dir));
        self.fs.ensure_data_dir_exists(self.ui.verbose)?;

        let config = PipelineConfig {
            data_dir: self.fs.data_dir().to_path_buf(),
            citations_url: self.settings.url.clone(),
            date: self.settings.date,
        };

        self.ui.verbose_progress("Resolving task graph");
        let terminal = pipeline::terminal_task(&self.settings.task, &config)?;
        let graph = Graph::resolve(terminal).context("while resolving the task graph")?;
        self.ui.done();
        log::debug!("graph for \"{}\" has {} tasks", self.settings.task, graph.len());

        // artifact dirs must exist before anything publishes:
        let families: Vec<&'static str> = graph.tasks().map(|t| t.family()).collect();
        self.fs.create_family_dirs(&families)?;

        let scheduler = Scheduler::new(self.settings.jobs);
        let plan = scheduler.plan(&graph);
        self.print_plan(&plan);

        if !plan.has_tasks_to_run() {
            eprintln!("{}", "Everything up to date; nothing to run.".green());
            return Ok(());
        }
        if self.settings.dry_run {
            eprintln!("{}", "Dry run; not executing.".green());
            return Ok(());
        }
        if !self.ui.confirm("Proceed?")? {
            return Ok(());
        }

        eprintln!("\n{}.\n", "Starting pipeline execution".magenta());
        self.ui.start_timer();
        let report = scheduler.run(&graph);
        self.ui.print_elapsed("Pipeline run");

        self.print_report(&report)
    }

    fn print_plan(&self, plan: &Plan) {
        if self.ui.verbose {
            for name in &plan.cached {
                eprintln!("{} {name}", "CACHED".cyan());
            }
        } else if !plan.cached.is_empty() {
            eprintln!("{} tasks already cached.", plan.cached.len());
        }
        for name in &plan.to_run {
            eprintln!("{} {name}", "RUN".green());
        }
    }

    fn print_report(&self, report: &RunReport) -> Result<()> {
        for (name, outcome) in &report.outcomes {
            match outcome {
                Outcome::Cached => {
                    if self.ui.verbose {
                        eprintln!("{} {name}", "CACHED".cyan());
                    }
                }
                Outcome::Ran => eprintln!("{} {name}", "DONE".green()),
                Outcome::Failed(e) => eprintln!("{} {name}: {e:#}", "FAILED".red()),
                Outcome::Blocked => eprintln!("{} {name}", "BLOCKED".yellow()),
            }
        }

        if let Some(path) = report.terminal_path() {
            eprintln!("\n{} {}", "Completed pipeline.".green(), path.display());
            return Ok(());
        }

        // report the true root cause, not the blocked dependents:
        match report.first_failure() {
            Some((name, _)) => Err(Error::RunFailed(name.to_owned()).into()),
            None => Err(Error::RunFailed(self.settings.task.clone()).into()),
        }
    }
}
