use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use crate::args::Args;
use crate::pipeline;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid date '{0}' (should be formatted YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("unknown task \"{0}\" (known tasks: {1})")]
    UnknownTask(String, String),
    #[error("--jobs must be at least 1")]
    ZeroJobs,
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. defaults are added in.
#[derive(Debug)]
pub struct Settings {
    pub task: String,
    pub date: NaiveDate,
    pub data_dir: PathBuf,
    pub url: String,
    pub jobs: usize,
    pub list: bool,
    pub yes: bool,
    pub verbose: u8,
    pub dry_run: bool,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if !args.list && !pipeline::KNOWN_TASKS.contains(&args.task.as_str()) {
            return Err(
                Error::UnknownTask(args.task, pipeline::KNOWN_TASKS.join(", ")).into(),
            );
        }

        if args.jobs == 0 {
            return Err(Error::ZeroJobs.into());
        }

        let date = match args.date {
            Some(s) => {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| Error::InvalidDate(s))?
            }
            None => chrono::Local::now().date_naive(),
        };

        Ok(Self {
            task: args.task,
            date,
            data_dir: PathBuf::from(&args.data_dir),
            url: args.url,
            jobs: args.jobs,
            list: args.list,
            yes: args.yes,
            verbose: args.verbose,
            dry_run: args.dry_run,
        })
    }
}
