use clap::Parser;

const CMD_NAME: &str = "cg";
const DEFAULT_TASK: &str = "common-doi";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CITATIONS_URL: &str =
    "https://opencitations.net/index/coci/dump/coci-latest.csv.zst";

/// Stores our command-line args format.
#[derive(Parser)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Terminal task to run
    #[arg(short, long, value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,

    /// Date partition of the identifier mapping (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<String>,

    /// Data directory, one artifact dir per task family
    #[arg(short = 'o', long, value_name = "DIR", default_value = DEFAULT_DATA_DIR)]
    #[arg(env = "CITEGRAPH_DATA")]
    pub data_dir: String,

    /// Source URL of the raw citations dump
    #[arg(short, long, value_name = "URL", default_value = DEFAULT_CITATIONS_URL)]
    #[arg(env = "CITEGRAPH_CITATIONS_URL")]
    pub url: String,

    /// Maximum number of tasks running concurrently
    #[arg(short, long, value_name = "N", default_value_t = 2)]
    pub jobs: usize,

    /// List known tasks and exit
    #[arg(short, long)]
    pub list: bool,

    /// Bypass user confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print additional debugging info
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dry run; print info but don't modify anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}
