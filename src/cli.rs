use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{get_config_dir, get_data_dir};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Spaces per nesting level in written XML (0 for a single line)
    #[arg(long, global = true)]
    pub indent: Option<usize>,

    /// Fail when a document uses plugin classes that are not registered
    #[arg(long, global = true)]
    pub strict_diagnostics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decode a job config.xml and list its scm, triggers and post-build steps
    Job { file: PathBuf },
    /// Decode a job config.xml and write it back to stdout
    Roundtrip { file: PathBuf },
    /// Show a build report (`/job/<name>/<number>/api/json`)
    Build {
        file: PathBuf,
        /// Print the value of this build parameter
        #[arg(short, long)]
        param: Option<String>,
    },
    /// Show a job report (`/job/<name>/api/json`)
    Status { file: PathBuf },
    /// Show a queue item (`/queue/item/<id>/api/json`)
    Queue { file: PathBuf },
    /// Write the default config.toml
    InitConfig,
}

const VERSION_MESSAGE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "-",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

pub fn version() -> String {
    let author = clap::crate_authors!();

    let config_dir_path = get_config_dir().display().to_string();
    let data_dir_path = get_data_dir().display().to_string();

    format!(
        "\
{VERSION_MESSAGE}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
