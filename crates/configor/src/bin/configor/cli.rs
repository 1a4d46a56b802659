//! configor cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; configor ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[clap(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Environment name (overrides CONFIGOR_ENV)
    #[clap(short = 'e', long = "env", global(true))]
    pub environment: Option<String>,

    /// Prefix of environment variable names, `-` to disable
    #[clap(short = 'p', long = "prefix", global(true))]
    pub prefix: Option<String>,

    /// Print files as they are loaded
    #[clap(long, global(true))]
    pub debug: bool,

    /// Also print the variable names looked up for each field
    #[clap(long, global(true))]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current environment name and variable prefix
    Env,

    /// List the files that would be loaded, in loading order
    Files(FilesCommand),

    /// Decode and merge files, then print the result
    ///
    /// Environment variables and defaults are not applied,
    /// they require a target struct.
    Merge(MergeCommand),
}

#[derive(Parser, Debug)]
pub struct FilesCommand {
    /// Candidate files, the first one wins
    #[clap(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct MergeCommand {
    #[clap(flatten)]
    pub output: OutputArgs,

    /// Candidate files, the first one wins
    #[clap(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
