use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meeting-archive")]
#[command(
    about = "Mirror a meeting-archive web page into local transcripts",
    long_about = None
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide download progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Number of archive pages to walk (overrides source.page_count)
    #[arg(long, global = true)]
    pub pages: Option<u32>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Walk every archive page and transcribe new recordings (default)
    Run,
    /// Download, extract and transcribe a single recording
    Process(ProcessCliArgs),
    /// Write chunk files for transcripts that have none
    Chunk,
    /// Mirror agenda and packet documents and combine them into one file
    Documents,
    /// Print the file name a label would be stored under
    Name(NameCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// Absolute URL of the recording
    pub url: String,
    /// Label to name the artifacts after, e.g. the thumbnail alt text
    #[arg(short, long)]
    pub label: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct NameCliArgs {
    /// Free-text label, e.g. "November 13, 2025 City Council Meeting at 6:00 PM"
    pub label: Option<String>,
    /// URL used when the label is missing or unusable
    #[arg(short, long, default_value = "")]
    pub url: String,
}
