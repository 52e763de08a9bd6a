use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "swapgl",
    author,
    version,
    about = "Validate and trace swapgl scenes against a recording GL context"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a scene, compile every pass and print what was built.
    Check(CheckArgs),
    /// Run a scene for a number of frames and print the recorded GPU calls.
    Trace(TraceArgs),
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Scene file (TOML).
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct TraceArgs {
    /// Scene file (TOML).
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Override the scene's frame count.
    #[arg(long, value_name = "N")]
    pub frames: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Draw the debug preview after every pass built with `debug = true`.
    #[arg(long)]
    pub debug_view: bool,

    /// Write the trace to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn parse() -> Args {
    Args::parse()
}
