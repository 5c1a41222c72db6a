//! CLI argument definitions

use crate::{ConvertOptions, EmitterOptions, ParseOptions};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Convert nginx configurations to Caddyfile format
#[derive(Parser)]
#[command(name = "nginx2caddy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert nginx configuration to a Caddyfile
    Convert(ConvertArgs),

    /// Report what would be converted, commented out, or skipped
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Input file(s), `-` for stdin
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tolerate unbalanced braces instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Spaces per nesting level
    #[arg(long, default_value = "2")]
    pub indent: usize,

    /// Print the result and diagnostics as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConvertArgs {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            parse: ParseOptions {
                strict_nesting: !self.lenient,
            },
            emitter: EmitterOptions {
                indent_width: self.indent,
            },
        }
    }
}

#[derive(clap::Args)]
pub struct AnalyzeArgs {
    /// Input file(s), `-` for stdin
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Tolerate unbalanced braces instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AnalyzeArgs {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            parse: ParseOptions {
                strict_nesting: !self.lenient,
            },
            ..Default::default()
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}
