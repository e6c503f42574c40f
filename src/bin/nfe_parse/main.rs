//! nfeparse - Export invoice installments from Brazilian NFe XML files.
//!
//! Reads every NFe XML file from the input directory and writes one Excel row per
//! installment ("fatura") with the invoice number, key, company name and dates.

mod config;
mod parse;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

pub use crate::config::Config;
use crate::parse::nfe_parse;

/// Command line arguments for nfeparse.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Export installments from NFe XML files to Excel"
)]
pub struct NfeParseArgs {
    /// Optional input directory or XML file path
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    pub path: Option<PathBuf>,

    /// Optional output file or directory (default is the input directory)
    #[arg(short, long, name = "OUTPUT_PATH")]
    pub output: Option<String>,

    /// Only print records without writing to file
    #[arg(short, long)]
    pub print: bool,

    /// Include XML files from subdirectories
    #[arg(short, long)]
    pub recurse: bool,

    /// Print verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    pub completion: Option<Shell>,
}

fn main() -> Result<()> {
    let args = NfeParseArgs::parse();
    if let Some(ref shell) = args.completion {
        nfe_tools::generate_shell_completion(*shell, NfeParseArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        let config = Config::from_args(&args)?;
        nfe_parse(&config)
    }
}
