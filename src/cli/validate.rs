//! Validate command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::analysis::validate_file;

#[derive(Args)]
pub struct ValidateArgs {
    /// CSV archive to check
    #[arg(value_name = "INFILE")]
    pub infile: PathBuf,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let report = validate_file(&args.infile)
        .with_context(|| format!("Failed validating {}", args.infile.display()))?;

    for finding in &report.findings {
        println!("{finding}");
    }
    println!(
        "{}: {} records, {} blank rows, {} findings",
        args.infile.display(),
        report.records,
        report.blank_rows,
        report.findings.len()
    );
    Ok(())
}
