use std::path::PathBuf;

use basketlist_sync::cli::{SheetArgs, init_logging, update_exit_code};
use basketlist_sync::{Result, sync};
use clap::Parser;

fn main() {
    let args = Cli::parse();
    if let Err(error) = run(args) {
        eprintln!("error: {error}");
        std::process::exit(update_exit_code(&error));
    }
}

fn run(args: Cli) -> Result<()> {
    init_logging()?;
    let pair = args.sheets.pair();
    let report = sync::update_workbook(&args.workbook, &pair)?;
    println!(
        "{}: copied {} rows x {} columns from '{}' to '{}'",
        args.workbook.display(),
        report.rows,
        report.columns,
        pair.source,
        pair.destination
    );
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Copy the source sheet of a workbook into its destination sheet, in place."
)]
struct Cli {
    /// Workbook (.xlsx) to update.
    workbook: PathBuf,

    #[command(flatten)]
    sheets: SheetArgs,
}
