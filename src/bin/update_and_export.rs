use std::path::PathBuf;

use basketlist_sync::cli::{EXIT_FAILURE, SheetArgs, init_logging};
use basketlist_sync::{Result, sync};
use clap::Parser;

fn main() {
    let args = Cli::parse();
    if let Err(error) = run(args) {
        eprintln!("error: {error}");
        std::process::exit(EXIT_FAILURE);
    }
}

fn run(args: Cli) -> Result<()> {
    init_logging()?;
    let summary = sync::update_and_export(&args.workbook, &args.export_dir, &args.sheets.pair())?;
    if summary.update.is_none() {
        println!("{}: update skipped", args.workbook.display());
    }
    for file in &summary.files {
        println!("wrote {}", file.display());
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Update the destination sheet of a workbook, then export both sheets to CSV."
)]
struct Cli {
    /// Workbook (.xlsx) to update.
    workbook: PathBuf,

    /// Directory receiving `<sheet>.csv` files; created when missing.
    export_dir: PathBuf,

    #[command(flatten)]
    sheets: SheetArgs,
}
