use std::{
    error::Error,
    fs::File,
    io::{self, BufReader, Read},
    path::PathBuf,
};

use clap::Parser;

use finance_tracker::aggregation::{Report, TransactionRecord};

/// Summarise exported transactions by month and by category.
///
/// Reads a JSON array of transactions, as returned by `GET /api/transactions`,
/// and prints the report as pretty JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the exported transactions. Reads from stdin if omitted.
    path: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let reader: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(BufReader::new(File::open(path).map_err(|error| {
            format!("Could not open {}: {error}", path.display())
        })?)),
        None => Box::new(io::stdin().lock()),
    };

    let records: Vec<TransactionRecord> = serde_json::from_reader(reader)
        .map_err(|error| format!("Could not parse transactions: {error}"))?;

    let report = Report::from_records(&records);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
