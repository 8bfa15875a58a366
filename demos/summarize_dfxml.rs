//! summarize_dfxml - Summarize the regular files described by a DFXML file.
//!
//! Prints the same statistics the analyzer puts in `analysis.csv`: file
//! count, total size, and the date range of the timestamp family with the
//! oldest values. A second table counts file objects by name type.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example summarize_dfxml <filename.xml> [--all]
//! ```
//!
//! With `--all`, unallocated files are counted too.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use diskimage_toolkit::reader::{self, Event};
use diskimage_toolkit::stats::{convert_size, current_year, StatisticsBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <filename.xml> [--all]", args[0]);
        std::process::exit(1);
    }
    let export_all = args.iter().skip(2).any(|a| a == "--all");

    let mut builder = StatisticsBuilder::new(export_all);
    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();

    for result in reader::open(Path::new(&args[1]))? {
        match result {
            Ok(Event::FileObject(fi)) => {
                let key = fi.name_type.map(|t| t.as_str()).unwrap_or("-");
                *by_type.entry(key.to_string()).or_default() += 1;
                builder.add(&fi);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error parsing DFXML: {}", e);
                return Err(e.into());
            }
        }
    }

    let year = current_year();
    match builder.finish(&year) {
        Some(stats) => {
            println!("{:>14}  {}", "Files", stats.file_count);
            println!("{:>14}  {}", "Size", convert_size(stats.total_bytes));
            println!("{:>14}  {}", "Date statement", stats.date_statement());
            println!("{:>14}  {} to {}", "Range", stats.earliest_date, stats.latest_date);
        }
        None => println!("No regular files"),
    }

    println!();
    println!("{:>8}    {:>8}", "Type", "Count");
    for (name_type, count) in &by_type {
        println!("{:>8}    {:>8}", name_type, count);
    }

    Ok(())
}
