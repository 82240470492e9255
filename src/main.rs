use clap::Parser;
use station_summary::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    eprintln!("Failed to listen for CTRL+C: {}", e);
                }
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(station_summary::StationError::processing_interrupted(
                    "Processing interrupted by user",
                )
                .into())
            }
        }
    });

    // Blocking workers may still be reading; do not wait for them
    runtime.shutdown_background();

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Station Summary - Per-Station Temperature Aggregation");
    println!("=====================================================");
    println!();
    println!("Computes the minimum, mean and maximum temperature of every station");
    println!("in a `station;temperature` measurement file.");
    println!();
    println!("USAGE:");
    println!("    station-summary <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    aggregate   Aggregate a measurement file into min/mean/max per station");
    println!("    generate    Generate a synthetic measurement file");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Create 1 billion measurements from the station list:");
    println!("    station-summary generate 1_000_000_000");
    println!();
    println!("    # Aggregate them on 8 workers, one station per line:");
    println!("    station-summary aggregate ./data/measurements.txt -j 8 --format lines");
    println!();
    println!("For detailed help on any command, use:");
    println!("    station-summary <COMMAND> --help");
}
