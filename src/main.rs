mod common;
mod config;
mod error;
mod intake;
mod logging;
mod process;
mod transform;
mod workspace;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::RelinkError;
use crate::process::{ProcessReport, process_archive};
use crate::workspace::OutputStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/relinker/config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rename every image in a zip bundle and relink its HTML file
    Process {
        /// Path to the .zip file holding the images folder and the HTML file
        archive: Option<PathBuf>,

        /// Suffix appended to every image name (photo.png -> photo_<TOKEN>.png)
        #[arg(short, long)]
        token: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a processed file from an earlier run
    Download {
        /// Run id printed by `process`
        #[arg(short, long)]
        run: String,

        /// Name of the processed file (e.g. index.html)
        name: String,

        /// Destination file or directory; "-" writes to stdout
        #[arg(long, default_value = ".")]
        to: PathBuf,
    },
}

fn print_report(report: &ProcessReport, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", text);
        return Ok(());
    }

    if report.renamed.is_empty() {
        println!("No images found; {} left unchanged.", report.html_file);
    } else {
        println!("Renamed {} image(s):", report.renamed.len());
        for entry in report.renamed.iter() {
            println!("  {} -> {}", entry.original_name, entry.new_name);
        }
    }
    println!("Run: {}", report.run_id);
    println!("Processed HTML: {}", report.published.display());
    println!(
        "Download with: relinker download --run {} {}",
        report.run_id, report.html_file
    );

    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Process {
            archive,
            token,
            json,
        } => {
            let report = process_archive(archive.as_deref(), token.as_deref(), &config)?;
            print_report(&report, json)?;
        }
        Command::Download { run, name, to } => {
            let store = OutputStore::new(&config.output_root);
            if to.as_os_str() == "-" {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                store.stream(&run, &name, &mut out)?;
                out.flush().context("Failed to flush stdout")?;
            } else {
                let written = store.download_to(&run, &name, &to)?;
                println!("Saved {}", written.display());
            }
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    if let Err(err) = run(args) {
        let code = err
            .downcast_ref::<RelinkError>()
            .map(RelinkError::exit_code)
            .unwrap_or(1);
        eprintln!("Error: {:#}", err);
        std::process::exit(code);
    }
}
