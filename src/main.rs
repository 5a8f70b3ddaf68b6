use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inspirebib::latex::parser::resolve_bibfile;
use inspirebib::{
    aux_to_texkeys, blg_to_texkeys, join_entries, resolve_keys, write_bibliography, Blacklist,
    InspireClient, InspireConfig, Resolution,
};

/// CLI app for fetching BibTeX entries from INSPIRE-HEP for the keys cited in a LaTeX build
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Extra citation keys to skip (repeatable)
    #[arg(short = 'x', long = "exclude", global = true)]
    exclude: Vec<String>,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate bibliography from a LaTeX .aux file
    Aux2bib {
        /// LaTeX .aux file
        file: PathBuf,
    },
    /// Generate bibliography from a BibTeX .blg file
    Blg2bib {
        /// BibTeX .blg file
        file: PathBuf,
        /// Append bib entries to the .bib file defined in the .blg file
        #[arg(long)]
        addtobib: bool,
    },
}

/// Exit status used when the user interrupts twice.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Resolve keys, stopping early on Ctrl-C.
///
/// The first Ctrl-C ends the lookups and keeps what was resolved. Any later
/// Ctrl-C, including one after the lookups are over, exits at once.
fn resolve(texkeys: &[String]) -> Result<Resolution> {
    let abort = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&abort);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .context("Failed to install Ctrl-C handler")?;

    let client = InspireClient::new(InspireConfig::from_env());
    info!("Querying {}", client.config().literature_url());
    let resolution = resolve_keys(&client, texkeys, &abort);
    abort.store(true, Ordering::SeqCst);
    Ok(resolution)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let blacklist = Blacklist::default().with_keys(args.exclude);

    match args.command {
        Command::Aux2bib { file } => {
            let texkeys = aux_to_texkeys(&file, &blacklist);
            let resolution = resolve(&texkeys)?;
            println!("{}", join_entries(&resolution.resolved));
        }
        Command::Blg2bib { file, addtobib } => {
            let scan = blg_to_texkeys(&file, &blacklist);
            let resolution = resolve(&scan.keys)?;
            let bibfile = scan.bibfile.map(|bib| resolve_bibfile(&file, &bib));
            if resolution.aborted {
                warn!("Writing the {} entries resolved before the abort", resolution.resolved.len());
            }

            let stdout = io::stdout();
            let report = write_bibliography(
                scan.keys.len(),
                &resolution.resolved,
                bibfile.as_deref(),
                addtobib,
                &mut stdout.lock(),
            )
            .context("Failed to write bibliography")?;
            if let Some(path) = report.appended_to {
                info!("Output appended to {:?}", path);
            }
        }
    }

    Ok(())
}
