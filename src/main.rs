//! # specmatch CLI
//!
//! Command-line front end for spectral identification: decode vendor
//! files, clean them, and match them against the reference library.
//!
//! ## Usage
//!
//! ```bash
//! # Identify a measurement against the Raman reference library
//! specmatch identify sample.txt
//!
//! # Annotate peaks
//! specmatch peaks sample.txt --prominence 5
//!
//! # Inspect a file without processing it
//! specmatch info sample.spc
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
