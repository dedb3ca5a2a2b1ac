use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use specmatch::library::archive::DataDir;
use specmatch::library::LibraryKind;

mod archive;
mod convert;
mod identify;
mod info;
mod library;
mod peaks;

/// specmatch - Spectral Identification Toolkit
#[derive(Parser)]
#[command(name = "specmatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which reference collection a command works with.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum KindArg {
    /// Raman reference spectra (quality-tiered)
    #[default]
    Raman,
    /// Processed infrared reference spectra
    Infrared,
}

impl From<KindArg> for LibraryKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Raman => LibraryKind::Raman,
            KindArg::Infrared => LibraryKind::Infrared,
        }
    }
}

/// Output layout for the convert command.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormatArg {
    /// RRUFF plaintext (comma-delimited pairs)
    #[default]
    Rruff,
    /// Defender LRD 1.1 instrument library file (UTF-16LE)
    Lrd,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify a spectrum against the reference library
    Identify {
        /// Input spectral file (any recognized format)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Reference collection to match against
        #[arg(short, long, value_enum, default_value_t = KindArg::Raman)]
        kind: KindArg,

        /// Data directory (defaults to ~/.specmatch)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Lower edge of the analysis window (wavenumbers)
        #[arg(long, default_value_t = 200.0)]
        xmin: f64,

        /// Upper edge of the analysis window (wavenumbers)
        #[arg(long, default_value_t = 3000.0)]
        xmax: f64,

        /// Baseline smoothness decade (lambda = 10^SMOOTHNESS)
        #[arg(long, default_value_t = 3.0)]
        smoothness: f64,

        /// Baseline asymmetry decade (p = 10^-ASYMMETRY)
        #[arg(long, default_value_t = 3.0)]
        asymmetry: f64,

        /// Skip baseline subtraction before matching
        #[arg(long)]
        no_baseline: bool,

        /// Linear axis recalibration: slope,intercept (e.g. 1.0093,0.1226)
        #[arg(long, value_name = "SLOPE,INTERCEPT", value_parser = parse_calibration)]
        recalibrate: Option<(f64, f64)>,

        /// Resampling resolution for scoring (axis units)
        #[arg(long, default_value_t = specmatch::score::DEFAULT_RESOLUTION)]
        resolution: f64,

        /// Candidates to report per metric
        #[arg(long, default_value_t = specmatch::score::TOP_CANDIDATES)]
        top: usize,

        /// Maximum reference entries kept per mineral (Raman only)
        #[arg(long, default_value_t = 2)]
        max_similar: usize,

        /// Preferred laser wavelength in nm (Raman only)
        #[arg(long, default_value_t = 780.0)]
        preferred_laser: f64,
    },

    /// Detect and list prominent peaks in a spectrum
    Peaks {
        /// Input spectral file (any recognized format)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Lower edge of the analysis window (wavenumbers)
        #[arg(long, default_value_t = 200.0)]
        xmin: f64,

        /// Upper edge of the analysis window (wavenumbers)
        #[arg(long, default_value_t = 3000.0)]
        xmax: f64,

        /// Prominence filter as a percentage of the maximum intensity
        #[arg(short, long, default_value_t = 5.0)]
        prominence: f64,

        /// Subtract the estimated baseline before detection
        #[arg(long)]
        subtract_baseline: bool,

        /// Baseline smoothness decade (lambda = 10^SMOOTHNESS)
        #[arg(long, default_value_t = 3.0)]
        smoothness: f64,

        /// Baseline asymmetry decade (p = 10^-ASYMMETRY)
        #[arg(long, default_value_t = 3.0)]
        asymmetry: f64,
    },

    /// Display information about a spectral file
    Info {
        /// Input spectral file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Convert a spectral file to the RRUFF or LRD layout
    Convert {
        /// Input spectral file (any recognized format)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output layout
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Rruff)]
        format: OutputFormatArg,

        /// Name recorded in the output header (defaults to the input stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// Build or inspect the cached reference library
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },

    /// Manage the local reference archive
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },
}

#[derive(Subcommand)]
enum LibraryCommands {
    /// Scan the reference archive and cache the built library
    Build {
        /// Reference collection to build
        #[arg(short, long, value_enum, default_value_t = KindArg::Raman)]
        kind: KindArg,

        /// Data directory (defaults to ~/.specmatch)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Maximum entries kept per mineral (Raman only)
        #[arg(long, default_value_t = 2)]
        max_similar: usize,

        /// Preferred laser wavelength in nm (Raman only)
        #[arg(long, default_value_t = 780.0)]
        preferred_laser: f64,

        /// Discard any existing cache and rebuild from the archive
        #[arg(long)]
        force: bool,
    },

    /// Report what the cached library contains
    Info {
        /// Reference collection to inspect
        #[arg(short, long, value_enum, default_value_t = KindArg::Raman)]
        kind: KindArg,

        /// Data directory (defaults to ~/.specmatch)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ArchiveCommands {
    /// Show which archives are installed and how old they are
    Status {
        /// Data directory (defaults to ~/.specmatch)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Install a downloaded archive zip into the data directory
    Install {
        /// Archive directory name (e.g. raman_excellent_unoriented)
        #[arg(value_name = "DATASET")]
        dataset: String,

        /// Path to the downloaded zip file
        #[arg(value_name = "ZIP")]
        zip: PathBuf,

        /// Data directory (defaults to ~/.specmatch)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Identify {
            file,
            kind,
            data_dir,
            xmin,
            xmax,
            smoothness,
            asymmetry,
            no_baseline,
            recalibrate,
            resolution,
            top,
            max_similar,
            preferred_laser,
        } => identify::run(identify::IdentifyArgs {
            file,
            kind: kind.into(),
            data_dir: resolve_data_dir(data_dir)?,
            xmin,
            xmax,
            smoothness,
            asymmetry,
            no_baseline,
            recalibrate,
            resolution,
            top,
            max_similar,
            preferred_laser,
        }),
        Commands::Peaks {
            file,
            xmin,
            xmax,
            prominence,
            subtract_baseline,
            smoothness,
            asymmetry,
        } => peaks::run(
            file,
            xmin,
            xmax,
            prominence,
            subtract_baseline,
            smoothness,
            asymmetry,
        ),
        Commands::Info { file } => info::run(file),
        Commands::Convert {
            input,
            output,
            format,
            name,
        } => convert::run(input, output, format, name),
        Commands::Library { command } => match command {
            LibraryCommands::Build {
                kind,
                data_dir,
                max_similar,
                preferred_laser,
                force,
            } => library::run_build(
                resolve_data_dir(data_dir)?,
                kind.into(),
                max_similar,
                preferred_laser,
                force,
            ),
            LibraryCommands::Info { kind, data_dir } => {
                library::run_info(resolve_data_dir(data_dir)?, kind.into())
            }
        },
        Commands::Archive { command } => match command {
            ArchiveCommands::Status { data_dir } => {
                archive::run_status(resolve_data_dir(data_dir)?)
            }
            ArchiveCommands::Install {
                dataset,
                zip,
                data_dir,
            } => archive::run_install(resolve_data_dir(data_dir)?, &dataset, zip),
        },
    }
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<DataDir> {
    match explicit {
        Some(root) => Ok(DataDir::at(root)),
        None => Ok(DataDir::resolve()?),
    }
}

/// Parse a `slope,intercept` calibration pair.
fn parse_calibration(raw: &str) -> Result<(f64, f64), String> {
    let (slope, intercept) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected SLOPE,INTERCEPT, got {raw:?}"))?;
    let slope: f64 = slope
        .trim()
        .parse()
        .map_err(|_| format!("bad slope {slope:?}"))?;
    let intercept: f64 = intercept
        .trim()
        .parse()
        .map_err(|_| format!("bad intercept {intercept:?}"))?;
    Ok((slope, intercept))
}
