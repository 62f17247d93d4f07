//! gbd - Gamut boundary descriptor CLI
//!
//! Builds `.gam` surfaces from point lists, inspects them, exports VRML and
//! answers surface queries.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gbd")]
#[command(author, version, about = "Gamut boundary descriptor tool")]
#[command(long_about = "
Builds and queries gamut boundary descriptors: closed triangulated
surfaces around the colors a device or colorspace can reach.

Point lists are text files with one L a b (or J a b) triple per line,
separated by spaces or commas; lines starting with # are ignored.

Examples:
  gbd build measured.txt                    # Writes measured.gam
  gbd build 'printers/*.txt' -O gamuts -r 5 # Batch, resolution 5
  gbd build jab.txt --jab --center 50,0,0
  gbd info device.gam --json                # Volume, white/black, cusps
  gbd vrml device.gam -o device.wrl --axes --cusps
  gbd query device.gam radial 60,40,10 30,-20,-20
  gbd query device.gam isect 0,0,0 100,0,0
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Build .gam surfaces from point lists
    #[command(visible_alias = "b")]
    Build(BuildArgs),

    /// Show gamut information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Export a gamut surface as VRML
    Vrml(VrmlArgs),

    /// Query a gamut surface
    #[command(visible_alias = "q")]
    Query(QueryArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Input point lists (glob patterns allowed)
    #[arg(required = true)]
    input: Vec<String>,

    /// Output file (single input only)
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Output directory (default: next to each input)
    #[arg(short = 'O', long)]
    output_dir: Option<PathBuf>,

    /// Surface resolution (0 = default)
    #[arg(short, long, default_value = "0")]
    resolution: f64,

    /// Points are CIECAM Jab
    #[arg(long)]
    jab: bool,

    /// Gamut center as L,a,b
    #[arg(short, long)]
    center: Option<String>,

    /// Keep every distinct point instead of filtering to the extremes
    #[arg(long)]
    no_filter: bool,

    /// Find the hue cusps and store them with the surface
    #[arg(long)]
    cusps: bool,

    /// Also write a VRML file next to each .gam
    #[arg(long)]
    vrml: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Input .gam file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct VrmlArgs {
    /// Input .gam file
    input: PathBuf,

    /// Output .wrl file (default: input with .wrl extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Draw L, a and b axes
    #[arg(short, long)]
    axes: bool,

    /// Mark the hue cusps
    #[arg(short, long)]
    cusps: bool,
}

/// Surface query kinds.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum QueryOp {
    /// Surface crossing of the ray from the center through each point
    Radial,
    /// Distance relative to the surface along the ray (<= 1 inside)
    Nradial,
    /// Closest surface point
    Nearest,
    /// Crossings of the line through each pair of points
    Isect,
}

#[derive(Args)]
struct QueryArgs {
    /// Input .gam file
    input: PathBuf,

    /// Query kind
    #[arg(value_enum)]
    op: QueryOp,

    /// Points as L,a,b
    #[arg(required = true, allow_hyphen_values = true)]
    points: Vec<String>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Build(args) => commands::build::run(args, cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.verbose),
        Commands::Vrml(args) => commands::vrml::run(args, cli.verbose),
        Commands::Query(args) => commands::query::run(args, cli.verbose),
    }
}
