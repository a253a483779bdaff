use clap::{Args, Parser, Subcommand, ValueEnum};
use rnascore::{EnsembleMethod, EnsemblePolicy, Normalization};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "RNAScore Developers",
    version,
    about = "RNAScore CLI - Superposition and TM-score evaluation of predicted RNA 3D structures against reference structures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score predicted structures against reference structures, target by target.
    Score(ScoreArgs),
    /// Check the scoring invariants on randomly generated structures.
    Selftest(SelftestArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the `score` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    // --- Inputs ---
    /// Predictions in labels format (ID, resname, resid, x_1, y_1, z_1, ...).
    #[arg(short, long, required = true, value_name = "CSV")]
    pub predicted: PathBuf,

    /// Reference structures in labels format. Several models per residue form a
    /// reference ensemble.
    #[arg(short, long, required = true, value_name = "CSV")]
    pub reference: PathBuf,

    /// Only score these targets. Can be used multiple times.
    #[arg(short, long = "target", value_name = "ID")]
    pub targets: Vec<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Scoring Overrides ---
    /// Length used to normalize the score: target, predicted, average or a number.
    #[arg(short, long, value_name = "MODE")]
    pub normalize: Option<Normalization>,

    /// Reduction over predictions against a single reference:
    /// best, avg-of-best or best-of-avg.
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<EnsemblePolicy>,

    /// Reduction over predictions against several references:
    /// best-of-best, avg-of-best or best-of-avg.
    #[arg(long, value_name = "METHOD")]
    pub method: Option<EnsembleMethod>,

    /// Pair predicted and reference chains by optimal assignment instead of
    /// concatenating them.
    #[arg(long)]
    pub multichain: bool,

    // --- Output ---
    /// Also report RMSD, GDT-TS, lDDT and clash counts for the best prediction.
    #[arg(long)]
    pub metrics: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S scoring.d0-floor=0.6
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `selftest` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SelftestArgs {
    /// Seed for the random structure generator.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of residues in the generated structures used for the invariance checks.
    #[arg(short, long, default_value_t = 100, value_name = "INT")]
    pub length: usize,
}
