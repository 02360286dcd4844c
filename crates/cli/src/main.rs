// pricecheck CLI - three-source quotation reconciliation

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "pricecheck")]
#[command(about = "Reconcile quotation prices across request, deal specialist and pricing engine")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation described by a TOML config file
    #[command(after_help = "\
Examples:
  pricecheck run pricecheck.toml
  pricecheck run pricecheck.toml --json
  pricecheck run pricecheck.toml --output result.json
  pricecheck run pricecheck.toml --rates rates.toml --strict")]
    Run {
        /// Path to the run config
        config: PathBuf,

        /// Print the JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Static rate file (TOML) used instead of the HTTP rate service
        #[arg(long, env = "PRICECHECK_RATES")]
        rates: Option<PathBuf>,

        /// Exit 63 when currencies are unmapped or rate lookups failed
        #[arg(long)]
        strict: bool,
    },

    /// Parse and validate a config without loading any source
    #[command(after_help = "\
Examples:
  pricecheck validate pricecheck.toml")]
    Validate {
        /// Path to the run config
        config: PathBuf,
    },

    /// Load the sources and list every currency name with its ISO code
    #[command(after_help = "\
Examples:
  pricecheck currencies pricecheck.toml
  pricecheck currencies pricecheck.toml --json")]
    Currencies {
        /// Path to the run config
        config: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, json, output, rates, strict } => {
            recon::cmd_run(config, json, output, rates, strict)
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Currencies { config, json } => recon::cmd_currencies(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(ref hint) = e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    /// Unspecified failure (exit 1).
    pub fn general(message: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, message)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<pricecheck_recon::ReconError> for CliError {
    fn from(err: pricecheck_recon::ReconError) -> Self {
        use pricecheck_recon::ReconError;
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("check [sources.*.columns] and [sources.*.rename] against the file header".to_string())
            }
            ReconError::DuplicateKey { .. } => {
                Some("set [join] key = \"id\" to pair rows by position".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::recon_exit_code(&err), message: err.to_string(), hint }
    }
}
