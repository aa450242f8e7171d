use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diffcov::cli::{self, Style};
use diffcov::config::{Config, DEFAULT_BASE_REF, DEFAULT_REPORT};
use diffcov::diff::{DiffSource, GitDiff, PatchDiff};
use diffcov::filter::DEFAULT_EXTENSIONS;
use diffcov::git;
use diffcov::index::DuplicatePolicy;
use diffcov::paths::{self, PathResolver};

/// diffcov: report changed lines that the test suite never executes.
#[derive(Parser)]
#[command(name = "diffcov", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    /// Path to the LCOV coverage report.
    #[arg(long, env = "DIFFCOV_REPORT", default_value = DEFAULT_REPORT)]
    report: PathBuf,

    /// Directory relative paths are resolved against
    /// (default: the git top-level directory, else the working directory).
    #[arg(long, env = "DIFFCOV_ROOT")]
    root: Option<PathBuf>,

    /// How to treat a report with several sections for the same file.
    #[arg(long, value_enum, env = "DIFFCOV_DUPLICATES", default_value = "last-wins")]
    duplicates: DuplicatePolicy,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure coverage of the lines changed since a base ref.
    Check {
        #[command(flatten)]
        report: ReportArgs,

        /// Git ref to diff against.
        #[arg(long, env = "DIFFCOV_BASE", default_value = DEFAULT_BASE_REF)]
        base: String,

        /// Read a zero-context unified diff (`git diff -U0`) from stdin
        /// instead of running git.
        #[arg(long, conflicts_with = "patch")]
        stdin: bool,

        /// Read a zero-context unified diff from a file instead of running git.
        #[arg(long)]
        patch: Option<PathBuf>,

        /// Source file extensions to measure.
        #[arg(
            long = "ext",
            env = "DIFFCOV_EXTENSIONS",
            value_delimiter = ',',
            default_values_t = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect::<Vec<_>>()
        )]
        extensions: Vec<String>,

        /// Measure changed test files (*.test.*, *.spec.*) instead of sources.
        #[arg(long)]
        tests_only: bool,

        /// Exit non-zero when overall diff coverage is below this percentage.
        #[arg(long, env = "DIFFCOV_FAIL_UNDER")]
        fail_under: Option<f64>,

        /// Output style.
        #[arg(long, value_enum, env = "DIFFCOV_STYLE", default_value = "text")]
        style: Style,
    },

    /// Show the uncovered lines of one source file.
    Uncovered {
        /// The source file path.
        source_file: String,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Show the lines a single-file diff introduces.
    Changed {
        /// File holding the diff. If omitted, reads from stdin.
        diff_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            report,
            base,
            stdin,
            patch,
            extensions,
            tests_only,
            fail_under,
            style,
        } => {
            let use_git = !stdin && patch.is_none();
            let root = resolve_root(report.root, use_git)?;

            let mut config = Config::new(root);
            config.base_ref = base;
            config.report = report.report;
            config.extensions = extensions;
            config.tests_only = tests_only;
            config.fail_under = fail_under;
            config.duplicates = report.duplicates;
            config.style = style;

            let source: Box<dyn DiffSource> = if stdin {
                Box::new(PatchDiff::new(&read_stdin()?))
            } else if let Some(path) = patch {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read diff from {}", path.display()))?;
                Box::new(PatchDiff::new(&text))
            } else {
                Box::new(GitDiff::open(&config.root, config.base_ref.as_str())?)
            };

            let output = cli::cmd_check(&config, source.as_ref())?;
            print!("{}", output.text);
            if !output.passed {
                let pct = output.report.aggregate.overall_percent().unwrap_or(0.0);
                let min = config.fail_under.unwrap_or(0.0);
                anyhow::bail!("Diff coverage {pct:.2}% is below the required {min:.2}%");
            }
            Ok(())
        }
        Commands::Uncovered {
            source_file,
            report,
        } => {
            let root = resolve_root(report.root, true)?;
            let resolver = PathResolver::new(root);
            let out = cli::cmd_uncovered(&report.report, &resolver, report.duplicates, &source_file)?;
            print!("{out}");
            Ok(())
        }
        Commands::Changed { diff_file } => {
            let text = match diff_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read diff from {}", path.display()))?,
                None => read_stdin()?,
            };
            print!("{}", cli::cmd_changed(&text));
            Ok(())
        }
    }
}

/// An explicit root wins and is made absolute. Otherwise use the git
/// top-level when inside a work tree, since git reports paths relative to it.
fn resolve_root(explicit: Option<PathBuf>, prefer_git: bool) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(paths::absolute(&root));
    }
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    if prefer_git {
        if let Ok(top) = git::repo_root(&cwd) {
            return Ok(top);
        }
    }
    Ok(cwd)
}

fn read_stdin() -> Result<String> {
    std::io::read_to_string(std::io::stdin()).context("Failed to read diff from stdin")
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
