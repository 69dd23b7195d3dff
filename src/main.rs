use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covrep::cli;
use covrep::config::{IncrementalMap, ReportConfig};
use covrep::diff::{self, DiffSource, GitDiff, StdinDiff};
use covrep::report::Format;

/// covrep — coverage aggregation, source annotation and report generation.
#[derive(Parser)]
#[command(name = "covrep", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate reports from a coverage JSON file.
    Report {
        /// Path to the coverage JSON file (istanbul format).
        file: PathBuf,

        /// Report format(s) to generate; repeatable (html, lcovonly,
        /// text-lcov, json, none).
        #[arg(long = "report", default_value = "html")]
        reports: Vec<String>,

        /// Directory in which to generate reports.
        #[arg(long, default_value = "coverage")]
        dir: PathBuf,

        /// JSON file of changed-line ranges ({path: [[start, end], ...]}).
        #[arg(long, conflicts_with_all = ["git_diff", "diff_stdin"])]
        diff_json: Option<PathBuf>,

        /// Git diff arguments, e.g. "HEAD~1" or "main..HEAD".
        #[arg(long, conflicts_with = "diff_stdin")]
        git_diff: Option<String>,

        /// Read a unified diff from stdin.
        #[arg(long)]
        diff_stdin: bool,

        /// Optional path prefix to prepend to diff paths for matching
        /// against coverage data paths.
        #[arg(long)]
        path_prefix: Option<String>,

        /// Log each written file to stderr.
        #[arg(long)]
        verbose: bool,
    },

    /// Print a text summary of the merged coverage metrics.
    Summary {
        /// Path to the coverage JSON file.
        file: PathBuf,
    },

    /// List the available report formats.
    Formats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            file,
            reports,
            dir,
            diff_json,
            git_diff,
            diff_stdin,
            path_prefix,
            verbose,
        } => {
            let collector = cli::load_coverage(&file)?;
            let formats = reports
                .iter()
                .map(|name| name.parse::<Format>())
                .collect::<covrep::error::Result<Vec<_>>>()?;

            let mut incremental_map =
                incremental_map_from(diff_json.as_deref(), git_diff.as_deref(), diff_stdin)?;
            if let Some(prefix) = path_prefix.as_deref() {
                incremental_map = incremental_map.map(|map| diff::apply_path_prefix(map, prefix));
            }

            let config = ReportConfig {
                dir,
                verbose,
                ..Default::default()
            };
            cli::cmd_report(&collector, &formats, &config, incremental_map)
        }
        Commands::Summary { file } => {
            let collector = cli::load_coverage(&file)?;
            print!("{}", cli::cmd_summary(&collector));
            Ok(())
        }
        Commands::Formats => {
            print!("{}", cli::cmd_formats());
            Ok(())
        }
    }
}

fn incremental_map_from(
    diff_json: Option<&std::path::Path>,
    git_diff: Option<&str>,
    diff_stdin: bool,
) -> Result<Option<IncrementalMap>> {
    if let Some(path) = diff_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(Some(diff::parse_diff_json(&text)?));
    }
    if let Some(args) = git_diff {
        let text = GitDiff {
            args: args.to_string(),
        }
        .fetch_diff()?;
        return Ok(Some(diff::parse_diff(&text)));
    }
    if diff_stdin {
        let text = StdinDiff.fetch_diff()?;
        return Ok(Some(diff::parse_diff(&text)));
    }
    Ok(None)
}
