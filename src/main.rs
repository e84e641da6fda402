use anyhow::Result;
use baml_path_fixer::patch::{run_all, Mode, PatchOutcome};
use baml_path_fixer::project::{resolve_project, ProjectLayout, PROJECT_ENV};
use baml_path_fixer::report::{self, Severity, StatusLine};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "baml-path-fixer")]
#[command(
    about = "Make a generated baml_client load this project's baml_src",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to project root (auto-detected if not specified)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch globals.py and __init__.py (default)
    Apply {
        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report which generated files still need patching
    Status,

    /// Exit non-zero unless both generated files are already patched
    Verify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let layout = resolve_layout(cli.project)?;

    match cli.command.unwrap_or(Commands::Apply {
        dry_run: false,
        diff: false,
    }) {
        Commands::Apply { dry_run, diff } => cmd_apply(&layout, dry_run, diff),
        Commands::Status => cmd_status(&layout),
        Commands::Verify => cmd_verify(&layout),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_layout(explicit: Option<PathBuf>) -> Result<ProjectLayout> {
    let cwd = env::current_dir()?;
    let (layout, source) = resolve_project(explicit, env::var(PROJECT_ENV).ok(), &cwd)?;
    tracing::info!("project {} ({})", layout.root().display(), source);
    Ok(layout)
}

fn print_status(line: &StatusLine) {
    let symbol = match line.severity {
        Severity::Success => line.severity.symbol().green(),
        Severity::Warning => line.severity.symbol().yellow(),
    };
    println!("{} {}", symbol, line.text);
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Failures are reported as status lines only; the exit code stays 0.
fn cmd_apply(layout: &ProjectLayout, dry_run: bool, show_diff: bool) -> Result<()> {
    let mode = if dry_run { Mode::DryRun } else { Mode::Write };

    println!("{}", report::BANNER);
    if dry_run {
        println!("{}", "  [DRY RUN - no files will be modified]".cyan());
    }

    for (patch, result) in run_all(layout, mode) {
        print_status(&report::status_line(patch, &result));

        if show_diff {
            if let Some((file, before, after)) = result.as_ref().ok().and_then(|o| o.change()) {
                display_diff(file, before, after);
            }
        }
    }

    println!("{}", report::DONE);
    Ok(())
}

fn cmd_status(layout: &ProjectLayout) -> Result<()> {
    println!("{}", "BAML Client Patch Status".bold());
    println!("Project: {}", layout.root().display());
    println!();

    for (patch, result) in run_all(layout, Mode::DryRun) {
        match result {
            Ok(PatchOutcome::AlreadyApplied { .. }) => {
                println!("{} {}: {}", "✓".green(), patch.label(), "PATCHED".green().bold());
            }
            Ok(PatchOutcome::WouldApply { .. }) | Ok(PatchOutcome::Applied { .. }) => {
                println!(
                    "{} {}: {}",
                    "⊙".yellow(),
                    patch.label(),
                    "NEEDS PATCH".yellow().bold()
                );
            }
            Err(e) => {
                println!(
                    "{} {}: {} ({})",
                    "✗".red(),
                    patch.label(),
                    "CANNOT PATCH".red().bold(),
                    e.to_string().dimmed()
                );
            }
        }
    }

    Ok(())
}

fn cmd_verify(layout: &ProjectLayout) -> Result<()> {
    println!("{}", "Verifying generated client...".bold());
    println!("Project: {}", layout.root().display());
    println!();

    let mut verified = 0;
    let mut mismatch = 0;

    for (patch, result) in run_all(layout, Mode::DryRun) {
        match result {
            Ok(PatchOutcome::AlreadyApplied { .. }) => {
                println!("{} {}: Verified (already patched)", "✓".green(), patch.label());
                verified += 1;
            }
            Ok(outcome) => {
                eprintln!("{} {}: MISMATCH", "✗".red(), patch.label());
                eprintln!("  Expected: patch already applied");
                eprintln!("  Found: patch not yet applied");
                if let Some((file, _, _)) = outcome.change() {
                    eprintln!("  Location: {}", file.display());
                }
                mismatch += 1;
            }
            Err(e) => {
                eprintln!("{} {}: MISMATCH", "✗".red(), patch.label());
                eprintln!("  Error: {}", e);
                mismatch += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} verified", format!("{}", verified).green());
    println!("  {} mismatch", format!("{}", mismatch).red());

    if mismatch > 0 {
        std::process::exit(1);
    }

    Ok(())
}
