use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "layerval", version)]
struct Cli {
    /// Log level for diagnostics written to stderr.
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    log_level: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a scenario JSON and print the report. Exits with status 1 on any discrepancy.
    Check(CheckArgs),
    /// Print the rotation/flip composition table.
    Table,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input scenario JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Validation config JSON (tolerances, error budgets).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads; overrides the config file.
    #[arg(long)]
    threads: Option<usize>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level)
        .init();

    match cli.cmd {
        Command::Check(args) => cmd_check(args),
        Command::Table => {
            print_table();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let scenario = layerval::Scenario::from_path(&args.in_path)
        .with_context(|| format!("load scenario '{}'", args.in_path.display()))?;

    let mut config = match &args.config {
        Some(path) => layerval::ValidationConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => layerval::ValidationConfig::default(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    let report = scenario.run(&config).with_context(|| "validate scenario")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .with_context(|| "serialize report")?;
    println!("{json}");

    let count = report.discrepancies().count();
    if !report.is_clean() || !report.unused_composition_targets.is_empty() {
        eprintln!(
            "{count} discrepancies, {} unused composition targets",
            report.unused_composition_targets.len()
        );
        return Ok(ExitCode::FAILURE);
    }
    eprintln!("ok: {} displays clean", report.reports.len());
    Ok(ExitCode::SUCCESS)
}

fn print_table() {
    use layerval::DiscreteTransform as D;

    print!("{:>8} |", "a \\ b");
    for b in D::ALL {
        print!(" {:>7}", b.name());
    }
    println!();
    println!("{}", "-".repeat(10 + 8 * D::ALL.len()));
    for a in D::ALL {
        print!("{:>8} |", a.name());
        for b in D::ALL {
            print!(" {:>7}", a.then(b).name());
        }
        println!();
    }
}
