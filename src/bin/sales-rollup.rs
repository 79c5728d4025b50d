use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use sales_rollup::{
    build_monthly_report, build_summary_report, import_batch, ConsistencyChecker, EngineConfig,
    FileStore, ImportKind, LedgerSheet, MonthKey, PeriodStore, ReportSet, SkippedFile,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sales-rollup")]
#[command(about = "Daily sales ledgers and fiscal period reports", long_about = None)]
struct Cli {
    /// Directory holding ledgers and master data
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// JSON engine configuration; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import daily extracts named *YYYYMMDD*.csv
    ImportDaily { files: Vec<PathBuf> },
    /// Import month-end corrections named *YYYYMM*.csv
    ImportFix { files: Vec<PathBuf> },
    /// Import target.csv, prev.csv and/or days.csv
    ImportMaster { files: Vec<PathBuf> },
    /// Quarter, half and full-year report up to the base date
    Summary {
        #[arg(long)]
        base_date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// One block per month of the fiscal year
    Monthly {
        #[arg(long)]
        base_date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show a month's ledger with daily achievement ratios (MONTH as yyyy_MM)
    Ledger { month: MonthKey },
    /// Create an empty ledger for manual entry
    CreateMonth { month: MonthKey },
    /// Check company-wide totals against channel figures
    Verify,
    /// Print the JSON schema of the configuration file
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn read_files(paths: &[PathBuf]) -> (Vec<(String, String)>, Vec<SkippedFile>) {
    let mut files = Vec::new();
    let mut unreadable = Vec::new();

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match fs::read_to_string(path) {
            Ok(content) => files.push((name, content)),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                unreadable.push(SkippedFile {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    (files, unreadable)
}

fn run_import(
    store: &mut FileStore,
    config: &EngineConfig,
    kind: ImportKind,
    paths: &[PathBuf],
) -> Result<()> {
    if paths.is_empty() {
        bail!("no files given");
    }

    let (files, unreadable) = read_files(paths);
    let mut summary = import_batch(store, config, kind, &files);
    summary.skipped.extend(unreadable);

    println!("Imported {} file(s)", summary.imported.len());
    for name in &summary.imported {
        println!("  ok    {}", name);
    }
    for skipped in &summary.skipped {
        println!("  skip  {}: {}", skipped.name, skipped.reason);
    }
    Ok(())
}

fn print_report(report: &ReportSet, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Csv => report.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        println!("{}", EngineConfig::schema_as_json()?);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let mut store = FileStore::open(&cli.data_dir)
        .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?;
    info!("Using data directory {}", cli.data_dir.display());

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::ImportDaily { files } => {
            run_import(&mut store, &config, ImportKind::Daily, &files)?;
        }
        Commands::ImportFix { files } => {
            run_import(&mut store, &config, ImportKind::Correction, &files)?;
        }
        Commands::ImportMaster { files } => {
            run_import(&mut store, &config, ImportKind::Master, &files)?;
        }
        Commands::Summary { base_date, format } => {
            let report = build_summary_report(&store, &config, base_date.unwrap_or(today))?;
            print_report(&report, format)?;
        }
        Commands::Monthly { base_date, format } => {
            let report = build_monthly_report(&store, &config, base_date.unwrap_or(today))?;
            print_report(&report, format)?;
        }
        Commands::Ledger { month } => match LedgerSheet::load(&store, &config, month)? {
            Some(sheet) => print!("{}", sheet.render_text()),
            None => bail!("no ledger for {}", month),
        },
        Commands::CreateMonth { month } => {
            store.create_empty_ledger(month)?;
            println!("Created empty ledger {}", month);
        }
        Commands::Verify => {
            let result = ConsistencyChecker::default().verify_store(&store)?;
            println!("Checked {} recorded day(s)", result.checked_days);
            if result.is_consistent() {
                println!("No inconsistencies found");
            } else {
                for warning in &result.warnings {
                    println!("  warn  {}", warning);
                }
            }
        }
        Commands::Schema => {}
    }

    Ok(())
}
