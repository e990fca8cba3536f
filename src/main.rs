use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use contact_cleaner::logging::init_logging;
use contact_cleaner::{
    load_table, AppConfig, ColumnDetector, EmailCleaner, JobRunner, PhoneCleaner, SqliteJobStore,
};

#[derive(Parser)]
#[command(name = "contact-cleaner")]
#[command(version, long_about = None)]
#[command(about = "Clean, validate and classify business contact sheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full cleaning job on a CSV or JSON file
    Clean {
        /// Input file (.csv or .json)
        input: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQLite database for jobs and results (overrides the config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Write the cleaned table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the detected type of every column
    Detect {
        input: PathBuf,
    },

    /// Clean a single phone number
    Phone {
        value: String,
    },

    /// Validate a single email address
    Email {
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Clean {
            input,
            config,
            db,
            output,
        } => run_clean(input, config, db, output),
        Commands::Detect { input } => run_detect(input),
        Commands::Phone { value } => print_json(&PhoneCleaner::new().clean_str(&value)),
        Commands::Email { value } => print_json(&EmailCleaner::new().clean_str(&value)),
    }
}

fn run_clean(
    input: PathBuf,
    config: Option<PathBuf>,
    db: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = match config {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AppConfig::default(),
    };
    let db_path = db.unwrap_or(config.database_path);

    println!("🧹 Contact Cleaner");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut store = SqliteJobStore::open(&db_path)?;
    let file_id = store.register_file(&input)?;

    let mut runner = JobRunner::new(store);
    let report = runner.run(&file_id, config.cleaning)?;
    let stats = &report.statistics;

    println!("\n✓ Job {}", report.job_id);
    println!("✓ Rows: {} processed of {}", stats.processed_rows, stats.total_rows);
    println!("✓ Valid rows: {}  Rows with errors: {}", stats.valid_rows, stats.error_rows);
    println!("✓ Valid phones: {}  Valid emails: {}", stats.valid_phones, stats.valid_emails);
    println!("✓ Duplicates: {}  Classified: {}", stats.duplicate_rows, stats.classified_rows);
    println!("✓ Quality score: {:.1}%", stats.quality_score);
    println!("✓ Time: {:.2}s", stats.processing_time);

    if let Some(output) = output {
        let table = runner
            .store()
            .get_results(&report.job_id)?
            .context("Job finished without results")?;
        contact_cleaner::loader::save_csv(&table, &output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("\n💾 Cleaned table written to {}", output.display());
    }

    Ok(())
}

fn run_detect(input: PathBuf) -> Result<()> {
    let table = load_table(&input)?;
    let detections = ColumnDetector::new().detect_all(&table);
    print_json(&detections)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
