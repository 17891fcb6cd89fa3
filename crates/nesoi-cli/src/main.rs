//! Nesoi Command-Line Interface
//!
//! An interactive SQL shell over an embedded Nesoi database.
//!
//! # Usage
//!
//! ```bash
//! # Start interactive REPL
//! nesoi
//!
//! # Execute a single command
//! nesoi -c "CREATE TABLE t (id INT PRIMARY KEY); SELECT id FROM t"
//!
//! # Execute commands from a file
//! nesoi -f schema.sql
//!
//! # Output as JSON
//! nesoi -o json -c "SHOW DATABASES"
//! ```

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nesoi_kv::MemoryDriver;
use nesoi_server::{Database, DatabaseConfig};
use nesoi_sql::SessionConfig;

mod commands;
mod formatter;
mod repl;

use formatter::OutputFormat;
use repl::Repl;

/// Nesoi command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "nesoi",
    version,
    about = "Command-line interface for Nesoi",
    long_about = "An interactive SQL shell for Nesoi, a MySQL-compatible relational\n\
                  front end over a key-value store. The database lives in memory\n\
                  for the lifetime of the shell."
)]
struct Args {
    /// Database selected on start (created if missing)
    #[arg(short = 'd', long, env = "NESOI_DATABASE")]
    database: Option<String>,

    /// Execute SQL and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Execute SQL statements from file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "table")]
    output: OutputFormatArg,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress banner (for scripting)
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display results as CSV
    Csv,
    /// Display tab separated values
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let db = Arc::new(open_database(&args)?);
    let mut repl = Repl::new(db, args.output.into())?;

    if let Some(command) = &args.command {
        info!("Executing command: {}", command);
        repl.execute_and_print(command);
        Ok(())
    } else if let Some(file) = &args.file {
        execute_file(&mut repl, file)
    } else {
        if !args.quiet {
            repl.print_banner();
        }
        repl.run()
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nesoi_cli=debug,nesoi_sql=debug,nesoi_server=debug")
    } else {
        EnvFilter::new("nesoi_cli=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn open_database(args: &Args) -> Result<Database> {
    let mut config = DatabaseConfig {
        max_connections: 1,
        session: SessionConfig::default(),
    };
    if let Some(db) = &args.database {
        config.session.default_database = db.clone();
    }
    Database::open(Arc::new(MemoryDriver::new()), config).context("Failed to open database")
}

fn execute_file(repl: &mut Repl, path: &Path) -> Result<()> {
    info!("Executing file: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for statement in split_statements(&content) {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            repl.execute_and_print(trimmed);
        }
    }

    Ok(())
}

/// Splits SQL text into statements on `;`, ignoring separators inside
/// quotes and comments. Comments are dropped.
fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                // A doubled quote is an escaped quote.
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            } else if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                current.push(' ');
            }
            ';' => {
                if !current.trim().is_empty() {
                    statements.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}
