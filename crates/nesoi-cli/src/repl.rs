//! The interactive shell.
//!
//! Input accumulates across lines until it ends in `;` outside a quoted
//! string, or starts with a backslash command. History persists under the
//! platform data directory.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error};

use nesoi_server::{ConnectionId, Database};
use nesoi_sql::session::StatementOutcome;
use nesoi_sql::Session;

use crate::commands::Command;
use crate::formatter::{self, OutputFormat};

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "LIMIT", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "CREATE",
    "DROP", "DATABASE", "SCHEMA", "TABLE", "INDEX", "UNIQUE", "ON", "PRIMARY", "KEY", "NOT",
    "NULL", "IF", "EXISTS", "USE", "SHOW", "DATABASES", "TABLES", "INT", "BIGINT", "VARCHAR",
    "TEXT", "STRING",
];

/// Keyword completion and statement-end detection.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .map(|i| i + 1)
            .unwrap_or(0);

        let word = line[start..pos].to_uppercase();
        let matches = KEYWORDS
            .iter()
            .filter(|kw| !word.is_empty() && kw.starts_with(&word))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if statement_complete(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

impl Helper for ReplHelper {}

/// Interactive REPL over an embedded database.
pub struct Repl {
    db: Arc<Database>,
    connection: ConnectionId,
    session: Session,
    editor: Editor<ReplHelper, DefaultHistory>,
    format: OutputFormat,
    history_file: Option<PathBuf>,
    timing: bool,
}

impl Repl {
    /// Creates a new REPL with its own session on `db`.
    pub fn new(db: Arc<Database>, format: OutputFormat) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(1000)?
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        let history_file = get_history_file();
        if let Some(ref path) = history_file {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        let (connection, session) = db.open_session(None)?;

        Ok(Self {
            db,
            connection,
            session,
            editor,
            format,
            history_file,
            timing: false,
        })
    }

    /// Greeting shown before the first prompt.
    pub fn print_banner(&self) {
        println!("Nesoi CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Type \\? for help, \\q to quit.\n");
    }

    /// Reads and runs input until `\q` or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = self.get_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    match self.process_line(line) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        self.save_history();
        println!("Goodbye!");
        Ok(())
    }

    fn get_prompt(&self) -> String {
        format!("nesoi:{}> ", self.session.current_database())
    }

    /// Processes one line of input. Returns true when the REPL should exit.
    fn process_line(&mut self, line: &str) -> Result<bool> {
        if line.starts_with('\\') {
            return self.process_command(Command::parse(line));
        }
        self.execute_and_print(line);
        Ok(false)
    }

    fn process_command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Quit => return Ok(true),
            Command::Help => println!("{}", Command::help_text()),
            Command::Timing => {
                self.timing = !self.timing;
                println!("Timing is {}.", if self.timing { "on" } else { "off" });
            }
            Command::Explain(sql) => match self.session.explain(&sql) {
                Ok(plan) => print!("{}", plan),
                Err(e) => eprintln!("ERROR {}: {}", e.code(), e),
            },
            Command::ListTables => self.execute_and_print("SHOW TABLES"),
            Command::ListDatabases => self.execute_and_print("SHOW DATABASES"),
            Command::Use(db) => self.execute_and_print(&format!("USE {}", db)),
            Command::Format(Some(format)) => {
                self.format = format;
                println!("Output format set to {:?}.", format);
            }
            Command::Format(None) => eprintln!("Unknown format. Use table, json, csv or raw."),
            Command::ConnectionInfo => println!(
                "Connection {} (database: {}, {} statements)",
                self.connection,
                self.session.current_database(),
                self.session.statement_count()
            ),
            Command::Unknown(name) => {
                eprintln!("Invalid command \\{}. Try \\? for help.", name)
            }
        }
        Ok(false)
    }

    /// Executes SQL and prints each statement's result. Errors are printed
    /// after the results of the statements that ran, not returned.
    pub fn execute_and_print(&mut self, sql: &str) {
        let start = Instant::now();
        let batch = self.session.run_batch(sql);
        let elapsed = start.elapsed();
        for outcome in &batch.completed {
            self.print_outcome(outcome);
        }
        match batch.error {
            Some(e) => eprintln!("ERROR {}: {}", e.code(), e),
            None => self.print_timing(elapsed),
        }
    }

    fn print_outcome(&self, outcome: &StatementOutcome) {
        match outcome {
            StatementOutcome::Rows(rows) => {
                println!("{}", formatter::format_result(rows, self.format));
                println!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
            }
            StatementOutcome::Done {
                affected_rows,
                warnings,
            } => {
                let mut line = format!(
                    "OK, {} row{} affected",
                    affected_rows,
                    if *affected_rows == 1 { "" } else { "s" }
                );
                if *warnings > 0 {
                    line.push_str(&format!(
                        ", {} warning{}",
                        warnings,
                        if *warnings == 1 { "" } else { "s" }
                    ));
                }
                println!("{}", line);
            }
        }
    }

    fn print_timing(&self, elapsed: Duration) {
        if self.timing {
            println!("Time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
        }
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = self.editor.save_history(path) {
                debug!("Failed to save history: {}", e);
            }
        }
    }
}

impl Drop for Repl {
    fn drop(&mut self) {
        self.db.close_session(self.connection);
    }
}

/// True when `input` can be run as is: empty, a backslash command, or SQL
/// whose last `;` sits outside any quote.
fn statement_complete(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('\\') {
        return true;
    }
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in trimmed.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None => {}
        }
    }
    quote.is_none() && trimmed.ends_with(';')
}

fn get_history_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("nesoi").join("history"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_complete() {
        assert!(statement_complete(""));
        assert!(statement_complete("\\dt"));
        assert!(statement_complete("SELECT 1;"));
        assert!(!statement_complete("SELECT name\nFROM t"));
        assert!(!statement_complete("INSERT INTO t VALUES (1, 'a;"));
        assert!(statement_complete("INSERT INTO t VALUES (1, 'it\\'s');"));
    }

    #[test]
    fn test_get_history_file() {
        if let Some(path) = get_history_file() {
            assert!(path.ends_with("nesoi/history"));
        }
    }
}
