//! Backslash commands for the REPL.

use crate::formatter::OutputFormat;

/// A parsed backslash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Quit the REPL.
    Quit,
    /// Show help.
    Help,
    /// Toggle timing.
    Timing,
    /// Print the plan of a statement.
    Explain(String),
    /// List tables of the current database.
    ListTables,
    /// List databases.
    ListDatabases,
    /// Switch database.
    Use(String),
    /// Set output format.
    Format(Option<OutputFormat>),
    /// Show connection info.
    ConnectionInfo,
    /// Unknown command, or one missing its argument.
    Unknown(String),
}

impl Command {
    /// Parses a command string.
    pub fn parse(input: &str) -> Self {
        let input = input.trim().trim_end_matches(';');
        let cmd = input.strip_prefix('\\').unwrap_or(input);

        let mut parts = cmd.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match (name.as_str(), args) {
            ("q" | "quit" | "exit", _) => Command::Quit,
            ("?" | "h" | "help", _) => Command::Help,
            ("timing" | "t", _) => Command::Timing,
            ("explain" | "x", Some(sql)) => Command::Explain(sql.to_string()),
            ("dt" | "tables", _) => Command::ListTables,
            ("l" | "list", _) => Command::ListDatabases,
            ("c" | "use", Some(db)) => Command::Use(db.to_string()),
            ("format" | "f", Some(fmt)) => Command::Format(OutputFormat::parse(fmt)),
            ("conninfo", _) => Command::ConnectionInfo,
            _ => Command::Unknown(name),
        }
    }

    /// Help text listing every command.
    pub fn help_text() -> String {
        r#"General
  \q              Quit
  \?              Show this help
  \timing         Toggle timing of statements
  \conninfo       Show the current database

Query
  \explain SQL    Show the plan of SQL without running it
  \format FMT     Output format: table, json, csv, raw

Catalog
  \l              List databases
  \dt             List tables in the current database
  \c DB           Switch to database DB

Statements end with ';' and may span lines."#
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("\\q"), Command::Quit);
        assert_eq!(Command::parse("\\?"), Command::Help);
        assert_eq!(Command::parse("\\timing"), Command::Timing);
        assert_eq!(Command::parse("\\dt"), Command::ListTables);
        assert_eq!(Command::parse("\\c shop"), Command::Use("shop".into()));
        assert_eq!(
            Command::parse("\\explain SELECT 1;"),
            Command::Explain("SELECT 1".into())
        );
        assert_eq!(
            Command::parse("\\format json"),
            Command::Format(Some(OutputFormat::Json))
        );
    }

    #[test]
    fn test_missing_argument_is_unknown() {
        assert_eq!(Command::parse("\\explain"), Command::Unknown("explain".into()));
        assert_eq!(Command::parse("\\bogus"), Command::Unknown("bogus".into()));
    }
}
