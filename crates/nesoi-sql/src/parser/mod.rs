//! SQL front end.
//!
//! Statement text is parsed with `sqlparser` using the MySQL dialect and
//! lowered into the engine's own [`Statement`] tree. Only the subset the
//! engine executes survives lowering:
//!
//! - CREATE/DROP DATABASE, USE, SHOW DATABASES/TABLES
//! - CREATE/DROP TABLE with INT and string columns
//! - CREATE [UNIQUE] INDEX
//! - SELECT over at most one table with a single equality in WHERE
//! - INSERT ... VALUES and UPDATE ... SET with literal values
//!
//! # Usage
//!
//! ```
//! use nesoi_sql::parser::{Parser, Statement};
//!
//! let statements = Parser::parse("SELECT name FROM t WHERE id = 1").unwrap();
//! assert!(matches!(statements[0], Statement::Select(_)));
//! ```

use std::borrow::Cow;

use sqlparser::dialect::MySqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser as SqlParser;
use sqlparser::tokenizer::{Token, Tokenizer};
use thiserror::Error;

mod lower;
mod statement;

pub use statement::*;

/// Errors that can occur during SQL parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Error from the underlying sqlparser crate.
    #[error("SQL syntax error: {0}")]
    Syntax(String),

    /// Valid SQL the engine does not implement.
    #[error("Unsupported SQL feature: {0}")]
    Unsupported(String),

    /// Invalid identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid literal value.
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// Empty query.
    #[error("Empty query")]
    EmptyQuery,
}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        ParseError::Syntax(err.to_string())
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// SQL parser for the MySQL dialect.
pub struct Parser;

impl Parser {
    /// Parses a statement batch.
    pub fn parse(sql: &str) -> ParseResult<Vec<Statement>> {
        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        let dialect = MySqlDialect {};
        let sql = normalize(&dialect, sql)?;
        let ast = SqlParser::parse_sql(&dialect, &sql)?;

        if ast.is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        ast.into_iter().map(lower::lower_statement).collect()
    }

    /// Parses exactly one statement.
    pub fn parse_one(sql: &str) -> ParseResult<Statement> {
        let mut statements = Self::parse(sql)?;
        if statements.len() != 1 {
            return Err(ParseError::Syntax(format!(
                "Expected 1 statement, got {}",
                statements.len()
            )));
        }
        Ok(statements.remove(0))
    }
}

/// Rewrites `DROP DATABASE` to `DROP SCHEMA`, which is the form the
/// underlying grammar accepts. Other text is returned untouched.
fn normalize<'a>(dialect: &MySqlDialect, sql: &'a str) -> ParseResult<Cow<'a, str>> {
    let tokens = Tokenizer::new(dialect, sql)
        .tokenize()
        .map_err(|e| ParseError::Syntax(e.to_string()))?;

    let mut out = Vec::with_capacity(tokens.len());
    let mut after_drop = false;
    let mut changed = false;

    for token in tokens {
        match &token {
            Token::Word(w) if after_drop && w.keyword == Keyword::DATABASE => {
                out.push(Token::make_keyword("SCHEMA"));
                after_drop = false;
                changed = true;
                continue;
            }
            Token::Whitespace(_) => {}
            Token::Word(w) => after_drop = w.keyword == Keyword::DROP,
            _ => after_drop = false,
        }
        out.push(token);
    }

    if !changed {
        return Ok(Cow::Borrowed(sql));
    }
    Ok(Cow::Owned(out.iter().map(|t| t.to_string()).collect()))
}
