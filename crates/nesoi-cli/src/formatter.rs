//! Rendering of result sets for the shell.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde_json::{json, Value as JsonValue};

use nesoi_sql::{Datum, ResultSet};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
    /// CSV output.
    Csv,
    /// Raw output (values separated by tabs).
    Raw,
}

impl OutputFormat {
    /// Parses a format name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            "raw" => Some(OutputFormat::Raw),
            _ => None,
        }
    }
}

/// Formats a result set according to the specified format.
pub fn format_result(result: &ResultSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(result),
        OutputFormat::Json => format_json(result),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Raw => result.to_string(),
    }
}

fn format_table(result: &ResultSet) -> String {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if !result.columns.is_empty() {
        table.set_header(result.column_names());
    }
    for row in &result.rows {
        table.add_row(row.datums().iter().map(|datum| {
            let cell = Cell::new(datum);
            // Numbers line up on the right, as in the mysql client.
            match datum {
                Datum::Int64(_) => cell.set_alignment(CellAlignment::Right),
                _ => cell,
            }
        }));
    }

    table.to_string()
}

/// One JSON object per row, keyed by column name.
fn format_json(result: &ResultSet) -> String {
    let names = result.column_names();
    let rows: Vec<JsonValue> = result
        .rows
        .iter()
        .map(|row| {
            let fields = row.datums().iter().enumerate().map(|(i, datum)| {
                let key = names
                    .get(i)
                    .map_or_else(|| format!("column_{}", i), |n| n.to_string());
                (key, datum_to_json(datum))
            });
            JsonValue::Object(fields.collect())
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

fn datum_to_json(datum: &Datum) -> JsonValue {
    match datum {
        Datum::Null => JsonValue::Null,
        Datum::Int64(i) => json!(*i),
        Datum::String(b) => json!(String::from_utf8_lossy(b)),
    }
}

/// RFC 4180 style CSV. NULL becomes an empty field.
fn format_csv(result: &ResultSet) -> String {
    let mut lines = Vec::with_capacity(result.rows.len() + 1);
    if !result.columns.is_empty() {
        lines.push(csv_line(result.column_names().iter().map(|n| n.to_string())));
    }
    for row in &result.rows {
        lines.push(csv_line(row.datums().iter().map(|datum| match datum {
            Datum::Null => String::new(),
            other => other.to_string(),
        })));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn csv_line(fields: impl Iterator<Item = String>) -> String {
    fields
        .map(|field| escape_csv(&field))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_csv(value: &str) -> String {
    if value.chars().any(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
