// Output formatting for CLI

use crate::cli::OutputFormat;
use anyhow::Result;
use serde_json::Value;
use std::io::Write;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output one file's metadata
    pub fn output_metadata(&self, path: &str, metadata: &Value, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(&with_path(path, metadata))?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(&with_path(path, metadata))?)?;
            }
            OutputFormat::KeyValue => {
                writeln!(writer, "file: {}", path)?;
                for (key, value) in flatten(metadata) {
                    writeln!(writer, "{}: {}", key, format_value(&value))?;
                }
                writeln!(writer)?;
            }
            OutputFormat::Table => self.output_table(path, metadata, writer)?,
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, path: &str, metadata: &Value, writer: &mut dyn Write) -> Result<()> {
        let rows = flatten(metadata);
        let max_key_len = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        writeln!(writer, "{}", path)?;
        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        for (key, value) in &rows {
            writeln!(writer, "{:<width$} {}", format!("{}:", key), format_value(value), width = max_key_len + 2)?;
        }
        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        Ok(())
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

fn with_path(path: &str, metadata: &Value) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("file".to_string(), Value::String(path.to_string()));
    if let Some(obj) = metadata.as_object() {
        out.extend(obj.clone());
    }
    Value::Object(out)
}

/// Dotted key paths down to arrays and scalars; empty values are dropped
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    fn walk(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
        match value {
            Value::Object(obj) => {
                for (key, child) in obj {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&path, child, out);
                }
            }
            Value::Null => {}
            Value::Array(arr) if arr.is_empty() => {}
            other => out.push((prefix.to_string(), other.clone())),
        }
    }
    let mut out = Vec::new();
    walk("", value, &mut out);
    out
}

/// Format a JSON value for display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(null)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(arr) if arr.iter().all(|v| v.is_string() || v.is_number()) => arr
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} items}}", obj.len()),
    }
}
