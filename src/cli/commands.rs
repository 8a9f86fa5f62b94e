// CLI command implementations
use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use audiotag::{identify, StreamSource};
use glob::glob;
use serde_json::Value;

use crate::cli::config::parse_fields;
use crate::cli::{Commands, Config, OutputFormatter};

/// Run the selected command; returns false when any file failed
pub fn run(config: &Config) -> Result<bool> {
    let formatter = OutputFormatter::new(config.format, config.quiet);
    match &config.command {
        Commands::Read { files, fields, output } => {
            command_read(config, &expand_files(files)?, fields.as_deref(), output.as_deref(), &formatter)
        }
        Commands::Detect { files } => command_detect(&expand_files(files)?, &formatter),
    }
}

/// Expand glob patterns; plain paths are passed through untouched
pub fn expand_files(patterns: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !(pattern.contains('*') || pattern.contains('?')) {
            files.push(pattern.clone());
            continue;
        }
        let mut matched = false;
        for entry in glob(pattern).with_context(|| format!("invalid glob pattern {}", pattern))? {
            let path = entry?;
            if path.is_file() {
                files.push(path.to_string_lossy().into_owned());
                matched = true;
            }
        }
        if !matched {
            log::warn!("no files match {}", pattern);
        }
    }
    Ok(files)
}

/// Read metadata from files
fn command_read(
    config: &Config,
    files: &[String],
    fields: Option<&str>,
    output: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };
    let fields = parse_fields(fields);

    let mut all_ok = true;
    for file_path in files {
        match read_one(config, file_path) {
            Ok(metadata) => {
                let shown = match &fields {
                    Some(fields) => select_fields(&metadata, fields),
                    None => metadata,
                };
                formatter.output_metadata(file_path, &shown, &mut *writer)?;
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {:#}", file_path, e));
                all_ok = false;
            }
        }
    }
    writer.flush()?;
    if let Some(path) = output {
        formatter.print_info(&format!("Wrote {} file(s) to {}", files.len(), path));
    }
    Ok(all_ok)
}

fn read_one(config: &Config, file_path: &str) -> Result<Value> {
    let metadata = audiotag::parse_file(file_path, config.parse_options())
        .with_context(|| format!("failed to parse {}", file_path))?;
    for warning in &metadata.warnings {
        log::info!("{}: {}", file_path, warning);
    }
    Ok(serde_json::to_value(&metadata)?)
}

/// Keep only the named fields, looked up in `common` first, then `format`
pub fn select_fields(metadata: &Value, fields: &[String]) -> Value {
    let mut selected = serde_json::Map::new();
    for field in fields {
        let value = ["common", "format"]
            .iter()
            .find_map(|&section| metadata.get(section).and_then(|s| s.get(field.as_str())))
            .cloned()
            .unwrap_or(Value::Null);
        selected.insert(field.clone(), value);
    }
    Value::Object(selected)
}

/// Detect file format
fn command_detect(files: &[String], formatter: &OutputFormatter) -> Result<bool> {
    let mut all_ok = true;
    for file_path in files {
        let detected = StreamSource::open(file_path)
            .map_err(audiotag::Error::from)
            .and_then(|mut source| {
                let options = audiotag::ParseOptions {
                    path: Some(file_path.clone()),
                    ..Default::default()
                };
                identify(&mut source, &options)
            });
        match detected {
            Ok(loader) => println!("{}: {}", file_path, loader.format_id),
            Err(e) => {
                formatter.print_error(&format!("{}: {}", file_path, e));
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_select_fields() {
        let metadata = json!({
            "format": { "duration": 3.5, "codec": "Opus" },
            "common": { "title": "Foo", "codec": "shadowed" },
        });
        let fields = vec!["title".to_string(), "duration".to_string(), "codec".to_string(), "missing".to_string()];
        assert_eq!(
            select_fields(&metadata, &fields),
            json!({ "title": "Foo", "duration": 3.5, "codec": "shadowed", "missing": null })
        );
    }

    #[test]
    fn test_plain_paths_pass_through() {
        let files = expand_files(&["no/such/file.mp3".to_string()]).unwrap();
        assert_eq!(files, vec!["no/such/file.mp3".to_string()]);
    }
}
