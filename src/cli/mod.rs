//! CLI command handling
//!
//! Reads the input files, runs the library code and formats output.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;

use crate::backend::RawUnit;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::diff::{diff_text, LineDiff};
use crate::mapping::{FormattedMapping, SourceMapping};
use crate::sources::{concatenate_units, BasicFormatter, ScriptFormatter, HTML_MIME, JAVASCRIPT_MIME};

/// A unit given on the command line as `FILE@LINE:COL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl UnitSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let (path, position) = spec
            .rsplit_once('@')
            .ok_or_else(|| Error::InvalidUnitSpec(format!("{spec}: expected FILE@LINE:COL")))?;
        if path.is_empty() {
            return Err(Error::InvalidUnitSpec(format!("{spec}: missing file")));
        }

        let (line, column) = match position.split_once(':') {
            Some((line, column)) => (line, column),
            None => (position, "0"),
        };
        let line = line
            .parse()
            .map_err(|_| Error::InvalidUnitSpec(format!("{spec}: invalid line '{line}'")))?;
        let column = column
            .parse()
            .map_err(|_| Error::InvalidUnitSpec(format!("{spec}: invalid column '{column}'")))?;

        Ok(Self {
            path: PathBuf::from(path),
            line,
            column,
        })
    }
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Concat { units, json } => {
            let mut loaded = Vec::with_capacity(units.len());
            for spec in &units {
                let spec = UnitSpec::parse(spec)?;
                let text = read(&spec.path).await?;
                let unit = RawUnit::new(spec.path.display().to_string()).at(spec.line, spec.column);
                loaded.push((unit, text));
            }
            let concatenation = concatenate_units(&loaded);

            if json {
                print_json(&concatenation)?;
            } else {
                println!("{}", concatenation.text);
            }
            Ok(())
        }

        Commands::Format { file, indent, json } => {
            let text = read(&file).await?;
            let formatter = BasicFormatter::new(indent.unwrap_or(config.formatter.indent));
            let formatted = formatter.format(mime_for(&file), &text);

            if json {
                print_json(&json!({
                    "text": formatted.text,
                    "mapping": formatted.mapping,
                }))?;
            } else {
                print!("{}", formatted.text);
            }
            Ok(())
        }

        Commands::Map {
            file,
            line,
            column,
            to_script,
            indent,
            json,
        } => {
            let text = read(&file).await?;
            let formatter = BasicFormatter::new(indent.unwrap_or(config.formatter.indent));
            let formatted = formatter.format(mime_for(&file), &text);
            let unit = RawUnit::new(file.display().to_string());
            let mapping = SourceMapping::Formatted(FormattedMapping::new(
                &[unit],
                &text,
                &formatted.text,
                formatted.mapping,
            ));

            let (line, column) = if to_script {
                let location = mapping
                    .source_location_to_script_location(line, column)
                    .ok_or_else(|| Error::Internal("mapping has no unit".to_string()))?;
                (location.line, location.column)
            } else {
                let location = mapping.script_location_to_source_location(line, column);
                (location.line, location.column)
            };

            if json {
                print_json(&json!({ "line": line, "column": column }))?;
            } else {
                println!("{line}:{column}");
            }
            Ok(())
        }

        Commands::Reanchor {
            old,
            new,
            lines,
            json,
        } => {
            let diff = diff_files(&old, &new).await?;
            let moves: Vec<LineMove> = lines
                .into_iter()
                .map(|line| LineMove {
                    line,
                    new_line: diff.reanchor(line as usize).map(|l| l as u32),
                })
                .collect();

            if json {
                print_json(&moves)?;
            } else {
                for entry in &moves {
                    match entry.new_line {
                        Some(new_line) => println!("{} -> {}", entry.line, new_line),
                        None => println!("{} -> dropped", entry.line),
                    }
                }
            }
            Ok(())
        }

        Commands::Diff { old, new, json } => {
            let diff = diff_files(&old, &new).await?;

            if json {
                print_json(&json!({
                    "forward": diff.forward,
                    "reverse": diff.reverse,
                }))?;
            } else {
                for (line, mapped) in diff.forward.iter().enumerate() {
                    match mapped {
                        Some(new_line) => println!("{line} = {new_line}"),
                        None => println!("{line} -"),
                    }
                }
                for (line, mapped) in diff.reverse.iter().enumerate() {
                    if mapped.is_none() {
                        println!("+ {line}");
                    }
                }
            }
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineMove {
    line: u32,
    new_line: Option<u32>,
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })
}

async fn diff_files(old: &Path, new: &Path) -> Result<LineDiff> {
    let old = read(old).await?;
    let new = read(new).await?;
    Ok(diff_text(&old, &new))
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => HTML_MIME,
        _ => JAVASCRIPT_MIME,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
