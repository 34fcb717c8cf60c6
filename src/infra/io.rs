use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::core::error::ReproError;

/// Issue text from exactly one of `--desc` or `--file` (`-` reads stdin).
pub fn read_issue_text(
    desc: Option<&str>,
    file: Option<&Path>,
) -> Result<String> {
    match (desc, file) {
        (Some(_), Some(_)) => {
            Err(ReproError::InvalidInput("use either --desc or --file, not both".into()).into())
        }
        (None, None) => {
            Err(ReproError::InvalidInput("one of --desc or --file is required".into()).into())
        }
        (Some(text), None) => Ok(text.to_string()),
        (None, Some(path)) if path == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read issue text from stdin")?;
            Ok(buf)
        }
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
            ReproError::InvalidInput(format!("cannot read {}: {e}", path.display())).into()
        }),
    }
}

/// Parse a single `KEY=VALUE` assignment (used for `--env`).
pub fn parse_env_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(format!("invalid variable name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse dotenv-style text: blank lines and `#` comments are skipped, an
/// optional `export ` prefix is dropped, matching outer quotes are stripped.
pub fn parse_env_text(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) =
            parse_env_assignment(line).map_err(|e| format!("line {}: {e}", lineno + 1))?;
        out.push((key, unquote(value.trim()).to_string()));
    }
    Ok(out)
}

/// Read and parse an env file; any problem is a configuration error.
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path).map_err(|e| {
        ReproError::InvalidInput(format!("cannot read env file {}: {e}", path.display()))
    })?;
    parse_env_text(&text).map_err(|e| {
        ReproError::InvalidInput(format!("env file {}: {e}", path.display())).into()
    })
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

/// Line-delimited JSON sink. Each record is serialized in full before a
/// single write, so a line is either complete or absent.
pub struct JsonlWriter {
    file: File,
    path: PathBuf,
}

impl JsonlWriter {
    /// Create (truncating) the file, making parent directories as needed.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self { file, path: path.to_path_buf() })
    }

    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Write `value` as pretty JSON, replacing whatever was there.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut text = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
