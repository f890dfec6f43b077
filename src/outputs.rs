//! Step outputs for GitHub Actions.
//!
//! Values are appended to the file named by `$GITHUB_OUTPUT`; outside of
//! Actions they are printed to stdout in the same `key=value` form.

use crate::error::{CiError, Result};
use std::cell::RefCell;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

const MULTILINE_DELIMITER: &str = "GHA_CI_EOF";

#[derive(Debug)]
enum Sink {
    File(PathBuf),
    Stdout,
    Memory(RefCell<Vec<(String, String)>>),
}

#[derive(Debug)]
pub struct Outputs {
    sink: Sink,
}

impl Outputs {
    /// `$GITHUB_OUTPUT` when set, stdout otherwise.
    pub fn from_env() -> Self {
        match std::env::var_os(GITHUB_OUTPUT_ENV) {
            Some(path) if !path.is_empty() => Self::file(path),
            _ => Self::stdout(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Outputs {
            sink: Sink::File(path.into()),
        }
    }

    pub fn stdout() -> Self {
        Outputs { sink: Sink::Stdout }
    }

    /// Keeps values in memory, see [Outputs::get].
    pub fn memory() -> Self {
        Outputs {
            sink: Sink::Memory(RefCell::new(Vec::new())),
        }
    }

    pub fn set(&self, key: &str, value: impl Display) -> Result<()> {
        let value = value.to_string();
        tracing::debug!(key, value = %value, "setting output");
        match &self.sink {
            Sink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        CiError::config(format!("cannot open {}: {}", path.display(), e))
                    })?;
                file.write_all(format_line(key, &value).as_bytes())?;
            }
            Sink::Stdout => print!("{}", format_line(key, &value)),
            Sink::Memory(values) => values.borrow_mut().push((key.to_string(), value)),
        }
        Ok(())
    }

    pub fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_string(value)?)
    }

    /// Last value set for `key` (in-memory outputs only).
    pub fn get(&self, key: &str) -> Option<String> {
        match &self.sink {
            Sink::Memory(values) => values
                .borrow()
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }
}

fn format_line(key: &str, value: &str) -> String {
    if value.contains('\n') {
        format!(
            "{key}<<{delim}\n{value}\n{delim}\n",
            key = key,
            delim = MULTILINE_DELIMITER,
            value = value
        )
    } else {
        format!("{}={}\n", key, value)
    }
}
