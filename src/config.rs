use crate::protocol::DEFAULT_PRINTER;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SENTINEL: &str = "<<ghci-debugger>>";

/// Debugger settings, read from a JSON file and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Interpreter executable.
    pub ghci_path: PathBuf,
    /// Extra interpreter arguments, placed before the module to debug.
    pub ghci_args: Vec<String>,
    /// Function applied to expressions to render their values.
    pub printer: String,
    pub response_timeout_ms: u64,
    pub startup_timeout_ms: u64,
    /// Prompt ghci is told to print after every answer.
    pub prompt_sentinel: String,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            ghci_path: PathBuf::from("ghci"),
            ghci_args: Vec::new(),
            printer: DEFAULT_PRINTER.to_string(),
            response_timeout_ms: 5_000,
            startup_timeout_ms: 30_000,
            prompt_sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

impl DebuggerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace interpreter arguments with a shell-like argument line.
    pub fn with_args_line(mut self, line: &str) -> Result<Self> {
        self.ghci_args = shlex::split(line)
            .ok_or_else(|| Error::Config(format!("cannot split ghci arguments: {line}")))?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let sentinel = &self.prompt_sentinel;
        if sentinel.trim().is_empty() {
            return Err(Error::Config("prompt sentinel is empty".to_string()));
        }
        // the sentinel is embedded in a Haskell string literal and ghci expands `%` escapes
        if sentinel.contains(['"', '\\', '%', '\n']) {
            return Err(Error::Config(format!(
                "prompt sentinel contains reserved characters: {sentinel}"
            )));
        }
        if self.printer.trim().is_empty() {
            return Err(Error::Config("printer function is empty".to_string()));
        }
        if self.response_timeout_ms == 0 || self.startup_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// `:set prompt` command installing the sentinel.
    pub fn prompt_command(&self) -> String {
        format!(":set prompt \"{}\\n\"", self.prompt_sentinel)
    }
}
