//! License ledger adapters
//!
//! Produces the raw ledger lines either by running the account tool
//! (`steamcmd +login <user> +licenses_print +quit`) or by reading a ledger
//! that was saved to disk earlier. Parsing happens in [`crate::ledger`].

use crate::config::LedgerConfig;
use crate::sources::LedgerSource;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs the account tool and captures its stdout.
#[derive(Debug, Clone)]
pub struct SteamCmd {
    executable: PathBuf,
    login: String,
}

impl SteamCmd {
    pub fn new(executable: impl Into<PathBuf>, login: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            login: login.into(),
        }
    }

    fn args(&self) -> [&str; 4] {
        ["+login", self.login.as_str(), "+licenses_print", "+quit"]
    }

    async fn run(&self) -> Result<Vec<String>> {
        info!(
            executable = %self.executable.display(),
            login = %self.login,
            "Reading license ledger"
        );

        let output = Command::new(&self.executable)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run license tool: {}",
                    self.executable.display()
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "License tool failed");
            anyhow::bail!("License tool exited with {}", output.status);
        }

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        debug!(lines = lines.len(), "License tool finished");
        Ok(lines)
    }
}

/// A ledger previously captured to a text file.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<String>> {
        info!(file = %self.path.display(), "Reading saved license ledger");
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read ledger file: {}", self.path.display()))?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

/// Ledger adapter selected from configuration.
#[derive(Debug, Clone)]
pub enum LedgerReader {
    Command(SteamCmd),
    File(LedgerFile),
}

impl LedgerReader {
    pub fn from_config(config: &LedgerConfig, login: &str) -> Self {
        match &config.file {
            Some(path) => LedgerReader::File(LedgerFile::new(path)),
            None => LedgerReader::Command(SteamCmd::new(&config.steamcmd_path, login)),
        }
    }
}

impl LedgerSource for SteamCmd {
    async fn ledger_lines(&self) -> Result<Vec<String>> {
        self.run().await
    }
}

impl LedgerSource for LedgerFile {
    async fn ledger_lines(&self) -> Result<Vec<String>> {
        self.read().await
    }
}

impl LedgerSource for LedgerReader {
    async fn ledger_lines(&self) -> Result<Vec<String>> {
        match self {
            LedgerReader::Command(cmd) => cmd.run().await,
            LedgerReader::File(file) => file.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_command_arguments() {
        let cmd = SteamCmd::new("/opt/steamcmd/steamcmd.sh", "someone");
        assert_eq!(cmd.args(), ["+login", "someone", "+licenses_print", "+quit"]);
    }

    #[test]
    fn test_reader_prefers_saved_file() {
        let config = LedgerConfig {
            steamcmd_path: PathBuf::from("steamcmd"),
            file: Some(PathBuf::from("licenses.txt")),
        };
        assert!(matches!(
            LedgerReader::from_config(&config, "someone"),
            LedgerReader::File(_)
        ));

        let config = LedgerConfig {
            file: None,
            ..config
        };
        assert!(matches!(
            LedgerReader::from_config(&config, "someone"),
            LedgerReader::Command(_)
        ));
    }

    #[tokio::test]
    async fn test_read_saved_ledger() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[0] License list (1 entries):")?;
        writeln!(file, "License packageID 7:")?;
        file.flush()?;

        let lines = LedgerFile::new(file.path()).ledger_lines().await?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "License packageID 7:");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_executable_is_an_error() {
        let cmd = SteamCmd::new("/nonexistent/steamcmd-binary", "someone");
        let err = cmd.ledger_lines().await.unwrap_err();
        assert!(err.to_string().contains("Failed to run license tool"));
    }
}
