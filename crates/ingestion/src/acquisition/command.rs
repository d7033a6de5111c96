//! Subprocess-backed text extractors
//!
//! Runs an external tool (pdftotext, a python-docx script, ...) on the
//! document and captures its standard output as the document text.

use super::TextExtractor;
use crate::errors::IngestionError;
use async_trait::async_trait;
use contractiq_common::config::CommandConfig;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Text extractor that shells out to a configured command
pub struct CommandExtractor {
    name: String,
    command: CommandConfig,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(name: impl Into<String>, command: CommandConfig, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command,
            timeout,
        }
    }
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(extractor = %self.name, path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String, IngestionError> {
        let input = path.to_string_lossy();
        let args = self.command.resolved_args(&input);

        debug!(program = %self.command.program, "Spawning text extractor");

        let child = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must not leave the child running
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IngestionError::ExtractorSpawn {
                extractor: self.name.clone(),
                path: path.display().to_string(),
                message: format!("{}: {}", self.command.program, e),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Text extractor timed out");
                return Err(IngestionError::ExtractorTimeout {
                    extractor: self.name.clone(),
                    path: path.display().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = ?output.status.code(), stderr = %stderr, "Text extractor failed");
            return Err(IngestionError::ExtractorFailed {
                extractor: self.name.clone(),
                path: path.display().to_string(),
                status: output.status.code(),
                stderr,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(text_len = text.len(), "Text extractor finished");

        Ok(text)
    }
}
