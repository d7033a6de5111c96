//! Configuration management for ContractIQ services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The database URL has no default when loading; a missing value fails
//! at startup instead of silently pointing at a built-in location.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder in command arguments replaced by the document path
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Python snippet that prints the non-empty paragraphs of a DOCX file
pub const DOCX_PARAGRAPH_SCRIPT: &str = "import sys\nfrom docx import Document\ndoc = Document(sys.argv[1])\nprint('\\n'.join(p.text for p in doc.paragraphs if p.text.strip()))\n";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Text acquisition and extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// External process used to turn a binary document into plain text
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandConfig {
    /// Executable name or path
    pub program: String,

    /// Arguments; `{input}` is replaced with the document path
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    /// Arguments with the input placeholder substituted
    pub fn resolved_args(&self, input: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, input))
            .collect()
    }
}

/// What to do with parties already extracted from the same contract
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartyDedupPolicy {
    /// Insert every extracted party on every run
    #[default]
    AlwaysCreate,
    /// Skip parties whose normalized name already exists for the contract
    SkipExisting,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// PDF text extraction command
    #[serde(default = "default_pdf_command")]
    pub pdf: CommandConfig,

    /// DOCX paragraph extraction command
    #[serde(default = "default_docx_command")]
    pub docx: CommandConfig,

    /// Upper bound on a single extractor process, in seconds
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,

    /// Documents processed concurrently during batch re-processing
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Party deduplication across re-runs
    #[serde(default)]
    pub party_dedup: PartyDedupPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_extraction_timeout() -> u64 { 45 }
fn default_batch_concurrency() -> usize { 1 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "contractiq-ingestion".to_string() }

fn default_pdf_command() -> CommandConfig {
    CommandConfig {
        program: "pdftotext".to_string(),
        args: vec![
            "-layout".to_string(),
            "-enc".to_string(),
            "UTF-8".to_string(),
            INPUT_PLACEHOLDER.to_string(),
            "-".to_string(),
        ],
    }
}

fn default_docx_command() -> CommandConfig {
    CommandConfig {
        program: "python3".to_string(),
        args: vec![
            "-c".to_string(),
            DOCX_PARAGRAPH_SCRIPT.to_string(),
            INPUT_PLACEHOLDER.to_string(),
        ],
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf: default_pdf_command(),
            docx: default_docx_command(),
            timeout_secs: default_extraction_timeout(),
            batch_concurrency: default_batch_concurrency(),
            party_dedup: PartyDedupPolicy::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__EXTRACTION__TIMEOUT_SECS=30
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the extraction pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("database.url must be set".to_string()));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "extraction.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.extraction.batch_concurrency == 0 {
            return Err(ConfigError::Message(
                "extraction.batch_concurrency must be at least 1".to_string(),
            ));
        }
        for (name, command) in [("pdf", &self.extraction.pdf), ("docx", &self.extraction.docx)] {
            if command.program.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "extraction.{}.program must be set",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Get the extractor process timeout as Duration
    pub fn extraction_timeout(&self) -> Duration {
        self.extraction.timeout()
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}
