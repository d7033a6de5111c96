//! Document text acquisition
//!
//! Turns a PDF or DOCX file into plain text by delegating to an external
//! extractor. The format comes from the file extension, or from the
//! first four bytes when the extension is missing or unrecognised.

mod command;

pub use command::CommandExtractor;

use crate::errors::IngestionError;
use async_trait::async_trait;
use contractiq_common::config::ExtractionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

/// `%PDF`
const PDF_SIGNATURE: [u8; 4] = [0x25, 0x50, 0x44, 0x46];
/// `PK\x03\x04`, the ZIP local file header that opens every DOCX
const DOCX_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Binary document formats the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Neither the extension nor the signature identified the file
    Unknown,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Unknown => "unknown",
        }
    }

    /// Classify a file header
    pub fn from_signature(header: &[u8]) -> Self {
        if header.starts_with(&PDF_SIGNATURE) {
            DocumentFormat::Pdf
        } else if header.starts_with(&DOCX_SIGNATURE) {
            DocumentFormat::Docx
        } else {
            DocumentFormat::Unknown
        }
    }

    /// Classify by extension, case-insensitively
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// Determine the format of a document on disk
pub async fn detect_format(path: &Path) -> Result<DocumentFormat, IngestionError> {
    if let Some(format) = DocumentFormat::from_extension(path) {
        return Ok(format);
    }

    let file = tokio::fs::File::open(path).await?;
    let mut header = Vec::with_capacity(4);
    file.take(4).read_to_end(&mut header).await?;

    let format = DocumentFormat::from_signature(&header);
    debug!(path = %path.display(), format = format.as_str(), "Sniffed document signature");

    Ok(format)
}

/// A capability that turns one document into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Identifier used in logs and errors
    fn name(&self) -> &str;

    /// Extract the full plain text of the document at `path`
    async fn extract(&self, path: &Path) -> Result<String, IngestionError>;
}

/// Plain text obtained from a document
#[derive(Debug, Clone)]
pub struct AcquiredText {
    pub text: String,
    /// Format whose extractor produced the text
    pub format: DocumentFormat,
}

/// Routes documents to the PDF or DOCX extractor
#[derive(Clone)]
pub struct DocumentAcquirer {
    pdf: Arc<dyn TextExtractor>,
    docx: Arc<dyn TextExtractor>,
}

impl DocumentAcquirer {
    pub fn new(pdf: Arc<dyn TextExtractor>, docx: Arc<dyn TextExtractor>) -> Self {
        Self { pdf, docx }
    }

    /// Build subprocess extractors from configuration
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let timeout = config.timeout();
        Self::new(
            Arc::new(CommandExtractor::new("pdf", config.pdf.clone(), timeout)),
            Arc::new(CommandExtractor::new("docx", config.docx.clone(), timeout)),
        )
    }

    /// Acquire the plain text of a document
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn acquire(&self, path: &Path) -> Result<AcquiredText, IngestionError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(IngestionError::FileNotFound(path.display().to_string()));
        }

        let format = detect_format(path).await?;

        let (text, format) = match format {
            DocumentFormat::Pdf => (self.pdf.extract(path).await?, DocumentFormat::Pdf),
            DocumentFormat::Docx => (self.docx.extract(path).await?, DocumentFormat::Docx),
            DocumentFormat::Unknown => self.extract_unknown(path).await?,
        };

        let text = normalize_text(&text);
        if text.trim().is_empty() {
            warn!(format = format.as_str(), "Extractor returned no text (scanned document?)");
        }

        Ok(AcquiredText { text, format })
    }

    /// Unrecognised header: DOCX first, then PDF
    async fn extract_unknown(&self, path: &Path) -> Result<(String, DocumentFormat), IngestionError> {
        let docx_err = match self.docx.extract(path).await {
            Ok(text) => return Ok((text, DocumentFormat::Docx)),
            Err(e) => e,
        };

        warn!(error = %docx_err, "DOCX extraction failed for unrecognised file, trying PDF");

        match self.pdf.extract(path).await {
            Ok(text) => Ok((text, DocumentFormat::Pdf)),
            Err(pdf_err) => Err(IngestionError::UnsupportedFormat {
                path: path.display().to_string(),
                message: format!("docx: {}; pdf: {}", docx_err, pdf_err),
            }),
        }
    }
}

/// Normalise extractor output without destroying paragraph breaks
fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        // pdftotext separates pages with form feeds
        .replace('\u{000C}', "\n\n")
        .replace('\u{FEFF}', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records which paths it was asked for and answers with a fixed result
    struct StubExtractor {
        name: &'static str,
        succeed: bool,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl StubExtractor {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        fn name(&self) -> &str {
            self.name
        }

        async fn extract(&self, path: &Path) -> Result<String, IngestionError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            if self.succeed {
                Ok(format!("text from {}\r\n", self.name))
            } else {
                Err(IngestionError::ExtractorFailed {
                    extractor: self.name.to_string(),
                    path: path.display().to_string(),
                    status: Some(1),
                    stderr: format!("{} cannot read file", self.name),
                })
            }
        }
    }

    fn file_with(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_signature_detection() {
        assert_eq!(DocumentFormat::from_signature(b"%PDF-1.7"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_signature(b"PK\x03\x04rest"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_signature(b"GIF8"), DocumentFormat::Unknown);
        assert_eq!(DocumentFormat::from_signature(b"%P"), DocumentFormat::Unknown);
    }

    #[test]
    fn test_extension_detection_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_extension(Path::new("/uploads/Contract.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_extension(Path::new("a.docx")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_extension(Path::new("upload-1234")), None);
    }

    #[tokio::test]
    async fn test_extensionless_pdf_routes_to_pdf_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with(&dir, "upload-1", b"%PDF-1.4\n...");
        let pdf = StubExtractor::new("pdf", true);
        let docx = StubExtractor::new("docx", true);
        let acquirer = DocumentAcquirer::new(pdf.clone(), docx.clone());

        let acquired = acquirer.acquire(&path).await.unwrap();
        assert_eq!(acquired.format, DocumentFormat::Pdf);
        assert_eq!(acquired.text, "text from pdf\n");
        assert_eq!(pdf.call_count(), 1);
        assert_eq!(docx.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extensionless_docx_routes_to_docx_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with(&dir, "upload-2", b"PK\x03\x04\x14\x00");
        let pdf = StubExtractor::new("pdf", true);
        let docx = StubExtractor::new("docx", true);
        let acquirer = DocumentAcquirer::new(pdf.clone(), docx.clone());

        let acquired = acquirer.acquire(&path).await.unwrap();
        assert_eq!(acquired.format, DocumentFormat::Docx);
        assert_eq!(pdf.call_count(), 0);
        assert_eq!(docx.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_header_tries_docx_then_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with(&dir, "upload-3", b"\x00\x01\x02\x03");
        let pdf = StubExtractor::new("pdf", true);
        let docx = StubExtractor::new("docx", false);
        let acquirer = DocumentAcquirer::new(pdf.clone(), docx.clone());

        let acquired = acquirer.acquire(&path).await.unwrap();
        assert_eq!(acquired.format, DocumentFormat::Pdf);
        assert_eq!(docx.call_count(), 1);
        assert_eq!(pdf.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_header_stops_at_docx_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with(&dir, "upload-4", b"????");
        let pdf = StubExtractor::new("pdf", true);
        let docx = StubExtractor::new("docx", true);
        let acquirer = DocumentAcquirer::new(pdf.clone(), docx.clone());

        let acquired = acquirer.acquire(&path).await.unwrap();
        assert_eq!(acquired.format, DocumentFormat::Docx);
        assert_eq!(pdf.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_header_both_failing_reports_both() {
        let dir = tempfile::tempdir().unwrap();
        let path = file_with(&dir, "upload-5", b"????");
        let acquirer = DocumentAcquirer::new(
            StubExtractor::new("pdf", false),
            StubExtractor::new("docx", false),
        );

        let err = acquirer.acquire(&path).await.unwrap_err();
        assert!(err.is_acquisition_failure());
        let message = err.to_string();
        assert!(message.contains("docx cannot read file"));
        assert!(message.contains("pdf cannot read file"));
    }

    #[tokio::test]
    async fn test_missing_file_never_reaches_extractor() {
        let pdf = StubExtractor::new("pdf", true);
        let acquirer = DocumentAcquirer::new(pdf.clone(), StubExtractor::new("docx", true));

        let err = acquirer
            .acquire(Path::new("/nonexistent/contract.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::FileNotFound(_)));
        assert_eq!(pdf.call_count(), 0);
    }

    #[test]
    fn test_normalize_keeps_paragraph_breaks() {
        let text = "\u{FEFF}Page one\r\n\r\nstill one\u{000C}Page two";
        assert_eq!(normalize_text(text), "Page one\n\nstill one\n\nPage two");
    }
}
