use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::extract::{self, dates, service};
use crate::model::{EmailSubscription, Platform};
use crate::patterns::SUBSCRIPTION_TERMS;

/// Document-specific service phrase: "subscription to X", "plan for X".
static DOC_SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:subscription|plan|membership)\s+(?:to|for)\s+([A-Za-z0-9 ]+)").unwrap()
});

#[derive(Debug, Clone)]
pub enum DocumentInput {
    Pdf(PathBuf),
    Image(PathBuf),
    Text(PathBuf),
}

impl DocumentInput {
    /// Classify by extension; anything unrecognized is rejected up front so
    /// the recognizer never sees it.
    pub fn classify(path: &Path) -> Result<Self, ScanError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentInput::Pdf(path.to_path_buf())),
            "png" | "jpg" | "jpeg" => Ok(DocumentInput::Image(path.to_path_buf())),
            "txt" => Ok(DocumentInput::Text(path.to_path_buf())),
            other => Err(ScanError::Recognizer(format!(
                "unsupported file type: {:?}",
                other
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            DocumentInput::Pdf(p) | DocumentInput::Image(p) | DocumentInput::Text(p) => p,
        }
    }

    /// Name of last resort when the text itself names no service.
    pub fn fallback_name(&self) -> String {
        self.path()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(service::clean_name)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizeProgress {
    Starting,
    Page { current: usize, total: usize },
    Finished,
}

/// Black-box text acquisition. The engine's lifecycle stays behind this seam;
/// callers only read the resulting text.
#[allow(async_fn_in_trait)]
pub trait TextRecognizer {
    async fn recognize(
        &self,
        input: &DocumentInput,
        progress: &mut dyn FnMut(RecognizeProgress),
    ) -> Result<String, ScanError>;
}

/// Recognizer backed by local CLI tools: `pdftotext` per page for PDFs,
/// `tesseract` for raster images. Each invocation is a scoped child process
/// awaited to completion, so nothing lingers on any exit path.
pub struct CliRecognizer {
    lang: String,
}

impl CliRecognizer {
    /// Probe for the engine before committing to a scan. A missing binary is
    /// `Upstream`, distinguishable from a recognition failure, so the caller
    /// can suggest manual entry.
    pub async fn acquire() -> Result<Self, ScanError> {
        let probe = Command::new("tesseract").arg("--version").output().await;
        if probe.is_err() {
            return Err(ScanError::Upstream(
                "tesseract not found on PATH".to_string(),
            ));
        }
        Ok(Self {
            lang: "eng".to_string(),
        })
    }
}

impl TextRecognizer for CliRecognizer {
    async fn recognize(
        &self,
        input: &DocumentInput,
        progress: &mut dyn FnMut(RecognizeProgress),
    ) -> Result<String, ScanError> {
        progress(RecognizeProgress::Starting);
        let text = match input {
            DocumentInput::Pdf(path) => recognize_pdf(path, progress).await?,
            DocumentInput::Image(path) => recognize_image(path, &self.lang).await?,
            DocumentInput::Text(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ScanError::Recognizer(e.to_string()))?,
        };
        progress(RecognizeProgress::Finished);
        if text.trim().is_empty() {
            return Err(ScanError::Recognizer(
                "no text could be extracted from the document".to_string(),
            ));
        }
        Ok(text)
    }
}

async fn recognize_pdf(
    path: &Path,
    progress: &mut dyn FnMut(RecognizeProgress),
) -> Result<String, ScanError> {
    let total = pdf_page_count(path).await?;
    let mut text = String::new();
    for page in 1..=total {
        progress(RecognizeProgress::Page {
            current: page,
            total,
        });
        let output = Command::new("pdftotext")
            .args(["-layout", "-f", &page.to_string(), "-l", &page.to_string()])
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| ScanError::Recognizer(e.to_string()))?;
        if !output.status.success() {
            // One bad page must not sink the document.
            warn!("pdftotext failed on page {} of {:?}, continuing", page, path);
            continue;
        }
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        text.push('\n');
    }
    Ok(text)
}

async fn recognize_image(path: &Path, lang: &str) -> Result<String, ScanError> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .args(["-l", lang])
        .output()
        .await
        .map_err(|e| ScanError::Recognizer(e.to_string()))?;
    if !output.status.success() {
        return Err(ScanError::Recognizer(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn pdf_page_count(path: &Path) -> Result<usize, ScanError> {
    let output = Command::new("pdfinfo")
        .arg(path)
        .output()
        .await
        .map_err(|e| ScanError::Recognizer(e.to_string()))?;
    if !output.status.success() {
        return Err(ScanError::Recognizer(format!(
            "pdfinfo failed for {:?}",
            path
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find_map(|line| {
            line.strip_prefix("Pages:")
                .and_then(|rest| rest.trim().parse().ok())
        })
        .ok_or_else(|| ScanError::Recognizer("page count missing from pdfinfo".to_string()))
}

/// Run recognized text through the shared extractors. Same relevance gate as
/// the email path; a document naming no service at all is dropped.
pub fn extract_document(text: &str, fallback_name: &str) -> Option<EmailSubscription> {
    let lower = text.to_lowercase();
    if !SUBSCRIPTION_TERMS.iter().any(|t| lower.contains(t)) {
        return None;
    }

    let service_name = DOC_SERVICE_RE
        .captures(text)
        .map(|caps| service::clean_name(&caps[1]))
        .filter(|n| !n.is_empty())
        .or_else(|| {
            let fallback = service::clean_name(fallback_name);
            (!fallback.is_empty()).then_some(fallback)
        })?;
    debug!(service = %service_name, "document subscription");

    let haystack = format!("{} {}", service_name, text);
    Some(EmailSubscription {
        price: extract::extract_price(text),
        billing_cycle: extract::billing_cycle(text),
        next_billing_date: dates::next_billing_date(text),
        category: extract::categorize(Platform::Other, &haystack),
        service_name,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingCycle, Category};
    use chrono::NaiveDate;

    #[test]
    fn receipt_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/receipt.txt").unwrap();
        let sub = extract_document(&text, "receipt-scan").unwrap();
        assert_eq!(sub.service_name, "Dropbox Plus");
        assert_eq!(sub.price, Some(11.99));
        assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
        assert_eq!(
            sub.next_billing_date,
            Some(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
        );
        assert_eq!(sub.category, Category::Cloud);
    }

    #[test]
    fn fallback_name_from_file_stem() {
        let text = "Thanks for the payment plan. $4 due.";
        let sub = extract_document(text, "gym-membership").unwrap();
        assert_eq!(sub.service_name, "Gym Membership");
    }

    #[test]
    fn irrelevant_document_is_dropped() {
        assert_eq!(extract_document("grocery list: eggs, milk", "list"), None);
    }

    #[test]
    fn classify_by_extension() {
        assert!(matches!(
            DocumentInput::classify(Path::new("a.PDF")),
            Ok(DocumentInput::Pdf(_))
        ));
        assert!(matches!(
            DocumentInput::classify(Path::new("scan.jpeg")),
            Ok(DocumentInput::Image(_))
        ));
        assert!(matches!(
            DocumentInput::classify(Path::new("notes.txt")),
            Ok(DocumentInput::Text(_))
        ));
        assert!(DocumentInput::classify(Path::new("movie.mkv")).is_err());
    }
}
