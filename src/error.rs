use thiserror::Error;

/// Failures that must stay distinguishable at the orchestration boundary.
/// Absence of a signal is never an error: extractors return `None` for
/// "no match" and detection reports an empty result.
#[derive(Debug, Error)]
pub enum ScanError {
    /// An upstream collaborator (mail API, OCR engine, page fetch) is
    /// unreachable or refused the request. The caller can offer manual entry.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The text recognizer ran but could not produce usable text.
    #[error("recognizer failed: {0}")]
    Recognizer(String),

    /// A message payload could not be decoded into text.
    #[error("malformed payload: {0}")]
    Decode(String),
}
