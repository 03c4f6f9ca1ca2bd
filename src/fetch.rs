use std::time::Duration;

use tracing::warn;

use crate::error::ScanError;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Fetch a page body over HTTP with exponential backoff on rate limits and
/// server errors. Client errors other than 429 fail immediately.
pub async fn fetch_page(url: &str) -> Result<String, ScanError> {
    let client = reqwest::Client::builder()
        .user_agent("subscan/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let mut last_status = None;
    for attempt in 0..=MAX_RETRIES {
        let response = client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.text().await?);
        }

        let should_retry = status.as_u16() == 429 || status.is_server_error();
        if !should_retry {
            return Err(ScanError::Upstream(format!(
                "fetch of {} returned {}",
                url, status
            )));
        }
        last_status = Some(status);

        if attempt < MAX_RETRIES {
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "got {} from {} (attempt {}/{}), backing off {:.1}s",
                status,
                url,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }
    }

    Err(ScanError::Upstream(format!(
        "fetch of {} still failing after {} retries (last status {})",
        url,
        MAX_RETRIES,
        last_status.map(|s| s.to_string()).unwrap_or_default()
    )))
}
