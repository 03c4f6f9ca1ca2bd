use base64::Engine;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::extract::{self, dates, service};
use crate::model::{EmailSubscription, Platform};
use crate::patterns::SUBSCRIPTION_TERMS;

/// One decoded message: headers of interest plus the flattened text body.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub body: String,
}

/// Seam to the mail backend: search returns a bounded id list, fetch returns
/// a decoded message. The scanner never talks HTTP directly.
#[allow(async_fn_in_trait)]
pub trait MailTransport {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, ScanError>;
    async fn fetch(&self, id: &str) -> Result<MailMessage, ScanError>;
}

/// Sequentially scans candidate messages and emits one record per message
/// that passes the relevance filter and resolves a service name.
pub struct EmailScanner<T> {
    transport: T,
}

impl<T: MailTransport> EmailScanner<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// A failed search aborts the batch; a failed or unparseable message is
    /// logged and skipped, and the batch carries on with what remains.
    pub async fn scan(&self, query: &str, limit: usize) -> Result<Vec<EmailSubscription>, ScanError> {
        let ids = self.transport.search(query, limit).await?;

        let pb = ProgressBar::new(ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut found = Vec::new();
        for id in ids {
            match self.transport.fetch(&id).await {
                Ok(message) => {
                    if let Some(sub) = extract_subscription(&message) {
                        found.push(sub);
                    }
                }
                Err(e) => {
                    warn!("skipping message {}: {}", id, e);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(found)
    }
}

/// Turn one message into a record, or nothing. Messages with no subscription
/// term anywhere, or no resolvable service name, are dropped silently.
pub fn extract_subscription(message: &MailMessage) -> Option<EmailSubscription> {
    let subject_lower = message.subject.to_lowercase();
    let body_lower = message.body.to_lowercase();
    let relevant = SUBSCRIPTION_TERMS
        .iter()
        .any(|t| subject_lower.contains(t) || body_lower.contains(t));
    if !relevant {
        return None;
    }

    let service_name = service::from_subject(&message.subject, &message.from)?;
    debug!(service = %service_name, id = %message.id, "subscription email");

    // Category is judged over name + body so a recognizable service name can
    // tip an otherwise bland receipt.
    let haystack = format!("{} {}", service_name, message.body);

    Some(EmailSubscription {
        price: extract::extract_price(&message.body),
        billing_cycle: extract::billing_cycle(&message.body),
        next_billing_date: dates::next_billing_date(&message.body),
        category: extract::categorize(Platform::Other, &haystack),
        service_name,
    })
}

// ── HTTP transport ──

/// Gmail-style REST transport: bearer token, JSON payloads, base64url part
/// data decoded here (the "thin helper" the scanner relies on).
pub struct HttpMailTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpMailTransport {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    payload: Payload,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

impl MailTransport for HttpMailTransport {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, ScanError> {
        let response = self
            .client
            .get(format!("{}/messages", self.base_url))
            .query(&[("q", query), ("maxResults", &limit.to_string())])
            .bearer_auth(&self.token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScanError::Upstream(format!(
                "message search returned {}",
                response.status()
            )));
        }
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch(&self, id: &str) -> Result<MailMessage, ScanError> {
        let response = self
            .client
            .get(format!("{}/messages/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScanError::Upstream(format!(
                "message fetch returned {}",
                response.status()
            )));
        }
        let parsed: MessageResponse = response.json().await?;

        let subject = header_value(&parsed.payload, "subject").unwrap_or_default();
        let from = header_value(&parsed.payload, "from").unwrap_or_default();

        let mut body = String::new();
        collect_body(&parsed.payload, &mut body)?;

        Ok(MailMessage {
            id: id.to_string(),
            subject,
            from,
            body,
        })
    }
}

fn header_value(payload: &Payload, name: &str) -> Option<String> {
    payload
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// Walk the part tree depth-first, appending every decoded data chunk.
fn collect_body(payload: &Payload, out: &mut String) -> Result<(), ScanError> {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        out.push_str(&decode_part(data)?);
    }
    for part in &payload.parts {
        collect_body(part, out)?;
    }
    Ok(())
}

fn decode_part(data: &str) -> Result<String, ScanError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| ScanError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ── Tests ──
