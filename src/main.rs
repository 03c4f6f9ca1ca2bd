mod db;
mod detect;
mod document;
mod email;
mod error;
mod extract;
mod fetch;
mod lifecycle;
mod model;
mod page;
mod patterns;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::detect::PageDetector;
use crate::document::{CliRecognizer, DocumentInput, RecognizeProgress, TextRecognizer};
use crate::email::{EmailScanner, HttpMailTransport};
use crate::lifecycle::{PageEvent, ScanController, ScanPhase};
use crate::model::DetectedSubscription;
use crate::page::PageSnapshot;

const DEFAULT_MAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_MAIL_QUERY: &str = "subject:(subscription OR invoice OR billing OR renewal)";

#[derive(Parser)]
#[command(name = "subscan", about = "Subscription detector for pages, mailboxes, and documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one page (local HTML file or fetched URL) for a subscription
    Page {
        /// Local HTML file; omit to fetch --url over HTTP
        file: Option<PathBuf>,
        /// Page URL; the record's location and the platform hint
        #[arg(short, long)]
        url: Option<String>,
        /// Print the detected record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Watch a local HTML file and re-scan on change, with a save prompt
    Watch {
        /// HTML file to watch
        file: PathBuf,
        /// Page URL to attribute records to
        #[arg(short, long)]
        url: String,
    },
    /// Scan mailbox messages matching a query
    Emails {
        /// Mail search query
        #[arg(short, long, default_value = DEFAULT_MAIL_QUERY)]
        query: String,
        /// Max messages to scan
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },
    /// Extract a subscription from a PDF, image, or text document
    Document {
        /// File to recognize and scan
        file: PathBuf,
    },
    /// List saved subscriptions
    List {
        /// Filter by category (streaming, music, cloud, ...)
        #[arg(short, long)]
        category: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show scan statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Page { file, url, json } => cmd_page(file, url, json).await,
        Commands::Watch { file, url } => cmd_watch(file, url).await,
        Commands::Emails { query, limit } => cmd_emails(&query, limit).await,
        Commands::Document { file } => cmd_document(file).await,
        Commands::List { category, limit } => cmd_list(category.as_deref(), limit),
        Commands::Stats => cmd_stats(),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn cmd_page(file: Option<PathBuf>, url: Option<String>, json: bool) -> anyhow::Result<()> {
    let (html, url) = match file {
        Some(path) => {
            let html = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let url = url.unwrap_or_else(|| format!("file://{}", path.display()));
            (html, url)
        }
        None => {
            let url = url.context("either a file or --url is required")?;
            let html = fetch::fetch_page(&url).await?;
            (html, url)
        }
    };

    let conn = db::connect()?;
    db::init_schema(&conn)?;

    let snapshot = PageSnapshot::parse(&html, &url);
    let mut detector = PageDetector::new(&snapshot);

    match detector.detect_subscription() {
        Some(sub) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&sub)?);
            } else {
                print_record(&sub);
            }
            db::save_subscription(&conn, &sub, "page")?;
            db::log_scan(&conn, &url, "detected", Some(&sub.service_name))?;
        }
        None => {
            println!("No subscription detected.");
            db::log_scan(&conn, &url, "nothing", None)?;
        }
    }
    Ok(())
}

async fn cmd_watch(file: PathBuf, url: String) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;

    let (tx, rx) = mpsc::channel(16);
    tx.send(PageEvent::Loaded).await.ok();

    // File mtime poller stands in for mutation events.
    let poller = {
        let tx = tx.clone();
        let path = file.clone();
        tokio::spawn(async move {
            let mut last = None;
            let mut tick = tokio::time::interval(std::time::Duration::from_millis(500));
            loop {
                tick.tick().await;
                let Ok(meta) = tokio::fs::metadata(&path).await else {
                    continue;
                };
                let modified = meta.modified().ok();
                if last.is_some() && modified != last {
                    let _ = tx.send(PageEvent::Mutated).await;
                }
                last = modified;
            }
        })
    };

    // y/n on stdin settles the prompt.
    let prompter = {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let event = match line.trim() {
                    "y" | "Y" => PageEvent::Saved,
                    "n" | "N" => PageEvent::Dismissed,
                    _ => continue,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        })
    };
    drop(tx);

    let scan_file = file.clone();
    let scan_url = url.clone();
    let controller = ScanController::new(move || {
        let html = std::fs::read_to_string(&scan_file)
            .with_context(|| format!("reading {}", scan_file.display()))?;
        let snapshot = PageSnapshot::parse(&html, &scan_url);
        Ok(PageDetector::new(&snapshot).detect_subscription())
    });

    println!("Watching {} (url: {})...", file.display(), url);
    let mut detected: Option<DetectedSubscription> = None;
    let state = controller
        .run(rx, |sub| {
            print_record(sub);
            println!("Save this subscription? [y/n]");
            detected = Some(sub.clone());
        })
        .await;

    poller.abort();
    prompter.abort();

    match (state.phase(), detected) {
        (ScanPhase::Saved, Some(sub)) => {
            db::save_subscription(&conn, &sub, "watch")?;
            db::log_scan(&conn, &url, "detected", Some(&sub.service_name))?;
            println!("Saved {}.", sub.service_name);
        }
        (ScanPhase::Dismissed, _) => {
            db::log_scan(&conn, &url, "nothing", Some("dismissed"))?;
            println!("Dismissed.");
        }
        _ => {
            db::log_scan(&conn, &url, "nothing", None)?;
            println!("Watch ended with nothing to save.");
        }
    }
    Ok(())
}

async fn cmd_emails(query: &str, limit: usize) -> anyhow::Result<()> {
    let base = std::env::var("MAIL_API_BASE").unwrap_or_else(|_| DEFAULT_MAIL_API_BASE.into());
    let token =
        std::env::var("MAIL_API_TOKEN").context("MAIL_API_TOKEN environment variable must be set")?;

    let conn = db::connect()?;
    db::init_schema(&conn)?;

    println!("Scanning up to {} messages matching {:?}...", limit, query);
    let scanner = EmailScanner::new(HttpMailTransport::new(base, token));
    let found = scanner.scan(query, limit).await?;

    if found.is_empty() {
        println!("No subscription emails found.");
        return Ok(());
    }
    for sub in &found {
        let price = sub
            .price
            .map(|p| format!("${:.2}", p))
            .unwrap_or_else(|| "-".into());
        let next = sub
            .next_billing_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<24} {:>8} {:<10} next: {:<12} [{}]",
            truncate(&sub.service_name, 24),
            price,
            sub.billing_cycle.as_str(),
            next,
            sub.category.as_str(),
        );
    }
    let saved = db::save_email_subscriptions(&conn, &found, "email")?;
    println!("Saved {} subscriptions from {} messages.", saved, found.len());
    Ok(())
}

async fn cmd_document(file: PathBuf) -> anyhow::Result<()> {
    let input = DocumentInput::classify(&file)?;

    let text = match &input {
        DocumentInput::Text(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let recognizer = CliRecognizer::acquire().await?;
            let pb = indicatif::ProgressBar::new_spinner();
            let mut progress = |p: RecognizeProgress| match p {
                RecognizeProgress::Starting => pb.set_message("recognizing..."),
                RecognizeProgress::Page { current, total } => {
                    pb.set_message(format!("page {}/{}", current, total));
                }
                RecognizeProgress::Finished => pb.finish_and_clear(),
            };
            recognizer.recognize(&input, &mut progress).await?
        }
    };

    match document::extract_document(&text, &input.fallback_name()) {
        Some(sub) => {
            let price = sub
                .price
                .map(|p| format!("${:.2}", p))
                .unwrap_or_else(|| "-".into());
            println!(
                "{} — {} {} [{}]",
                sub.service_name,
                price,
                sub.billing_cycle.as_str(),
                sub.category.as_str(),
            );
            if let Some(next) = sub.next_billing_date {
                println!("Next billing date: {}", next);
            }
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            db::save_email_subscriptions(&conn, std::slice::from_ref(&sub), "document")?;
            println!("Saved.");
        }
        None => println!("No subscription found in {}.", file.display()),
    }
    Ok(())
}

fn cmd_list(category: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let rows = db::fetch_overview(&conn, category, limit)?;
    if rows.is_empty() {
        println!("No subscriptions saved yet.");
        return Ok(());
    }

    println!(
        "{:>3} | {:<24} | {:>8} | {:<10} | {:<10} | {:<8} | {:<19}",
        "#", "Service", "Price", "Cycle", "Category", "Source", "Detected"
    );
    println!("{}", "-".repeat(98));
    for (i, r) in rows.iter().enumerate() {
        let price = r
            .price
            .map(|p| format!("${:.2}", p))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>3} | {:<24} | {:>8} | {:<10} | {:<10} | {:<8} | {:<19}",
            i + 1,
            truncate(&r.service_name, 24),
            price,
            r.billing_cycle,
            r.category,
            r.source,
            r.detected_at,
        );
    }
    println!("\n{} subscriptions", rows.len());
    Ok(())
}

fn cmd_stats() -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let s = db::get_stats(&conn)?;
    println!("Page records:  {}", s.page_records);
    println!("Email records: {}", s.email_records);
    println!("Trials:        {}", s.trials);
    println!("Scans logged:  {}", s.scans);
    println!("Scan errors:   {}", s.scan_errors);
    Ok(())
}

fn print_record(sub: &DetectedSubscription) {
    println!(
        "{} — ${:.2} {} [{}]",
        sub.service_name,
        sub.price,
        sub.billing_cycle.as_str(),
        sub.category.as_str(),
    );
    if sub.is_trial {
        match sub.trial_duration {
            Some(days) => println!("Trial: {} days", days),
            None => println!("Trial offer detected"),
        }
    }
    println!("URL: {}", sub.url);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
