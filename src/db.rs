use anyhow::Result;
use rusqlite::Connection;

use crate::model::{DetectedSubscription, EmailSubscription};

const DB_PATH: &str = "data/subscan.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS subscriptions (
            id               INTEGER PRIMARY KEY,
            service_name     TEXT NOT NULL,
            price            REAL NOT NULL,
            billing_cycle    TEXT NOT NULL CHECK(billing_cycle IN ('monthly','yearly','quarterly')),
            category         TEXT NOT NULL,
            url              TEXT NOT NULL,
            is_trial         BOOLEAN NOT NULL DEFAULT 0,
            trial_duration   INTEGER,
            trial_start_date TEXT,
            trial_end_date   TEXT,
            source           TEXT NOT NULL CHECK(source IN ('page','watch')),
            detected_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(service_name, url)
        );
        CREATE INDEX IF NOT EXISTS idx_subs_category ON subscriptions(category);

        CREATE TABLE IF NOT EXISTS email_subscriptions (
            id                INTEGER PRIMARY KEY,
            service_name      TEXT NOT NULL,
            price             REAL,
            billing_cycle     TEXT NOT NULL CHECK(billing_cycle IN ('monthly','yearly','quarterly')),
            next_billing_date TEXT,
            category          TEXT NOT NULL,
            source            TEXT NOT NULL CHECK(source IN ('email','document')),
            detected_at       TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(service_name, source)
        );
        CREATE INDEX IF NOT EXISTS idx_email_subs_category ON email_subscriptions(category);

        CREATE TABLE IF NOT EXISTS scan_log (
            id          INTEGER PRIMARY KEY,
            url         TEXT NOT NULL,
            outcome     TEXT NOT NULL CHECK(outcome IN ('detected','nothing','error')),
            detail      TEXT,
            scanned_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Saving ──

pub fn save_subscription(
    conn: &Connection,
    sub: &DetectedSubscription,
    source: &str,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO subscriptions
         (service_name, price, billing_cycle, category, url,
          is_trial, trial_duration, trial_start_date, trial_end_date, source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            sub.service_name,
            sub.price,
            sub.billing_cycle.as_str(),
            sub.category.as_str(),
            sub.url,
            sub.is_trial,
            sub.trial_duration,
            sub.trial_start_date.map(|d| d.to_rfc3339()),
            sub.trial_end_date.map(|d| d.to_rfc3339()),
            source,
        ],
    )?;
    Ok(())
}

pub fn save_email_subscriptions(
    conn: &Connection,
    subs: &[EmailSubscription],
    source: &str,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO email_subscriptions
             (service_name, price, billing_cycle, next_billing_date, category, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for s in subs {
            count += stmt.execute(rusqlite::params![
                s.service_name,
                s.price,
                s.billing_cycle.as_str(),
                s.next_billing_date.map(|d| d.to_string()),
                s.category.as_str(),
                source,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn log_scan(conn: &Connection, url: &str, outcome: &str, detail: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_log (url, outcome, detail) VALUES (?1, ?2, ?3)",
        rusqlite::params![url, outcome, detail],
    )?;
    Ok(())
}

// ── Overview ──

pub struct OverviewRow {
    pub service_name: String,
    pub price: Option<f64>,
    pub billing_cycle: String,
    pub category: String,
    pub source: String,
    pub detected_at: String,
}

/// Page and email records merged into one listing, newest first.
pub fn fetch_overview(
    conn: &Connection,
    category: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let where_clause = if category.is_some() {
        " WHERE category = ?1"
    } else {
        ""
    };
    let sql = format!(
        "SELECT service_name, price, billing_cycle, category, source, detected_at
         FROM (
             SELECT service_name, price, billing_cycle, category, source, detected_at
             FROM subscriptions{w}
             UNION ALL
             SELECT service_name, price, billing_cycle, category, source, detected_at
             FROM email_subscriptions{w}
         )
         ORDER BY detected_at DESC
         LIMIT {limit}",
        w = where_clause,
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row| {
        Ok(OverviewRow {
            service_name: row.get(0)?,
            price: row.get(1)?,
            billing_cycle: row.get(2)?,
            category: row.get(3)?,
            source: row.get(4)?,
            detected_at: row.get(5)?,
        })
    };
    let rows = match category {
        Some(c) => stmt
            .query_map(rusqlite::params![c], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub page_records: usize,
    pub email_records: usize,
    pub trials: usize,
    pub scans: usize,
    pub scan_errors: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let page_records: usize =
        conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |r| r.get(0))?;
    let email_records: usize =
        conn.query_row("SELECT COUNT(*) FROM email_subscriptions", [], |r| r.get(0))?;
    let trials: usize = conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE is_trial = 1",
        [],
        |r| r.get(0),
    )?;
    let scans: usize = conn.query_row("SELECT COUNT(*) FROM scan_log", [], |r| r.get(0))?;
    let scan_errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM scan_log WHERE outcome = 'error'",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        page_records,
        email_records,
        trials,
        scans,
        scan_errors,
    })
}

// ── Tests ──
