//! OTE intraday market report
//!
//! The market page links the current day's report from a
//! `report_attachment_links` paragraph. The report is an Excel workbook whose
//! first sheet holds one row per 15-minute interval.

use anyhow::{Context, Result};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use reqwest::Client;
use std::io::Cursor;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::sheet::table_from_grid;
use super::{RowSource, SourceError};
use crate::models::RowTable;

pub const OTE_BASE_URL: &str = "https://www.ote-cr.cz";
pub const OTE_INTRADAY_PAGE: &str = "https://www.ote-cr.cz/cs/kratkodobe-trhy/elektrina/vnitrodenni-trh";

const ATTACHMENT_CONTAINER: &str = "report_attachment_links";

#[derive(Debug, Clone)]
pub struct OteSourceConfig {
    pub page_url: String,
    /// Prefix for relative report links.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OteSourceConfig {
    fn default() -> Self {
        Self {
            page_url: OTE_INTRADAY_PAGE.to_string(),
            base_url: OTE_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct OteSource {
    client: Client,
    config: OteSourceConfig,
}

impl OteSource {
    pub fn new(config: OteSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    async fn report_url(&self) -> Result<String, SourceError> {
        let html = self
            .client
            .get(&self.config.page_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let href = find_report_link(&html).ok_or_else(|| {
            SourceError::Parse("report download link not found on market page".to_string())
        })?;

        Ok(absolute_url(&self.config.base_url, &href))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if bytes.is_empty() {
            return Err(SourceError::Parse("downloaded report is empty".to_string()));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RowSource for OteSource {
    async fn fetch_table(&self) -> Result<RowTable, SourceError> {
        let started = Instant::now();
        let url = self.report_url().await?;
        debug!(url = %url, "Downloading OTE intraday report");

        let bytes = self.download(&url).await?;
        let size = bytes.len();

        let grid = tokio::task::spawn_blocking(move || read_first_sheet(bytes))
            .await
            .map_err(|e| SourceError::Parse(format!("sheet reader task failed: {}", e)))??;
        let table = table_from_grid(&grid)?;

        info!(
            rows = table.len(),
            bytes = size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "📥 OTE report fetched"
        );
        Ok(table)
    }
}

/// First `href` inside the `<p class="report_attachment_links">` container,
/// with `&amp;` decoded.
pub fn find_report_link(html: &str) -> Option<String> {
    let mut rest = container_body(html)?;

    while let Some(at) = find_tag(rest, "a") {
        let tag = &rest[at..];
        let end = tag.find('>')?;
        let href = attr_value(&tag[..end], "href")
            .map(str::trim)
            .filter(|h| !h.is_empty());
        if let Some(href) = href {
            return Some(href.replace("&amp;", "&"));
        }
        rest = &tag[end..];
    }
    None
}

/// Inner HTML of the first `<p>` carrying the attachment class.
fn container_body(html: &str) -> Option<&str> {
    let mut rest = html;

    while let Some(at) = find_tag(rest, "p") {
        let tag = &rest[at..];
        let end = tag.find('>')?;
        let is_container = attr_value(&tag[..end], "class")
            .map_or(false, |classes| {
                classes.split_whitespace().any(|c| c == ATTACHMENT_CONTAINER)
            });

        let body = &tag[end + 1..];
        if is_container {
            let close = find_tag(body, "/p").unwrap_or(body.len());
            return Some(&body[..close]);
        }
        rest = body;
    }
    None
}

/// Byte offset of the next `<name` start tag (ASCII case-insensitive).
fn find_tag(html: &str, name: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = html[from..].find('<') {
        let at = from + offset;
        let after = &html.as_bytes()[at + 1..];
        let name_matches = after
            .get(..name.len())
            .map_or(false, |b| b.eq_ignore_ascii_case(name.as_bytes()));
        let boundary = matches!(
            after.get(name.len()),
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/'
        );
        if name_matches && boundary {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Value of attribute `name` (lowercase) inside a start tag. Double-quoted,
/// single-quoted and unquoted values are accepted.
fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let mut from = 0;

    while let Some(offset) = lower[from..].find(name) {
        let at = from + offset;
        from = at + name.len();

        let preceded = lower[..at].ends_with(|c: char| c.is_ascii_whitespace());
        let after_name = lower[from..].trim_start();
        if !preceded || !after_name.starts_with('=') {
            continue;
        }

        let value = tag[tag.len() - after_name.len() + 1..].trim_start();
        return match value.chars().next()? {
            quote @ ('"' | '\'') => {
                let inner = &value[1..];
                inner.find(quote).map(|end| &inner[..end])
            }
            _ => value
                .split(|c: char| c.is_ascii_whitespace() || c == '>')
                .next(),
        };
    }
    None
}

pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}

fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, SourceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SourceError::Parse(format!("unreadable workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| SourceError::Parse(format!("unreadable sheet: {}", e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}
