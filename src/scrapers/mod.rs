//! Row table sources
//!
//! The resolver never talks to the network. A [`RowSource`] hands it a
//! freshly built [`RowTable`] per cycle, or says why it could not.

pub mod ote;
pub mod sheet;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::RowTable;

pub use ote::{OteSource, OteSourceConfig};

/// Errors while producing a row table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network or transport failure.
    Fetch(String),
    /// The document came back but could not be turned into rows.
    Parse(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            Self::Parse(msg) => write!(f, "parse failed: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Fetch(err.to_string())
    }
}

#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_table(&self) -> Result<RowTable, SourceError>;
}

/// In-memory source returning scripted responses in order. The last
/// response repeats once the script runs out.
pub struct StaticSource {
    script: Mutex<VecDeque<Result<RowTable, SourceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(table: RowTable) -> Self {
        Self::scripted(vec![Ok(table)])
    }

    pub fn scripted(responses: Vec<Result<RowTable, SourceError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_response(&self) -> Result<RowTable, SourceError> {
        let mut script = self.script.lock();
        if script.len() > 1 {
            if let Some(next) = script.pop_front() {
                return next;
            }
        }
        script
            .front()
            .cloned()
            .unwrap_or_else(|| Err(SourceError::Fetch("no scripted response".to_string())))
    }
}

#[async_trait]
impl RowSource for StaticSource {
    async fn fetch_table(&self) -> Result<RowTable, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response()
    }
}
