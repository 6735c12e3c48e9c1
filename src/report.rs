use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, error, info, warn};
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub const DEFAULT_REPORT_URL: &str = "https://script.google.com/macros/s/AKfycbzKI0EAuzvHhAaEc8hGxT8GqXGUo6UkrrA1quj5RKPpLW7UlA5DFR-ClJwFSrPMHmphvw/exec";
pub const TIMES_PARAM: &str = "times";

const REPORT_TIMEOUT: Duration = Duration::from_secs(10);
const FLUSH_POLL: Duration = Duration::from_millis(20);
// integers above this are no longer exact in an f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode durations: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid report endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("report request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("report endpoint answered {0}")]
    Status(reqwest::StatusCode),
}

/// Receives the finished session's durations. Implementations must not block
/// the caller and must swallow their own failures.
pub trait Reporter {
    fn report(&self, durations: &[f64]);

    /// Waits up to `timeout` for reports still in flight. Called on shutdown.
    fn flush(&self, _timeout: Duration) {}
}

/// JSON array of the durations, whole seconds written without a fraction
/// (`[2,0.5]`, not `[2.0,0.5]`).
pub fn encode_times(durations: &[f64]) -> Result<String, serde_json::Error> {
    let values: Vec<Value> = durations
        .iter()
        .map(|&d| {
            if d.fract() == 0.0 && d.abs() < MAX_EXACT_INTEGER {
                Value::from(d as i64)
            } else {
                Value::from(d)
            }
        })
        .collect();
    serde_json::to_string(&values)
}

/// Builds `<endpoint>?times=<url-encoded JSON array>`
pub fn report_url(endpoint: &str, durations: &[f64]) -> Result<Url, ReportError> {
    let times = encode_times(durations)?;
    Ok(Url::parse_with_params(endpoint, &[(TIMES_PARAM, times)])?)
}

/// Sends durations with a GET on a background thread; the outcome only
/// reaches the log. Threads are kept so `flush` can wait for them.
#[derive(Debug, Clone)]
pub struct HttpReporter {
    endpoint: String,
    inflight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl HttpReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            inflight: Arc::default(),
        }
    }

    /// Reports whose request has not completed yet
    pub fn pending_reports(&self) -> usize {
        self.inflight
            .lock()
            .map(|inflight| inflight.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or_default()
    }

    fn reap(inflight: &mut Vec<JoinHandle<()>>) {
        let (done, running): (Vec<_>, Vec<_>) =
            inflight.drain(..).partition(|h| h.is_finished());
        for handle in done {
            if handle.join().is_err() {
                error!("report thread panicked");
            }
        }
        *inflight = running;
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send(endpoint: &str, durations: &[f64]) -> Result<(), ReportError> {
        let url = report_url(endpoint, durations)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REPORT_TIMEOUT)
            .build()?;
        let response = client.get(url).send()?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReportError::Status(response.status()))
        }
    }
}

impl Reporter for HttpReporter {
    fn report(&self, durations: &[f64]) {
        let endpoint = self.endpoint.clone();
        let durations = durations.to_vec();
        let spawned = thread::Builder::new()
            .name("report".into())
            .spawn(move || match Self::send(&endpoint, &durations) {
                Ok(()) => info!(
                    "saved {} durations [{}]",
                    durations.len(),
                    durations.iter().map(|d| format!("{d:.3}")).join(", ")
                ),
                Err(e) => error!("failed to save durations: {e}"),
            });
        match spawned {
            Ok(handle) => match self.inflight.lock() {
                Ok(mut inflight) => {
                    Self::reap(&mut inflight);
                    inflight.push(handle);
                }
                Err(_) => warn!("report thread is untracked and may be cut short on exit"),
            },
            Err(e) => error!("could not start report thread: {e}"),
        }
    }

    fn flush(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = match self.inflight.lock() {
                Ok(mut inflight) => {
                    Self::reap(&mut inflight);
                    inflight.len()
                }
                Err(_) => return,
            };
            if remaining == 0 {
                return;
            }
            if Instant::now() >= deadline {
                warn!("abandoning {remaining} unsent report(s) after {timeout:?}");
                return;
            }
            thread::sleep(FLUSH_POLL);
        }
    }
}

/// Used when reporting is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, durations: &[f64]) {
        debug!("reporting disabled, dropping {} durations", durations.len());
    }
}

/// Keeps every report in memory, for tests
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Vec<f64>> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, durations: &[f64]) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(durations.to_vec());
        }
    }
}
