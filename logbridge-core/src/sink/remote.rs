//! Remote telemetry sink
//!
//! Records are handed to a [`TelemetryClient`]. The default client,
//! [`HttpTelemetryClient`], buffers them in memory and ships them to a
//! New Relic compatible log ingest endpoint when the sink is flushed.
//!
//! Credentials are checked when the sink is built. A rejected credential is
//! a startup configuration error: [`RemoteSink::new`] panics so that the
//! deployment fails loudly instead of silently losing remote logs.

use super::{Output, Sink};
use crate::error::{SinkError, SinkResult};
use crate::format::{LEVEL_KEY, TIME_KEY};
use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default log ingest endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://log-api.newrelic.com/log/v1";

/// Required license key length.
pub const LICENSE_LEN: usize = 40;

/// Default number of records held before the oldest are dropped.
pub const DEFAULT_MAX_BUFFERED: usize = 10_000;

const LICENSE_HEADER: &str = "X-License-Key";

/// Remote telemetry settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Application name reported with every record
    pub app: String,
    /// License key, exactly 40 characters
    pub license: String,
    /// Ingest endpoint override
    pub endpoint: Option<String>,
    /// Buffer capacity override
    pub max_buffered: Option<usize>,
}

impl RemoteConfig {
    /// Check the credential locally, before any connection is attempted.
    pub fn validate(&self) -> SinkResult<()> {
        if self.license.chars().count() != LICENSE_LEN {
            return Err(SinkError::InvalidCredential(format!(
                "license length is not {LICENSE_LEN}"
            )));
        }
        if self.app.trim().is_empty() {
            return Err(SinkError::InvalidCredential("app name is required".to_string()));
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

/// One record as the remote backend receives it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogData {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub severity: String,
    /// The encoded record
    pub message: String,
}

/// Contract of the remote telemetry client
pub trait TelemetryClient: Send + Sync + fmt::Debug {
    /// Accept one record; never blocks on the network.
    fn record_log(&self, data: LogData);

    /// Block until the backend is reachable or `timeout` elapses.
    fn wait_for_connection(&self, timeout: Duration) -> bool;

    /// Deliver pending records and close the session, within `timeout`.
    fn shutdown(&self, timeout: Duration);
}

/// Sink forwarding JSON records to a [`TelemetryClient`]
#[derive(Debug)]
pub struct RemoteSink {
    level: Level,
    client: Arc<dyn TelemetryClient>,
}

impl RemoteSink {
    /// Open a session with the default HTTP client.
    ///
    /// # Panics
    ///
    /// Panics with `failed to init remote telemetry app: <reason>` when the
    /// credential is rejected.
    pub fn new(level: Level, config: &RemoteConfig) -> Self {
        Self::try_new(level, config).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Same as [`RemoteSink::new`] but returns the error.
    pub fn try_new(level: Level, config: &RemoteConfig) -> SinkResult<Self> {
        config.validate()?;
        let client = HttpTelemetryClient::new(config)?;
        Ok(Self::with_client(level, Arc::new(client)))
    }

    /// Sink over any client implementation.
    pub fn with_client(level: Level, client: Arc<dyn TelemetryClient>) -> Self {
        Self { level, client }
    }
}

impl Sink for RemoteSink {
    fn output(&self) -> Output {
        Output::Remote
    }

    fn level(&self) -> Level {
        self.level
    }

    fn write(&self, line: &[u8]) -> anyhow::Result<()> {
        let message = std::str::from_utf8(line)?.trim();
        let (severity, timestamp_ms) = parse_meta(message);
        self.client.record_log(LogData { timestamp_ms, severity, message: message.to_string() });
        Ok(())
    }

    fn wait(&self, timeout: Duration) {
        if !self.client.wait_for_connection(timeout) {
            log::warn!(
                target: "logbridge::remote",
                "remote telemetry not connected after {:?}, continuing",
                timeout
            );
        }
    }

    fn flush(&self, timeout: Duration) {
        self.client.shutdown(timeout);
    }
}

/// Pull severity and timestamp out of an encoded JSON record.
fn parse_meta(message: &str) -> (String, i64) {
    let parsed: Option<Value> = serde_json::from_str(message).ok();
    let severity = parsed
        .as_ref()
        .and_then(|v| v.get(LEVEL_KEY))
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_string();
    let timestamp_ms = parsed
        .as_ref()
        .and_then(|v| v.get(TIME_KEY))
        .and_then(Value::as_str)
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    (severity, timestamp_ms)
}

/// Buffering HTTP client for a New Relic compatible log API
pub struct HttpTelemetryClient {
    endpoint: String,
    app: String,
    license: String,
    max_buffered: usize,
    http: reqwest::blocking::Client,
    state: Mutex<ClientState>,
}

#[derive(Debug, Default)]
struct ClientState {
    buffer: VecDeque<LogData>,
    dropped: u64,
    connected: bool,
    closed: bool,
}

impl HttpTelemetryClient {
    /// Build the client. Must not be called from inside an async runtime.
    pub fn new(config: &RemoteConfig) -> SinkResult<Self> {
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            endpoint: config.endpoint().to_string(),
            app: config.app.clone(),
            license: config.license.clone(),
            max_buffered: config.max_buffered.unwrap_or(DEFAULT_MAX_BUFFERED).max(1),
            http,
            state: Mutex::new(ClientState::default()),
        })
    }

    /// Records waiting to be shipped.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Records discarded because the buffer was full or the session closed.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, logs: &[LogData], timeout: Duration) -> SinkResult<()> {
        let entries: Vec<Value> = logs
            .iter()
            .map(|l| {
                json!({
                    "timestamp": l.timestamp_ms,
                    "message": l.message,
                    "attributes": { "level": l.severity },
                })
            })
            .collect();
        let payload = json!([{
            "common": { "attributes": { "service.name": self.app } },
            "logs": entries,
        }]);

        self.http
            .post(&self.endpoint)
            .header(LICENSE_HEADER, &self.license)
            .timeout(timeout)
            .json(&payload)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl fmt::Debug for HttpTelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTelemetryClient")
            .field("endpoint", &self.endpoint)
            .field("app", &self.app)
            .field("max_buffered", &self.max_buffered)
            .finish_non_exhaustive()
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn record_log(&self, data: LogData) {
        let mut state = self.lock();
        if state.closed {
            state.dropped += 1;
            return;
        }
        if state.buffer.len() >= self.max_buffered {
            state.buffer.pop_front();
            state.dropped += 1;
        }
        state.buffer.push_back(data);
    }

    fn wait_for_connection(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.is_connected();
        }
        match self.send(&[], timeout) {
            Ok(()) => {
                self.lock().connected = true;
                true
            }
            Err(err) => {
                log::warn!(target: "logbridge::remote", "connection check failed: {}", err);
                false
            }
        }
    }

    fn shutdown(&self, timeout: Duration) {
        let (pending, dropped) = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            (state.buffer.drain(..).collect::<Vec<_>>(), state.dropped)
        };

        if dropped > 0 {
            log::warn!(target: "logbridge::remote", "{} records were dropped before shutdown", dropped);
        }
        if pending.is_empty() {
            return;
        }
        if timeout.is_zero() {
            log::warn!(
                target: "logbridge::remote",
                "shutdown without time budget, discarding {} records",
                pending.len()
            );
            return;
        }
        if let Err(err) = self.send(&pending, timeout) {
            log::warn!(
                target: "logbridge::remote",
                "failed to deliver {} records: {}",
                pending.len(),
                err
            );
        }
    }
}
