#![allow(dead_code)]

use logbridge_core::sink::{Output, SharedBuffer, Sink};
use logbridge_core::Level;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// JSON-encoded sink capturing into memory
#[derive(Debug)]
pub struct JsonCapture {
    level: Level,
    buf: SharedBuffer,
}

impl JsonCapture {
    pub fn new(level: Level) -> (Self, SharedBuffer) {
        let buf = SharedBuffer::new();
        (Self { level, buf: buf.clone() }, buf)
    }
}

impl Sink for JsonCapture {
    fn output(&self) -> Output {
        Output::File
    }

    fn level(&self) -> Level {
        self.level
    }

    fn write(&self, line: &[u8]) -> anyhow::Result<()> {
        use std::io::Write;
        let mut buf = self.buf.clone();
        buf.write_all(line)?;
        buf.write_all(b"\n")?;
        Ok(())
    }
}

/// Sink recording its lifecycle calls into a journal shared with its peers
#[derive(Debug)]
pub struct LifecycleRecorder {
    name: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
}

impl LifecycleRecorder {
    pub fn new(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        Self { name, journal: Arc::clone(journal) }
    }

    fn note(&self, event: &str) {
        self.journal.lock().unwrap().push(format!("{event}:{}", self.name));
    }
}

impl Sink for LifecycleRecorder {
    fn output(&self) -> Output {
        Output::Remote
    }

    fn level(&self) -> Level {
        Level::Debug
    }

    fn write(&self, _line: &[u8]) -> anyhow::Result<()> {
        self.note("write");
        Ok(())
    }

    fn wait(&self, _timeout: Duration) {
        self.note("wait");
    }

    fn flush(&self, _timeout: Duration) {
        self.note("flush");
    }
}

/// Parsed JSON lines with the timestamp removed.
pub fn json_lines(buf: &SharedBuffer) -> Vec<serde_json::Value> {
    buf.lines()
        .iter()
        .map(|line| {
            let mut value: serde_json::Value = serde_json::from_str(line).unwrap();
            value.as_object_mut().unwrap().remove("time");
            value
        })
        .collect()
}
