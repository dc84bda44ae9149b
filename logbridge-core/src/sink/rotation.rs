//! Size-based file rotation with age and count retention
//!
//! The active file is opened lazily on the first write. When a write would
//! push it past the size limit, it is renamed to
//! `<stem>-<local time>.<ext>` and a fresh file takes its place; backups
//! beyond the age or count limits are then removed. Rotations within the
//! same millisecond get a `_<n>` counter after the timestamp.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Timestamp layout embedded in backup file names.
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

const MEGABYTE: u64 = 1024 * 1024;
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Resolved rotation parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Active log file
    pub path: PathBuf,
    /// Rotate before the active file exceeds this many bytes
    pub max_size_bytes: u64,
    /// Remove backups older than this many days (0 keeps all)
    pub max_age_days: u32,
    /// Keep at most this many backups (0 keeps all)
    pub max_backups: u32,
}

impl RotationPolicy {
    pub fn new(path: impl Into<PathBuf>, max_size_mb: u64, max_age_days: u32, max_backups: u32) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: max_size_mb.saturating_mul(MEGABYTE),
            max_age_days,
            max_backups,
        }
    }

    /// Size limit in whole megabytes.
    pub fn max_size_mb(&self) -> u64 {
        self.max_size_bytes / MEGABYTE
    }
}

/// Thread-safe rotating file writer
#[derive(Debug)]
pub struct RotatingWriter {
    policy: RotationPolicy,
    state: Mutex<WriterState>,
}

#[derive(Debug, Default)]
struct WriterState {
    file: Option<File>,
    size: u64,
}

impl RotatingWriter {
    /// Create a writer; nothing touches the file system until the first write.
    pub fn new(policy: RotationPolicy) -> Self {
        Self { policy, state: Mutex::new(WriterState::default()) }
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Append one line, rotating first when it would not fit.
    pub fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_writer(&mut state)?;

        let incoming = data.len() as u64 + 1;
        if state.size > 0 && state.size + incoming > self.policy.max_size_bytes {
            self.rotate(&mut state)?;
        }

        let mut framed = Vec::with_capacity(data.len() + 1);
        framed.extend_from_slice(data);
        framed.push(b'\n');

        if let Some(file) = state.file.as_mut() {
            file.write_all(&framed)?;
            state.size += incoming;
        }
        Ok(())
    }

    /// Flush and release the file handle. A later write reopens it.
    pub fn close(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut file) = state.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        state.size = 0;
        Ok(())
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).file.is_some()
    }

    fn ensure_writer(&self, state: &mut WriterState) -> anyhow::Result<()> {
        if state.file.is_none() {
            if let Some(parent) = self.policy.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(&self.policy.path)?;
            state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
        }
        Ok(())
    }

    fn rotate(&self, state: &mut WriterState) -> anyhow::Result<()> {
        if let Some(mut file) = state.file.take() {
            file.flush()?;
        }

        let rotated_path = self.generate_rotated_filename();
        if self.policy.path.exists() {
            fs::rename(&self.policy.path, &rotated_path)?;
        }

        self.cleanup_old_files();

        state.size = 0;
        self.ensure_writer(state)
    }

    fn generate_rotated_filename(&self) -> PathBuf {
        let (parent, stem, extension) = split_path(&self.policy.path);
        let timestamp = Local::now().format(BACKUP_TIME_FORMAT).to_string();

        let mut candidate = parent.join(format!("{stem}-{timestamp}.{extension}"));
        let mut counter = 1u32;
        while candidate.exists() {
            candidate = parent.join(format!("{stem}-{timestamp}_{counter}.{extension}"));
            counter += 1;
        }
        candidate
    }

    /// Backups next to the active file, newest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        let (parent, stem, extension) = split_path(&self.policy.path);
        let prefix = format!("{stem}-");
        let suffix = format!(".{extension}");

        let mut found: Vec<(PathBuf, (NaiveDateTime, u32))> = Vec::new();
        if let Ok(entries) = fs::read_dir(&parent) {
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
                let Some(middle) =
                    name.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(&suffix))
                else {
                    continue;
                };
                if let Some(order) = parse_backup_stamp(middle) {
                    found.push((path, order));
                }
            }
        }

        found.sort_by(|a, b| b.1.cmp(&a.1));
        found.into_iter().map(|(path, _)| path).collect()
    }

    fn cleanup_old_files(&self) {
        let backups = self.backups();
        let cutoff = SystemTime::now().checked_sub(DAY * self.policy.max_age_days);

        for (idx, path) in backups.iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && idx >= self.policy.max_backups as usize;
            let too_old = self.policy.max_age_days > 0
                && match (cutoff, fs::metadata(path).and_then(|m| m.modified())) {
                    (Some(cutoff), Ok(modified)) => modified < cutoff,
                    _ => false,
                };
            if over_count || too_old {
                if let Err(err) = fs::remove_file(path) {
                    log::warn!(
                        target: "logbridge::sink",
                        "failed to remove old log file {}: {}",
                        path.display(),
                        err
                    );
                }
            }
        }
    }
}

/// `<timestamp>` or `<timestamp>_<n>` from a backup name.
fn parse_backup_stamp(stamp: &str) -> Option<(NaiveDateTime, u32)> {
    let (ts, counter) = match stamp.split_once('_') {
        Some((ts, n)) => (ts, n.parse().ok()?),
        None => (stamp, 0),
    };
    let ts = NaiveDateTime::parse_from_str(ts, BACKUP_TIME_FORMAT).ok()?;
    Some((ts, counter))
}

fn split_path(path: &Path) -> (PathBuf, String, String) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("app").to_string();
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("log").to_string();
    (parent, stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tiny_policy(dir: &Path, max_backups: u32) -> RotationPolicy {
        RotationPolicy {
            path: dir.join("test.log"),
            max_size_bytes: 64,
            max_age_days: 0,
            max_backups,
        }
    }

    #[test]
    fn test_lazy_open() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RotatingWriter::new(tiny_policy(temp_dir.path(), 3));
        assert!(!writer.is_open());
        assert!(!temp_dir.path().join("test.log").exists());
    }

    #[test]
    fn test_size_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RotatingWriter::new(tiny_policy(temp_dir.path(), 0));

        for i in 0..3 {
            let data = format!("This is log entry {} with enough text to trigger rotation", i);
            writer.write(data.as_bytes()).unwrap();
        }
        writer.close().unwrap();

        assert!(!writer.backups().is_empty(), "Should have rotated at least once");
        let active = fs::read_to_string(temp_dir.path().join("test.log")).unwrap();
        assert_eq!(active.lines().count(), 1);
    }

    #[test]
    fn test_max_backups_retention() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RotatingWriter::new(tiny_policy(temp_dir.path(), 2));

        for i in 0..6 {
            let data = format!("entry {} padded out to overflow the tiny limit......", i);
            writer.write(data.as_bytes()).unwrap();
        }
        writer.close().unwrap();

        assert!(writer.backups().len() <= 2, "found {:?}", writer.backups());
    }

    #[test]
    fn test_rapid_rotation_keeps_every_line() {
        let temp_dir = TempDir::new().unwrap();
        let writer = RotatingWriter::new(tiny_policy(temp_dir.path(), 0));

        for i in 0..50 {
            let data = format!("burst line {:02} long enough to fill the whole file", i);
            writer.write(data.as_bytes()).unwrap();
        }
        writer.close().unwrap();

        let backups = writer.backups();
        assert_eq!(backups.len(), 49);

        let mut lines: Vec<String> = Vec::new();
        for path in backups.iter().rev().chain([&temp_dir.path().join("test.log")]) {
            lines.extend(fs::read_to_string(path).unwrap().lines().map(str::to_string));
        }
        let expected: Vec<String> = (0..50)
            .map(|i| format!("burst line {:02} long enough to fill the whole file", i))
            .collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_backup_stamp_with_counter_sorts_after_plain() {
        let plain = parse_backup_stamp("2024-01-15T10-30-00.123").unwrap();
        let second = parse_backup_stamp("2024-01-15T10-30-00.123_1").unwrap();
        let third = parse_backup_stamp("2024-01-15T10-30-00.123_2").unwrap();
        assert!(plain < second && second < third);
        assert!(parse_backup_stamp("2024-01-15T10-30-00.123_x").is_none());
    }

    #[test]
    fn test_close_then_write_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let policy = RotationPolicy::new(temp_dir.path().join("nested/app.log"), 1, 0, 0);
        let writer = RotatingWriter::new(policy);

        writer.write(b"one").unwrap();
        writer.close().unwrap();
        assert!(!writer.is_open());
        writer.write(b"two").unwrap();
        writer.close().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("nested/app.log")).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[test]
    fn test_policy_megabytes() {
        let policy = RotationPolicy::new("./logs/app.log", 150, 28, 7);
        assert_eq!(policy.max_size_bytes, 150 * 1024 * 1024);
        assert_eq!(policy.max_size_mb(), 150);
    }
}
