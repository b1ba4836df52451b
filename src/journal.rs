//! Account event journal
//!
//! Every significant event becomes one append-only line tagged with the account
//! and a wall-clock timestamp. Lines are mirrored to the `log` facade and handed
//! to a `LogSink`, which by default appends to `{dir}/account_{n}.log`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use log::Level;

/// Which journal a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountTag {
    /// Process-wide records that belong to no account
    System,
    /// Zero-based account index; rendered 1-based
    Account(usize),
}

impl AccountTag {
    pub fn file_name(&self) -> String {
        format!("{}.log", self)
    }
}

impl fmt::Display for AccountTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountTag::System => f.write_str("system"),
            AccountTag::Account(index) => write!(f, "account_{}", index + 1),
        }
    }
}

/// What produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Lifecycle,
    Profile,
    TaskList,
    Claim,
    Cycle,
}

impl EventKind {
    /// Profile, task list and claim records each stand for exactly one remote call
    pub fn is_call(&self) -> bool {
        matches!(self, EventKind::Profile | EventKind::TaskList | EventKind::Claim)
    }
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub tag: AccountTag,
    pub kind: EventKind,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.tag,
            self.message
        )
    }
}

/// Destination for journal records. Writers never fail the caller.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

/// Appends each record to a per-tag file under `dir`; each file is opened once
pub struct FileSink {
    dir: PathBuf,
    files: Mutex<HashMap<AccountTag, File>>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tag: AccountTag) -> PathBuf {
        self.dir.join(tag.file_name())
    }

    fn append(&self, record: &LogRecord) -> std::io::Result<()> {
        let mut files = self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = match files.entry(record.tag) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.path_for(record.tag))?,
            ),
        };
        writeln!(file, "{}", record)
    }
}

impl LogSink for FileSink {
    fn write(&self, record: &LogRecord) {
        if let Err(e) = self.append(record) {
            log::warn!("Failed to append to {}: {}", self.path_for(record.tag).display(), e);
        }
    }
}

/// Drops records; the `log` mirror is still written
pub struct NullSink;

impl LogSink for NullSink {
    fn write(&self, _record: &LogRecord) {}
}

/// Keeps records in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn records_for(&self, tag: AccountTag) -> Vec<LogRecord> {
        self.records().into_iter().filter(|r| r.tag == tag).collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
    }
}

/// Journal handle bound to one tag
#[derive(Clone)]
pub struct AccountLog {
    tag: AccountTag,
    sink: Arc<dyn LogSink>,
}

impl AccountLog {
    pub fn new(tag: AccountTag, sink: Arc<dyn LogSink>) -> Self {
        Self { tag, sink }
    }

    pub fn system(sink: Arc<dyn LogSink>) -> Self {
        Self::new(AccountTag::System, sink)
    }

    pub fn tag(&self) -> AccountTag {
        self.tag
    }

    /// Same sink, different tag
    pub fn for_tag(&self, tag: AccountTag) -> Self {
        Self::new(tag, Arc::clone(&self.sink))
    }

    pub fn record(&self, kind: EventKind, level: Level, message: impl Into<String>) {
        let record = LogRecord {
            timestamp: Utc::now(),
            tag: self.tag,
            kind,
            level,
            message: single_line(message.into()),
        };
        log::log!(level, "[{}] {}", record.tag, record.message);
        self.sink.write(&record);
    }

    pub fn info(&self, kind: EventKind, message: impl Into<String>) {
        self.record(kind, Level::Info, message);
    }

    pub fn warn(&self, kind: EventKind, message: impl Into<String>) {
        self.record(kind, Level::Warn, message);
    }

    pub fn error(&self, kind: EventKind, message: impl Into<String>) {
        self.record(kind, Level::Error, message);
    }
}

/// Records are one physical line each; embedded line breaks become spaces
fn single_line(message: String) -> String {
    if message.contains(['\n', '\r']) {
        message.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        message
    }
}
