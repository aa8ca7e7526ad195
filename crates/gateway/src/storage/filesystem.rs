//! File-per-record storage
//!
//! Directory structure:
//! ```text
//! root/
//!   1700000000123.9f2c4e1a7b3d5c60.json   # one message per file
//!   webhooks/
//!     wh_1700000000456.json               # one subscription per file
//! ```
//!
//! File names are the percent-encoded record id, so separators and `..`
//! segments in an id can never escape the root. Ids whose encoding would
//! pass the file-name length limit are shortened and suffixed with a SHA-256
//! of the id; the `msg_id`/`id` inside the record stays authoritative.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::traits::{
    page, require_message_id, require_webhook_id, sort_hooks_newest_first, sort_newest_first,
};
use super::{MessageStore, StoreError, StoreResult, WebhookStore};
use crate::models::{Message, MessageQuery, WebhookConfig};

const RECORD_EXTENSION: &str = "json";
const WEBHOOK_DIR: &str = "webhooks";

/// Longest encoded id used verbatim as a file stem
const MAX_PLAIN_STEM: usize = 200;

/// Encoded-id prefix kept in front of the hash for long ids
const HASHED_PREFIX: usize = 120;

/// Distinguishes concurrent temp files within this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores each record as a pretty-printed JSON file under a root directory
pub struct FileStore {
    root: PathBuf,
    closed: AtomicBool,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::io(format!("create store directory {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn webhook_dir(&self) -> PathBuf {
        self.root.join(WEBHOOK_DIR)
    }

    fn message_path(&self, id: &str) -> PathBuf {
        self.root.join(record_file_name(id))
    }

    fn webhook_path(&self, id: &str) -> PathBuf {
        self.webhook_dir().join(record_file_name(id))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::closed());
        }
        Ok(())
    }

    fn close_inner(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Filesystem-safe file name for a record id
///
/// Plain stems are at most [`MAX_PLAIN_STEM`] bytes and hashed stems are
/// longer, so the two forms never collide.
fn record_file_name(id: &str) -> String {
    let encoded = urlencoding::encode(id);
    if encoded.len() <= MAX_PLAIN_STEM {
        return format!("{}.{}", encoded, RECORD_EXTENSION);
    }

    // the encoding is pure ASCII, so any byte offset is a char boundary
    let prefix = &encoded[..HASHED_PREFIX];
    let digest = hex::encode(Sha256::digest(id.as_bytes()));
    format!("{}~{}.{}", prefix, digest, RECORD_EXTENSION)
}

/// Serialize `value` into a fresh temp file next to `path`
///
/// The temp file is removed again if writing it fails.
fn write_temp<T: Serialize>(path: &Path, value: &T) -> StoreResult<PathBuf> {
    let data = serde_json::to_vec_pretty(value)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::invalid(format!("bad record path {}", path.display())))?;
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(&data)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(temp_path)
}

/// Replace a file's contents in one step (write to temp, then rename)
fn write_whole<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let temp_path = write_temp(path, value)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Publish a complete file at `path` only if nothing is there yet
///
/// `hard_link` fails with `AlreadyExists` when the target exists, so the
/// existence check and the publish are one operation and readers never see
/// a partial file.
fn write_new<T: Serialize>(path: &Path, value: &T) -> StoreResult<bool> {
    let temp_path = write_temp(path, value)?;
    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Read and parse one record; `None` if the file does not exist
fn read_record<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse every record file in a directory, skipping anything unreadable
fn read_all<T: DeserializeOwned>(dir: &Path) -> StoreResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION)
        {
            continue;
        }
        match read_record(&path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!("[STORE] Skipping unreadable record {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

impl MessageStore for FileStore {
    fn save(&self, message: &Message) -> StoreResult<()> {
        self.ensure_open()?;
        require_message_id(message)?;
        write_whole(&self.message_path(message.id.as_str()), message)
    }

    fn get(&self, query: &MessageQuery) -> StoreResult<Vec<Message>> {
        self.ensure_open()?;

        if let Some(id) = &query.id {
            let found: Option<Message> = read_record(&self.message_path(id.as_str()))?;
            return Ok(found.into_iter().collect());
        }

        let mut messages: Vec<Message> = read_all(&self.root)?;
        sort_newest_first(&mut messages);
        Ok(page(messages, query))
    }

    fn close(&self) -> StoreResult<()> {
        self.close_inner()
    }
}

impl WebhookStore for FileStore {
    fn create(&self, hook: &WebhookConfig) -> StoreResult<()> {
        self.ensure_open()?;
        require_webhook_id(&hook.id)?;
        fs::create_dir_all(self.webhook_dir())?;

        if !write_new(&self.webhook_path(&hook.id), hook)? {
            return Err(StoreError::AlreadyExists {
                resource: format!("webhook {}", hook.id),
            });
        }
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<WebhookConfig> {
        self.ensure_open()?;
        read_record(&self.webhook_path(id))?
            .ok_or_else(|| StoreError::not_found(format!("webhook {}", id)))
    }

    fn list(&self) -> StoreResult<Vec<WebhookConfig>> {
        self.ensure_open()?;
        let mut hooks: Vec<WebhookConfig> = read_all(&self.webhook_dir())?;
        sort_hooks_newest_first(&mut hooks);
        Ok(hooks)
    }

    fn update(&self, hook: &WebhookConfig) -> StoreResult<()> {
        self.ensure_open()?;
        let path = self.webhook_path(&hook.id);
        if !path.is_file() {
            return Err(StoreError::not_found(format!("webhook {}", hook.id)));
        }
        write_whole(&path, hook)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        match fs::remove_file(self.webhook_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("webhook {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self) -> StoreResult<()> {
        self.close_inner()
    }
}
