//! Persistent interaction log
//!
//! The log is an ordered map from a millisecond timestamp key to an
//! [`InteractionRecord`], mirrored to a pretty-printed JSON file on every
//! append. A single [`MemoryLog`] actor owns the map; the rest of the
//! process talks to it through a cloneable [`MemoryHandle`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use kameo::actor::{ActorRef, Spawn};
use kameo::error::SendError;
use kameo::message::{Context, Message};
use kameo::{Actor, Reply};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::MemoryError;

/// Entry identifier: Unix time in milliseconds, strictly increasing within a log
pub type EntryKey = u64;

/// One delegated exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub user_message: String,
    #[serde(default)]
    pub on_chain_request: String,
    #[serde(default)]
    pub on_chain_response: String,
}

impl InteractionRecord {
    pub fn new(
        user_message: impl Into<String>,
        on_chain_request: impl Into<String>,
        on_chain_response: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            on_chain_request: on_chain_request.into(),
            on_chain_response: on_chain_response.into(),
        }
    }
}

/// The part of the log embedded into completion prompts
#[derive(Debug, Clone, Default, Serialize, Reply)]
#[serde(transparent)]
pub struct MemorySnapshot {
    entries: BTreeMap<EntryKey, InteractionRecord>,
}

impl MemorySnapshot {
    pub fn entries(&self) -> &BTreeMap<EntryKey, InteractionRecord> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON, as embedded in the system prompt
    pub fn to_json(&self) -> String {
        // A map of plain strings always serializes.
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }
}

/// In-process owner of the interaction log and its state file
#[derive(Actor)]
pub struct MemoryLog {
    path: PathBuf,
    entries: BTreeMap<EntryKey, InteractionRecord>,
    context_window: Option<usize>,
}

impl MemoryLog {
    /// Read the state file, starting empty when it does not exist.
    ///
    /// A file that exists but does not parse is reported as
    /// [`MemoryError::Corrupt`] and left untouched.
    pub async fn load(
        path: impl Into<PathBuf>,
        context_window: Option<usize>,
    ) -> Result<Self, MemoryError> {
        let path = path.into();

        let entries = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| MemoryError::Corrupt {
                    path: path.display().to_string(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::info!("Loaded {} memory entries from {}", entries.len(), path.display());

        Ok(Self { path, entries, context_window })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<EntryKey, InteractionRecord> {
        &self.entries
    }

    fn next_key(&self) -> EntryKey {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        match self.entries.last_key_value() {
            Some((&last, _)) if now <= last => last + 1,
            _ => now,
        }
    }

    /// Insert `record` under a fresh key and rewrite the state file.
    pub async fn append(&mut self, record: InteractionRecord) -> Result<EntryKey, MemoryError> {
        let key = self.next_key();
        self.entries.insert(key, record);
        self.persist().await?;
        tracing::debug!("Appended memory entry {}", key);
        Ok(key)
    }

    /// The most recent `context_window` records, or all of them when unbounded
    pub fn snapshot(&self) -> MemorySnapshot {
        let skip = match self.context_window {
            Some(window) => self.entries.len().saturating_sub(window),
            None => 0,
        };
        MemorySnapshot {
            entries: self.entries.iter().skip(skip).map(|(k, v)| (*k, v.clone())).collect(),
        }
    }

    /// Rewrite the whole state file from memory
    pub async fn persist(&self) -> Result<(), MemoryError> {
        let content = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write = async {
            fs::write(&tmp, content).await?;
            fs::rename(&tmp, &self.path).await
        };
        write.await.map_err(|source| MemoryError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Append a record; replies with its key
#[derive(Debug)]
pub struct Append(pub InteractionRecord);

/// Request the bounded snapshot
#[derive(Debug)]
pub struct Snapshot;

/// Request the total number of records
#[derive(Debug)]
pub struct Len;

impl Message<Append> for MemoryLog {
    type Reply = Result<EntryKey, MemoryError>;

    async fn handle(&mut self, msg: Append, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.append(msg.0).await
    }
}

impl Message<Snapshot> for MemoryLog {
    type Reply = MemorySnapshot;

    async fn handle(&mut self, _msg: Snapshot, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.snapshot()
    }
}

impl Message<Len> for MemoryLog {
    type Reply = usize;

    async fn handle(&mut self, _msg: Len, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.len()
    }
}

/// Cloneable handle to the running [`MemoryLog`] actor
#[derive(Clone)]
pub struct MemoryHandle {
    actor: ActorRef<MemoryLog>,
}

impl MemoryHandle {
    /// Spawn the log on the current runtime
    pub fn spawn(log: MemoryLog) -> Self {
        Self { actor: MemoryLog::spawn(log) }
    }

    pub async fn append(&self, record: InteractionRecord) -> Result<EntryKey, MemoryError> {
        match self.actor.ask(Append(record)).await {
            Ok(key) => Ok(key),
            Err(SendError::HandlerError(e)) => Err(e),
            Err(_) => Err(MemoryError::Unavailable),
        }
    }

    pub async fn snapshot(&self) -> Result<MemorySnapshot, MemoryError> {
        self.actor.ask(Snapshot).await.map_err(|_| MemoryError::Unavailable)
    }

    pub async fn len(&self) -> Result<usize, MemoryError> {
        self.actor.ask(Len).await.map_err(|_| MemoryError::Unavailable)
    }
}
