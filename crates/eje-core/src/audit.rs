//! audit.rs
//! Append-only, tamper-evident audit log contract (spec §4.8) plus a
//! hash-chained JSONL implementation in the teacher's `append_jsonl` idiom.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{EjeError, EjeResult};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub request_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditReceipt {
    pub event_id: String,
    pub sequence: u64,
    pub entry_hash: String,
    pub chain_hash: String,
}

/// `WriteSigned(event) → receipt` (spec §4.8). Implementations choose the
/// tamper-evidence mechanism; the core depends only on this append operation.
pub trait AuditLog: Send + Sync {
    fn write_signed(&self, event: AuditEvent) -> EjeResult<AuditReceipt>;
}

/// Hash-chained JSONL writer: each line embeds the SHA-256 of the previous
/// line's chain hash, so editing any past entry breaks every receipt after
/// it. Grounded on the teacher's `append_jsonl` helper, extended with the
/// chain field.
pub struct HashChainAuditLog {
    path: PathBuf,
    state: Mutex<ChainState>,
}

#[derive(Default)]
struct ChainState {
    sequence: u64,
    last_chain_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChainedEntry {
    sequence: u64,
    event: AuditEvent,
    prev_chain_hash: String,
    entry_hash: String,
    chain_hash: String,
}

impl HashChainAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: Mutex::new(ChainState::default()) }
    }

    fn entry_hash(event: &AuditEvent) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(event).unwrap_or_default());
        hex::encode(hasher.finalize())
    }

    fn chain_hash(prev: &str, entry_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev.as_bytes());
        hasher.update(entry_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl AuditLog for HashChainAuditLog {
    fn write_signed(&self, event: AuditEvent) -> EjeResult<AuditReceipt> {
        let mut state = self.state.lock().map_err(|_| EjeError::AuditWrite {
            event_id: event.event_id.clone(),
            message: "audit log chain state lock poisoned".to_string(),
        })?;

        let entry_hash = Self::entry_hash(&event);
        let chain_hash = Self::chain_hash(&state.last_chain_hash, &entry_hash);
        let sequence = state.sequence;

        let entry = ChainedEntry {
            sequence,
            event: event.clone(),
            prev_chain_hash: state.last_chain_hash.clone(),
            entry_hash: entry_hash.clone(),
            chain_hash: chain_hash.clone(),
        };

        append_jsonl(&self.path, &entry).map_err(|e| EjeError::AuditWrite {
            event_id: event.event_id.clone(),
            message: e,
        })?;

        state.sequence += 1;
        state.last_chain_hash = chain_hash.clone();

        Ok(AuditReceipt { event_id: event.event_id, sequence, entry_hash, chain_hash })
    }
}

fn append_jsonl<P: AsRef<Path>, S: Serialize>(path: P, val: &S) -> Result<(), String> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| e.to_string())?;
    let line = serde_json::to_string(val).map_err(|e| e.to_string())?;
    writeln!(f, "{line}").map_err(|e| e.to_string())
}

/// In-memory audit log for tests and dry runs; chains the same way but
/// never touches the filesystem.
#[derive(Default)]
pub struct InMemoryAuditLog {
    state: Mutex<(Vec<ChainedEntry>, String)>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEvent> {
        self.state.lock().unwrap().0.iter().map(|e| e.event.clone()).collect()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn write_signed(&self, event: AuditEvent) -> EjeResult<AuditReceipt> {
        let mut state = self.state.lock().map_err(|_| EjeError::AuditWrite {
            event_id: event.event_id.clone(),
            message: "in-memory audit log lock poisoned".to_string(),
        })?;
        let entry_hash = HashChainAuditLog::entry_hash(&event);
        let chain_hash = HashChainAuditLog::chain_hash(&state.1, &entry_hash);
        let sequence = state.0.len() as u64;
        state.0.push(ChainedEntry {
            sequence,
            event: event.clone(),
            prev_chain_hash: state.1.clone(),
            entry_hash: entry_hash.clone(),
            chain_hash: chain_hash.clone(),
        });
        state.1 = chain_hash.clone();
        Ok(AuditReceipt { event_id: event.event_id, sequence, entry_hash, chain_hash })
    }
}
