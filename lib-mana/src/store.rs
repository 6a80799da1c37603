//! Ledger persistence
//!
//! The system state is stored as one bincode record. Implementations of
//! [`StateStore`] take `&self` and use interior mutability, so a store can
//! be shared between a running system and a restore path.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::errors::{ManaError, ManaResult};
use crate::events::EventSink;
use crate::system::{ManaState, ManaSystem};

/// Storage key of the encoded system state
pub const STATE_KEY: &[u8] = b"mana:state:v1";

/// Key-value storage interface
pub trait StateStore {
    /// Get value from storage
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Set value in storage
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete value from storage
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Check if key exists in storage
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory storage; clones share the same map
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self.data.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut data = self.data.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        data.remove(key);
        Ok(())
    }
}

/// One file per key under a directory; file names are the hex-encoded keys
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create store directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        self.root.join(hex::encode(key))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        // Readers never observe a partially written record
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to commit {}", path.display()))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        Ok(())
    }
}

impl ManaSystem {
    /// Persist the committed state of both ledgers
    pub fn save(&self, store: &dyn StateStore) -> ManaResult<()> {
        let encoded =
            bincode::serialize(self.state()).map_err(|e| ManaError::Storage(e.to_string()))?;
        store.set(STATE_KEY, &encoded)?;
        info!(bytes = encoded.len(), "MANA state saved");
        Ok(())
    }

    /// Rebuild a system from a previously saved state
    pub fn restore(store: &dyn StateStore, sink: Box<dyn EventSink>) -> ManaResult<Self> {
        let encoded = store
            .get(STATE_KEY)?
            .ok_or_else(|| ManaError::Storage("no saved MANA state".to_string()))?;
        let state: ManaState =
            bincode::deserialize(&encoded).map_err(|e| ManaError::Storage(e.to_string()))?;

        let system = ManaSystem::from_state(state, sink);
        if let Err(violations) = system.check_invariants() {
            return Err(ManaError::Storage(format!(
                "restored state violates {} invariant(s): {}",
                violations.len(),
                violations[0]
            )));
        }
        info!(mana = %system.mana().address(), "MANA state restored");
        Ok(system)
    }
}
