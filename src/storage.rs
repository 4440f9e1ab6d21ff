//! Represents the log and configuration-registry traits the core consumes,
//! and in-memory implementations of both.
//!
//! Durable storage is a key integration point; custom implementations of
//! these traits are expected. The in-memory versions here back the test
//! suites and small deployments.

// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Result, StorageError};
use crate::types::{Entry, Membership};

/// An append-only log of entries.
///
/// If any method returns an error, the surrounding node must consider the
/// log inoperable and step out of its current role; the application is
/// responsible for cleanup and recovery.
pub trait Log {
    /// The index of the last entry, or 0 for an empty log.
    fn last_index(&self) -> Result<u64>;

    /// Fetches the entry at `index`.
    fn entry(&self, index: u64) -> Result<Entry>;

    /// Appends entries to the log. Entries must continue the log without
    /// gaps.
    fn append(&self, entries: Vec<Entry>) -> Result<()>;
}

/// A registry of the configurations in force across the log.
///
/// `push_config(first_index, conf)` records that `conf` governs the log from
/// `first_index` onward. Pushes arrive in log order.
pub trait ConfigManager {
    /// Records `conf` as in force from `first_index` onward.
    fn push_config(&self, first_index: u64, conf: Membership) -> Result<()>;

    /// The most recently pushed configuration.
    fn last_config(&self) -> Result<Membership>;
}

#[derive(Default)]
struct MemLogCore {
    entries: Vec<Entry>,
}

/// `MemLog` is a thread-safe in-memory implementation of [`Log`].
///
/// Cloned handles share the same backing store.
#[derive(Clone, Default)]
pub struct MemLog {
    core: Arc<RwLock<MemLogCore>>,
}

impl MemLog {
    /// Creates an empty log.
    pub fn new() -> MemLog {
        MemLog::default()
    }

    fn rl(&self) -> RwLockReadGuard<'_, MemLogCore> {
        self.core.read().unwrap()
    }

    fn wl(&self) -> RwLockWriteGuard<'_, MemLogCore> {
        self.core.write().unwrap()
    }
}

impl Log for MemLog {
    fn last_index(&self) -> Result<u64> {
        Ok(self.rl().entries.last().map_or(0, |e| e.index))
    }

    fn entry(&self, index: u64) -> Result<Entry> {
        let core = self.rl();
        let first = match core.entries.first() {
            Some(e) => e.index,
            None => return Err(StorageError::Unavailable.into()),
        };
        if index < first || index > core.entries.last().map_or(0, |e| e.index) {
            return Err(StorageError::Unavailable.into());
        }
        Ok(core.entries[(index - first) as usize].clone())
    }

    fn append(&self, entries: Vec<Entry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut core = self.wl();
        let mut expected = match core.entries.last() {
            Some(e) => e.index + 1,
            None => entries[0].index,
        };
        for e in &entries {
            if e.index != expected {
                return Err(StorageError::Other(
                    format!("non-contiguous append at index {}, expected {}", e.index, expected)
                        .into(),
                )
                .into());
            }
            expected += 1;
        }
        core.entries.extend(entries);
        Ok(())
    }
}

#[derive(Default)]
struct MemConfigManagerCore {
    configs: Vec<(u64, Membership)>,
}

/// `MemConfigManager` is a thread-safe in-memory implementation of
/// [`ConfigManager`].
///
/// Cloned handles share the same backing store.
#[derive(Clone, Default)]
pub struct MemConfigManager {
    core: Arc<RwLock<MemConfigManagerCore>>,
}

impl MemConfigManager {
    /// Creates an empty registry.
    pub fn new() -> MemConfigManager {
        MemConfigManager::default()
    }

    /// Creates a registry seeded with `conf` in force from index 1.
    pub fn with_config(conf: Membership) -> MemConfigManager {
        let manager = MemConfigManager::default();
        manager.core.write().unwrap().configs.push((1, conf));
        manager
    }

    /// The configuration in force at `index`, if any push covers it.
    pub fn config_at(&self, index: u64) -> Option<Membership> {
        let core = self.core.read().unwrap();
        core.configs
            .iter()
            .rev()
            .find(|(first, _)| *first <= index)
            .map(|(_, conf)| conf.clone())
    }
}

impl ConfigManager for MemConfigManager {
    fn push_config(&self, first_index: u64, conf: Membership) -> Result<()> {
        let mut core = self.core.write().unwrap();
        if let Some(&(last, _)) = core.configs.last() {
            if first_index < last {
                return Err(StorageError::Other(
                    format!(
                        "config pushed at index {}, behind the latest push at {}",
                        first_index, last
                    )
                    .into(),
                )
                .into());
            }
        }
        core.configs.push((first_index, conf));
        Ok(())
    }

    fn last_config(&self) -> Result<Membership> {
        let core = self.core.read().unwrap();
        match core.configs.last() {
            Some((_, conf)) => Ok(conf.clone()),
            None => Err(StorageError::Unavailable.into()),
        }
    }
}
