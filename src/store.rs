//! In-memory record store with optimistic concurrency control.
//!
//! Every operation runs under one store-wide mutex, so a read-check-mutate-write
//! cycle in [`VersionedStore::update`] is atomic with respect to other callers.
//! Records are handed out by value: readers never hold a reference into the map.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;

/// Opaque optimistic-lock token, regenerated on every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(Uuid);

impl Version {
    pub fn new() -> Self {
        Version(Uuid::new_v4())
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A value that can live in a [`VersionedStore`].
pub trait Record: Clone {
    type Id: Clone + Eq + Hash + fmt::Display;

    fn id(&self) -> &Self::Id;

    fn version(&self) -> Version;

    /// Mark the record as a new generation.
    fn stamp(&mut self, version: Version, at: DateTime<Utc>);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {id}")]
    NotFound { id: String },

    #[error("version mismatch for {id}: stored {actual}, expected {expected}")]
    VersionMismatch {
        id: String,
        expected: Version,
        actual: Version,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::VersionMismatch { .. } => ErrorKind::VersionMismatch,
        }
    }
}

/// Mutex-guarded map of records keyed by id.
pub struct VersionedStore<R: Record> {
    records: Mutex<HashMap<R::Id, R>>,
}

impl<R: Record> VersionedStore<R> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Insert `record` unless its id is taken; either way return what is stored.
    ///
    /// First writer wins: on a race the caller's record is discarded.
    pub fn create_or_get(&self, record: R) -> R {
        let mut records = self.lock();
        records
            .entry(record.id().clone())
            .or_insert(record)
            .clone()
    }

    pub fn get(&self, id: &R::Id) -> Result<R, StoreError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Snapshot of every record matching `predicate` at the time of the call.
    pub fn list(&self, predicate: impl Fn(&R) -> bool) -> Vec<R> {
        self.lock()
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Compare-and-swap update.
    ///
    /// `mutate` works on a copy; the stored record is replaced only if the
    /// stored version equals `expected` and `mutate` succeeds. The new record
    /// gets a fresh version and timestamp. `mutate` runs with the lock held and
    /// must not call back into this store.
    pub fn update<F, E>(&self, id: &R::Id, expected: Version, mutate: F) -> Result<R, E>
    where
        F: FnOnce(&mut R) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut records = self.lock();
        let stored = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if stored.version() != expected {
            return Err(StoreError::VersionMismatch {
                id: id.to_string(),
                expected,
                actual: stored.version(),
            }
            .into());
        }

        let mut working = stored.clone();
        mutate(&mut working)?;
        working.stamp(Version::new(), Utc::now());
        records.insert(id.clone(), working.clone());
        Ok(working)
    }

    // Records are only ever inserted fully built, so a panic in another
    // holder cannot leave a torn value behind.
    fn lock(&self) -> MutexGuard<'_, HashMap<R::Id, R>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Record> Default for VersionedStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
