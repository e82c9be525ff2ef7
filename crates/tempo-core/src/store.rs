//! The persistence collaborator interface.
//!
//! Handlers that track accumulated focus time talk to a [`RecordStore`].
//! The engine itself persists nothing; the trait is the boundary, and
//! [`MemoryStore`] is the process-memory reference implementation used by
//! the demo bot and tests. Database-backed implementations live with the
//! host.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Per-user accumulated study record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Platform id of the user.
    pub user_id: String,
    /// Total accumulated focus time, in seconds.
    pub focus_seconds: u64,
    /// Number of focus sessions completed.
    pub sessions_completed: u64,
}

impl UserRecord {
    /// Creates an empty record for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

/// Additive change applied to a [`UserRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordDelta {
    /// Focus seconds to add.
    pub focus_seconds: u64,
    /// Completed sessions to add.
    pub sessions_completed: u64,
}

/// Storage surface for per-user study records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches a user's record, or `None` if the user has none yet.
    async fn fetch_record(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;

    /// Creates a fresh record. Fails with [`StoreError::AlreadyExists`] if
    /// one is present.
    async fn create_record(&self, record: UserRecord) -> StoreResult<()>;

    /// Applies a delta to an existing record. Fails with
    /// [`StoreError::NotFound`] if the user has no record.
    async fn update_record(&self, user_id: &str, delta: RecordDelta) -> StoreResult<UserRecord>;
}

/// In-memory [`RecordStore`] for demos and tests.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store has no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_record(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.records.read().get(user_id).cloned())
    }

    async fn create_record(&self, record: UserRecord) -> StoreResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.user_id) {
            return Err(StoreError::AlreadyExists(record.user_id));
        }
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn update_record(&self, user_id: &str, delta: RecordDelta) -> StoreResult<UserRecord> {
        let mut records = self.records.write();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        record.focus_seconds += delta.focus_seconds;
        record.sessions_completed += delta.sessions_completed;
        Ok(record.clone())
    }
}
