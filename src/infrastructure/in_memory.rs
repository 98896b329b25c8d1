use crate::domain::EntityKind;
use crate::domain::ports::Store;
use crate::domain::record::{ChangeSet, Record};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    rows: HashMap<EntityKind, BTreeMap<u64, Record>>,
    sequences: HashMap<EntityKind, u64>,
}

/// A thread-safe in-memory store for every engine table.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access. A commit takes the
/// write lock once for the whole change set, so readers see either all of an
/// operation's writes or none of them.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load(&self, kind: EntityKind, id: u64) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.rows.get(&kind).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn scan(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(&kind)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn next_id(&self, kind: EntityKind) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let sequence = tables.sequences.entry(kind).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;

        changes.verify_guards(|kind, id| {
            Ok(tables.rows.get(&kind).and_then(|rows| rows.get(&id)).cloned())
        })?;

        for record in changes.records {
            let (kind, id) = record.key();
            tables.rows.entry(kind).or_default().insert(id, record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Entity, RowGuard};
    use crate::domain::user::{User, UserRole};
    use crate::error::EngineError;
    use chrono::Utc;

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryStore::new();
        let user = User::new(1, "ana", UserRole::Client, Utc::now());

        store
            .commit(ChangeSet {
                records: vec![user.clone().into()],
                guards: vec![],
            })
            .await
            .unwrap();

        let retrieved = store.load(EntityKind::User, 1).await.unwrap().unwrap();
        assert_eq!(User::decode(retrieved).unwrap(), user);
        assert!(store.load(EntityKind::User, 2).await.unwrap().is_none());
        assert!(store.scan(EntityKind::Job).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequences_are_per_table() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_id(EntityKind::User).await.unwrap(), 1);
        assert_eq!(store.next_id(EntityKind::User).await.unwrap(), 2);
        assert_eq!(store.next_id(EntityKind::Job).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_guard_rejects_whole_change_set() {
        let store = InMemoryStore::new();
        let user = User::new(1, "ana", UserRole::Client, Utc::now());
        store
            .commit(ChangeSet {
                records: vec![user.clone().into()],
                guards: vec![],
            })
            .await
            .unwrap();

        let mut stale = user.clone();
        stale.name = "ana maria".to_string();
        let other = User::new(2, "bo", UserRole::Developer, Utc::now());
        let result = store
            .commit(ChangeSet {
                records: vec![other.into(), user.clone().into()],
                guards: vec![RowGuard {
                    kind: EntityKind::User,
                    id: 1,
                    expected: Some(stale.into()),
                }],
            })
            .await;

        assert!(matches!(result, Err(EngineError::Conflict { id: 1, .. })));
        assert!(store.load(EntityKind::User, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_tables() {
        let store = InMemoryStore::new();
        let other = store.clone();
        let user = User::new(1, "ana", UserRole::Client, Utc::now());
        other
            .commit(ChangeSet {
                records: vec![user.into()],
                guards: vec![RowGuard {
                    kind: EntityKind::User,
                    id: 1,
                    expected: None,
                }],
            })
            .await
            .unwrap();

        assert!(store.load(EntityKind::User, 1).await.unwrap().is_some());
        assert_eq!(other.next_id(EntityKind::User).await.unwrap(), 1);
        assert_eq!(store.next_id(EntityKind::User).await.unwrap(), 2);
    }
}
