use crate::domain::notification::Notification;
use crate::domain::ports::Store;
use crate::domain::EntityKind;
use crate::domain::record::{ChangeSet, Entity, Record, RowGuard};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// One consistency scope: the staged writes of a single engine operation.
///
/// Reads go to the staged copy first and fall through to the store, so an
/// operation always sees its own writes. Nothing reaches the store until
/// [`Scope::commit`], which hands every staged record to the store as one
/// change set, guarded by the first value this scope saw for each of them.
/// Dropping a scope discards it.
pub struct Scope<'a> {
    store: &'a dyn Store,
    now: DateTime<Utc>,
    staged: BTreeMap<(EntityKind, u64), Record>,
    observed: Mutex<BTreeMap<(EntityKind, u64), Option<Record>>>,
    outbox: Vec<Notification>,
}

impl<'a> Scope<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            now: Utc::now(),
            staged: BTreeMap::new(),
            observed: Mutex::new(BTreeMap::new()),
            outbox: Vec::new(),
        }
    }

    /// The timestamp shared by every write in this scope.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub async fn find<E: Entity>(&self, id: u64) -> Result<Option<E>> {
        if let Some(record) = self.staged.get(&(E::KIND, id)) {
            return E::decode(record.clone()).map(Some);
        }
        let stored = self.store.load(E::KIND, id).await?;
        self.observed
            .lock()
            .await
            .entry((E::KIND, id))
            .or_insert_with(|| stored.clone());
        stored.map(E::decode).transpose()
    }

    pub async fn fetch<E: Entity>(&self, id: u64) -> Result<E> {
        self.find(id)
            .await?
            .ok_or(EngineError::NotFound { entity: E::KIND, id })
    }

    /// Every entity of type `E` matching `filter`, staged versions included,
    /// ordered by id.
    pub async fn select<E, F>(&self, filter: F) -> Result<Vec<E>>
    where
        E: Entity,
        F: Fn(&E) -> bool,
    {
        let mut merged: BTreeMap<u64, Record> = self
            .store
            .scan(E::KIND)
            .await?
            .into_iter()
            .map(|record| (record.id(), record))
            .collect();
        {
            let mut observed = self.observed.lock().await;
            for (id, record) in &merged {
                observed
                    .entry((E::KIND, *id))
                    .or_insert_with(|| Some(record.clone()));
            }
        }
        for ((kind, id), record) in &self.staged {
            if *kind == E::KIND {
                merged.insert(*id, record.clone());
            }
        }

        let mut selected = Vec::new();
        for record in merged.into_values() {
            let entity = E::decode(record)?;
            if filter(&entity) {
                selected.push(entity);
            }
        }
        Ok(selected)
    }

    pub async fn allocate<E: Entity>(&self) -> Result<u64> {
        self.store.next_id(E::KIND).await
    }

    pub fn stage<E: Entity>(&mut self, entity: E) {
        self.staged.insert((E::KIND, entity.id()), entity.into());
    }

    pub fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    /// Applies every staged write atomically and returns the notifications
    /// to emit now that the scope is durable.
    pub async fn commit(self) -> Result<Vec<Notification>> {
        if self.staged.is_empty() {
            return Ok(self.outbox);
        }

        let observed = self.observed.into_inner();
        let guards = self
            .staged
            .keys()
            .map(|&(kind, id)| RowGuard {
                kind,
                id,
                expected: observed.get(&(kind, id)).cloned().flatten(),
            })
            .collect();
        let changes = ChangeSet {
            records: self.staged.into_values().collect(),
            guards,
        };
        self.store.commit(changes).await?;
        Ok(self.outbox)
    }
}
