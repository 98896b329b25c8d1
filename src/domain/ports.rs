use super::EntityKind;
use super::notification::Notification;
use super::record::{ChangeSet, Record};
use crate::error::Result;
use async_trait::async_trait;

/// The relational store behind the engine.
///
/// `commit` must apply a change set atomically: either every guard matches the
/// stored row and every record is written, or nothing changes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self, kind: EntityKind, id: u64) -> Result<Option<Record>>;
    async fn scan(&self, kind: EntityKind) -> Result<Vec<Record>>;
    async fn next_id(&self, kind: EntityKind) -> Result<u64>;
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Delivers user-visible messages. Failures never reach the engine's caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

pub type StoreBox = Box<dyn Store>;
