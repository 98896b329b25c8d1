use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::EntityKind;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },
    #[error("user {actor} is not allowed to act on {entity} {id}")]
    Unauthorized {
        actor: u64,
        entity: EntityKind,
        id: u64,
    },
    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidState {
        entity: EntityKind,
        id: u64,
        from: &'static str,
        to: &'static str,
    },
    #[error("user {user_id} has {available} available, {requested} requested")]
    InsufficientBalance {
        user_id: u64,
        requested: Decimal,
        available: Decimal,
    },
    #[error("developer {developer_id} already applied to job {job_id}")]
    DuplicateProposal { job_id: u64, developer_id: u64 },
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("{entity} {id} has already been processed")]
    AlreadyProcessed { entity: EntityKind, id: u64 },
    #[error("job {0} is not open for proposals")]
    JobNotOpen(u64),
    #[error("client cannot apply to their own job {0}")]
    SelfApplication(u64),
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: EntityKind, id: u64 },
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
