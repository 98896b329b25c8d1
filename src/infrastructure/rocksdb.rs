use crate::domain::EntityKind;
use crate::domain::ports::Store;
use crate::domain::record::{ChangeSet, Record};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family holding the id sequence of every table.
pub const CF_META: &str = "meta";

type Sequences = HashMap<EntityKind, u64>;

/// A persistent store implementation using RocksDB.
///
/// Each entity kind lives in its own Column Family keyed by the big-endian id,
/// with `serde_json` values. A commit is a single `WriteBatch`, which RocksDB
/// applies atomically. Id sequences are handed out from memory and persisted
/// in `meta` by the same batch, so an id only becomes durable once a commit
/// writes a row of its table.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    sequences: Arc<Mutex<Sequences>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that one column family per table plus `meta` exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = EntityKind::ALL
            .iter()
            .map(|kind| ColumnFamilyDescriptor::new(kind.table_name(), Options::default()))
            .chain(std::iter::once(ColumnFamilyDescriptor::new(
                CF_META,
                Options::default(),
            )))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let mut store = Self {
            db: Arc::new(db),
            sequences: Arc::default(),
        };
        let sequences = store.read_sequences()?;
        store.sequences = Arc::new(Mutex::new(sequences));
        Ok(store)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EngineError::Storage(format!("{name} column family not found")))
    }

    fn get_record(&self, kind: EntityKind, id: u64) -> Result<Option<Record>> {
        let cf = self.cf(kind.table_name())?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_sequences(&self) -> Result<Sequences> {
        let cf = self.cf(CF_META)?;
        let mut sequences = Sequences::new();
        for kind in EntityKind::ALL {
            if let Some(bytes) = self.db.get_cf(cf, kind.table_name().as_bytes())? {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    EngineError::Storage(format!("corrupt sequence for {}", kind.table_name()))
                })?;
                sequences.insert(kind, u64::from_be_bytes(raw));
            }
        }
        Ok(sequences)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Sequences>> {
        self.sequences
            .lock()
            .map_err(|_| EngineError::Storage("sequence lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for RocksDBStore {
    async fn load(&self, kind: EntityKind, id: u64) -> Result<Option<Record>> {
        self.get_record(kind, id)
    }

    async fn scan(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let cf = self.cf(kind.table_name())?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    async fn next_id(&self, kind: EntityKind) -> Result<u64> {
        let mut sequences = self.lock()?;
        let sequence = sequences.entry(kind).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let sequences = self.lock()?;

        changes.verify_guards(|kind, id| self.get_record(kind, id))?;

        let mut batch = WriteBatch::default();
        let mut touched = BTreeSet::new();
        for record in &changes.records {
            let cf = self.cf(record.kind().table_name())?;
            batch.put_cf(cf, record.id().to_be_bytes(), serde_json::to_vec(record)?);
            touched.insert(record.kind());
        }

        let meta = self.cf(CF_META)?;
        for kind in touched {
            if let Some(sequence) = sequences.get(&kind) {
                batch.put_cf(meta, kind.table_name().as_bytes(), sequence.to_be_bytes());
            }
        }
        self.db.write(batch)?;

        Ok(())
    }
}
