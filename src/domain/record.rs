use super::job::Job;
use super::job_request::JobRequest;
use super::payment::Payment;
use super::project::Project;
use super::proposal::Proposal;
use super::user::User;
use super::withdrawal::{AdminEarnings, Withdrawal};
use super::EntityKind;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Any persisted entity, tagged by kind.
///
/// Storage adapters deal only in records so the port stays object safe; the
/// application layer converts to concrete entities through [`Entity`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    User(User),
    Job(Job),
    Proposal(Proposal),
    JobRequest(JobRequest),
    Project(Project),
    Payment(Payment),
    Withdrawal(Withdrawal),
    AdminEarnings(AdminEarnings),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Job(_) => EntityKind::Job,
            Record::Proposal(_) => EntityKind::Proposal,
            Record::JobRequest(_) => EntityKind::JobRequest,
            Record::Project(_) => EntityKind::Project,
            Record::Payment(_) => EntityKind::Payment,
            Record::Withdrawal(_) => EntityKind::Withdrawal,
            Record::AdminEarnings(_) => EntityKind::AdminEarnings,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Record::User(e) => e.id,
            Record::Job(e) => e.id,
            Record::Proposal(e) => e.id,
            Record::JobRequest(e) => e.id,
            Record::Project(e) => e.id,
            Record::Payment(e) => e.id,
            Record::Withdrawal(e) => e.id,
            Record::AdminEarnings(e) => e.id,
        }
    }

    pub fn key(&self) -> (EntityKind, u64) {
        (self.kind(), self.id())
    }
}

/// A concrete entity type that round-trips through [`Record`].
pub trait Entity: Clone + Send + Sync + Into<Record> + TryFrom<Record, Error = Record> + 'static {
    const KIND: EntityKind;

    fn id(&self) -> u64;

    fn decode(record: Record) -> Result<Self> {
        Self::try_from(record).map_err(|other| {
            EngineError::Storage(format!(
                "expected {} record, found {} {}",
                Self::KIND,
                other.kind(),
                other.id()
            ))
        })
    }
}

macro_rules! entity {
    ($ty:ident, $kind:ident) => {
        impl From<$ty> for Record {
            fn from(entity: $ty) -> Self {
                Record::$kind(entity)
            }
        }

        impl TryFrom<Record> for $ty {
            type Error = Record;

            fn try_from(record: Record) -> std::result::Result<Self, Record> {
                match record {
                    Record::$kind(entity) => Ok(entity),
                    other => Err(other),
                }
            }
        }

        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> u64 {
                self.id
            }
        }
    };
}

entity!(User, User);
entity!(Job, Job);
entity!(Proposal, Proposal);
entity!(JobRequest, JobRequest);
entity!(Project, Project);
entity!(Payment, Payment);
entity!(Withdrawal, Withdrawal);
entity!(AdminEarnings, AdminEarnings);

/// The stored row a commit expects to overwrite.
///
/// `expected` is the record as the scope read it, or `None` for a row the
/// scope creates. The store compares it with what it currently holds, so a
/// row rewritten by anyone else in the meantime fails the whole commit.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGuard {
    pub kind: EntityKind,
    pub id: u64,
    pub expected: Option<Record>,
}

/// Every write of one engine operation. Applied all-or-nothing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeSet {
    pub records: Vec<Record>,
    pub guards: Vec<RowGuard>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks every guard against `current`, which looks up the stored row.
    pub fn verify_guards<F>(&self, mut current: F) -> Result<()>
    where
        F: FnMut(EntityKind, u64) -> Result<Option<Record>>,
    {
        for guard in &self.guards {
            if current(guard.kind, guard.id)? != guard.expected {
                return Err(EngineError::Conflict {
                    entity: guard.kind,
                    id: guard.id,
                });
            }
        }
        Ok(())
    }
}
