//! Domain layer: entities, their transition tables, and the ports the
//! engine depends on.

pub mod job;
pub mod job_request;
pub mod lifecycle;
pub mod money;
pub mod notification;
pub mod payment;
pub mod ports;
pub mod project;
pub mod proposal;
pub mod record;
pub mod user;
pub mod withdrawal;

use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = u64;
pub type JobId = u64;
pub type ProposalId = u64;
pub type JobRequestId = u64;
pub type ProjectId = u64;
pub type PaymentId = u64;
pub type WithdrawalId = u64;

/// Every persisted entity type. Doubles as the table name in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Job,
    Proposal,
    JobRequest,
    Project,
    Payment,
    Withdrawal,
    AdminEarnings,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::User,
        EntityKind::Job,
        EntityKind::Proposal,
        EntityKind::JobRequest,
        EntityKind::Project,
        EntityKind::Payment,
        EntityKind::Withdrawal,
        EntityKind::AdminEarnings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Job => "job",
            EntityKind::Proposal => "proposal",
            EntityKind::JobRequest => "job_request",
            EntityKind::Project => "project",
            EntityKind::Payment => "payment",
            EntityKind::Withdrawal => "withdrawal",
            EntityKind::AdminEarnings => "admin_earnings",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Job => "jobs",
            EntityKind::Proposal => "proposals",
            EntityKind::JobRequest => "job_requests",
            EntityKind::Project => "projects",
            EntityKind::Payment => "payments",
            EntityKind::Withdrawal => "withdrawals",
            EntityKind::AdminEarnings => "admin_earnings",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
