use super::lifecycle::Lifecycle;
use super::{EntityKind, JobId, ProposalId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Completed,
}

impl Lifecycle for ProposalStatus {
    const ENTITY: EntityKind = EntityKind::Proposal;

    fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Withdrawn => "withdrawn",
            ProposalStatus::Completed => "completed",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            ProposalStatus::Pending => &[
                ProposalStatus::Accepted,
                ProposalStatus::Rejected,
                ProposalStatus::Withdrawn,
            ],
            // `Rejected` is reachable from `Accepted` only through the sibling
            // sweep when another proposal on the same job wins.
            ProposalStatus::Accepted => &[ProposalStatus::Completed, ProposalStatus::Rejected],
            ProposalStatus::Rejected | ProposalStatus::Withdrawn | ProposalStatus::Completed => &[],
        }
    }
}

/// A developer's application to a job. Unique per `(job_id, developer_id)`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Proposal {
    pub id: ProposalId,
    pub job_id: JobId,
    pub developer_id: UserId,
    pub status: ProposalStatus,
    pub proposed_budget: Decimal,
    pub cover_letter: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(
        id: ProposalId,
        job_id: JobId,
        developer_id: UserId,
        proposed_budget: Decimal,
        cover_letter: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_id,
            developer_id,
            status: ProposalStatus::Pending,
            proposed_budget,
            cover_letter: cover_letter.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: ProposalStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Whether this proposal competes for the job's single acceptance slot.
    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            ProposalStatus::Pending | ProposalStatus::Accepted
        )
    }
}
