use super::lifecycle::Lifecycle;
use super::{EntityKind, JobId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
    Closed,
}

impl Lifecycle for JobStatus {
    const ENTITY: EntityKind = EntityKind::Job;

    fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Closed => "closed",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            JobStatus::Open => &[JobStatus::InProgress, JobStatus::Cancelled, JobStatus::Closed],
            JobStatus::InProgress => &[JobStatus::Completed, JobStatus::Closed],
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Closed => &[],
        }
    }
}

/// An open posting on the marketplace.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Job {
    pub id: JobId,
    pub client_id: UserId,
    pub title: String,
    pub status: JobStatus,
    pub assigned_developer_id: Option<UserId>,
    /// Informational only; may lag behind the proposals table.
    pub proposals_count: u32,
    pub budget: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        id: JobId,
        client_id: UserId,
        title: impl Into<String>,
        budget: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            title: title.into(),
            status: JobStatus::Open,
            assigned_developer_id: None,
            proposals_count: 0,
            budget,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: JobStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Moves an open job to `in_progress` under `developer_id`.
    pub fn assign(&mut self, developer_id: UserId, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::InProgress, now)?;
        self.assigned_developer_id = Some(developer_id);
        Ok(())
    }

    pub fn proposal_received(&mut self, now: DateTime<Utc>) {
        self.proposals_count = self.proposals_count.saturating_add(1);
        self.updated_at = now;
    }

    pub fn proposal_withdrawn(&mut self, now: DateTime<Utc>) {
        self.proposals_count = self.proposals_count.saturating_sub(1);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use rust_decimal_macros::dec;

    fn job() -> Job {
        Job::new(7, 1, "landing page", dec!(500), Utc::now())
    }

    #[test]
    fn test_assign_sets_developer() {
        let mut job = job();
        job.assign(2, Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.assigned_developer_id, Some(2));
    }

    #[test]
    fn test_open_job_cannot_skip_to_completed() {
        let mut job = job();
        let err = job.transition(JobStatus::Completed, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                entity: EntityKind::Job,
                id: 7,
                from: "open",
                to: "completed"
            }
        ));
        assert_eq!(job.status, JobStatus::Open);
    }

    #[test]
    fn test_in_progress_cannot_be_cancelled() {
        let mut job = job();
        job.assign(2, Utc::now()).unwrap();
        assert!(job.transition(JobStatus::Cancelled, Utc::now()).is_err());
        assert!(job.transition(JobStatus::Closed, Utc::now()).is_ok());
    }

    #[test]
    fn test_proposals_count_saturates() {
        let mut job = job();
        job.proposal_withdrawn(Utc::now());
        assert_eq!(job.proposals_count, 0);
        job.proposal_received(Utc::now());
        job.proposal_received(Utc::now());
        job.proposal_withdrawn(Utc::now());
        assert_eq!(job.proposals_count, 1);
    }
}
