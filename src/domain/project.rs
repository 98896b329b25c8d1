use super::lifecycle::Lifecycle;
use super::{EntityKind, JobId, JobRequestId, ProjectId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Cancelled,
    OnHold,
}

impl Lifecycle for ProjectStatus {
    const ENTITY: EntityKind = EntityKind::Project;

    fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
            ProjectStatus::OnHold => "on_hold",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            ProjectStatus::Active => &[
                ProjectStatus::Completed,
                ProjectStatus::Cancelled,
                ProjectStatus::OnHold,
            ],
            ProjectStatus::OnHold => &[ProjectStatus::Active],
            ProjectStatus::Completed | ProjectStatus::Cancelled => &[],
        }
    }
}

/// Where a project came from. Exactly one origin per project.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum ProjectOrigin {
    Job(JobId),
    JobRequest(JobRequestId),
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub client_id: UserId,
    pub developer_id: UserId,
    pub origin: ProjectOrigin,
    pub status: ProjectStatus,
    pub progress: u8,
    pub budget: Decimal,
    pub end_date: Option<DateTime<Utc>>,
    /// Set once the developer has been paid for this project.
    pub payment_released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        id: ProjectId,
        client_id: UserId,
        developer_id: UserId,
        origin: ProjectOrigin,
        budget: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            developer_id,
            origin,
            status: ProjectStatus::Active,
            progress: 0,
            budget,
            end_date: None,
            payment_released: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        match self.origin {
            ProjectOrigin::Job(id) => Some(id),
            ProjectOrigin::JobRequest(_) => None,
        }
    }

    pub fn job_request_id(&self) -> Option<JobRequestId> {
        match self.origin {
            ProjectOrigin::JobRequest(id) => Some(id),
            ProjectOrigin::Job(_) => None,
        }
    }

    pub fn transition(&mut self, next: ProjectStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the project completed. Returns `false` when it already was, in
    /// which case nothing (including `end_date`) changes.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if self.status == ProjectStatus::Completed {
            return Ok(false);
        }
        self.transition(ProjectStatus::Completed, now)?;
        self.end_date = Some(now);
        Ok(true)
    }

    /// Stores `progress` clamped to `0..=100` and returns the stored value.
    pub fn set_progress(&mut self, progress: i64, now: DateTime<Utc>) -> u8 {
        self.progress = progress.clamp(0, 100) as u8;
        self.updated_at = now;
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn project() -> Project {
        Project::new(1, 10, 20, ProjectOrigin::Job(5), dec!(300), Utc::now())
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut project = project();
        assert_eq!(project.set_progress(150, Utc::now()), 100);
        assert_eq!(project.set_progress(-3, Utc::now()), 0);
        assert_eq!(project.set_progress(42, Utc::now()), 42);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut project = project();
        assert!(project.complete(Utc::now()).unwrap());
        let end_date = project.end_date;

        assert!(!project.complete(Utc::now()).unwrap());
        assert_eq!(project.end_date, end_date);
        assert_eq!(project.status, ProjectStatus::Completed);
    }

    #[test]
    fn test_on_hold_round_trip_and_no_completion_from_hold() {
        let mut project = project();
        project.transition(ProjectStatus::OnHold, Utc::now()).unwrap();
        assert!(project.complete(Utc::now()).is_err());
        project.transition(ProjectStatus::Active, Utc::now()).unwrap();
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[test]
    fn test_origin_accessors() {
        let project = project();
        assert_eq!(project.job_id(), Some(5));
        assert_eq!(project.job_request_id(), None);
    }
}
