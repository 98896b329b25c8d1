use super::lifecycle::Lifecycle;
use super::{EntityKind, JobRequestId, PaymentId, UserId};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum JobRequestStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl Lifecycle for JobRequestStatus {
    const ENTITY: EntityKind = EntityKind::JobRequest;

    fn as_str(self) -> &'static str {
        match self {
            JobRequestStatus::Pending => "pending",
            JobRequestStatus::Accepted => "accepted",
            JobRequestStatus::Declined => "declined",
            JobRequestStatus::Cancelled => "cancelled",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            JobRequestStatus::Pending => &[
                JobRequestStatus::Accepted,
                JobRequestStatus::Declined,
                JobRequestStatus::Cancelled,
            ],
            _ => &[],
        }
    }
}

/// A direct-hire offer whose budget is escrowed when it is sent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct JobRequest {
    pub id: JobRequestId,
    pub client_id: UserId,
    pub developer_id: UserId,
    pub title: String,
    pub status: JobRequestStatus,
    pub budget: Decimal,
    /// The pending payment row recording the escrow debit.
    pub escrow_payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRequest {
    pub fn new(
        id: JobRequestId,
        client_id: UserId,
        developer_id: UserId,
        title: impl Into<String>,
        budget: Decimal,
        escrow_payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            developer_id,
            title: title.into(),
            status: JobRequestStatus::Pending,
            budget,
            escrow_payment_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolves a pending request. Any other state reports `AlreadyProcessed`
    /// rather than `InvalidState` since a second response is a replay.
    pub fn resolve(&mut self, next: JobRequestStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status != JobRequestStatus::Pending {
            return Err(EngineError::AlreadyProcessed {
                entity: EntityKind::JobRequest,
                id: self.id,
            });
        }
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }
}
