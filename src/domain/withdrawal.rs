use super::lifecycle::Lifecycle;
use super::money::WithdrawalSplit;
use super::{EntityKind, PaymentId, UserId, WithdrawalId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl Lifecycle for WithdrawalStatus {
    const ENTITY: EntityKind = EntityKind::Withdrawal;

    fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            WithdrawalStatus::Pending => &[
                WithdrawalStatus::Processing,
                WithdrawalStatus::Completed,
                WithdrawalStatus::Failed,
                WithdrawalStatus::Cancelled,
            ],
            WithdrawalStatus::Processing => {
                &[WithdrawalStatus::Completed, WithdrawalStatus::Failed]
            }
            WithdrawalStatus::Completed
            | WithdrawalStatus::Failed
            | WithdrawalStatus::Cancelled => &[],
        }
    }
}

impl WithdrawalStatus {
    /// Whether the withdrawn amount still counts against the developer.
    pub fn holds_funds(self) -> bool {
        !matches!(self, WithdrawalStatus::Failed | WithdrawalStatus::Cancelled)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub developer_id: UserId,
    pub amount: Decimal,
    pub fee_amount: Decimal,
    pub net_amount: Decimal,
    pub status: WithdrawalStatus,
    /// Opaque payout metadata (bank, paypal, ...).
    pub payment_method: String,
    pub payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(
        id: WithdrawalId,
        developer_id: UserId,
        amount: Decimal,
        split: WithdrawalSplit,
        payment_method: impl Into<String>,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            developer_id,
            amount,
            fee_amount: split.fee_amount,
            net_amount: split.net_amount,
            status: WithdrawalStatus::Pending,
            payment_method: payment_method.into(),
            payment_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: WithdrawalStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AdminEarningsStatus {
    Pending,
    Completed,
}

impl Lifecycle for AdminEarningsStatus {
    const ENTITY: EntityKind = EntityKind::AdminEarnings;

    fn as_str(self) -> &'static str {
        match self {
            AdminEarningsStatus::Pending => "pending",
            AdminEarningsStatus::Completed => "completed",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            AdminEarningsStatus::Pending => &[AdminEarningsStatus::Completed],
            AdminEarningsStatus::Completed => &[],
        }
    }
}

/// The platform's commission on one withdrawal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AdminEarnings {
    pub id: u64,
    pub withdrawal_id: WithdrawalId,
    pub developer_id: UserId,
    pub original_amount: Decimal,
    pub fee_amount: Decimal,
    pub fee_percentage: Decimal,
    pub status: AdminEarningsStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminEarnings {
    pub fn for_withdrawal(
        id: u64,
        withdrawal: &Withdrawal,
        fee_percentage: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            withdrawal_id: withdrawal.id,
            developer_id: withdrawal.developer_id,
            original_amount: withdrawal.amount,
            fee_amount: withdrawal.fee_amount,
            fee_percentage,
            status: AdminEarningsStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: AdminEarningsStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }
}
