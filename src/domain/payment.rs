use super::lifecycle::Lifecycle;
use super::money::Amount;
use super::{EntityKind, JobRequestId, PaymentId, ProjectId, UserId, WithdrawalId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    TopUp,
    Escrow,
    EscrowRelease,
    Refund,
    Settlement,
    Withdrawal,
    Reversal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl Lifecycle for PaymentStatus {
    const ENTITY: EntityKind = EntityKind::Payment;

    fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            PaymentStatus::Pending => &[
                PaymentStatus::Completed,
                PaymentStatus::Failed,
                PaymentStatus::Refunded,
            ],
            // completed rows are immutable
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded => &[],
        }
    }
}

/// One row of the append-only money movement history.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub kind: PaymentKind,
    pub payer_id: Option<UserId>,
    pub payee_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
    pub job_request_id: Option<JobRequestId>,
    pub withdrawal_id: Option<WithdrawalId>,
    pub amount: Decimal,
    pub net_amount: Decimal,
    pub platform_fee: Decimal,
    pub status: PaymentStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn draft(kind: PaymentKind) -> PaymentDraft {
        PaymentDraft {
            kind,
            payer_id: None,
            payee_id: None,
            project_id: None,
            job_request_id: None,
            withdrawal_id: None,
            platform_fee: Decimal::ZERO,
            status: PaymentStatus::Completed,
            description: String::new(),
        }
    }

    pub fn transition(&mut self, next: PaymentStatus, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.advance(self.id, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Whether this row credits `user_id` with settled funds.
    ///
    /// A reversal only returns money that never left, so it earns nothing.
    pub fn credits(&self, user_id: UserId) -> bool {
        self.payee_id == Some(user_id)
            && self.status == PaymentStatus::Completed
            && self.kind != PaymentKind::Reversal
    }
}

/// The descriptive half of a payment; the ledger fills in the id, amount and
/// timestamps when it applies the balance change.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDraft {
    kind: PaymentKind,
    payer_id: Option<UserId>,
    payee_id: Option<UserId>,
    project_id: Option<ProjectId>,
    job_request_id: Option<JobRequestId>,
    withdrawal_id: Option<WithdrawalId>,
    platform_fee: Decimal,
    status: PaymentStatus,
    description: String,
}

impl PaymentDraft {
    pub fn payer(mut self, user_id: UserId) -> Self {
        self.payer_id = Some(user_id);
        self
    }

    pub fn payee(mut self, user_id: UserId) -> Self {
        self.payee_id = Some(user_id);
        self
    }

    pub fn project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn job_request(mut self, job_request_id: JobRequestId) -> Self {
        self.job_request_id = Some(job_request_id);
        self
    }

    pub fn withdrawal(mut self, withdrawal_id: WithdrawalId) -> Self {
        self.withdrawal_id = Some(withdrawal_id);
        self
    }

    pub fn fee(mut self, platform_fee: Decimal) -> Self {
        self.platform_fee = platform_fee;
        self
    }

    pub fn pending(mut self) -> Self {
        self.status = PaymentStatus::Pending;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn payer_or(mut self, user_id: UserId) -> Self {
        self.payer_id.get_or_insert(user_id);
        self
    }

    pub(crate) fn payee_or(mut self, user_id: UserId) -> Self {
        self.payee_id.get_or_insert(user_id);
        self
    }

    pub fn into_payment(self, id: PaymentId, amount: Amount, now: DateTime<Utc>) -> Payment {
        Payment {
            id,
            kind: self.kind,
            payer_id: self.payer_id,
            payee_id: self.payee_id,
            project_id: self.project_id,
            job_request_id: self.job_request_id,
            withdrawal_id: self.withdrawal_id,
            amount: amount.value(),
            net_amount: amount.value() - self.platform_fee,
            platform_fee: self.platform_fee,
            status: self.status,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_draft_builds_net_amount_from_fee() {
        let payment = Payment::draft(PaymentKind::Withdrawal)
            .payer(4)
            .withdrawal(2)
            .fee(dec!(10))
            .pending()
            .into_payment(1, Amount::new(dec!(100)).unwrap(), Utc::now());

        assert_eq!(payment.net_amount, dec!(90));
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.payer_id, Some(4));
        assert_eq!(payment.payee_id, None);
    }

    #[test]
    fn test_defaults_do_not_override_explicit_parties() {
        let payment = Payment::draft(PaymentKind::EscrowRelease)
            .payer(1)
            .payee_or(2)
            .payer_or(3)
            .into_payment(1, Amount::new(dec!(5)).unwrap(), Utc::now());

        assert_eq!(payment.payer_id, Some(1));
        assert_eq!(payment.payee_id, Some(2));
        assert!(payment.credits(2));
    }

    #[test]
    fn test_reversal_is_not_a_credit() {
        let reversal = Payment::draft(PaymentKind::Reversal).payee(2).into_payment(
            1,
            Amount::new(dec!(5)).unwrap(),
            Utc::now(),
        );
        assert_eq!(reversal.status, PaymentStatus::Completed);
        assert!(!reversal.credits(2));
    }

    #[test]
    fn test_completed_payment_is_immutable() {
        let mut payment = Payment::draft(PaymentKind::TopUp).into_payment(
            1,
            Amount::new(dec!(5)).unwrap(),
            Utc::now(),
        );
        assert!(payment
            .transition(PaymentStatus::Refunded, Utc::now())
            .is_err());
    }
}
