use super::engine::{MarketplaceEngine, admin_earnings_for, authorize, require_admin};
use super::scope::Scope;
use crate::domain::lifecycle::Lifecycle;
use crate::domain::money::Amount;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::payment::{Payment, PaymentKind, PaymentStatus};
use crate::domain::user::{User, UserRole};
use crate::domain::withdrawal::{AdminEarnings, AdminEarningsStatus, Withdrawal, WithdrawalStatus};
use crate::domain::{EntityKind, UserId, WithdrawalId};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

impl MarketplaceEngine {
    /// Requests a payout of `amount` from the developer's available balance.
    ///
    /// The amount is debited immediately under a pending `withdrawal` payment,
    /// and the withdrawal is created together with its commission record.
    /// Over-asking fails with `InsufficientBalance` and writes nothing.
    pub async fn request_withdrawal(
        &self,
        developer_id: UserId,
        amount: Decimal,
        method: &str,
    ) -> Result<Withdrawal> {
        Amount::new(amount)?;
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let developer: User = scope.fetch(developer_id).await?;
        if developer.role != UserRole::Developer {
            return Err(EngineError::Unauthorized {
                actor: developer_id,
                entity: EntityKind::User,
                id: developer_id,
            });
        }
        let available = self.ledger().available_balance(&scope, developer_id).await?;
        if amount > available {
            warn!(developer_id, %amount, %available, "withdrawal exceeds available balance");
            return Err(EngineError::InsufficientBalance {
                user_id: developer_id,
                requested: amount,
                available,
            });
        }

        let split = self.ledger().withdrawal_split(amount)?;
        let id = scope.allocate::<Withdrawal>().await?;
        let payment = self
            .ledger()
            .debit(
                &mut scope,
                developer_id,
                amount,
                Payment::draft(PaymentKind::Withdrawal)
                    .withdrawal(id)
                    .fee(split.fee_amount)
                    .pending()
                    .describe(format!("withdrawal via {method}")),
            )
            .await?;
        let withdrawal = Withdrawal::new(
            id,
            developer_id,
            amount,
            split,
            method,
            payment.id,
            scope.now(),
        );
        let earnings_id = scope.allocate::<AdminEarnings>().await?;
        let earnings = AdminEarnings::for_withdrawal(
            earnings_id,
            &withdrawal,
            self.ledger().fee_percentage(),
            scope.now(),
        );
        scope.notify(
            Notification::new(
                developer_id,
                NotificationKind::Withdrawal,
                "Withdrawal requested",
                format!(
                    "Your withdrawal of {amount} was requested; you will receive {} after a {} fee",
                    withdrawal.net_amount, withdrawal.fee_amount
                ),
            )
            .related(EntityKind::Withdrawal, id),
        );
        scope.stage(withdrawal.clone());
        scope.stage(earnings);

        self.finish(scope).await?;
        info!(
            withdrawal_id = id,
            developer_id,
            %amount,
            fee = %withdrawal.fee_amount,
            "withdrawal requested"
        );
        Ok(withdrawal)
    }

    pub async fn start_withdrawal_processing(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: UserId,
    ) -> Result<Withdrawal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        require_admin(&scope, admin_id, EntityKind::Withdrawal, withdrawal_id).await?;
        let mut withdrawal: Withdrawal = scope.fetch(withdrawal_id).await?;
        withdrawal.transition(WithdrawalStatus::Processing, scope.now())?;
        scope.stage(withdrawal.clone());

        self.finish(scope).await?;
        info!(withdrawal_id, "withdrawal processing");
        Ok(withdrawal)
    }

    /// Marks the payout as sent. The platform's commission is earned at this
    /// point.
    pub async fn complete_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: UserId,
    ) -> Result<Withdrawal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        require_admin(&scope, admin_id, EntityKind::Withdrawal, withdrawal_id).await?;
        let mut withdrawal: Withdrawal = scope.fetch(withdrawal_id).await?;
        withdrawal.transition(WithdrawalStatus::Completed, scope.now())?;
        self.ledger()
            .settle(&mut scope, withdrawal.payment_id, PaymentStatus::Completed)
            .await?;
        let mut earnings = admin_earnings_for(&scope, withdrawal_id).await?;
        earnings.transition(AdminEarningsStatus::Completed, scope.now())?;
        scope.notify(
            Notification::new(
                withdrawal.developer_id,
                NotificationKind::Withdrawal,
                "Withdrawal completed",
                format!("Your withdrawal of {} was paid out", withdrawal.net_amount),
            )
            .related(EntityKind::Withdrawal, withdrawal_id),
        );
        scope.stage(withdrawal.clone());
        scope.stage(earnings);

        self.finish(scope).await?;
        info!(withdrawal_id, "withdrawal completed");
        Ok(withdrawal)
    }

    /// The payout could not be made: the amount goes back to the developer.
    pub async fn fail_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: UserId,
    ) -> Result<Withdrawal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        require_admin(&scope, admin_id, EntityKind::Withdrawal, withdrawal_id).await?;
        let withdrawal = self
            .release_withdrawal(&mut scope, withdrawal_id, WithdrawalStatus::Failed)
            .await?;

        self.finish(scope).await?;
        warn!(withdrawal_id, "withdrawal failed, funds returned");
        Ok(withdrawal)
    }

    /// The developer takes back a withdrawal nobody has started on.
    pub async fn cancel_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
        developer_id: UserId,
    ) -> Result<Withdrawal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let withdrawal: Withdrawal = scope.fetch(withdrawal_id).await?;
        authorize(
            developer_id,
            withdrawal.developer_id,
            EntityKind::Withdrawal,
            withdrawal_id,
        )?;
        let withdrawal = self
            .release_withdrawal(&mut scope, withdrawal_id, WithdrawalStatus::Cancelled)
            .await?;

        self.finish(scope).await?;
        info!(withdrawal_id, "withdrawal cancelled");
        Ok(withdrawal)
    }

    async fn release_withdrawal(
        &self,
        scope: &mut Scope<'_>,
        withdrawal_id: WithdrawalId,
        next: WithdrawalStatus,
    ) -> Result<Withdrawal> {
        let mut withdrawal: Withdrawal = scope.fetch(withdrawal_id).await?;
        withdrawal.transition(next, scope.now())?;
        self.ledger().void(scope, withdrawal.payment_id).await?;
        scope.notify(
            Notification::new(
                withdrawal.developer_id,
                NotificationKind::Withdrawal,
                "Withdrawal returned",
                format!(
                    "Your withdrawal of {} was {} and the amount is back in your balance",
                    withdrawal.amount,
                    next.as_str()
                ),
            )
            .related(EntityKind::Withdrawal, withdrawal_id),
        );
        scope.stage(withdrawal.clone());
        Ok(withdrawal)
    }
}
