use super::scope::Scope;
use crate::config::EngineConfig;
use crate::domain::UserId;
use crate::domain::money::{Amount, WithdrawalSplit, checked_sum, compute_withdrawal_split};
use crate::domain::payment::{Payment, PaymentDraft, PaymentKind, PaymentStatus};
use crate::domain::user::User;
use crate::domain::withdrawal::Withdrawal;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use tracing::debug;

/// Owns every balance mutation.
///
/// Each operation reads the user inside the caller's scope, applies the change,
/// and stages the user together with the payment row that records it, so a
/// balance never moves without its audit row.
#[derive(Debug, Clone)]
pub struct Ledger {
    fee_percentage: Decimal,
    fee_decimal_places: u32,
}

impl Ledger {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fee_percentage: config.withdrawal_fee_percentage,
            fee_decimal_places: config.fee_decimal_places,
        }
    }

    pub fn fee_percentage(&self) -> Decimal {
        self.fee_percentage
    }

    /// Adds `amount` to the user's balance. The payee defaults to the user.
    pub async fn credit(
        &self,
        scope: &mut Scope<'_>,
        user_id: UserId,
        amount: Decimal,
        draft: PaymentDraft,
    ) -> Result<Payment> {
        let amount = Amount::new(amount)?;
        let mut user: User = scope.fetch(user_id).await?;
        user.credit(amount, scope.now())?;

        let payment = self.record(scope, draft.payee_or(user_id), amount).await?;
        debug!(user_id, %amount, payment_id = payment.id, "credit staged");
        scope.stage(user);
        Ok(payment)
    }

    /// Removes `amount` from the user's balance, failing with
    /// `InsufficientBalance` if it would go negative. The payer defaults to
    /// the user.
    pub async fn debit(
        &self,
        scope: &mut Scope<'_>,
        user_id: UserId,
        amount: Decimal,
        draft: PaymentDraft,
    ) -> Result<Payment> {
        let amount = Amount::new(amount)?;
        let mut user: User = scope.fetch(user_id).await?;
        user.debit(amount, scope.now())?;

        let payment = self.record(scope, draft.payer_or(user_id), amount).await?;
        debug!(user_id, %amount, payment_id = payment.id, "debit staged");
        scope.stage(user);
        Ok(payment)
    }

    /// Moves `amount` from one user to another under a single payment row.
    pub async fn transfer(
        &self,
        scope: &mut Scope<'_>,
        from: UserId,
        to: UserId,
        amount: Decimal,
        draft: PaymentDraft,
    ) -> Result<Payment> {
        let amount = Amount::new(amount)?;
        let mut payer: User = scope.fetch(from).await?;
        payer.debit(amount, scope.now())?;
        scope.stage(payer);

        let mut payee: User = scope.fetch(to).await?;
        payee.credit(amount, scope.now())?;
        scope.stage(payee);

        let payment = self
            .record(scope, draft.payer(from).payee(to), amount)
            .await?;
        debug!(from, to, %amount, payment_id = payment.id, "transfer staged");
        Ok(payment)
    }

    /// Reverses a pending debit: the row is marked `failed`, the payer gets
    /// the amount back, and a `reversal` row records the return.
    pub async fn void(&self, scope: &mut Scope<'_>, payment_id: u64) -> Result<Payment> {
        let mut payment: Payment = scope.fetch(payment_id).await?;
        let payer_id = payment.payer_id.ok_or_else(|| {
            EngineError::Storage(format!("payment {payment_id} has no payer to restore"))
        })?;
        payment.transition(PaymentStatus::Failed, scope.now())?;
        let amount = Amount::new(payment.amount)?;

        let mut payer: User = scope.fetch(payer_id).await?;
        payer.credit(amount, scope.now())?;
        scope.stage(payer);
        scope.stage(payment.clone());

        let mut draft = Payment::draft(PaymentKind::Reversal)
            .payee(payer_id)
            .describe(format!("reversal of payment {payment_id}"));
        if let Some(withdrawal_id) = payment.withdrawal_id {
            draft = draft.withdrawal(withdrawal_id);
        }
        let reversal = self.record(scope, draft, amount).await?;
        debug!(payment_id, payer_id, reversal_id = reversal.id, "debit voided");
        Ok(payment)
    }

    /// Moves a pending payment row to `next` without touching any balance.
    pub async fn settle(
        &self,
        scope: &mut Scope<'_>,
        payment_id: u64,
        next: PaymentStatus,
    ) -> Result<Payment> {
        let mut payment: Payment = scope.fetch(payment_id).await?;
        payment.transition(next, scope.now())?;
        scope.stage(payment.clone());
        Ok(payment)
    }

    pub fn withdrawal_split(&self, amount: Decimal) -> Result<WithdrawalSplit> {
        compute_withdrawal_split(amount, self.fee_percentage, self.fee_decimal_places)
    }

    /// Σ settled payments credited to the user − Σ withdrawals still holding
    /// funds.
    pub async fn available_balance(&self, scope: &Scope<'_>, user_id: UserId) -> Result<Decimal> {
        let credits = scope.select::<Payment, _>(|p| p.credits(user_id)).await?;
        let holds = scope
            .select::<Withdrawal, _>(|w| w.developer_id == user_id && w.status.holds_funds())
            .await?;

        let overflow =
            || EngineError::Storage(format!("payment history of user {user_id} overflows"));
        let credited = checked_sum(credits.iter().map(|p| p.net_amount)).ok_or_else(overflow)?;
        let withdrawn = checked_sum(holds.iter().map(|w| w.amount)).ok_or_else(overflow)?;
        Ok(credited - withdrawn)
    }

    async fn record(
        &self,
        scope: &mut Scope<'_>,
        draft: PaymentDraft,
        amount: Amount,
    ) -> Result<Payment> {
        let id = scope.allocate::<Payment>().await?;
        let payment = draft.into_payment(id, amount, scope.now());
        scope.stage(payment.clone());
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Balance;
    use crate::domain::user::UserRole;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;

    async fn seed(store: &InMemoryStore, balance: Decimal) {
        let mut scope = Scope::new(store);
        let mut user = User::new(1, "ana", UserRole::Client, scope.now());
        user.balance = Balance::new(balance);
        scope.stage(user);
        scope.stage(User::new(2, "bo", UserRole::Developer, scope.now()));
        scope.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_credit_appends_payment() {
        let store = InMemoryStore::new();
        seed(&store, dec!(0)).await;
        let ledger = Ledger::new(&EngineConfig::default());

        let mut scope = Scope::new(&store);
        let payment = ledger
            .credit(&mut scope, 1, dec!(25), Payment::draft(PaymentKind::TopUp))
            .await
            .unwrap();
        scope.commit().await.unwrap();

        let scope = Scope::new(&store);
        let user: User = scope.fetch(1).await.unwrap();
        assert_eq!(user.balance, Balance::new(dec!(25)));
        let stored: Payment = scope.fetch(payment.id).await.unwrap();
        assert_eq!(stored.payee_id, Some(1));
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_credit_rejects_non_positive_amount() {
        let store = InMemoryStore::new();
        seed(&store, dec!(0)).await;
        let ledger = Ledger::new(&EngineConfig::default());

        let mut scope = Scope::new(&store);
        let result = ledger
            .credit(&mut scope, 1, dec!(0), Payment::draft(PaymentKind::TopUp))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_overdraft_debit_stages_nothing() {
        let store = InMemoryStore::new();
        seed(&store, dec!(10)).await;
        let ledger = Ledger::new(&EngineConfig::default());

        let mut scope = Scope::new(&store);
        let result = ledger
            .debit(&mut scope, 1, dec!(11), Payment::draft(PaymentKind::Escrow))
            .await;
        assert!(matches!(
            result,
            Err(EngineError::InsufficientBalance { user_id: 1, .. })
        ));
        scope.commit().await.unwrap();

        let scope = Scope::new(&store);
        let user: User = scope.fetch(1).await.unwrap();
        assert_eq!(user.balance, Balance::new(dec!(10)));
        assert!(scope.select::<Payment, _>(|_| true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_writes_one_row() {
        let store = InMemoryStore::new();
        seed(&store, dec!(50)).await;
        let ledger = Ledger::new(&EngineConfig::default());

        let mut scope = Scope::new(&store);
        ledger
            .transfer(&mut scope, 1, 2, dec!(30), Payment::draft(PaymentKind::Settlement))
            .await
            .unwrap();
        scope.commit().await.unwrap();

        let scope = Scope::new(&store);
        let client: User = scope.fetch(1).await.unwrap();
        let developer: User = scope.fetch(2).await.unwrap();
        assert_eq!(client.balance, Balance::new(dec!(20)));
        assert_eq!(developer.balance, Balance::new(dec!(30)));
        assert_eq!(ledger.available_balance(&scope, 2).await.unwrap(), dec!(30));
        assert_eq!(scope.select::<Payment, _>(|_| true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_void_restores_pending_debit() {
        let store = InMemoryStore::new();
        seed(&store, dec!(40)).await;
        let ledger = Ledger::new(&EngineConfig::default());

        let mut scope = Scope::new(&store);
        let payment = ledger
            .debit(
                &mut scope,
                1,
                dec!(40),
                Payment::draft(PaymentKind::Withdrawal).pending(),
            )
            .await
            .unwrap();
        scope.commit().await.unwrap();

        let mut scope = Scope::new(&store);
        let voided = ledger.void(&mut scope, payment.id).await.unwrap();
        scope.commit().await.unwrap();
        assert_eq!(voided.status, PaymentStatus::Failed);

        let scope = Scope::new(&store);
        let user: User = scope.fetch(1).await.unwrap();
        assert_eq!(user.balance, Balance::new(dec!(40)));

        let reversals = scope
            .select::<Payment, _>(|p| p.kind == PaymentKind::Reversal)
            .await
            .unwrap();
        assert_eq!(reversals.len(), 1);
        assert_eq!(reversals[0].payee_id, Some(1));
        assert_eq!(reversals[0].amount, dec!(40));
        assert_eq!(
            ledger.available_balance(&scope, 1).await.unwrap(),
            dec!(0),
            "a reversal must not count as earnings"
        );
    }

    #[test]
    fn test_withdrawal_split_uses_configured_fee() {
        let config = EngineConfig::default().with_fee_percentage(dec!(5)).unwrap();
        let ledger = Ledger::new(&config);
        let split = ledger.withdrawal_split(dec!(200)).unwrap();
        assert_eq!(split.fee_amount, dec!(10));
        assert_eq!(split.net_amount, dec!(190));
    }
}
