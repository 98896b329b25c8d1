use super::ledger::Ledger;
use super::notifications::NotificationDispatcher;
use super::scope::Scope;
use crate::config::EngineConfig;
use crate::domain::job::Job;
use crate::domain::job_request::JobRequest;
use crate::domain::payment::{Payment, PaymentKind};
use crate::domain::ports::{Notifier, StoreBox};
use crate::domain::project::Project;
use crate::domain::proposal::Proposal;
use crate::domain::user::{User, UserRole};
use crate::domain::withdrawal::{AdminEarnings, Withdrawal};
use crate::domain::{EntityKind, JobId, UserId, WithdrawalId};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The workflow and escrow ledger engine.
///
/// Every public mutating method is one workflow transition: it takes the
/// write gate, validates against current state, stages all entity and ledger
/// writes in one [`Scope`], commits them together, and only then queues the
/// resulting notifications. A failed validation returns before anything is
/// committed.
pub struct MarketplaceEngine {
    store: StoreBox,
    ledger: Ledger,
    notifications: NotificationDispatcher,
    write_gate: Mutex<()>,
}

impl MarketplaceEngine {
    /// Creates a new engine over `store`.
    ///
    /// Must be called inside a Tokio runtime: notification delivery runs on a
    /// spawned task.
    pub fn new(store: StoreBox, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        Self {
            store,
            ledger: Ledger::new(&config),
            notifications: NotificationDispatcher::spawn(notifier),
            write_gate: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn scope(&self) -> Scope<'_> {
        Scope::new(self.store.as_ref())
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Commits the scope, then hands its notifications to the dispatcher.
    pub(crate) async fn finish(&self, scope: Scope<'_>) -> Result<()> {
        let notifications = scope.commit().await?;
        self.notifications.publish(notifications);
        Ok(())
    }

    /// Waits until every notification emitted so far reached the notifier.
    pub async fn flush_notifications(&self) {
        self.notifications.flush().await;
    }

    pub async fn open_account(&self, name: &str, role: UserRole) -> Result<User> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let id = scope.allocate::<User>().await?;
        let user = User::new(id, name, role, scope.now());
        scope.stage(user.clone());

        self.finish(scope).await?;
        info!(user_id = id, role = %role, "account opened");
        Ok(user)
    }

    /// Adds funds to a user's balance from outside the platform.
    pub async fn top_up(&self, user_id: UserId, amount: Decimal) -> Result<Payment> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let payment = self
            .ledger
            .credit(
                &mut scope,
                user_id,
                amount,
                Payment::draft(PaymentKind::TopUp).describe("balance top-up"),
            )
            .await?;

        self.finish(scope).await?;
        info!(user_id, %amount, payment_id = payment.id, "balance topped up");
        Ok(payment)
    }

    pub async fn user(&self, id: UserId) -> Result<User> {
        self.scope().fetch(id).await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.scope().select(|_: &User| true).await
    }

    pub async fn job(&self, id: JobId) -> Result<Job> {
        self.scope().fetch(id).await
    }

    pub async fn proposal(&self, id: u64) -> Result<Proposal> {
        self.scope().fetch(id).await
    }

    pub async fn proposals_for_job(&self, job_id: JobId) -> Result<Vec<Proposal>> {
        self.scope().select(|p: &Proposal| p.job_id == job_id).await
    }

    pub async fn job_request(&self, id: u64) -> Result<JobRequest> {
        self.scope().fetch(id).await
    }

    pub async fn project(&self, id: u64) -> Result<Project> {
        self.scope().fetch(id).await
    }

    pub async fn projects_for_job(&self, job_id: JobId) -> Result<Vec<Project>> {
        self.scope()
            .select(|p: &Project| p.job_id() == Some(job_id))
            .await
    }

    pub async fn projects_for_job_request(&self, job_request_id: u64) -> Result<Vec<Project>> {
        self.scope()
            .select(|p: &Project| p.job_request_id() == Some(job_request_id))
            .await
    }

    pub async fn payment(&self, id: u64) -> Result<Payment> {
        self.scope().fetch(id).await
    }

    /// Every payment the user paid or received, oldest first.
    pub async fn payments_for_user(&self, user_id: UserId) -> Result<Vec<Payment>> {
        self.scope()
            .select(|p: &Payment| p.payer_id == Some(user_id) || p.payee_id == Some(user_id))
            .await
    }

    pub async fn withdrawal(&self, id: WithdrawalId) -> Result<Withdrawal> {
        self.scope().fetch(id).await
    }

    pub async fn withdrawals_for_developer(&self, developer_id: UserId) -> Result<Vec<Withdrawal>> {
        self.scope()
            .select(|w: &Withdrawal| w.developer_id == developer_id)
            .await
    }

    pub async fn admin_earnings_for_withdrawal(
        &self,
        withdrawal_id: WithdrawalId,
    ) -> Result<AdminEarnings> {
        admin_earnings_for(&self.scope(), withdrawal_id).await
    }

    pub async fn available_balance(&self, user_id: UserId) -> Result<Decimal> {
        let scope = self.scope();
        scope.fetch::<User>(user_id).await?;
        self.ledger.available_balance(&scope, user_id).await
    }
}

pub(crate) async fn admin_earnings_for(
    scope: &Scope<'_>,
    withdrawal_id: WithdrawalId,
) -> Result<AdminEarnings> {
    scope
        .select(|e: &AdminEarnings| e.withdrawal_id == withdrawal_id)
        .await?
        .into_iter()
        .next()
        .ok_or(EngineError::NotFound {
            entity: EntityKind::AdminEarnings,
            id: withdrawal_id,
        })
}

/// Fails with `Unauthorized` unless `actor` is `owner`.
pub(crate) fn authorize(actor: UserId, owner: UserId, entity: EntityKind, id: u64) -> Result<()> {
    if actor == owner {
        Ok(())
    } else {
        Err(EngineError::Unauthorized { actor, entity, id })
    }
}

/// Fails with `Unauthorized` unless `actor` is an admin.
pub(crate) async fn require_admin(
    scope: &Scope<'_>,
    actor: UserId,
    entity: EntityKind,
    id: u64,
) -> Result<()> {
    let user: User = scope.fetch(actor).await?;
    if user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(EngineError::Unauthorized { actor, entity, id })
    }
}
