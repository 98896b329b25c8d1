use super::engine::{MarketplaceEngine, authorize};
use super::scope::Scope;
use crate::domain::job_request::{JobRequest, JobRequestStatus};
use crate::domain::money::Amount;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::payment::{Payment, PaymentKind, PaymentStatus};
use crate::domain::project::{Project, ProjectOrigin};
use crate::domain::user::User;
use crate::domain::{EntityKind, JobRequestId, UserId};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use tracing::info;

impl MarketplaceEngine {
    /// Sends a direct-hire offer. The budget is debited from the client
    /// before the request exists; a client who cannot cover it gets
    /// `InsufficientBalance` and nothing is written.
    pub async fn send_job_request(
        &self,
        client_id: UserId,
        developer_id: UserId,
        title: &str,
        budget: Decimal,
    ) -> Result<JobRequest> {
        Amount::new(budget)?;
        if client_id == developer_id {
            return Err(EngineError::Unauthorized {
                actor: client_id,
                entity: EntityKind::User,
                id: developer_id,
            });
        }
        let _gate = self.lock().await;
        let mut scope = self.scope();

        scope.fetch::<User>(developer_id).await?;
        let id = scope.allocate::<JobRequest>().await?;
        let escrow = self
            .ledger()
            .debit(
                &mut scope,
                client_id,
                budget,
                Payment::draft(PaymentKind::Escrow)
                    .job_request(id)
                    .pending()
                    .describe(format!("escrow for \"{title}\"")),
            )
            .await?;
        let request = JobRequest::new(
            id,
            client_id,
            developer_id,
            title,
            budget,
            escrow.id,
            scope.now(),
        );
        scope.notify(
            Notification::new(
                developer_id,
                NotificationKind::JobRequest,
                "New job request",
                format!("You received a direct job request: \"{title}\""),
            )
            .related(EntityKind::JobRequest, id),
        );
        scope.stage(request.clone());

        self.finish(scope).await?;
        info!(job_request_id = id, client_id, developer_id, %budget, "job request sent");
        Ok(request)
    }

    /// The developer accepts: escrow is released to them and the project
    /// starts.
    pub async fn accept_job_request(
        &self,
        request_id: JobRequestId,
        developer_id: UserId,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut request: JobRequest = scope.fetch(request_id).await?;
        authorize(
            developer_id,
            request.developer_id,
            EntityKind::JobRequest,
            request_id,
        )?;
        request.resolve(JobRequestStatus::Accepted, scope.now())?;

        self.ledger()
            .settle(&mut scope, request.escrow_payment_id, PaymentStatus::Completed)
            .await?;
        let project_id = scope.allocate::<Project>().await?;
        self.ledger()
            .credit(
                &mut scope,
                developer_id,
                request.budget,
                Payment::draft(PaymentKind::EscrowRelease)
                    .payer(request.client_id)
                    .job_request(request_id)
                    .project(project_id)
                    .describe(format!("escrow release for \"{}\"", request.title)),
            )
            .await?;

        let mut project = Project::new(
            project_id,
            request.client_id,
            developer_id,
            ProjectOrigin::JobRequest(request_id),
            request.budget,
            scope.now(),
        );
        project.payment_released = true;

        scope.notify(
            Notification::new(
                request.client_id,
                NotificationKind::JobRequest,
                "Job request accepted",
                format!("Your job request \"{}\" was accepted", request.title),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.notify(
            Notification::new(
                developer_id,
                NotificationKind::Payment,
                "Payment received",
                format!(
                    "{} was added to your balance for \"{}\"",
                    request.budget, request.title
                ),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.stage(project.clone());
        scope.stage(request);

        self.finish(scope).await?;
        info!(job_request_id = request_id, project_id, "job request accepted");
        Ok(project)
    }

    pub async fn decline_job_request(
        &self,
        request_id: JobRequestId,
        developer_id: UserId,
    ) -> Result<JobRequest> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut request: JobRequest = scope.fetch(request_id).await?;
        authorize(
            developer_id,
            request.developer_id,
            EntityKind::JobRequest,
            request_id,
        )?;
        request.resolve(JobRequestStatus::Declined, scope.now())?;
        self.refund_escrow(&mut scope, &request).await?;
        scope.notify(
            Notification::new(
                request.client_id,
                NotificationKind::JobRequest,
                "Job request declined",
                format!(
                    "Your job request \"{}\" was declined and {} was refunded",
                    request.title, request.budget
                ),
            )
            .related(EntityKind::JobRequest, request_id),
        );
        scope.stage(request.clone());

        self.finish(scope).await?;
        info!(job_request_id = request_id, "job request declined");
        Ok(request)
    }

    /// The client withdraws an unanswered offer and gets the escrow back.
    pub async fn cancel_job_request(
        &self,
        request_id: JobRequestId,
        client_id: UserId,
    ) -> Result<JobRequest> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut request: JobRequest = scope.fetch(request_id).await?;
        authorize(
            client_id,
            request.client_id,
            EntityKind::JobRequest,
            request_id,
        )?;
        request.resolve(JobRequestStatus::Cancelled, scope.now())?;
        self.refund_escrow(&mut scope, &request).await?;
        scope.notify(
            Notification::new(
                request.developer_id,
                NotificationKind::JobRequest,
                "Job request cancelled",
                format!("The job request \"{}\" was cancelled by the client", request.title),
            )
            .related(EntityKind::JobRequest, request_id),
        );
        scope.stage(request.clone());

        self.finish(scope).await?;
        info!(job_request_id = request_id, "job request cancelled");
        Ok(request)
    }

    async fn refund_escrow(&self, scope: &mut Scope<'_>, request: &JobRequest) -> Result<()> {
        self.ledger()
            .settle(scope, request.escrow_payment_id, PaymentStatus::Refunded)
            .await?;
        self.ledger()
            .credit(
                scope,
                request.client_id,
                request.budget,
                Payment::draft(PaymentKind::Refund)
                    .job_request(request.id)
                    .describe(format!("refund for \"{}\"", request.title)),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::application::test_support::Harness;
    use crate::domain::EntityKind;
    use crate::domain::job_request::JobRequestStatus;
    use crate::domain::payment::{PaymentKind, PaymentStatus};
    use crate::domain::project::{ProjectOrigin, ProjectStatus};
    use crate::error::EngineError;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_send_escrows_budget() {
        let h = Harness::new();
        let client = h.client(dec!(300)).await;
        let developer = h.developer().await;

        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await
            .unwrap();

        assert_eq!(request.status, JobRequestStatus::Pending);
        assert_eq!(
            h.engine.user(client).await.unwrap().balance.value(),
            dec!(180)
        );
        let escrow = h.engine.payment(request.escrow_payment_id).await.unwrap();
        assert_eq!(escrow.kind, PaymentKind::Escrow);
        assert_eq!(escrow.status, PaymentStatus::Pending);
        assert_eq!(escrow.payer_id, Some(client));
        assert_eq!(escrow.payee_id, None);
        assert_eq!(h.notifications_for(developer).await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_without_funds_writes_nothing() {
        let h = Harness::new();
        let client = h.client(dec!(50)).await;
        let developer = h.developer().await;

        let result = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await;
        assert!(matches!(
            result,
            Err(EngineError::InsufficientBalance { user_id, .. }) if user_id == client
        ));
        assert_eq!(
            h.engine.user(client).await.unwrap().balance.value(),
            dec!(50)
        );
        assert!(matches!(
            h.engine.job_request(1).await,
            Err(EngineError::NotFound {
                entity: EntityKind::JobRequest,
                ..
            })
        ));
        assert_eq!(h.engine.payments_for_user(client).await.unwrap().len(), 1);
        assert!(h.notifications_for(developer).await.is_empty());
    }

    #[tokio::test]
    async fn test_send_to_self_is_rejected() {
        let h = Harness::new();
        let client = h.client(dec!(50)).await;
        assert!(matches!(
            h.engine.send_job_request(client, client, "me", dec!(10)).await,
            Err(EngineError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_accept_pays_developer_and_starts_project() {
        let h = Harness::new();
        let client = h.client(dec!(300)).await;
        let developer = h.developer().await;
        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await
            .unwrap();

        let project = h
            .engine
            .accept_job_request(request.id, developer)
            .await
            .unwrap();

        assert_eq!(project.origin, ProjectOrigin::JobRequest(request.id));
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.progress, 0);
        assert!(project.payment_released);
        assert_eq!(
            h.engine.user(developer).await.unwrap().balance.value(),
            dec!(120)
        );
        assert_eq!(
            h.engine.user(client).await.unwrap().balance.value(),
            dec!(180)
        );

        let received = h.engine.payments_for_user(developer).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, PaymentKind::EscrowRelease);
        assert_eq!(received[0].status, PaymentStatus::Completed);
        assert_eq!(received[0].net_amount, dec!(120));
        assert_eq!(received[0].payer_id, Some(client));
        assert_eq!(
            h.engine
                .payment(request.escrow_payment_id)
                .await
                .unwrap()
                .status,
            PaymentStatus::Completed
        );
        assert_eq!(
            h.engine
                .projects_for_job_request(request.id)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(h.engine.available_balance(developer).await.unwrap(), dec!(120));
        assert!(!h.notifications_for(client).await.is_empty());
    }

    #[tokio::test]
    async fn test_decline_refunds_exactly() {
        let h = Harness::new();
        let client = h.client(dec!(300)).await;
        let developer = h.developer().await;
        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await
            .unwrap();

        let declined = h
            .engine
            .decline_job_request(request.id, developer)
            .await
            .unwrap();

        assert_eq!(declined.status, JobRequestStatus::Declined);
        assert_eq!(
            h.engine.user(client).await.unwrap().balance.value(),
            dec!(300)
        );
        assert_eq!(
            h.engine
                .payment(request.escrow_payment_id)
                .await
                .unwrap()
                .status,
            PaymentStatus::Refunded
        );
        assert!(
            h.engine
                .payments_for_user(client)
                .await
                .unwrap()
                .iter()
                .any(|p| p.kind == PaymentKind::Refund && p.payee_id == Some(client))
        );
        assert!(
            h.engine
                .projects_for_job_request(request.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(h.engine.available_balance(developer).await.unwrap(), dec!(0));
    }

    #[tokio::test]
    async fn test_second_response_is_already_processed() {
        let h = Harness::new();
        let client = h.client(dec!(300)).await;
        let developer = h.developer().await;
        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await
            .unwrap();
        h.engine
            .accept_job_request(request.id, developer)
            .await
            .unwrap();

        assert!(matches!(
            h.engine.decline_job_request(request.id, developer).await,
            Err(EngineError::AlreadyProcessed { .. })
        ));
        assert!(matches!(
            h.engine.accept_job_request(request.id, developer).await,
            Err(EngineError::AlreadyProcessed { .. })
        ));
        assert!(matches!(
            h.engine.cancel_job_request(request.id, client).await,
            Err(EngineError::AlreadyProcessed { .. })
        ));
        assert_eq!(
            h.engine.user(developer).await.unwrap().balance.value(),
            dec!(120)
        );
        assert_eq!(
            h.engine
                .projects_for_job_request(request.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_only_addressed_developer_responds() {
        let h = Harness::new();
        let client = h.client(dec!(300)).await;
        let developer = h.developer().await;
        let other = h.developer().await;
        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(120))
            .await
            .unwrap();

        assert!(matches!(
            h.engine.accept_job_request(request.id, other).await,
            Err(EngineError::Unauthorized { .. })
        ));
        assert!(matches!(
            h.engine.decline_job_request(request.id, client).await,
            Err(EngineError::Unauthorized { .. })
        ));
        assert_eq!(
            h.engine.job_request(request.id).await.unwrap().status,
            JobRequestStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_cancel_refunds_and_notifies_developer() {
        let h = Harness::new();
        let client = h.client(dec!(100)).await;
        let developer = h.developer().await;
        let request = h
            .engine
            .send_job_request(client, developer, "audit", dec!(100))
            .await
            .unwrap();

        assert!(matches!(
            h.engine.cancel_job_request(request.id, developer).await,
            Err(EngineError::Unauthorized { .. })
        ));
        let cancelled = h
            .engine
            .cancel_job_request(request.id, client)
            .await
            .unwrap();
        assert_eq!(cancelled.status, JobRequestStatus::Cancelled);
        assert_eq!(
            h.engine.user(client).await.unwrap().balance.value(),
            dec!(100)
        );
        assert!(
            h.notifications_for(developer)
                .await
                .iter()
                .any(|n| n.title == "Job request cancelled")
        );
    }
}
