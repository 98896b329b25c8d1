use super::engine::{MarketplaceEngine, authorize, require_admin};
use super::scope::Scope;
use crate::domain::job::{Job, JobStatus};
use crate::domain::money::Amount;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::proposal::{Proposal, ProposalStatus};
use crate::domain::user::User;
use crate::domain::{EntityKind, JobId, UserId};
use crate::error::Result;
use rust_decimal::Decimal;
use tracing::info;

impl MarketplaceEngine {
    pub async fn post_job(&self, client_id: UserId, title: &str, budget: Decimal) -> Result<Job> {
        Amount::new(budget)?;
        let _gate = self.lock().await;
        let mut scope = self.scope();

        scope.fetch::<User>(client_id).await?;
        let id = scope.allocate::<Job>().await?;
        let job = Job::new(id, client_id, title, budget, scope.now());
        scope.stage(job.clone());

        self.finish(scope).await?;
        info!(job_id = id, client_id, %budget, "job posted");
        Ok(job)
    }

    /// Withdraws an open job from the marketplace. Pending proposals are
    /// rejected.
    pub async fn cancel_job(&self, job_id: JobId, client_id: UserId) -> Result<Job> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut job: Job = scope.fetch(job_id).await?;
        authorize(client_id, job.client_id, EntityKind::Job, job_id)?;
        job.transition(JobStatus::Cancelled, scope.now())?;
        reject_pending(&mut scope, &job, "the job was cancelled by the client").await?;
        scope.stage(job.clone());

        self.finish(scope).await?;
        info!(job_id, "job cancelled");
        Ok(job)
    }

    /// Administrative close of an open or in-progress job.
    pub async fn close_job(&self, job_id: JobId, admin_id: UserId) -> Result<Job> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        require_admin(&scope, admin_id, EntityKind::Job, job_id).await?;
        let mut job: Job = scope.fetch(job_id).await?;
        job.transition(JobStatus::Closed, scope.now())?;
        reject_pending(&mut scope, &job, "the job was closed").await?;
        scope.notify(
            Notification::new(
                job.client_id,
                NotificationKind::Job,
                "Job closed",
                format!("Your job \"{}\" was closed by an administrator", job.title),
            )
            .related(EntityKind::Job, job_id),
        );
        scope.stage(job.clone());

        self.finish(scope).await?;
        info!(job_id, admin_id, "job closed");
        Ok(job)
    }
}

async fn reject_pending(scope: &mut Scope<'_>, job: &Job, reason: &str) -> Result<()> {
    let pending = scope
        .select(|p: &Proposal| p.job_id == job.id && p.status == ProposalStatus::Pending)
        .await?;
    for mut proposal in pending {
        proposal.transition(ProposalStatus::Rejected, scope.now())?;
        scope.notify(
            Notification::new(
                proposal.developer_id,
                NotificationKind::Proposal,
                "Proposal rejected",
                format!("Your proposal for \"{}\" was rejected: {reason}", job.title),
            )
            .related(EntityKind::Proposal, proposal.id),
        );
        scope.stage(proposal);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::application::test_support::Harness;
    use crate::domain::EntityKind;
    use crate::domain::job::JobStatus;
    use crate::domain::proposal::ProposalStatus;
    use crate::error::EngineError;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_post_job_opens_with_no_proposals() {
        let h = Harness::new();
        let client = h.client(dec!(0)).await;

        let job = h.engine.post_job(client, "mobile app", dec!(900)).await.unwrap();
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.proposals_count, 0);
        assert_eq!(job.assigned_developer_id, None);
    }

    #[tokio::test]
    async fn test_post_job_rejects_zero_budget() {
        let h = Harness::new();
        let client = h.client(dec!(0)).await;
        assert!(matches!(
            h.engine.post_job(client, "free work", dec!(0)).await,
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_job_rejects_pending_proposals() {
        let h = Harness::new();
        let client = h.client(dec!(0)).await;
        let developer = h.developer().await;
        let job = h.job(client, dec!(100)).await;
        let proposal = h
            .engine
            .submit_proposal(job, developer, dec!(90), "pick me")
            .await
            .unwrap();

        let job = h.engine.cancel_job(job, client).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(
            h.engine.proposal(proposal.id).await.unwrap().status,
            ProposalStatus::Rejected
        );
        assert!(
            h.notifications_for(developer)
                .await
                .iter()
                .any(|n| n.title == "Proposal rejected")
        );
    }

    #[tokio::test]
    async fn test_only_owner_cancels() {
        let h = Harness::new();
        let client = h.client(dec!(0)).await;
        let stranger = h.client(dec!(0)).await;
        let job = h.job(client, dec!(100)).await;

        assert!(matches!(
            h.engine.cancel_job(job, stranger).await,
            Err(EngineError::Unauthorized {
                entity: EntityKind::Job,
                ..
            })
        ));
        assert_eq!(h.engine.job(job).await.unwrap().status, JobStatus::Open);
    }

    #[tokio::test]
    async fn test_close_requires_admin_and_works_in_progress() {
        let h = Harness::new();
        let client = h.client(dec!(0)).await;
        let developer = h.developer().await;
        let admin = h.admin().await;
        let job = h.job(client, dec!(100)).await;
        let proposal = h
            .engine
            .submit_proposal(job, developer, dec!(90), "")
            .await
            .unwrap();
        h.engine.accept_proposal(proposal.id, client).await.unwrap();

        assert!(matches!(
            h.engine.close_job(job, client).await,
            Err(EngineError::Unauthorized { .. })
        ));
        let job = h.engine.close_job(job, admin).await.unwrap();
        assert_eq!(job.status, JobStatus::Closed);
        assert!(matches!(
            h.engine.close_job(job.id, admin).await,
            Err(EngineError::InvalidState { from: "closed", .. })
        ));
    }
}
