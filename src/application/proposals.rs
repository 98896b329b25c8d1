use super::engine::{MarketplaceEngine, authorize};
use crate::domain::job::{Job, JobStatus};
use crate::domain::lifecycle::Lifecycle;
use crate::domain::money::Amount;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::project::{Project, ProjectOrigin};
use crate::domain::proposal::{Proposal, ProposalStatus};
use crate::domain::user::User;
use crate::domain::{EntityKind, JobId, ProposalId, UserId};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use tracing::info;

impl MarketplaceEngine {
    pub async fn submit_proposal(
        &self,
        job_id: JobId,
        developer_id: UserId,
        proposed_budget: Decimal,
        cover_letter: &str,
    ) -> Result<Proposal> {
        Amount::new(proposed_budget)?;
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut job: Job = scope.fetch(job_id).await?;
        scope.fetch::<User>(developer_id).await?;
        if developer_id == job.client_id {
            return Err(EngineError::SelfApplication(job_id));
        }
        if job.status != JobStatus::Open {
            return Err(EngineError::JobNotOpen(job_id));
        }
        let existing = scope
            .select(|p: &Proposal| p.job_id == job_id && p.developer_id == developer_id)
            .await?;
        if !existing.is_empty() {
            return Err(EngineError::DuplicateProposal {
                job_id,
                developer_id,
            });
        }

        let id = scope.allocate::<Proposal>().await?;
        let proposal = Proposal::new(
            id,
            job_id,
            developer_id,
            proposed_budget,
            cover_letter,
            scope.now(),
        );
        job.proposal_received(scope.now());
        scope.notify(
            Notification::new(
                job.client_id,
                NotificationKind::Proposal,
                "New proposal",
                format!("You received a new proposal for \"{}\"", job.title),
            )
            .related(EntityKind::Proposal, id),
        );
        scope.stage(proposal.clone());
        scope.stage(job);

        self.finish(scope).await?;
        info!(proposal_id = id, job_id, developer_id, "proposal submitted");
        Ok(proposal)
    }

    /// Accepts one proposal and turns it into a project.
    ///
    /// In the same commit the job moves to `in_progress`, every other live
    /// proposal on the job is rejected, and exactly one project is created, so
    /// no reader ever sees two accepted proposals for a job.
    pub async fn accept_proposal(
        &self,
        proposal_id: ProposalId,
        client_id: UserId,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut proposal: Proposal = scope.fetch(proposal_id).await?;
        let mut job: Job = scope.fetch(proposal.job_id).await?;
        authorize(client_id, job.client_id, EntityKind::Proposal, proposal_id)?;
        proposal
            .status
            .require(proposal_id, ProposalStatus::Pending)?;
        job.status.require(job.id, JobStatus::Open)?;

        let existing = scope
            .select(|p: &Project| p.job_id() == Some(job.id))
            .await?;
        if !existing.is_empty() {
            return Err(EngineError::AlreadyProcessed {
                entity: EntityKind::Job,
                id: job.id,
            });
        }

        proposal.transition(ProposalStatus::Accepted, scope.now())?;
        job.assign(proposal.developer_id, scope.now())?;

        let siblings = scope
            .select(|p: &Proposal| p.job_id == job.id && p.id != proposal_id && p.is_live())
            .await?;
        for mut sibling in siblings {
            sibling.transition(ProposalStatus::Rejected, scope.now())?;
            scope.notify(
                Notification::new(
                    sibling.developer_id,
                    NotificationKind::Proposal,
                    "Proposal rejected",
                    format!("Another proposal was accepted for \"{}\"", job.title),
                )
                .related(EntityKind::Proposal, sibling.id),
            );
            scope.stage(sibling);
        }

        let project_id = scope.allocate::<Project>().await?;
        let project = Project::new(
            project_id,
            job.client_id,
            proposal.developer_id,
            ProjectOrigin::Job(job.id),
            proposal.proposed_budget,
            scope.now(),
        );
        scope.notify(
            Notification::new(
                proposal.developer_id,
                NotificationKind::Proposal,
                "Proposal accepted",
                format!("Your proposal for \"{}\" was accepted", job.title),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.stage(project.clone());
        scope.stage(proposal);
        scope.stage(job);

        self.finish(scope).await?;
        info!(proposal_id, project_id, "proposal accepted");
        Ok(project)
    }

    pub async fn reject_proposal(
        &self,
        proposal_id: ProposalId,
        client_id: UserId,
    ) -> Result<Proposal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut proposal: Proposal = scope.fetch(proposal_id).await?;
        let job: Job = scope.fetch(proposal.job_id).await?;
        authorize(client_id, job.client_id, EntityKind::Proposal, proposal_id)?;
        proposal
            .status
            .require(proposal_id, ProposalStatus::Pending)?;
        proposal.transition(ProposalStatus::Rejected, scope.now())?;

        scope.notify(
            Notification::new(
                proposal.developer_id,
                NotificationKind::Proposal,
                "Proposal rejected",
                format!("Your proposal for \"{}\" was rejected", job.title),
            )
            .related(EntityKind::Proposal, proposal_id),
        );
        scope.stage(proposal.clone());

        self.finish(scope).await?;
        info!(proposal_id, "proposal rejected");
        Ok(proposal)
    }

    pub async fn withdraw_proposal(
        &self,
        proposal_id: ProposalId,
        developer_id: UserId,
    ) -> Result<Proposal> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut proposal: Proposal = scope.fetch(proposal_id).await?;
        authorize(
            developer_id,
            proposal.developer_id,
            EntityKind::Proposal,
            proposal_id,
        )?;
        proposal.transition(ProposalStatus::Withdrawn, scope.now())?;

        let mut job: Job = scope.fetch(proposal.job_id).await?;
        job.proposal_withdrawn(scope.now());
        scope.notify(
            Notification::new(
                job.client_id,
                NotificationKind::Proposal,
                "Proposal withdrawn",
                format!("A developer withdrew their proposal for \"{}\"", job.title),
            )
            .related(EntityKind::Job, job.id),
        );
        scope.stage(proposal.clone());
        scope.stage(job);

        self.finish(scope).await?;
        info!(proposal_id, "proposal withdrawn");
        Ok(proposal)
    }

    /// The developer marks accepted work as done: the proposal, its job and
    /// its project all become `completed`. Repeating the call is a no-op.
    pub async fn complete_proposal(
        &self,
        proposal_id: ProposalId,
        developer_id: UserId,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut proposal: Proposal = scope.fetch(proposal_id).await?;
        authorize(
            developer_id,
            proposal.developer_id,
            EntityKind::Proposal,
            proposal_id,
        )?;
        let mut project = scope
            .select(|p: &Project| p.job_id() == Some(proposal.job_id))
            .await?
            .into_iter()
            .find(|p| p.developer_id == developer_id)
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Project,
                id: proposal.job_id,
            })?;
        if proposal.status == ProposalStatus::Completed {
            return Ok(project);
        }

        proposal.transition(ProposalStatus::Completed, scope.now())?;
        let mut job: Job = scope.fetch(proposal.job_id).await?;
        job.transition(JobStatus::Completed, scope.now())?;
        project.complete(scope.now())?;

        scope.notify(
            Notification::new(
                job.client_id,
                NotificationKind::Project,
                "Project completed",
                format!("\"{}\" was marked as completed by the developer", job.title),
            )
            .related(EntityKind::Project, project.id),
        );
        scope.stage(proposal);
        scope.stage(job);
        scope.stage(project.clone());

        self.finish(scope).await?;
        info!(proposal_id, project_id = project.id, "proposal completed");
        Ok(project)
    }
}
