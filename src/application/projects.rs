use super::engine::{MarketplaceEngine, authorize};
use crate::domain::lifecycle::Lifecycle;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::payment::{Payment, PaymentKind};
use crate::domain::project::{Project, ProjectStatus};
use crate::domain::{EntityKind, ProjectId, UserId};
use crate::error::{EngineError, Result};
use tracing::info;

impl MarketplaceEngine {
    /// Stores the developer's progress, clamped to `0..=100`, and tells the
    /// client.
    pub async fn update_progress(
        &self,
        project_id: ProjectId,
        developer_id: UserId,
        progress: i64,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut project: Project = scope.fetch(project_id).await?;
        authorize(
            developer_id,
            project.developer_id,
            EntityKind::Project,
            project_id,
        )?;
        project
            .status
            .require(project_id, ProjectStatus::Active)?;
        let stored = project.set_progress(progress, scope.now());
        scope.notify(
            Notification::new(
                project.client_id,
                NotificationKind::Project,
                "Project progress",
                format!("Project #{project_id} is now {stored}% complete"),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.stage(project.clone());

        self.finish(scope).await?;
        info!(project_id, progress = stored, "project progress updated");
        Ok(project)
    }

    /// Client-side completion. Completing a completed project returns it
    /// unchanged.
    pub async fn complete_project(
        &self,
        project_id: ProjectId,
        client_id: UserId,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut project: Project = scope.fetch(project_id).await?;
        authorize(client_id, project.client_id, EntityKind::Project, project_id)?;
        if !project.complete(scope.now())? {
            return Ok(project);
        }
        scope.notify(
            Notification::new(
                project.developer_id,
                NotificationKind::Project,
                "Project completed",
                format!("Project #{project_id} was marked as completed by the client"),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.stage(project.clone());

        self.finish(scope).await?;
        info!(project_id, "project completed");
        Ok(project)
    }

    pub async fn hold_project(&self, project_id: ProjectId, actor: UserId) -> Result<Project> {
        self.move_project(project_id, actor, ProjectStatus::OnHold, "put on hold")
            .await
    }

    pub async fn resume_project(&self, project_id: ProjectId, actor: UserId) -> Result<Project> {
        self.move_project(project_id, actor, ProjectStatus::Active, "resumed")
            .await
    }

    pub async fn cancel_project(
        &self,
        project_id: ProjectId,
        client_id: UserId,
    ) -> Result<Project> {
        self.move_project(project_id, client_id, ProjectStatus::Cancelled, "cancelled")
            .await
    }

    /// Pays the developer of a completed marketplace project: the project
    /// budget moves from the client's balance to the developer's under one
    /// `settlement` payment.
    pub async fn release_payment(
        &self,
        project_id: ProjectId,
        client_id: UserId,
    ) -> Result<Payment> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut project: Project = scope.fetch(project_id).await?;
        authorize(client_id, project.client_id, EntityKind::Project, project_id)?;
        if project.payment_released {
            return Err(EngineError::AlreadyProcessed {
                entity: EntityKind::Project,
                id: project_id,
            });
        }
        project
            .status
            .require(project_id, ProjectStatus::Completed)?;

        let payment = self
            .ledger()
            .transfer(
                &mut scope,
                client_id,
                project.developer_id,
                project.budget,
                Payment::draft(PaymentKind::Settlement)
                    .project(project_id)
                    .describe(format!("settlement for project #{project_id}")),
            )
            .await?;
        project.payment_released = true;
        project.updated_at = scope.now();
        scope.notify(
            Notification::new(
                project.developer_id,
                NotificationKind::Payment,
                "Payment received",
                format!(
                    "{} was added to your balance for project #{project_id}",
                    project.budget
                ),
            )
            .related(EntityKind::Payment, payment.id),
        );
        scope.stage(project);

        self.finish(scope).await?;
        info!(project_id, payment_id = payment.id, "project payment released");
        Ok(payment)
    }

    async fn move_project(
        &self,
        project_id: ProjectId,
        actor: UserId,
        next: ProjectStatus,
        verb: &str,
    ) -> Result<Project> {
        let _gate = self.lock().await;
        let mut scope = self.scope();

        let mut project: Project = scope.fetch(project_id).await?;
        let client_only = next == ProjectStatus::Cancelled;
        let counterpart = if actor == project.client_id {
            project.developer_id
        } else if actor == project.developer_id && !client_only {
            project.client_id
        } else {
            return Err(EngineError::Unauthorized {
                actor,
                entity: EntityKind::Project,
                id: project_id,
            });
        };
        project.transition(next, scope.now())?;
        scope.notify(
            Notification::new(
                counterpart,
                NotificationKind::Project,
                "Project status changed",
                format!("Project #{project_id} was {verb}"),
            )
            .related(EntityKind::Project, project_id),
        );
        scope.stage(project.clone());

        self.finish(scope).await?;
        info!(project_id, status = next.as_str(), "project status changed");
        Ok(project)
    }
}
