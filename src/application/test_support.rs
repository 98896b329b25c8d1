use super::engine::MarketplaceEngine;
use crate::config::EngineConfig;
use crate::domain::notification::Notification;
use crate::domain::user::UserRole;
use crate::domain::{JobId, UserId};
use crate::infrastructure::in_memory::InMemoryStore;
use crate::infrastructure::notifier::RecordingNotifier;
use rust_decimal::Decimal;
use std::sync::Arc;

pub(crate) struct Harness {
    pub engine: MarketplaceEngine,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        let notifier = RecordingNotifier::new();
        let engine = MarketplaceEngine::new(
            Box::new(InMemoryStore::new()),
            Arc::new(notifier.clone()),
            EngineConfig::default(),
        );
        Self { engine, notifier }
    }

    pub async fn client(&self, balance: Decimal) -> UserId {
        let user = self
            .engine
            .open_account("client", UserRole::Client)
            .await
            .unwrap();
        if balance > Decimal::ZERO {
            self.engine.top_up(user.id, balance).await.unwrap();
        }
        user.id
    }

    pub async fn developer(&self) -> UserId {
        self.engine
            .open_account("developer", UserRole::Developer)
            .await
            .unwrap()
            .id
    }

    pub async fn admin(&self) -> UserId {
        self.engine
            .open_account("admin", UserRole::Admin)
            .await
            .unwrap()
            .id
    }

    pub async fn job(&self, client: UserId, budget: Decimal) -> JobId {
        self.engine
            .post_job(client, "build an api", budget)
            .await
            .unwrap()
            .id
    }

    pub async fn notifications_for(&self, user_id: UserId) -> Vec<Notification> {
        self.engine.flush_notifications().await;
        self.notifier.delivered_to(user_id).await
    }
}
