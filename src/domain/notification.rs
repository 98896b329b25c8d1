use super::{EntityKind, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Job,
    Proposal,
    JobRequest,
    Project,
    Payment,
    Withdrawal,
}

/// A user-visible message produced by a committed transition.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Notification {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<u64>,
    pub related_type: Option<EntityKind>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
            related_id: None,
            related_type: None,
        }
    }

    pub fn related(mut self, entity: EntityKind, id: u64) -> Self {
        self.related_id = Some(id);
        self.related_type = Some(entity);
        self
    }
}
