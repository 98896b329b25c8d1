use crate::domain::notification::Notification;
use crate::domain::ports::Notifier;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

enum Envelope {
    Deliver(Notification),
    Flush(oneshot::Sender<()>),
}

/// Queues notifications for a background task that hands them to the
/// [`Notifier`].
///
/// Publishing never blocks and never fails the caller: a delivery error or a
/// closed queue is logged and dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl NotificationDispatcher {
    /// Spawns the delivery task on the current Tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Envelope>();

        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                match envelope {
                    Envelope::Deliver(notification) => {
                        if let Err(e) = notifier.notify(&notification).await {
                            warn!(
                                user_id = notification.user_id,
                                title = %notification.title,
                                "notification delivery failed: {}",
                                e
                            );
                        }
                    }
                    Envelope::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { sender }
    }

    pub fn publish(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if self.sender.send(Envelope::Deliver(notification)).is_err() {
                warn!("notification queue closed, dropping notification");
                return;
            }
        }
    }

    /// Resolves once everything published before the call has been handed to
    /// the notifier.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Envelope::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}
