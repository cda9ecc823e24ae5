use chrono::Utc;

use super::PushAgent;
use crate::{
    collaborator::ServerCollaborator,
    error::{PushError, RejectReason},
    notification::{
        model::{NotificationId, NotificationPayload},
        svc::Notification,
    },
    platform::AgentHost,
    subscription::model::{PushSubscription, SubscribeOptions},
};

impl<H, S> PushAgent<H, S>
where
    H: AgentHost,
    S: ServerCollaborator,
{
    /// Shows exactly one notification for an inbound push, whatever it carries.
    pub(crate) async fn show_push(&self, data: Option<&[u8]>) -> Result<NotificationId, PushError> {
        let payload = NotificationPayload::parse(data);
        let pending = Notification::compose(
            &payload,
            &self.config.notification,
            Utc::now().timestamp_millis(),
        );
        tracing::debug!(title = %pending.title, tag = ?pending.options.tag, "showing notification");

        match self.host.show_notification(&pending).await {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(error = %e, "notification refused, showing fallback");
                let fallback = Notification::fallback(&self.config.notification);
                Ok(self.host.show_notification(&fallback).await?)
            }
        }
    }

    /// Replaces a subscription the push service rotated away, with no page open.
    pub(crate) async fn rotate_subscription(
        &self,
        old: Option<PushSubscription>,
    ) -> Result<(), PushError> {
        let Some(old) = old else {
            tracing::warn!("subscription changed without the old subscription, nothing to renew");
            return Ok(());
        };
        let Some(key) = old.application_server_key().cloned() else {
            tracing::warn!(endpoint = %old.endpoint, "old subscription has no server key, cannot renew");
            return Ok(());
        };

        let renewed = self
            .host
            .subscribe(&SubscribeOptions::user_visible(key))
            .await
            .map_err(|e| PushError::SubscriptionRejected(RejectReason::from(e)))?;
        if !renewed.has_encryption_keys() {
            return Err(PushError::SubscriptionRejected(RejectReason::MissingKeys));
        }

        self.server
            .save_subscription(&renewed)
            .await
            .map_err(|e| PushError::ServerSyncFailed(format!("{e:#}")))?;
        tracing::info!(old = %old.endpoint, new = %renewed.endpoint, "subscription renewed");

        if renewed.endpoint != old.endpoint {
            if let Err(e) = self.server.remove_subscription(&old.endpoint).await {
                tracing::warn!(endpoint = %old.endpoint, error = %format!("{e:#}"), "stale subscription left on server");
            }
        }
        Ok(())
    }
}
