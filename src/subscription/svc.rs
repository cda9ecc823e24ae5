use std::sync::Arc;

use tokio::sync::Mutex;

use super::model::{PushSubscription, SubscribeOptions, UnsubscribeOutcome};
use crate::{
    cfg::{AGENT_SCOPE, AGENT_SCRIPT_URL},
    codec::PublicKey,
    collaborator::{ServerCollaborator, TestPushReceipt},
    error::{PushError, RejectReason},
    platform::{PagePlatform, Permission, PermissionState},
};

/// Page-side owner of the push subscription lifecycle.
///
/// Holds no subscription state of its own: the platform is asked every time,
/// the server is told every time. `subscribe` and `unsubscribe` are serialised
/// so overlapping calls cannot leave two live subscriptions behind.
pub struct SubscriptionManager<P, S> {
    platform: Arc<P>,
    server: Arc<S>,
    op_lock: Mutex<()>,
}

impl<P, S> SubscriptionManager<P, S>
where
    P: PagePlatform,
    S: ServerCollaborator,
{
    pub fn new(platform: Arc<P>, server: Arc<S>) -> Self {
        Self {
            platform,
            server,
            op_lock: Mutex::new(()),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.platform.supports_agent() && self.platform.supports_push()
    }

    fn ensure_supported(&self) -> Result<(), PushError> {
        if self.is_supported() {
            Ok(())
        } else {
            tracing::info!("push notifications not supported");
            Err(PushError::UnsupportedPlatform)
        }
    }

    /// Registers the background agent over the whole origin.
    pub async fn register(&self) -> Result<(), PushError> {
        self.ensure_supported()?;
        self.platform
            .register_agent(AGENT_SCRIPT_URL, AGENT_SCOPE)
            .await?;
        tracing::info!(script = AGENT_SCRIPT_URL, scope = AGENT_SCOPE, "agent registered");
        Ok(())
    }

    /// Replaces any existing subscription with a fresh one the server knows about.
    ///
    /// `Ok(false)` means the user did not grant notification permission and
    /// nothing else was attempted.
    pub async fn subscribe(&self) -> Result<bool, PushError> {
        self.ensure_supported()?;
        let _guard = self.op_lock.lock().await;

        match self.resubscribe().await {
            Ok(Some(subscription)) => {
                tracing::info!(endpoint = %subscription.endpoint, "subscribed to push notifications");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "push subscription failed");
                Err(e)
            }
        }
    }

    async fn resubscribe(&self) -> Result<Option<PushSubscription>, PushError> {
        let permission = match self.platform.request_notification_permission().await {
            Ok(permission) => permission,
            Err(e) => {
                tracing::warn!(error = %e, "notification permission request failed");
                Permission::Denied
            }
        };
        tracing::debug!(?permission, "notification permission");
        if permission != Permission::Granted {
            return Ok(None);
        }

        let encoded = self
            .server
            .fetch_public_key()
            .await
            .map_err(|e| PushError::KeyFetchFailed(format!("{e:#}")))?;
        let key = PublicKey::parse(&encoded)?;

        self.platform
            .agent_ready()
            .await
            .map_err(PushError::AgentNotReady)?;

        let options = SubscribeOptions::user_visible(key);
        let state = match self.platform.permission_state(&options).await {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(error = %e, "push permission query unavailable, using notification permission");
                self.platform.notification_permission().into()
            }
        };
        if state == PermissionState::Denied {
            return Err(PushError::PermissionDenied);
        }

        if let Some(existing) = self.platform.get_subscription().await? {
            tracing::debug!(endpoint = %existing.endpoint, "dropping existing subscription");
            self.platform.unsubscribe(&existing.endpoint).await?;
            if let Err(e) = self.server.remove_subscription(&existing.endpoint).await {
                tracing::debug!(endpoint = %existing.endpoint, error = %format!("{e:#}"), "stale subscription left on server");
            }
        }

        let subscription = self
            .platform
            .subscribe(&options)
            .await
            .map_err(|e| PushError::SubscriptionRejected(RejectReason::from(e)))?;
        if !subscription.has_encryption_keys() {
            return Err(PushError::SubscriptionRejected(RejectReason::MissingKeys));
        }

        // The platform subscription stays live if this fails; the next
        // subscribe() replaces it anyway.
        self.server
            .save_subscription(&subscription)
            .await
            .map_err(|e| PushError::ServerSyncFailed(format!("{e:#}")))?;

        Ok(Some(subscription))
    }

    /// Cancels the live subscription, then tells the server on a best-effort basis.
    pub async fn unsubscribe(&self) -> Result<UnsubscribeOutcome, PushError> {
        self.ensure_supported()?;
        let _guard = self.op_lock.lock().await;

        self.platform
            .agent_ready()
            .await
            .map_err(PushError::AgentNotReady)?;
        let Some(subscription) = self.platform.get_subscription().await? else {
            return Ok(UnsubscribeOutcome::NotSubscribed);
        };
        let endpoint = subscription.endpoint;

        self.platform.unsubscribe(&endpoint).await?;

        match self.server.remove_subscription(&endpoint).await {
            Ok(()) => {
                tracing::info!(%endpoint, "unsubscribed from push notifications");
                Ok(UnsubscribeOutcome::Removed { endpoint })
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(%endpoint, error = %reason, "unsubscribed locally, server still holds the subscription");
                Ok(UnsubscribeOutcome::ServerPending { endpoint, reason })
            }
        }
    }

    /// Whether a live subscription exists. Never creates or removes one.
    pub async fn check_status(&self) -> bool {
        if !self.is_supported() {
            return false;
        }
        if let Err(e) = self.platform.agent_ready().await {
            tracing::warn!(error = %e, "agent not ready while checking push status");
            return false;
        }
        match self.platform.get_subscription().await {
            Ok(subscription) => subscription.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "reading push subscription failed");
                false
            }
        }
    }

    /// Asks the server to push `message` to every subscriber.
    pub async fn send_test(&self, message: &str) -> Result<TestPushReceipt, PushError> {
        self.ensure_supported()?;
        let receipt = self
            .server
            .send_test(message)
            .await
            .map_err(|e| PushError::ServerSyncFailed(format!("{e:#}")))?;
        tracing::info!(status = ?receipt.status, message = ?receipt.message, "test notification requested");
        Ok(receipt)
    }
}
