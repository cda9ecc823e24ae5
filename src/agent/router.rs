//! Notification click routing: reuse a matching window, otherwise open one.

use url::Url;

use super::PushAgent;
use crate::{
    collaborator::ServerCollaborator,
    error::PushError,
    notification::model::ShownNotification,
    platform::{AgentHost, WindowClient},
};

/// Action id that dismisses without navigating.
pub const CLOSE_ACTION: &str = "close";

/// Where a click on `notification` should land. Relative URLs resolve against
/// `origin`; anything missing or unparsable lands on the origin root.
pub fn resolve_target(notification: &ShownNotification, origin: &Url) -> Url {
    let root = origin_root(origin);
    notification
        .options
        .data
        .as_ref()
        .and_then(|data| data.url.as_deref())
        .filter(|url| !url.trim().is_empty())
        .and_then(|url| origin.join(url).ok())
        .unwrap_or(root)
}

pub fn origin_root(origin: &Url) -> Url {
    origin.join("/").unwrap_or_else(|_| origin.clone())
}

fn find_window<'a>(clients: &'a [WindowClient], target: &Url) -> Option<&'a WindowClient> {
    clients.iter().find(|client| {
        client.focusable
            && match Url::parse(&client.url) {
                Ok(url) => &url == target,
                Err(_) => client.url == target.as_str(),
            }
    })
}

impl<H, S> PushAgent<H, S>
where
    H: AgentHost,
    S: ServerCollaborator,
{
    pub(crate) async fn route_click(
        &self,
        notification: &ShownNotification,
        action: Option<&str>,
    ) -> Result<(), PushError> {
        if let Err(e) = self.host.close_notification(notification.id).await {
            tracing::warn!(id = ?notification.id, error = %e, "closing notification failed");
        }
        if action == Some(CLOSE_ACTION) {
            tracing::debug!("close action, not navigating");
            return Ok(());
        }

        let target = resolve_target(notification, &self.config.origin);
        let clients = self.host.match_all_windows(true).await?;
        if let Some(client) = find_window(&clients, &target) {
            tracing::info!(%target, client = ?client.id, "focusing existing window");
            self.host.focus(client.id).await?;
            return Ok(());
        }

        tracing::info!(%target, "opening new window");
        match self.host.open_window(target.as_str()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let root = origin_root(&self.config.origin);
                if root == target {
                    return Err(e.into());
                }
                tracing::warn!(%target, error = %e, "open failed, falling back to origin root");
                self.host.open_window(root.as_str()).await?;
                Ok(())
            }
        }
    }
}
