//! Background push agent.
//!
//! The host wakes the agent with one [`AgentEvent`] at a time and keeps it
//! alive until the future returned by [`PushAgent::dispatch`] resolves, so
//! every effect of an event is awaited inside that future. The agent keeps no
//! state between events; everything is re-read from the host.

mod lifecycle;
mod push;
pub mod router;

use std::sync::Arc;

use tracing::Instrument;
use url::Url;

use crate::{
    cfg::Config,
    collaborator::ServerCollaborator,
    error::PushError,
    notification::{
        model::ShownNotification,
        svc::{DEFAULT_TAG, NotificationDefaults},
    },
    platform::{AgentHost, FetchRequest, FetchResponse},
    subscription::model::PushSubscription,
};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub origin: Url,
    /// Current cache generation; every other cache is dropped on activation.
    pub cache_name: String,
    /// Static assets seeded on install.
    pub precache: Vec<String>,
    pub notification: NotificationDefaults,
}

impl AgentConfig {
    pub fn from_config(config: &Config) -> Self {
        let origin = config.origin.clone();
        let precache = ["/", config.icon.as_str(), "/static/manifest.json"]
            .iter()
            .map(|path| match origin.join(path) {
                Ok(url) => url.to_string(),
                Err(_) => path.to_string(),
            })
            .collect();

        Self {
            cache_name: config.cache_name(),
            precache,
            notification: NotificationDefaults {
                product_name: config.product_name.clone(),
                icon: config.icon.clone(),
                badge: config.icon.clone(),
                tag: DEFAULT_TAG.to_string(),
                origin: origin.origin().ascii_serialization(),
            },
            origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
    Push {
        data: Option<Vec<u8>>,
    },
    NotificationClick {
        notification: ShownNotification,
        action: Option<String>,
    },
    /// The push service revoked or rotated `old`.
    SubscriptionChange {
        old: Option<PushSubscription>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
    SubscriptionChange,
}

impl AgentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AgentEvent::Install => EventKind::Install,
            AgentEvent::Activate => EventKind::Activate,
            AgentEvent::Fetch(_) => EventKind::Fetch,
            AgentEvent::Push { .. } => EventKind::Push,
            AgentEvent::NotificationClick { .. } => EventKind::NotificationClick,
            AgentEvent::SubscriptionChange { .. } => EventKind::SubscriptionChange,
        }
    }
}

#[derive(Debug)]
pub enum EventOutcome {
    Completed,
    /// Answer for an intercepted fetch.
    Responded(FetchResponse),
    Failed(PushError),
}

impl EventOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, EventOutcome::Failed(_))
    }
}

pub struct PushAgent<H, S> {
    host: Arc<H>,
    server: Arc<S>,
    config: AgentConfig,
}

impl<H, S> PushAgent<H, S>
where
    H: AgentHost,
    S: ServerCollaborator,
{
    pub fn new(host: Arc<H>, server: Arc<S>, config: AgentConfig) -> Self {
        Self {
            host,
            server,
            config,
        }
    }

    /// Runs the handler for `event`. A failing handler is logged and reported
    /// in the outcome; it never affects later events.
    pub async fn dispatch(&self, event: AgentEvent) -> EventOutcome {
        let kind = event.kind();
        let span = tracing::info_span!("agent_event", ?kind);

        let result = async {
            match event {
                AgentEvent::Install => self.install().await.map(|()| EventOutcome::Completed),
                AgentEvent::Activate => self.activate().await.map(|()| EventOutcome::Completed),
                AgentEvent::Fetch(request) => self.fetch(request).await.map(EventOutcome::Responded),
                AgentEvent::Push { data } => self
                    .show_push(data.as_deref())
                    .await
                    .map(|_| EventOutcome::Completed),
                AgentEvent::NotificationClick {
                    notification,
                    action,
                } => self
                    .route_click(&notification, action.as_deref())
                    .await
                    .map(|()| EventOutcome::Completed),
                AgentEvent::SubscriptionChange { old } => self
                    .rotate_subscription(old)
                    .await
                    .map(|()| EventOutcome::Completed),
            }
        }
        .instrument(span)
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(?kind, error = %e, "agent event handler failed");
            EventOutcome::Failed(e)
        })
    }
}
