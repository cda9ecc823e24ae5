//! Browser capabilities the pipeline is written against.
//!
//! Page-side code sees a [`PagePlatform`]; the background agent sees an
//! [`AgentHost`]. Both reach the same [`PushManager`]. Nothing here holds
//! references across events: subscriptions are addressed by endpoint, window
//! clients by [`ClientId`] and notifications by [`NotificationId`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::PlatformError,
    notification::model::{NotificationId, PendingNotification},
    subscription::model::{PushSubscription, SubscribeOptions},
};

/// Notification permission as the user granted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

/// Permission state reported by the push capability itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

impl From<Permission> for PermissionState {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Granted => PermissionState::Granted,
            Permission::Denied => PermissionState::Denied,
            Permission::Default => PermissionState::Prompt,
        }
    }
}

#[async_trait]
pub trait PushManager: Send + Sync {
    /// Some platforms do not implement this query and return `NotSupported`.
    async fn permission_state(
        &self,
        options: &SubscribeOptions,
    ) -> Result<PermissionState, PlatformError>;

    async fn get_subscription(&self) -> Result<Option<PushSubscription>, PlatformError>;

    async fn subscribe(&self, options: &SubscribeOptions)
    -> Result<PushSubscription, PlatformError>;

    /// Cancels the subscription with this endpoint. `false` if it was not live.
    async fn unsubscribe(&self, endpoint: &str) -> Result<bool, PlatformError>;
}

/// What a page can reach: agent registration, notification permission and push.
#[async_trait]
pub trait PagePlatform: PushManager {
    fn supports_agent(&self) -> bool;

    fn supports_push(&self) -> bool;

    fn notification_permission(&self) -> Permission;

    async fn request_notification_permission(&self) -> Result<Permission, PlatformError>;

    async fn register_agent(&self, script_url: &str, scope: &str) -> Result<(), PlatformError>;

    /// Resolves once an agent for this origin is active.
    async fn agent_ready(&self) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Fetches every URL and stores all of them in `cache`, or none of them.
    async fn add_all(&self, cache: &str, urls: &[String]) -> Result<(), PlatformError>;

    async fn cache_names(&self) -> Result<Vec<String>, PlatformError>;

    async fn delete_cache(&self, cache: &str) -> Result<bool, PlatformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// A window the platform reports during client enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: ClientId,
    pub url: String,
    pub focusable: bool,
}

#[async_trait]
pub trait Clients: Send + Sync {
    async fn claim(&self) -> Result<(), PlatformError>;

    async fn match_all_windows(
        &self,
        include_uncontrolled: bool,
    ) -> Result<Vec<WindowClient>, PlatformError>;

    async fn focus(&self, client: ClientId) -> Result<(), PlatformError>;

    async fn open_window(&self, url: &str) -> Result<ClientId, PlatformError>;
}

#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn show_notification(
        &self,
        notification: &PendingNotification,
    ) -> Result<NotificationId, PlatformError>;

    async fn close_notification(&self, id: NotificationId) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError>;
}

/// Everything the background agent can reach from its own global scope.
#[async_trait]
pub trait AgentHost: PushManager + CacheStorage + Clients + NotificationCenter + Network {
    /// Lets a freshly installed agent replace the old one without waiting.
    async fn skip_waiting(&self) -> Result<(), PlatformError>;
}
