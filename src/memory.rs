//! In-memory platform and server collaborator.
//!
//! Behaves like a single browser profile: one push manager, one cache storage,
//! a set of open windows and a notification tray. Every call is recorded so
//! callers can check what the pipeline asked the platform to do.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use url::Url;

use crate::{
    codec,
    collaborator::{ServerCollaborator, TestPushReceipt},
    error::PlatformError,
    notification::model::{NotificationId, PendingNotification, ShownNotification},
    platform::{
        AgentHost, CacheStorage, ClientId, Clients, FetchRequest, FetchResponse, Network,
        NotificationCenter, PagePlatform, Permission, PermissionState, PushManager, WindowClient,
    },
    subscription::model::{PushSubscription, PushSubscriptionKeys, SubscribeOptions},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    RegisterAgent { script: String, scope: String },
    RequestPermission,
    PermissionState,
    AgentReady,
    GetSubscription,
    Subscribe,
    Unsubscribe(String),
    AddAll(String),
    CacheNames,
    DeleteCache(String),
    Claim,
    SkipWaiting,
    ShowNotification(String),
    CloseNotification(NotificationId),
    MatchAllWindows { include_uncontrolled: bool },
    Focus(ClientId),
    OpenWindow(String),
    Fetch(String),
}

#[derive(Debug)]
struct PlatformState {
    supports_agent: bool,
    supports_push: bool,
    permission: Permission,
    push_permission: Option<PermissionState>,
    agent_ready_error: Option<PlatformError>,
    subscribe_error: Option<PlatformError>,
    omit_keys: bool,
    live: Vec<PushSubscription>,
    assets: BTreeMap<String, Vec<u8>>,
    caches: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    windows: Vec<WindowClient>,
    failing_windows: BTreeSet<String>,
    show_failures: usize,
    tray: Vec<ShownNotification>,
    next_id: u64,
    calls: Vec<PlatformCall>,
}

#[derive(Debug)]
pub struct MemoryPlatform {
    origin: Url,
    state: Mutex<PlatformState>,
}

impl MemoryPlatform {
    /// A capable platform where the user grants every permission.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            state: Mutex::new(PlatformState {
                supports_agent: true,
                supports_push: true,
                permission: Permission::Granted,
                push_permission: Some(PermissionState::Granted),
                agent_ready_error: None,
                subscribe_error: None,
                omit_keys: false,
                live: Vec::new(),
                assets: BTreeMap::new(),
                caches: BTreeMap::new(),
                windows: Vec::new(),
                failing_windows: BTreeSet::new(),
                show_failures: 0,
                tray: Vec::new(),
                next_id: 1,
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, url: &str) -> String {
        match self.origin.join(url) {
            Ok(url) => url.to_string(),
            Err(_) => url.to_string(),
        }
    }

    fn record(&self, call: PlatformCall) -> MutexGuard<'_, PlatformState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    pub fn without_push(self) -> Self {
        self.state().supports_push = false;
        self
    }

    pub fn without_agent(self) -> Self {
        self.state().supports_agent = false;
        self
    }

    /// What the user answers to the notification permission prompt.
    pub fn with_permission(self, permission: Permission) -> Self {
        self.state().permission = permission;
        self
    }

    /// `None` makes the push permission query unsupported.
    pub fn with_push_permission(self, state: Option<PermissionState>) -> Self {
        self.state().push_permission = state;
        self
    }

    pub fn with_agent_ready_error(self, error: PlatformError) -> Self {
        self.state().agent_ready_error = Some(error);
        self
    }

    pub fn with_subscribe_error(self, error: PlatformError) -> Self {
        self.state().subscribe_error = Some(error);
        self
    }

    /// Subscriptions come back without an auth secret.
    pub fn without_subscription_keys(self) -> Self {
        self.state().omit_keys = true;
        self
    }

    /// Makes `url` fetchable over the network. Relative URLs are taken from the origin.
    pub fn with_asset(self, url: &str, body: &[u8]) -> Self {
        let url = self.resolve(url);
        self.state().assets.insert(url, body.to_vec());
        self
    }

    pub fn with_cache(self, name: &str) -> Self {
        self.state().caches.entry(name.to_string()).or_default();
        self
    }

    pub fn with_window(self, url: &str, focusable: bool) -> Self {
        {
            let mut state = self.state();
            let id = ClientId(state.next_id);
            state.next_id += 1;
            state.windows.push(WindowClient {
                id,
                url: url.to_string(),
                focusable,
            });
        }
        self
    }

    pub fn with_failing_window(self, url: &str) -> Self {
        self.state().failing_windows.insert(url.to_string());
        self
    }

    /// The next `count` notifications are refused.
    pub fn with_show_failures(self, count: usize) -> Self {
        self.state().show_failures = count;
        self
    }

    /// Puts a subscription in place as if an earlier session created it.
    pub fn insert_subscription(&self, subscription: PushSubscription) {
        self.state().live.push(subscription);
    }

    /// Drops a subscription the way the push service does before a rotation.
    pub fn revoke(&self, endpoint: &str) -> Option<PushSubscription> {
        let mut state = self.state();
        let index = state.live.iter().position(|s| s.endpoint == endpoint)?;
        Some(state.live.remove(index))
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    pub fn live_subscriptions(&self) -> Vec<PushSubscription> {
        self.state().live.clone()
    }

    /// Notifications currently in the tray.
    pub fn tray(&self) -> Vec<ShownNotification> {
        self.state().tray.clone()
    }

    /// Number of successful show calls, replacements included.
    pub fn shown_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, PlatformCall::ShowNotification(_)))
            .count()
    }

    pub fn caches(&self) -> BTreeMap<String, Vec<String>> {
        self.state()
            .caches
            .iter()
            .map(|(name, entries)| (name.clone(), entries.keys().cloned().collect()))
            .collect()
    }

    pub fn windows(&self) -> Vec<WindowClient> {
        self.state().windows.clone()
    }

    fn next_subscription(state: &mut PlatformState, options: &SubscribeOptions) -> PushSubscription {
        let n = state.next_id;
        state.next_id += 1;
        let mut p256dh = vec![0x04u8; 65];
        p256dh[1..9].copy_from_slice(&n.to_be_bytes());
        let auth = if state.omit_keys {
            String::new()
        } else {
            codec::encode(&n.to_le_bytes().repeat(2))
        };
        PushSubscription {
            endpoint: format!("https://push.memory.invalid/send/{n}"),
            expiration_time: None,
            keys: PushSubscriptionKeys {
                p256dh: codec::encode(&p256dh),
                auth,
            },
            options: Some(options.clone()),
        }
    }
}

#[async_trait]
impl PushManager for MemoryPlatform {
    async fn permission_state(
        &self,
        _options: &SubscribeOptions,
    ) -> Result<PermissionState, PlatformError> {
        self.record(PlatformCall::PermissionState)
            .push_permission
            .ok_or_else(|| PlatformError::NotSupported("permissionState".to_string()))
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscription>, PlatformError> {
        Ok(self.record(PlatformCall::GetSubscription).live.last().cloned())
    }

    async fn subscribe(
        &self,
        options: &SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError> {
        let mut state = self.record(PlatformCall::Subscribe);
        if let Some(error) = state.subscribe_error.clone() {
            return Err(error);
        }
        if !options.user_visible_only {
            return Err(PlatformError::NotAllowed("userVisibleOnly is required".to_string()));
        }
        let subscription = Self::next_subscription(&mut state, options);
        state.live.push(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self, endpoint: &str) -> Result<bool, PlatformError> {
        let mut state = self.record(PlatformCall::Unsubscribe(endpoint.to_string()));
        let before = state.live.len();
        state.live.retain(|s| s.endpoint != endpoint);
        Ok(state.live.len() != before)
    }
}

#[async_trait]
impl PagePlatform for MemoryPlatform {
    fn supports_agent(&self) -> bool {
        self.state().supports_agent
    }

    fn supports_push(&self) -> bool {
        self.state().supports_push
    }

    fn notification_permission(&self) -> Permission {
        self.state().permission
    }

    async fn request_notification_permission(&self) -> Result<Permission, PlatformError> {
        Ok(self.record(PlatformCall::RequestPermission).permission)
    }

    async fn register_agent(&self, script_url: &str, scope: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::RegisterAgent {
            script: script_url.to_string(),
            scope: scope.to_string(),
        });
        Ok(())
    }

    async fn agent_ready(&self) -> Result<(), PlatformError> {
        match self.record(PlatformCall::AgentReady).agent_ready_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryPlatform {
    async fn add_all(&self, cache: &str, urls: &[String]) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::AddAll(cache.to_string()));
        let mut fetched = BTreeMap::new();
        for url in urls {
            let Some(body) = state.assets.get(&self.resolve(url)) else {
                return Err(PlatformError::Network(format!("{url} responded with 404")));
            };
            fetched.insert(url.clone(), body.clone());
        }
        state.caches.entry(cache.to_string()).or_default().extend(fetched);
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, PlatformError> {
        Ok(self.record(PlatformCall::CacheNames).caches.keys().cloned().collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, PlatformError> {
        Ok(self
            .record(PlatformCall::DeleteCache(cache.to_string()))
            .caches
            .remove(cache)
            .is_some())
    }
}

#[async_trait]
impl Clients for MemoryPlatform {
    async fn claim(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::Claim);
        Ok(())
    }

    async fn match_all_windows(
        &self,
        include_uncontrolled: bool,
    ) -> Result<Vec<WindowClient>, PlatformError> {
        Ok(self
            .record(PlatformCall::MatchAllWindows {
                include_uncontrolled,
            })
            .windows
            .clone())
    }

    async fn focus(&self, client: ClientId) -> Result<(), PlatformError> {
        let state = self.record(PlatformCall::Focus(client));
        match state.windows.iter().find(|w| w.id == client) {
            Some(window) if window.focusable => Ok(()),
            Some(_) => Err(PlatformError::InvalidState(format!("{client:?} cannot be focused"))),
            None => Err(PlatformError::InvalidState(format!("{client:?} is gone"))),
        }
    }

    async fn open_window(&self, url: &str) -> Result<ClientId, PlatformError> {
        let mut state = self.record(PlatformCall::OpenWindow(url.to_string()));
        if state.failing_windows.contains(url) {
            return Err(PlatformError::NotAllowed(format!("opening {url}")));
        }
        let id = ClientId(state.next_id);
        state.next_id += 1;
        state.windows.push(WindowClient {
            id,
            url: url.to_string(),
            focusable: true,
        });
        Ok(id)
    }
}

#[async_trait]
impl NotificationCenter for MemoryPlatform {
    async fn show_notification(
        &self,
        notification: &PendingNotification,
    ) -> Result<NotificationId, PlatformError> {
        let mut state = self.state();
        if state.show_failures > 0 {
            state.show_failures -= 1;
            return Err(PlatformError::QuotaExceeded("notification refused".to_string()));
        }
        state
            .calls
            .push(PlatformCall::ShowNotification(notification.title.clone()));

        let id = NotificationId(state.next_id);
        state.next_id += 1;
        if let Some(tag) = &notification.options.tag {
            state.tray.retain(|n| n.options.tag.as_ref() != Some(tag));
        }
        state.tray.push(ShownNotification {
            id,
            title: notification.title.clone(),
            options: notification.options.clone(),
        });
        Ok(id)
    }

    async fn close_notification(&self, id: NotificationId) -> Result<(), PlatformError> {
        self.record(PlatformCall::CloseNotification(id))
            .tray
            .retain(|n| n.id != id);
        Ok(())
    }
}

#[async_trait]
impl Network for MemoryPlatform {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError> {
        let state = self.record(PlatformCall::Fetch(request.url.clone()));
        let response = match state.assets.get(&self.resolve(&request.url)) {
            Some(body) => FetchResponse {
                status: 200,
                headers: Vec::new(),
                body: body.clone(),
            },
            None => FetchResponse {
                status: 404,
                headers: Vec::new(),
                body: Vec::new(),
            },
        };
        Ok(response)
    }
}

#[async_trait]
impl AgentHost for MemoryPlatform {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::SkipWaiting);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ServerState {
    public_key: Option<String>,
    fail_save: bool,
    fail_remove: bool,
    key_fetches: usize,
    records: BTreeMap<String, PushSubscription>,
    test_messages: Vec<String>,
}

/// Server collaborator that keeps its subscription registry in memory.
#[derive(Debug, Default)]
pub struct MemoryCollaborator {
    state: Mutex<ServerState>,
}

impl MemoryCollaborator {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ServerState {
                public_key: Some(public_key.into()),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.state().fail_save = fail;
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.state().fail_remove = fail;
    }

    pub fn key_fetches(&self) -> usize {
        self.state().key_fetches
    }

    /// Persisted subscriptions keyed by endpoint.
    pub fn records(&self) -> BTreeMap<String, PushSubscription> {
        self.state().records.clone()
    }

    pub fn test_messages(&self) -> Vec<String> {
        self.state().test_messages.clone()
    }
}

#[async_trait]
impl ServerCollaborator for MemoryCollaborator {
    async fn fetch_public_key(&self) -> Result<String> {
        let mut state = self.state();
        state.key_fetches += 1;
        state
            .public_key
            .clone()
            .ok_or_else(|| anyhow!("response has no publicKey"))
    }

    async fn save_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let mut state = self.state();
        if state.fail_save {
            bail!("server responded with 500 Internal Server Error: Failed to save subscription");
        }
        state
            .records
            .insert(subscription.endpoint.clone(), subscription.clone());
        Ok(())
    }

    async fn remove_subscription(&self, endpoint: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_remove {
            bail!("server responded with 500 Internal Server Error: Failed to delete subscription");
        }
        state.records.remove(endpoint);
        Ok(())
    }

    async fn send_test(&self, message: &str) -> Result<TestPushReceipt> {
        self.state().test_messages.push(message.to_string());
        Ok(TestPushReceipt {
            status: Some("success".to_string()),
            message: Some("Notifications are being sent".to_string()),
        })
    }
}
