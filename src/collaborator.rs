//! Contract the push pipeline needs from the application server.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::subscription::model::PushSubscription;

pub const VAPID_PUBLIC_KEY_PATH: &str = "/api/vapid-public-key";
pub const SUBSCRIBE_PATH: &str = "/api/push/subscribe";
pub const UNSUBSCRIBE_PATH: &str = "/api/push/unsubscribe";
pub const TEST_PUSH_PATH: &str = "/api/push/test";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeRequest<'a> {
    pub endpoint: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TestPushRequest<'a> {
    pub message: &'a str,
}

/// Whatever the server said about a test send. Not otherwise interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestPushReceipt {
    pub status: Option<String>,
    pub message: Option<String>,
}

#[async_trait]
pub trait ServerCollaborator: Send + Sync {
    /// The server's VAPID public key, still base64url encoded.
    async fn fetch_public_key(&self) -> Result<String>;

    /// Fails on any non-2xx answer.
    async fn save_subscription(&self, subscription: &PushSubscription) -> Result<()>;

    async fn remove_subscription(&self, endpoint: &str) -> Result<()>;

    async fn send_test(&self, message: &str) -> Result<TestPushReceipt>;
}
