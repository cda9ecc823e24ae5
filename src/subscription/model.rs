use serde::{Deserialize, Serialize};

use crate::codec::PublicKey;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

/// What the push capability is asked for when subscribing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: PublicKey,
}

impl SubscribeOptions {
    /// Every push must surface a notification; silent pushes are never requested.
    pub fn user_visible(application_server_key: PublicKey) -> Self {
        Self {
            user_visible_only: true,
            application_server_key,
        }
    }
}

/// A subscription as handed out by the push capability.
///
/// The serialized form is what the server persists; `options` stays with the
/// platform record and is only used to resubscribe on rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<u64>,
    #[serde(default)]
    pub keys: PushSubscriptionKeys,
    #[serde(skip)]
    pub options: Option<SubscribeOptions>,
}

impl PushSubscription {
    /// The server cannot encrypt payloads without both keys.
    pub fn has_encryption_keys(&self) -> bool {
        !self.keys.p256dh.is_empty() && !self.keys.auth.is_empty()
    }

    pub fn application_server_key(&self) -> Option<&PublicKey> {
        self.options.as_ref().map(|o| &o.application_server_key)
    }
}

/// Result of an unsubscribe. The platform side is authoritative; the server
/// side may lag behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    NotSubscribed,
    Removed { endpoint: String },
    /// Cancelled locally, but the server still holds the record.
    ServerPending { endpoint: String, reason: String },
}

impl UnsubscribeOutcome {
    pub fn unsubscribed(&self) -> bool {
        !matches!(self, UnsubscribeOutcome::NotSubscribed)
    }
}
