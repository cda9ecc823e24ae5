use thiserror::Error;

use crate::codec::KeyFormatError;

/// Failures raised by a browser capability, named after the DOMException the
/// platform reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("aborted: {0}")]
    Abort(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

/// Why the push service refused to hand out a subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Blocked by the browser or user, or the key was refused.
    #[error("not allowed by the browser, the user or the push service key check")]
    NotAllowed,

    #[error("push unsupported for this agent or key")]
    NotSupported,

    #[error("subscription aborted (agent inactive, network or security restriction)")]
    Aborted,

    #[error("subscription is missing its p256dh or auth key")]
    MissingKeys,

    #[error("{0}")]
    Platform(PlatformError),
}

impl From<PlatformError> for RejectReason {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotAllowed(_) => RejectReason::NotAllowed,
            PlatformError::NotSupported(_) => RejectReason::NotSupported,
            PlatformError::Abort(_) => RejectReason::Aborted,
            other => RejectReason::Platform(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("push notifications are not supported on this platform")]
    UnsupportedPlatform,

    #[error("push permission denied")]
    PermissionDenied,

    #[error("failed to fetch server public key: {0}")]
    KeyFetchFailed(String),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error("background agent never became ready: {0}")]
    AgentNotReady(PlatformError),

    #[error("subscription rejected: {0}")]
    SubscriptionRejected(RejectReason),

    #[error("server sync failed: {0}")]
    ServerSyncFailed(String),

    #[error("seeding cache {cache} failed: {source}")]
    CacheSeedFailed {
        cache: String,
        #[source]
        source: PlatformError,
    },

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl PushError {
    /// Whether retrying later without user action can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PushError::UnsupportedPlatform | PushError::PermissionDenied
        )
    }
}
