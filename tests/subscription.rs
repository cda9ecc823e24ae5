mod common;

use common::{VAPID, manager, origin};
use jim_push::{
    error::{PlatformError, PushError, RejectReason},
    memory::{MemoryCollaborator, MemoryPlatform, PlatformCall},
    platform::{Permission, PermissionState},
    subscription::model::{PushSubscription, PushSubscriptionKeys, UnsubscribeOutcome},
};

fn stale_subscription() -> PushSubscription {
    PushSubscription {
        endpoint: "https://push.memory.invalid/send/stale".to_string(),
        expiration_time: None,
        keys: PushSubscriptionKeys {
            p256dh: "BOld".to_string(),
            auth: "old".to_string(),
        },
        options: None,
    }
}

fn position(calls: &[PlatformCall], wanted: &PlatformCall) -> Option<usize> {
    calls.iter().position(|c| c == wanted)
}

#[tokio::test]
async fn subscribe_persists_subscription_on_server() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    assert!(manager.subscribe().await.unwrap());

    let live = platform.live_subscriptions();
    assert_eq!(live.len(), 1);
    assert!(live[0].has_encryption_keys());
    let records = server.records();
    assert_eq!(records.len(), 1);
    assert!(records.contains_key(&live[0].endpoint));
    assert_eq!(
        live[0].application_server_key().map(|k| k.to_base64url()),
        Some(VAPID.to_string())
    );
}

#[tokio::test]
async fn subscribe_twice_leaves_one_subscription_and_one_record() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    assert!(manager.subscribe().await.unwrap());
    let first = platform.live_subscriptions()[0].endpoint.clone();
    assert!(manager.subscribe().await.unwrap());

    let live = platform.live_subscriptions();
    assert_eq!(live.len(), 1);
    assert_ne!(live[0].endpoint, first);
    let records = server.records();
    assert_eq!(records.len(), 1);
    assert!(records.contains_key(&live[0].endpoint));
}

#[tokio::test]
async fn existing_subscription_is_cancelled_before_subscribing() {
    let (manager, platform, _server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));
    platform.insert_subscription(stale_subscription());

    assert!(manager.subscribe().await.unwrap());

    let calls = platform.calls();
    let unsubscribe = position(
        &calls,
        &PlatformCall::Unsubscribe("https://push.memory.invalid/send/stale".to_string()),
    )
    .expect("stale subscription cancelled");
    let subscribe = position(&calls, &PlatformCall::Subscribe).expect("subscribed");
    assert!(unsubscribe < subscribe);
    assert_eq!(platform.live_subscriptions().len(), 1);
}

#[tokio::test]
async fn denied_notification_permission_short_circuits() {
    let (manager, platform, server) = manager(
        MemoryPlatform::new(origin()).with_permission(Permission::Denied),
        MemoryCollaborator::new(VAPID),
    );

    assert!(!manager.subscribe().await.unwrap());

    assert_eq!(server.key_fetches(), 0);
    assert_eq!(platform.calls(), vec![PlatformCall::RequestPermission]);
    assert!(platform.live_subscriptions().is_empty());
}

#[tokio::test]
async fn dismissed_prompt_is_not_a_grant() {
    let (manager, _platform, server) = manager(
        MemoryPlatform::new(origin()).with_permission(Permission::Default),
        MemoryCollaborator::new(VAPID),
    );

    assert!(!manager.subscribe().await.unwrap());
    assert_eq!(server.key_fetches(), 0);
}

#[tokio::test]
async fn denied_push_permission_fails_without_subscribing() {
    let (manager, platform, _server) = manager(
        MemoryPlatform::new(origin()).with_push_permission(Some(PermissionState::Denied)),
        MemoryCollaborator::new(VAPID),
    );

    let err = manager.subscribe().await.unwrap_err();
    assert!(matches!(err, PushError::PermissionDenied));
    assert!(!err.is_retryable());
    assert!(position(&platform.calls(), &PlatformCall::Subscribe).is_none());
}

#[tokio::test]
async fn unsupported_permission_query_falls_back_to_notification_permission() {
    let (manager, platform, _server) = manager(
        MemoryPlatform::new(origin()).with_push_permission(None),
        MemoryCollaborator::new(VAPID),
    );

    assert!(manager.subscribe().await.unwrap());
    assert_eq!(platform.live_subscriptions().len(), 1);
}

#[tokio::test]
async fn unsupported_platform_does_nothing() {
    for platform in [
        MemoryPlatform::new(origin()).without_push(),
        MemoryPlatform::new(origin()).without_agent(),
    ] {
        let (manager, platform, server) = manager(platform, MemoryCollaborator::new(VAPID));

        assert!(!manager.is_supported());
        assert!(matches!(
            manager.register().await,
            Err(PushError::UnsupportedPlatform)
        ));
        assert!(matches!(
            manager.subscribe().await,
            Err(PushError::UnsupportedPlatform)
        ));
        assert!(matches!(
            manager.unsubscribe().await,
            Err(PushError::UnsupportedPlatform)
        ));
        assert!(matches!(
            manager.send_test("Fixture reminder").await,
            Err(PushError::UnsupportedPlatform)
        ));
        assert!(!manager.check_status().await);
        assert!(platform.calls().is_empty());
        assert_eq!(server.key_fetches(), 0);
        assert!(server.test_messages().is_empty());
    }
}

#[tokio::test]
async fn key_fetch_failure_is_fatal() {
    let (manager, platform, _server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::default());

    let err = manager.subscribe().await.unwrap_err();
    assert!(matches!(err, PushError::KeyFetchFailed(_)));
    assert!(err.is_retryable());
    assert!(position(&platform.calls(), &PlatformCall::Subscribe).is_none());
}

#[tokio::test]
async fn malformed_key_is_never_used() {
    let (manager, platform, _server) = manager(
        MemoryPlatform::new(origin()),
        MemoryCollaborator::new("not*base64"),
    );

    let err = manager.subscribe().await.unwrap_err();
    assert!(matches!(err, PushError::KeyFormat(_)));
    assert!(position(&platform.calls(), &PlatformCall::Subscribe).is_none());
    assert!(position(&platform.calls(), &PlatformCall::AgentReady).is_none());
}

#[tokio::test]
async fn agent_that_never_activates_fails_subscribe() {
    let (manager, _platform, _server) = manager(
        MemoryPlatform::new(origin())
            .with_agent_ready_error(PlatformError::InvalidState("redundant".into())),
        MemoryCollaborator::new(VAPID),
    );

    assert!(matches!(
        manager.subscribe().await,
        Err(PushError::AgentNotReady(_))
    ));
}

#[tokio::test]
async fn platform_refusal_is_classified() {
    let (manager, _platform, server) = manager(
        MemoryPlatform::new(origin())
            .with_subscribe_error(PlatformError::NotAllowed("registration blocked".into())),
        MemoryCollaborator::new(VAPID),
    );

    assert!(matches!(
        manager.subscribe().await,
        Err(PushError::SubscriptionRejected(RejectReason::NotAllowed))
    ));
    assert!(server.records().is_empty());
}

#[tokio::test]
async fn subscription_without_keys_is_rejected() {
    let (manager, _platform, server) = manager(
        MemoryPlatform::new(origin()).without_subscription_keys(),
        MemoryCollaborator::new(VAPID),
    );

    assert!(matches!(
        manager.subscribe().await,
        Err(PushError::SubscriptionRejected(RejectReason::MissingKeys))
    ));
    assert!(server.records().is_empty());
}

#[tokio::test]
async fn server_sync_failure_is_repaired_by_next_subscribe() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));
    server.set_fail_save(true);

    let err = manager.subscribe().await.unwrap_err();
    assert!(matches!(err, PushError::ServerSyncFailed(_)));
    // The platform subscription outlives the failed sync.
    assert_eq!(platform.live_subscriptions().len(), 1);
    assert!(server.records().is_empty());

    server.set_fail_save(false);
    assert!(manager.subscribe().await.unwrap());
    let live = platform.live_subscriptions();
    assert_eq!(live.len(), 1);
    assert!(server.records().contains_key(&live[0].endpoint));
}

#[tokio::test]
async fn overlapping_subscribes_leave_one_subscription() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    let (a, b) = tokio::join!(manager.subscribe(), manager.subscribe());
    assert!(a.unwrap());
    assert!(b.unwrap());

    let live = platform.live_subscriptions();
    assert_eq!(live.len(), 1);
    assert_eq!(server.records().len(), 1);
}

#[tokio::test]
async fn unsubscribe_without_subscription_is_a_no_op() {
    let (manager, _platform, _server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    let outcome = manager.unsubscribe().await.unwrap();
    assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);
    assert!(!outcome.unsubscribed());
}

#[tokio::test]
async fn unsubscribe_removes_locally_and_on_server() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));
    assert!(manager.subscribe().await.unwrap());
    let endpoint = platform.live_subscriptions()[0].endpoint.clone();

    let outcome = manager.unsubscribe().await.unwrap();

    assert_eq!(outcome, UnsubscribeOutcome::Removed { endpoint });
    assert!(platform.live_subscriptions().is_empty());
    assert!(server.records().is_empty());
}

#[tokio::test]
async fn unsubscribe_survives_server_failure() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));
    assert!(manager.subscribe().await.unwrap());
    server.set_fail_remove(true);

    let outcome = manager.unsubscribe().await.unwrap();

    assert!(outcome.unsubscribed());
    assert!(matches!(outcome, UnsubscribeOutcome::ServerPending { .. }));
    assert!(platform.live_subscriptions().is_empty());
    assert_eq!(server.records().len(), 1);
}

#[tokio::test]
async fn check_status_is_read_only() {
    let (manager, platform, _server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    assert!(!manager.check_status().await);
    platform.insert_subscription(stale_subscription());
    assert!(manager.check_status().await);

    let calls = platform.calls();
    assert!(position(&calls, &PlatformCall::Subscribe).is_none());
    assert!(!calls.iter().any(|c| matches!(c, PlatformCall::Unsubscribe(_))));
    assert_eq!(platform.live_subscriptions().len(), 1);
}

#[tokio::test]
async fn register_covers_whole_origin() {
    let (manager, platform, _server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    manager.register().await.unwrap();

    assert_eq!(
        platform.calls(),
        vec![PlatformCall::RegisterAgent {
            script: "/static/service-worker.js".to_string(),
            scope: "/".to_string(),
        }]
    );
}

#[tokio::test]
async fn send_test_delegates_to_server() {
    let (manager, platform, server) =
        manager(MemoryPlatform::new(origin()), MemoryCollaborator::new(VAPID));

    let receipt = manager.send_test("Fixture reminder").await.unwrap();

    assert_eq!(receipt.status.as_deref(), Some("success"));
    assert_eq!(server.test_messages(), vec!["Fixture reminder".to_string()]);
    assert!(platform.calls().is_empty());
}
