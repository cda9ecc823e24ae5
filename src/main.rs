use std::sync::Arc;

use anyhow::{Context, Result, bail};
use jim_push::{
    agent::{AgentConfig, AgentEvent, EventOutcome, PushAgent},
    cfg::{get_config, init_config},
    http_client::HttpCollaborator,
    memory::MemoryPlatform,
    subscription::svc::SubscriptionManager,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Smoke run of the whole pipeline against a live server, with an in-memory
/// browser standing in for the page and the background agent.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,jim_push=debug")),
        )
        .init();

    init_config();
    let config = get_config();
    tracing::info!(server = %config.server_url, origin = %config.origin, "starting push smoke run");

    let server = Arc::new(HttpCollaborator::new(
        config.server_url.clone(),
        config.request_timeout,
    )?);
    let agent_config = AgentConfig::from_config(config);
    let mut platform = MemoryPlatform::new(config.origin.clone());
    for asset in &agent_config.precache {
        platform = platform.with_asset(asset, b"");
    }
    let platform = Arc::new(platform);

    let agent = PushAgent::new(platform.clone(), server.clone(), agent_config);
    for event in [AgentEvent::Install, AgentEvent::Activate] {
        if let EventOutcome::Failed(e) = agent.dispatch(event).await {
            bail!("agent lifecycle failed: {e}");
        }
    }

    let manager = SubscriptionManager::new(platform.clone(), server.clone());
    manager.register().await?;
    if !manager.subscribe().await.context("subscribing")? {
        bail!("notification permission was not granted");
    }
    tracing::info!(subscribed = manager.check_status().await, "subscription status");

    manager
        .send_test("This is a test notification from Jim.Tennis!")
        .await
        .context("requesting test push")?;

    let payload = json!({ "title": "Jim.Tennis", "body": "Smoke test delivery" }).to_string();
    agent
        .dispatch(AgentEvent::Push {
            data: Some(payload.into_bytes()),
        })
        .await;
    for notification in platform.tray() {
        agent
            .dispatch(AgentEvent::NotificationClick {
                notification,
                action: None,
            })
            .await;
    }

    let outcome = manager.unsubscribe().await.context("unsubscribing")?;
    tracing::info!(?outcome, "smoke run finished");
    Ok(())
}
