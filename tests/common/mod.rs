#![allow(dead_code)]

use std::sync::Arc;

use jim_push::{
    agent::{AgentConfig, PushAgent},
    cfg::Config,
    memory::{MemoryCollaborator, MemoryPlatform},
    subscription::svc::SubscriptionManager,
};
use url::Url;

pub const VAPID: &str =
    "BFFGrinjE3VIjgQD3XMX-h4dh8WWCK2ifCWin9ENcwCPff_fEEYFOUTP3aIiUjaaGHYVULoH2UM7qPI0uCU_nR0";

pub const ORIGIN: &str = "https://jim.tennis";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn config() -> Config {
    Config {
        server_url: origin(),
        origin: origin(),
        ..Config::default()
    }
}

pub fn manager(
    platform: MemoryPlatform,
    server: MemoryCollaborator,
) -> (
    SubscriptionManager<MemoryPlatform, MemoryCollaborator>,
    Arc<MemoryPlatform>,
    Arc<MemoryCollaborator>,
) {
    let platform = Arc::new(platform);
    let server = Arc::new(server);
    (
        SubscriptionManager::new(platform.clone(), server.clone()),
        platform,
        server,
    )
}

pub fn agent(
    platform: MemoryPlatform,
    server: MemoryCollaborator,
) -> (
    PushAgent<MemoryPlatform, MemoryCollaborator>,
    Arc<MemoryPlatform>,
    Arc<MemoryCollaborator>,
) {
    let platform = Arc::new(platform);
    let server = Arc::new(server);
    let agent = PushAgent::new(
        platform.clone(),
        server.clone(),
        AgentConfig::from_config(&config()),
    );
    (agent, platform, server)
}
