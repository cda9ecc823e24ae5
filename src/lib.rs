//! Web Push subscription and delivery pipeline for Jim.Tennis.
//!
//! [`subscription::svc::SubscriptionManager`] runs in page context and keeps
//! one push subscription per device in sync with the server.
//! [`agent::PushAgent`] runs in the background agent and turns inbound pushes
//! into notifications and clicks into focused or opened windows. Browser
//! capabilities are reached through the traits in [`platform`].

pub mod agent;
pub mod cfg;
pub mod codec;
pub mod collaborator;
pub mod error;
pub mod http_client;
pub mod memory;
pub mod notification;
pub mod platform;
pub mod subscription;
