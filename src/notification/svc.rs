use super::model::{
    NotificationData, NotificationOptions, NotificationPayload, PendingNotification, non_empty,
};

pub const DEFAULT_TAG: &str = "default";
pub const DEFAULT_BODY: &str = "New notification";
pub const FALLBACK_BODY: &str = "You have a new notification";

/// Values a push falls back to when the payload leaves them out.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub product_name: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    /// Origin the agent is registered on, serialized without a trailing slash.
    pub origin: String,
}

pub struct Notification {}

impl Notification {
    /// Turns any payload into exactly one displayable notification.
    pub fn compose(
        payload: &NotificationPayload,
        defaults: &NotificationDefaults,
        now_millis: i64,
    ) -> PendingNotification {
        let structured = match payload {
            NotificationPayload::Structured(p) => Some(p),
            _ => None,
        };

        // Title and body are only taken from the payload as a pair.
        let pair = structured.and_then(|p| Some((non_empty(&p.title)?, non_empty(&p.body)?)));
        let (title, body) = match pair {
            Some((title, body)) => (title, body),
            None => (
                defaults.product_name.as_str(),
                payload
                    .message()
                    .or_else(|| structured.and_then(|p| non_empty(&p.body)))
                    .unwrap_or(DEFAULT_BODY),
            ),
        };
        let (title, body) = (title.to_string(), body.to_string());

        let data = structured
            .and_then(|p| p.data.clone())
            .unwrap_or_else(|| NotificationData {
                url: Some(defaults.origin.clone()),
                date_of_arrival: Some(now_millis),
                ..Default::default()
            });

        let options = NotificationOptions {
            body,
            icon: Some(
                structured
                    .and_then(|p| non_empty(&p.icon))
                    .unwrap_or(&defaults.icon)
                    .to_string(),
            ),
            badge: Some(
                structured
                    .and_then(|p| non_empty(&p.badge))
                    .unwrap_or(&defaults.badge)
                    .to_string(),
            ),
            data: Some(data),
            actions: structured.map(|p| p.actions.clone()).unwrap_or_default(),
            tag: Some(
                structured
                    .and_then(|p| non_empty(&p.tag))
                    .unwrap_or(&defaults.tag)
                    .to_string(),
            ),
            renotify: structured.and_then(|p| p.renotify).unwrap_or(true),
            require_interaction: true,
        };

        PendingNotification { title, options }
    }

    /// Bare notification shown when the composed one is refused by the platform.
    pub fn fallback(defaults: &NotificationDefaults) -> PendingNotification {
        PendingNotification {
            title: defaults.product_name.clone(),
            options: NotificationOptions {
                body: FALLBACK_BODY.to_string(),
                ..Default::default()
            },
        }
    }
}
