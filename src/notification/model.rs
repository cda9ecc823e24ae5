use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Payload text used when a push carries no data at all.
pub const PLACEHOLDER_MESSAGE: &str = "No payload";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub date_of_arrival: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// JSON payload as sent by the server. Every field is optional, and a field
/// of the wrong type reads as absent without spoiling the others.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StructuredPayload {
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub body: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub icon: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub badge: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub data: Option<NotificationData>,
    #[serde(deserialize_with = "lenient_list")]
    pub actions: Vec<NotificationAction>,
    #[serde(deserialize_with = "lenient")]
    pub tag: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub renotify: Option<bool>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Keeps the well-formed entries of a list; anything but a list is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// An inbound push payload. Untrusted, so every shape maps to a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    Structured(StructuredPayload),
    Text(String),
    Empty,
}

impl NotificationPayload {
    /// Tries a JSON object first, then UTF-8 text, then gives up to `Empty`.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(bytes) = data else {
            return NotificationPayload::Empty;
        };
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value @ Value::Object(_)) => match serde_json::from_value(value) {
                Ok(structured) => return NotificationPayload::Structured(structured),
                Err(e) => tracing::debug!(error = %e, "push payload object has unexpected field types"),
            },
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "push payload is not JSON"),
        }

        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        if text.is_empty() {
            NotificationPayload::Empty
        } else {
            NotificationPayload::Text(text.to_string())
        }
    }

    /// The message this payload carries, or the placeholder when there is none.
    pub fn message(&self) -> Option<&str> {
        match self {
            NotificationPayload::Structured(p) => non_empty(&p.message),
            NotificationPayload::Text(text) => Some(text),
            NotificationPayload::Empty => Some(PLACEHOLDER_MESSAGE),
        }
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Options handed to the notification center.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub renotify: bool,
    pub require_interaction: bool,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNotification {
    pub title: String,
    pub options: NotificationOptions,
}

/// Handle the platform assigns to a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

/// A notification currently on screen, as the platform reports it back on click.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownNotification {
    pub id: NotificationId,
    pub title: String,
    pub options: NotificationOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_payload() {
        let raw = br#"{"title":"Fixture moved","body":"Now 7pm","tag":"fixture-12",
            "data":{"url":"/fixtures/12","team":"A"},
            "actions":[{"action":"open","title":"Open"},{"action":"close","title":"Dismiss"}]}"#;
        let NotificationPayload::Structured(p) = NotificationPayload::parse(Some(raw.as_slice())) else {
            panic!("expected structured payload");
        };
        assert_eq!(p.title.as_deref(), Some("Fixture moved"));
        assert_eq!(p.tag.as_deref(), Some("fixture-12"));
        assert_eq!(p.actions.len(), 2);
        let data = p.data.unwrap();
        assert_eq!(data.url.as_deref(), Some("/fixtures/12"));
        assert_eq!(data.extra.get("team"), Some(&Value::from("A")));
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(
            NotificationPayload::parse(Some("Match tonight".as_bytes())),
            NotificationPayload::Text("Match tonight".to_string())
        );
        // Valid JSON that is not an object is still just text.
        assert_eq!(
            NotificationPayload::parse(Some("\"quoted\"".as_bytes())),
            NotificationPayload::Text("\"quoted\"".to_string())
        );
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let raw = r#"{"title":"Match moved","body":"Now 7pm","actions":null,"renotify":"yes",
            "icon":5,"data":{"url":7,"team":"A"}}"#;
        let NotificationPayload::Structured(p) = NotificationPayload::parse(Some(raw.as_bytes())) else {
            panic!("expected structured payload");
        };
        assert_eq!(p.title.as_deref(), Some("Match moved"));
        assert_eq!(p.body.as_deref(), Some("Now 7pm"));
        assert!(p.actions.is_empty());
        assert_eq!(p.renotify, None);
        assert_eq!(p.icon, None);
        let data = p.data.unwrap();
        assert_eq!(data.url, None);
        assert_eq!(data.extra.get("team"), Some(&Value::from("A")));

        let NotificationPayload::Structured(p) = NotificationPayload::parse(Some(
            r#"{"actions":[{"action":"open","title":"Open"},{"action":1}]}"#.as_bytes(),
        )) else {
            panic!("expected structured payload");
        };
        assert_eq!(p.actions.len(), 1);
        assert_eq!(p.actions[0].action, "open");
    }

    #[test]
    fn empty_payloads() {
        assert_eq!(NotificationPayload::parse(None), NotificationPayload::Empty);
        assert_eq!(NotificationPayload::parse(Some("".as_bytes())), NotificationPayload::Empty);
        assert_eq!(NotificationPayload::parse(Some("  \n".as_bytes())), NotificationPayload::Empty);
        assert_eq!(NotificationPayload::Empty.message(), Some(PLACEHOLDER_MESSAGE));
    }

    #[test]
    fn invalid_utf8_is_lossy_text() {
        let payload = NotificationPayload::parse(Some(&[0x68u8, 0x69, 0xff][..]));
        assert_eq!(payload, NotificationPayload::Text("hi\u{fffd}".to_string()));
    }
}
