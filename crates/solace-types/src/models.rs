use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection names used by the backend.
pub mod collections {
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    pub const PROFILES: &str = "profiles";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const SCANNED_SESSIONS: &str = "scannedSessions";

    /// Path of the message sub-collection nested under a chat.
    pub fn messages_of(chat_id: &str) -> String {
        format!("{CHATS}/{chat_id}/{MESSAGES}")
    }
}

// -- Documents --

/// Untyped document envelope: an id plus a JSON object of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Decode into a typed model. The document id is injected as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut data = self.data.clone();
        let fields = data
            .as_object_mut()
            .ok_or_else(|| anyhow!("document {} is not an object", self.id))?;
        fields.insert("id".into(), Value::String(self.id.clone()));

        serde_json::from_value(data).with_context(|| format!("decoding document {}", self.id))
    }
}

/// Serialize a model into document fields. The `id` key is dropped since
/// ids live on the envelope, not in the data.
pub fn to_fields<T: Serialize>(model: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(model)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(anyhow!("expected an object, got {other}")),
    }
}

// -- Chats --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// The first participant that is not `user_id`.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .map(String::as_str)
            .find(|p| *p != user_id)
    }
}

/// A message in `chats/{chat_id}/messages`. Carries text, media, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub author_id: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Unread from the point of view of `user_id`. Own messages never count.
    pub fn is_unread_for(&self, user_id: &str) -> bool {
        !self.is_read && self.author_id != user_id
    }
}

// -- Check-ins --

/// Written once per successful QR scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedSession {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub scanned_data: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

// -- Profiles --

/// Profile document, keyed by the owner's user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub is_athlete: bool,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserProfile {
    /// "First Last", trimmed. `None` when both parts are blank.
    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}
