use serde::{Deserialize, Serialize};

// -- Chat list --

/// One row of the chat list, assembled from a chat, the counterpart's
/// profile and the chat's messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreview {
    pub chat_id: String,
    pub other_user_id: Option<String>,
    pub other_user_name: String,
    pub last_message: String,
    pub unread_count: usize,
}

// -- Navigation --

/// Screen transitions requested by the client logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Return to the home view.
    Home,
    /// Pop the current screen.
    Back,
}
