//! Route parameter parsing. A bad parameter is reported as
//! [`ClientError::InvalidRoute`], which sends the user back.

use std::collections::HashMap;

use crate::error::{ClientError, Result};

/// Parameters of the chat room route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoute {
    pub chat_id: String,
}

pub fn chat_route(params: &HashMap<String, String>) -> Result<ChatRoute> {
    let chat_id = params
        .get("chatId")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ClientError::InvalidRoute {
            name: "chatId",
            reason: "missing".into(),
        })?;

    Ok(ChatRoute {
        chat_id: chat_id.to_string(),
    })
}

/// The search results route carries its translation keys as a JSON array.
pub fn search_results(params: &HashMap<String, String>) -> Result<Vec<String>> {
    let raw = params.get("results").ok_or_else(|| ClientError::InvalidRoute {
        name: "results",
        reason: "missing".into(),
    })?;

    serde_json::from_str(raw).map_err(|e| ClientError::InvalidRoute {
        name: "results",
        reason: e.to_string(),
    })
}
