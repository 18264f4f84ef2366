//! Chat history conversion.
//!
//! The front end keeps one role-tagged record per speaker turn; the chatbots
//! take `(user, assistant)` pairs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Pair each user record with the assistant record right after it.
///
/// Order is preserved. A user record with no assistant reply (including a
/// trailing one) and an assistant record with no preceding user are skipped;
/// no pair is ever padded with empty text.
pub fn reconcile_history(messages: &[HistoryMessage]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(messages.len() / 2);
    let mut i = 0;
    while i < messages.len() {
        match (&messages[i], messages.get(i + 1)) {
            (
                HistoryMessage {
                    role: Role::User,
                    content: user,
                },
                Some(HistoryMessage {
                    role: Role::Assistant,
                    content: assistant,
                }),
            ) => {
                pairs.push((user.clone(), assistant.clone()));
                i += 2;
            }
            _ => i += 1,
        }
    }
    pairs
}

/// Flatten pairs back into role-tagged records.
pub fn pairs_to_messages(pairs: &[(String, String)]) -> Vec<HistoryMessage> {
    pairs
        .iter()
        .flat_map(|(user, assistant)| {
            [
                HistoryMessage::user(user.as_str()),
                HistoryMessage::assistant(assistant.as_str()),
            ]
        })
        .collect()
}
