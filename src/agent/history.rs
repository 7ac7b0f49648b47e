//! Chat history collaborator interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ChatMessage, ContentPart, ContextData, Role};

/// One prior message from the caller's store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub body: String,
    /// Who produced the message, when the store tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Renderer payload, present on context-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One page of history; `next_cursor` is `None` on the last page.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<HistoryMessage>,
    pub next_cursor: Option<String>,
}

/// Ordered, paginated source of prior chat messages.
#[async_trait]
pub trait ChatHistorySource: Send + Sync {
    async fn page(&self, cursor: Option<&str>) -> Result<HistoryPage>;
}

/// Drain every page of `source` into chat messages, oldest first.
pub async fn collect_history(source: &dyn ChatHistorySource) -> Result<Vec<ChatMessage>> {
    let mut messages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = source.page(cursor.as_deref()).await?;
        messages.extend(page.messages.into_iter().map(ChatMessage::from));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(messages)
}

impl From<HistoryMessage> for ChatMessage {
    fn from(message: HistoryMessage) -> Self {
        if let Some(context) = message.context {
            let mut chat = ChatMessage::context(context);
            chat.timestamp = message.timestamp;
            return chat;
        }
        ChatMessage {
            role: message.role,
            content: vec![ContentPart::Text { text: message.body }],
            name: message.author,
            timestamp: message.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TwoPages;

    #[async_trait]
    impl ChatHistorySource for TwoPages {
        async fn page(&self, cursor: Option<&str>) -> Result<HistoryPage> {
            match cursor {
                None => Ok(HistoryPage {
                    messages: vec![HistoryMessage {
                        role: Role::User,
                        body: "first".into(),
                        author: Some("student".into()),
                        context: None,
                        timestamp: None,
                    }],
                    next_cursor: Some("p2".into()),
                }),
                Some("p2") => Ok(HistoryPage {
                    messages: vec![HistoryMessage {
                        role: Role::Context,
                        body: String::new(),
                        author: None,
                        context: Some(ContextData {
                            kind: "skill".into(),
                            data: json!({"id": 4}),
                        }),
                        timestamp: None,
                    }],
                    next_cursor: None,
                }),
                other => panic!("unexpected cursor {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn drains_all_pages_in_order() {
        let messages = collect_history(&TwoPages).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "first");
        assert_eq!(messages[0].name.as_deref(), Some("student"));
        assert_eq!(messages[1].context_data().unwrap().kind, "skill");
    }
}
