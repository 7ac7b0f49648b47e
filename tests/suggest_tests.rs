//! Suggested-next-messages generation.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::ScriptedBackend;
use ouro::agent::{ChatHistorySource, HistoryMessage, HistoryPage};
use ouro::error::Result;
use ouro::prelude::*;

struct FixedHistory;

#[async_trait]
impl ChatHistorySource for FixedHistory {
    async fn page(&self, cursor: Option<&str>) -> Result<HistoryPage> {
        match cursor {
            None => Ok(HistoryPage {
                messages: vec![HistoryMessage {
                    role: Role::User,
                    body: "Can you explain fractions?".into(),
                    author: None,
                    context: None,
                    timestamp: None,
                }],
                next_cursor: Some("2".into()),
            }),
            Some(_) => Ok(HistoryPage {
                messages: vec![HistoryMessage {
                    role: Role::Assistant,
                    body: "A fraction is a part of a whole.".into(),
                    author: None,
                    context: None,
                    timestamp: None,
                }],
                next_cursor: None,
            }),
        }
    }
}

#[tokio::test]
async fn streams_growing_suggestion_lists() {
    let backend = ScriptedBackend::new(vec![vec![
        json!({ "suggested_user_messages": ["Show me an example"] }),
        json!({ "suggested_user_messages": ["Show me an example", "Why do we need them?"] }),
    ]]);
    let agent = AgentLoop::new(backend.clone());

    let partials = Arc::new(Mutex::new(Vec::<Vec<String>>::new()));
    let sink_partials = Arc::clone(&partials);
    let request = SuggestRequest::new()
        .with_count(2)
        .with_suggestion_sink(Arc::new(move |suggestions| {
            sink_partials.lock().unwrap().push(suggestions.to_vec());
        }));

    let result = agent
        .stream_suggested_next_messages(request, &FixedHistory)
        .await
        .unwrap();

    assert_eq!(
        result.suggested_user_messages,
        vec!["Show me an example".to_string(), "Why do we need them?".to_string()]
    );
    let partials = partials.lock().unwrap();
    assert_eq!(partials.len(), 2);
    assert!(partials.windows(2).all(|w| w[0].len() <= w[1].len()));

    // The full paginated history went into the prompt.
    let prompt = backend.requests()[0].messages.clone();
    assert!(prompt.iter().any(|m| m.text().contains("fractions")));
    assert_eq!(backend.requests()[0].schema_name, "suggested_user_messages");
}
