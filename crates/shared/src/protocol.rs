use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RequestId;

/// One request frame sent over the chat socket per user submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub id: RequestId,
    pub user_id: String,
    pub session_id: String,
    pub user_message: String,
    pub search: bool,
}

/// One inbound event frame from the assistant side of the chat socket.
///
/// Every field may be absent on the wire; unknown fields are passed through
/// undisturbed by ignoring them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chain_of_thought: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_of_thought_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<SearchResults>,
}

impl AssistantEvent {
    /// Parses one text frame. A frame that is not a valid event object yields
    /// `FrameError` so the caller can skip it without touching any state.
    pub fn from_frame(frame: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[derive(Debug, Error)]
#[error("malformed event frame: {0}")]
pub struct FrameError(#[from] serde_json::Error);

/// Search payload attached to an event: category name to an ordered list of
/// items. The upstream search service emits `null` placeholders inside the
/// lists, so items are nullable here and filtered at display time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResults(pub BTreeMap<String, Vec<Option<ResultItem>>>);

impl SearchResults {
    /// True when no category would survive null-entry removal.
    pub fn is_empty(&self) -> bool {
        self.0
            .values()
            .all(|items| items.iter().all(Option::is_none))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ResultItem {
    /// Display link, resolved by priority: `href`, then `url`, then `link`.
    pub fn resolved_link(&self) -> Option<&str> {
        self.href
            .as_deref()
            .or(self.url.as_deref())
            .or(self.link.as_deref())
    }

    /// Display image: the explicit `image`, else the first thumbnail.
    pub fn resolved_image(&self) -> Option<&str> {
        self.image
            .as_deref()
            .or_else(|| self.thumbnails.first().map(String::as_str))
    }

    /// Display timestamp, `date` preferred over `publish_time`.
    pub fn resolved_timestamp(&self) -> Option<&str> {
        self.date.as_deref().or(self.publish_time.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_event_frame() {
        let frame = r#"{
            "user_id": "u-1",
            "session_id": "s-1",
            "chain_of_thought": true,
            "chain_of_thought_message": "Searching for external information",
            "message": "",
            "search_results": {"news": [{"title": "X", "url": "http://x"}, null]}
        }"#;

        let event = AssistantEvent::from_frame(frame).expect("parse");
        assert!(event.chain_of_thought);
        assert_eq!(
            event.chain_of_thought_message.as_deref(),
            Some("Searching for external information")
        );
        assert_eq!(event.message.as_deref(), Some(""));

        let results = event.search_results.expect("results");
        let news = results.0.get("news").expect("news category");
        assert_eq!(news.len(), 2);
        assert!(news[1].is_none());
        assert_eq!(
            news[0].as_ref().and_then(|item| item.resolved_link()),
            Some("http://x")
        );
    }

    #[test]
    fn missing_fields_default_to_non_reasoning() {
        let event = AssistantEvent::from_frame(r#"{"message": "hi"}"#).expect("parse");
        assert!(!event.chain_of_thought);
        assert_eq!(event.message.as_deref(), Some("hi"));
        assert!(event.search_results.is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let event =
            AssistantEvent::from_frame(r#"{"message": "hi", "latency_ms": 12}"#).expect("parse");
        assert_eq!(event.message.as_deref(), Some("hi"));
    }

    #[test]
    fn rejects_malformed_frame() {
        assert!(AssistantEvent::from_frame("not json").is_err());
        assert!(AssistantEvent::from_frame(r#"["an", "array"]"#).is_err());
    }

    #[test]
    fn request_serializes_with_wire_field_names() {
        let request = ChatRequest {
            id: RequestId(1700000000000),
            user_id: "u-1".into(),
            session_id: "s-1".into(),
            user_message: "hello".into(),
            search: true,
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["id"], 1700000000000i64);
        assert_eq!(value["user_id"], "u-1");
        assert_eq!(value["session_id"], "s-1");
        assert_eq!(value["user_message"], "hello");
        assert_eq!(value["search"], true);
    }

    #[test]
    fn link_resolution_prefers_href_then_url_then_link() {
        let mut item = ResultItem {
            href: Some("http://href".into()),
            url: Some("http://url".into()),
            link: Some("http://link".into()),
            ..ResultItem::default()
        };
        assert_eq!(item.resolved_link(), Some("http://href"));

        item.href = None;
        assert_eq!(item.resolved_link(), Some("http://url"));

        item.url = None;
        assert_eq!(item.resolved_link(), Some("http://link"));
    }

    #[test]
    fn empty_or_null_only_payloads_count_as_empty() {
        assert!(SearchResults::default().is_empty());

        let null_only: SearchResults =
            serde_json::from_str(r#"{"videos": [], "web": [null, null]}"#).expect("parse");
        assert!(null_only.is_empty());

        let populated: SearchResults =
            serde_json::from_str(r#"{"web": [null, {"title": "T"}]}"#).expect("parse");
        assert!(!populated.is_empty());
    }
}
