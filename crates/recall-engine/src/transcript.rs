//! Transcript domain type: a titled, ordered sequence of message slots.
//!
//! Wire shape is a flat JSON object: a `"title"` key plus message slots named
//! `UserMessageN` / `AssistantMessageN`. Slot order is meaningful (it is the
//! conversation order), so deserialization walks the document's own entry
//! order instead of going through an intermediate map.
//!
//! Chunks produced by the chunker are themselves `Transcript` values: same
//! title, a contiguous run of the slots, no extra metadata.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::PipelineError;

/// Key holding the conversation title.
pub const TITLE_KEY: &str = "title";
/// Prefix of user-authored message slots.
pub const USER_SLOT_PREFIX: &str = "UserMessage";
/// Prefix of assistant-authored message slots.
pub const ASSISTANT_SLOT_PREFIX: &str = "AssistantMessage";

/// A chat transcript: title plus ordered `(slot, text)` messages.
///
/// Immutable after construction; the generation pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    title: String,
    messages: Vec<(String, String)>,
}

impl Transcript {
    /// Build a transcript from already-validated parts (chunker, tests).
    pub fn from_parts(
        title: impl Into<String>,
        messages: Vec<(String, String)>,
    ) -> Self {
        Self {
            title: title.into(),
            messages,
        }
    }

    /// Build a transcript from a decoded JSON value, validating shape.
    ///
    /// # Errors
    ///
    /// `PipelineError::InputShape` when the value is not an object, the title
    /// is missing, a key matches no recognized slot pattern, or any value is
    /// not a string. This is the caller-input defect of the error taxonomy:
    /// it surfaces before any generation is attempted and is never retried.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PipelineError> {
        let map = value
            .as_object()
            .ok_or_else(|| PipelineError::InputShape("transcript is not a JSON object".into()))?;

        let mut title: Option<String> = None;
        let mut messages = Vec::with_capacity(map.len().saturating_sub(1));

        for (key, value) in map {
            let text = value.as_str().ok_or_else(|| {
                PipelineError::InputShape(format!("value for key {key:?} is not a string"))
            })?;
            if key == TITLE_KEY {
                title = Some(text.to_string());
            } else if is_message_slot(key) {
                messages.push((key.clone(), text.to_string()));
            } else {
                return Err(PipelineError::InputShape(format!(
                    "invalid key name: {key:?}"
                )));
            }
        }

        let title = title
            .ok_or_else(|| PipelineError::InputShape("transcript has no title".into()))?;

        Ok(Self { title, messages })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Message slots in conversation order.
    pub fn messages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Prompt-facing textual form: title header plus one block per slot.
    pub fn render(&self) -> String {
        let mut out = format!("Title: {}\n\n", self.title);
        for (slot, text) in self.messages() {
            out.push_str(slot);
            out.push_str(": ");
            out.push_str(text);
            out.push_str("\n\n");
        }
        out
    }
}

/// `true` when `key` names a message slot.
fn is_message_slot(key: &str) -> bool {
    key.starts_with(USER_SLOT_PREFIX) || key.starts_with(ASSISTANT_SLOT_PREFIX)
}

impl Serialize for Transcript {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.messages.len() + 1))?;
        map.serialize_entry(TITLE_KEY, &self.title)?;
        for (slot, text) in &self.messages {
            map.serialize_entry(slot, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Transcript {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TranscriptVisitor;

        impl<'de> Visitor<'de> for TranscriptVisitor {
            type Value = Transcript;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a transcript object with a title and message slots")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Transcript, A::Error> {
                let mut title: Option<String> = None;
                let mut messages = Vec::new();

                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    if key == TITLE_KEY {
                        title = Some(value);
                    } else if is_message_slot(&key) {
                        messages.push((key, value));
                    } else {
                        return Err(de::Error::custom(format!("invalid key name: {key:?}")));
                    }
                }

                let title = title.ok_or_else(|| de::Error::missing_field(TITLE_KEY))?;
                Ok(Transcript { title, messages })
            }
        }

        deserializer.deserialize_map(TranscriptVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_preserves_slot_order() {
        let value = json!({
            "title": "Linked lists",
            "UserMessage1": "What is a linked list?",
            "AssistantMessage1": "A sequence of nodes.",
            "UserMessage2": "How do I reverse one?",
        });
        let transcript = Transcript::from_value(&value).unwrap();
        let slots: Vec<&str> = transcript.messages().map(|(k, _)| k).collect();
        assert_eq!(
            slots,
            ["UserMessage1", "AssistantMessage1", "UserMessage2"]
        );
        assert_eq!(transcript.title(), "Linked lists");
    }

    #[test]
    fn from_value_rejects_unrecognized_key() {
        let value = json!({
            "title": "t",
            "SystemMessage1": "nope",
        });
        let err = Transcript::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("invalid key name"));
        assert!(!err.is_retriable());
    }

    #[test]
    fn from_value_rejects_non_string_value() {
        let value = json!({
            "title": "t",
            "UserMessage1": 42,
        });
        let err = Transcript::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("not a string"));
    }

    #[test]
    fn from_value_requires_title() {
        let value = json!({
            "UserMessage1": "hello",
        });
        assert!(Transcript::from_value(&value).is_err());
    }

    #[test]
    fn render_contains_title_and_every_slot() {
        let transcript = Transcript::from_parts(
            "Recursion",
            vec![
                ("UserMessage1".into(), "What is recursion?".into()),
                ("AssistantMessage1".into(), "See: recursion.".into()),
            ],
        );
        let rendered = transcript.render();
        assert!(rendered.starts_with("Title: Recursion"));
        assert!(rendered.contains("UserMessage1: What is recursion?"));
        assert!(rendered.contains("AssistantMessage1: See: recursion."));
    }

    #[test]
    fn deserialize_rejects_bad_key() {
        let raw = r#"{"title": "t", "Banner": "x"}"#;
        assert!(serde_json::from_str::<Transcript>(raw).is_err());
    }

    #[test]
    fn serialize_round_trips_through_json() {
        let transcript = Transcript::from_parts(
            "t",
            vec![("UserMessage1".into(), "hi".into())],
        );
        let raw = serde_json::to_string(&transcript).unwrap();
        let back: Transcript = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, transcript);
    }
}
