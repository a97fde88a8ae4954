//! Summary validation: numbered-markdown topic extraction plus quality gates.
//!
//! Expected raw shape is a numbered list of `**Topic**: content` entries,
//! optionally preceded by a header sentence and optionally carrying one
//! fenced code example inside an entry:
//!
//! ```text
//! Here are the key topics:
//!
//! 1. **Time Complexity of Insertion**: Inserting at the head of a list is O(n).
//! 2. **Prepending With insert**: The insert method prepends in linear time.
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::errors::ShapeError;
use crate::types::{CodeExample, TopicNote};
use crate::validate::extract::{fenced_blocks, strip_output_wrapper};

fn entry_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+\.").expect("entry regex is valid"))
}

fn topic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\*\*(.+?)\*\*:\s*(.*)").expect("topic regex is valid"))
}

/// Validate raw model output into a topic → note mapping.
pub fn validate_summary(
    raw: &str,
    sentinel: Option<&str>,
) -> Result<BTreeMap<String, TopicNote>, ShapeError> {
    let text = match sentinel {
        Some(sentinel) => strip_output_wrapper(raw, sentinel)?,
        None => raw,
    };

    let body = remove_header(text)?;
    let topics = extract_topics(body)?;
    debug!(topics = topics.len(), "summary output validated");
    Ok(topics)
}

/// Drop everything before the first numbered entry.
fn remove_header(text: &str) -> Result<&str, ShapeError> {
    match text.find("1.") {
        Some(index) => Ok(text[index..].trim()),
        None => Err(ShapeError::SummaryHeaderMissing),
    }
}

/// Split the list into entries and pull out `**Topic**: content` pairs.
fn extract_topics(text: &str) -> Result<BTreeMap<String, TopicNote>, ShapeError> {
    let starts: Vec<usize> = entry_start_regex()
        .find_iter(text)
        .map(|m| m.start())
        .collect();

    let mut topics = BTreeMap::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let Some(caps) = topic_regex().captures(&text[start..end]) else {
            continue;
        };
        let topic = caps[1].trim().to_string();
        let content = caps[2].trim().to_string();

        reject_unlikely_topic(&topic)?;
        let note = split_code_example(&topic, &content)?;
        topics.insert(topic, note);
    }

    if topics.is_empty() {
        return Err(ShapeError::NoTopicsFound);
    }
    Ok(topics)
}

/// One-word topics ("Issue", "Problem") are low-information model filler.
fn reject_unlikely_topic(topic: &str) -> Result<(), ShapeError> {
    if topic.split_whitespace().count() <= 1 {
        return Err(ShapeError::SingleWordTopic {
            topic: topic.to_string(),
        });
    }
    Ok(())
}

/// Detach a fenced code example from the entry content, requiring a language
/// tag on every fence the entry declares.
fn split_code_example(topic: &str, content: &str) -> Result<TopicNote, ShapeError> {
    let blocks = fenced_blocks(content);
    let mut example = None;

    for block in blocks {
        let Some(language) = block.language else {
            return Err(ShapeError::MissingCodeLanguage {
                topic: topic.to_string(),
            });
        };
        if example.is_none() {
            example = Some(CodeExample {
                language,
                code: block.body,
            });
        }
    }

    let prose = if example.is_some() {
        let mut stripped = String::new();
        let mut inside = false;
        for line in content.lines() {
            if line.trim_start().starts_with("```") {
                inside = !inside;
                continue;
            }
            if !inside {
                stripped.push_str(line);
                stripped.push('\n');
            }
        }
        stripped.trim().to_string()
    } else {
        content.to_string()
    };

    Ok(TopicNote {
        content: prose,
        code_example: example,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Here are the key topics from the conversation:\n\n\
        1. **Time Complexity of Insertion**: Inserting an element at the beginning \
        of a Python list is a linear-time operation.\n\n\
        2. **Prepending Using insert**: The list.insert method can prepend an \
        element, but it is less efficient for large lists.\n";

    #[test]
    fn extracts_topic_content_pairs() {
        let topics = validate_summary(SAMPLE, None).unwrap();
        assert_eq!(topics.len(), 2);
        assert!(topics["Time Complexity of Insertion"]
            .content
            .contains("linear-time operation"));
        assert!(topics["Prepending Using insert"]
            .content
            .contains("less efficient"));
    }

    #[test]
    fn header_before_first_entry_is_dropped() {
        let topics = validate_summary(SAMPLE, None).unwrap();
        for note in topics.values() {
            assert!(!note.content.contains("key topics from the conversation"));
        }
    }

    #[test]
    fn missing_numbered_list_rejected() {
        let err = validate_summary("no list at all here", None).unwrap_err();
        assert_eq!(err, ShapeError::SummaryHeaderMissing);
    }

    #[test]
    fn entries_without_bold_topic_are_skipped_not_fatal() {
        let raw = "1. plain entry without markup\n2. **Binary Search Trees**: ordered nodes.\n";
        let topics = validate_summary(raw, None).unwrap();
        assert_eq!(topics.len(), 1);
        assert!(topics.contains_key("Binary Search Trees"));
    }

    #[test]
    fn zero_extracted_topics_rejected() {
        let raw = "1. nothing structured\n2. still nothing\n";
        assert_eq!(
            validate_summary(raw, None).unwrap_err(),
            ShapeError::NoTopicsFound
        );
    }

    #[test]
    fn single_word_topic_rejected() {
        let raw = "1. **Issue**: something vague.\n";
        assert_eq!(
            validate_summary(raw, None).unwrap_err(),
            ShapeError::SingleWordTopic {
                topic: "Issue".into()
            }
        );
    }

    #[test]
    fn multi_word_topic_accepted() {
        let raw = "1. **Issue with recursion**: missing base case.\n";
        let topics = validate_summary(raw, None).unwrap();
        assert!(topics.contains_key("Issue with recursion"));
    }

    #[test]
    fn code_example_with_language_is_detached() {
        let raw = "1. **List Prepending**: Use insert at index zero.\n\
            ```python\nxs.insert(0, item)\n```\n";
        let topics = validate_summary(raw, None).unwrap();
        let note = &topics["List Prepending"];
        let example = note.code_example.as_ref().unwrap();
        assert_eq!(example.language, "python");
        assert_eq!(example.code, "xs.insert(0, item)");
        assert!(!note.content.contains("insert(0, item)"));
    }

    #[test]
    fn code_example_without_language_rejected() {
        let raw = "1. **List Prepending**: Use insert at index zero.\n\
            ```\nxs.insert(0, item)\n```\n";
        assert_eq!(
            validate_summary(raw, None).unwrap_err(),
            ShapeError::MissingCodeLanguage {
                topic: "List Prepending".into()
            }
        );
    }

    #[test]
    fn sentinel_is_stripped_first() {
        let raw = format!("{SAMPLE}\n</output>\nAnything after the tag is ignored 1. **x**");
        let topics = validate_summary(&raw, Some("</output>")).unwrap();
        assert_eq!(topics.len(), 2);
    }
}
