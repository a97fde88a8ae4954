//! Shared extraction primitives: fenced code blocks and provider de-wrapping.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::ShapeError;

/// One fenced code region scanned out of raw model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Language tag from the opening fence; `None` when the fence is bare.
    pub language: Option<String>,
    pub body: String,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(\w*)\s+(.*?)```").expect("fence regex is valid"))
}

/// Scan `text` for fenced code regions in document order.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    fence_regex()
        .captures_iter(text)
        .map(|caps| {
            let tag = caps.get(1).map_or("", |m| m.as_str());
            FencedBlock {
                language: if tag.is_empty() {
                    None
                } else {
                    Some(tag.to_string())
                },
                body: caps.get(2).map_or("", |m| m.as_str()).trim_end().to_string(),
            }
        })
        .collect()
}

/// Strip everything from the provider's closing sentinel onward.
///
/// Some providers wrap their answer in a sentinel tag pair; when the
/// provider declares the sentinel required, its absence is a shape defect.
pub fn strip_output_wrapper<'a>(text: &'a str, sentinel: &str) -> Result<&'a str, ShapeError> {
    match text.find(sentinel) {
        Some(index) => Ok(text[..index].trim()),
        None => Err(ShapeError::SentinelMissing {
            sentinel: sentinel.to_string(),
        }),
    }
}
