//! Prompt text for each provider family and artifact kind.
//!
//! Prompt wording is deliberately interchangeable — the pipeline's contract
//! with the model is structural (numbered topic list, two fenced blocks, the
//! completion marker), and the validator enforces it after every call.

use crate::transcript::Transcript;
use crate::types::ArtifactKind;
use crate::validate::TODO_MARKER;

/// Summariser preamble shared by chat-completions providers.
pub const SUMMARY_SYSTEM_PREAMBLE: &str = "\
You are a revision-notes assistant. The user gives you a programming help \
conversation; you distill it into study notes.

Respond with a numbered list. Each entry must have the form \
`N. **Topic**: explanation`. Topics must be specific multi-word phrases, \
never one-word labels like 'Issue' or 'Problem'. If an entry benefits from a \
code example, put it in a fenced code block tagged with its language. \
Output only the list — no closing commentary.";

/// Examiner preamble shared by chat-completions providers.
pub const PRACTICE_SYSTEM_PREAMBLE: &str = "\
You are a coding-exercise author. From the conversation you are given, write \
ONE fill-in-the-blank exercise that tests its central concept.

Respond with exactly two fenced code blocks tagged with the same language. \
The first is the complete, working solution. The second is identical except \
that the key line or lines are replaced by this exact comment line:

# TODO: Add the missing line(s) below.

Every line outside the replaced region must match between the two blocks \
character for character. Output only the two code blocks.";

/// Extra instruction for providers whose answers are wrapped in output tags.
pub const OUTPUT_TAG_INSTRUCTION: &str = "\
Wrap your entire answer in <output> and </output> tags.";

/// System message for one (kind, tagged-output?) combination.
pub fn system_message(kind: ArtifactKind, wraps_output: bool) -> String {
    let preamble = match kind {
        ArtifactKind::Summary => SUMMARY_SYSTEM_PREAMBLE,
        ArtifactKind::Practice => PRACTICE_SYSTEM_PREAMBLE,
    };
    if wraps_output {
        format!("{preamble}\n\n{OUTPUT_TAG_INSTRUCTION}")
    } else {
        preamble.to_string()
    }
}

/// User message carrying the rendered chunk.
pub fn user_message(kind: ArtifactKind, chunk: &Transcript) -> String {
    match kind {
        ArtifactKind::Summary => format!(
            "Summarise the key topics of this conversation as revision notes:\n\n{}",
            chunk.render()
        ),
        ArtifactKind::Practice => format!(
            "Write one fill-in-the-blank exercise for the concept discussed here. \
            Remember: two fenced code blocks, same language, and the incomplete \
            variant marks the omitted region with `{TODO_MARKER}`.\n\n{}",
            chunk.render()
        ),
    }
}
