//! Practice-exercise validation: two code variants, one completion marker,
//! structural agreement outside the marked region.

use tracing::debug;

use crate::errors::ShapeError;
use crate::types::PracticeArtifact;
use crate::validate::extract::{fenced_blocks, strip_output_wrapper, FencedBlock};

/// Literal marker denoting the intentionally omitted region in the question
/// variant. Prompts instruct the model to emit exactly this line.
pub const TODO_MARKER: &str = "# TODO: Add the missing line(s) below.";

/// Validate raw model output into a practice exercise.
///
/// Contract: exactly two fenced blocks declaring the same language; exactly
/// one of them carries [`TODO_MARKER`] (that one is the question); and the
/// two variants agree line-for-line outside the marked region — strictly
/// before the marker, by ordered containment after it.
pub fn validate_practice(
    raw: &str,
    sentinel: Option<&str>,
) -> Result<PracticeArtifact, ShapeError> {
    let text = match sentinel {
        Some(sentinel) => strip_output_wrapper(raw, sentinel)?,
        None => raw,
    };

    let blocks = fenced_blocks(text);
    if blocks.len() != 2 {
        return Err(ShapeError::CodeBlockCount {
            expected: 2,
            found: blocks.len(),
        });
    }

    let language = consistent_language(&blocks)?;
    let (question, answer) = determine_question_and_answer(&blocks[0].body, &blocks[1].body)?;
    check_structural_agreement(question, answer)?;

    debug!(language = %language, "practice output validated");
    Ok(PracticeArtifact {
        language,
        question: question.to_string(),
        answer: answer.to_string(),
    })
}

/// Both blocks must be tagged, and with the same language.
fn consistent_language(blocks: &[FencedBlock]) -> Result<String, ShapeError> {
    let mut languages = Vec::with_capacity(2);
    for (index, block) in blocks.iter().enumerate() {
        match &block.language {
            Some(language) => languages.push(language.clone()),
            None => return Err(ShapeError::UntaggedCodeBlock { index }),
        }
    }
    if languages[0] != languages[1] {
        return Err(ShapeError::LanguageMismatch {
            first: languages[0].clone(),
            second: languages[1].clone(),
        });
    }
    Ok(languages.remove(0))
}

/// The block containing the marker is the question; the other is the answer.
fn determine_question_and_answer<'a>(
    block_1: &'a str,
    block_2: &'a str,
) -> Result<(&'a str, &'a str), ShapeError> {
    match (block_1.contains(TODO_MARKER), block_2.contains(TODO_MARKER)) {
        (true, false) => Ok((block_1, block_2)),
        (false, true) => Ok((block_2, block_1)),
        (false, false) => Err(ShapeError::MarkerMissing),
        (true, true) => Err(ShapeError::MarkerAmbiguous),
    }
}

/// Walk question and answer lines with two independent cursors.
///
/// Before the marker line every question line must equal the answer line at
/// the same position. The marker line itself is skipped without advancing
/// the answer cursor. After it, each remaining question line must appear in
/// the answer at or past the cursor, in order — the answer is allowed extra
/// inserted lines (the filled-in code), the question is not allowed lines
/// the answer lacks.
fn check_structural_agreement(question: &str, answer: &str) -> Result<(), ShapeError> {
    let answer_lines: Vec<&str> = answer.lines().collect();
    let mut cursor = 0usize;
    let mut past_marker = false;

    for (q_index, q_line) in question.lines().enumerate() {
        if !past_marker {
            if q_line.contains(TODO_MARKER) {
                past_marker = true;
                continue;
            }
            match answer_lines.get(cursor) {
                Some(a_line) if *a_line == q_line => cursor += 1,
                _ => {
                    return Err(ShapeError::DivergesBeforeMarker { line: q_index + 1 });
                }
            }
        } else {
            while cursor < answer_lines.len() && answer_lines[cursor] != q_line {
                cursor += 1;
            }
            if cursor == answer_lines.len() {
                return Err(ShapeError::AnswerMissingLines { line: q_index + 1 });
            }
            cursor += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice_output(question: &str, answer: &str) -> String {
        format!("```python\n{question}\n```\n\n```python\n{answer}\n```\n")
    }

    #[test]
    fn round_trip_marker_replaces_one_line() {
        let question = format!("def add(a, b):\n    {TODO_MARKER}\n");
        let answer = "def add(a, b):\n    return a + b\n";
        let raw = practice_output(&question, answer);

        let artifact = validate_practice(&raw, None).unwrap();
        assert_eq!(artifact.language, "python");
        assert!(artifact.question.contains(TODO_MARKER));
        assert!(artifact.answer.contains("return a + b"));
    }

    #[test]
    fn question_may_come_second() {
        let answer = "def add(a, b):\n    return a + b";
        let question = format!("def add(a, b):\n    {TODO_MARKER}");
        let raw = practice_output(answer, &question);

        let artifact = validate_practice(&raw, None).unwrap();
        assert!(artifact.question.contains(TODO_MARKER));
    }

    #[test]
    fn wrong_block_count_rejected() {
        let raw = "```python\nprint('only one block')\n```";
        let err = validate_practice(raw, None).unwrap_err();
        assert_eq!(
            err,
            ShapeError::CodeBlockCount {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn language_mismatch_rejected() {
        let raw = format!(
            "```javascript\nlet x = 1;\n// {TODO_MARKER}\n```\n```python\nx = 1\n```"
        );
        let err = validate_practice(&raw, None).unwrap_err();
        assert!(matches!(err, ShapeError::LanguageMismatch { .. }));
    }

    #[test]
    fn untagged_block_rejected() {
        let raw = format!("```\n{TODO_MARKER}\n```\n```python\nx = 1\n```");
        let err = validate_practice(&raw, None).unwrap_err();
        assert_eq!(err, ShapeError::UntaggedCodeBlock { index: 0 });
    }

    #[test]
    fn marker_in_both_blocks_rejected() {
        let body = format!("def f():\n    {TODO_MARKER}");
        let raw = practice_output(&body, &body);
        assert_eq!(
            validate_practice(&raw, None).unwrap_err(),
            ShapeError::MarkerAmbiguous
        );
    }

    #[test]
    fn marker_in_neither_block_rejected() {
        let raw = practice_output("def f():\n    return 1", "def f():\n    return 1");
        assert_eq!(
            validate_practice(&raw, None).unwrap_err(),
            ShapeError::MarkerMissing
        );
    }

    #[test]
    fn pre_marker_divergence_rejected() {
        let question = format!("def add(x, y):\n    {TODO_MARKER}");
        let answer = "def add(a, b):\n    return a + b";
        let raw = practice_output(&question, answer);
        assert_eq!(
            validate_practice(&raw, None).unwrap_err(),
            ShapeError::DivergesBeforeMarker { line: 1 }
        );
    }

    #[test]
    fn answer_may_insert_lines_in_marked_region() {
        let question = format!(
            "def stats(xs):\n    total = 0\n    {TODO_MARKER}\n    return total / len(xs)"
        );
        let answer =
            "def stats(xs):\n    total = 0\n    for x in xs:\n        total += x\n    return total / len(xs)";
        let raw = practice_output(&question, answer);
        assert!(validate_practice(&raw, None).is_ok());
    }

    #[test]
    fn post_marker_line_absent_from_answer_rejected() {
        let question = format!("def f():\n    {TODO_MARKER}\n    return total");
        let answer = "def f():\n    return count";
        let raw = practice_output(&question, answer);
        assert_eq!(
            validate_practice(&raw, None).unwrap_err(),
            ShapeError::AnswerMissingLines { line: 3 }
        );
    }

    #[test]
    fn post_marker_lines_must_stay_in_order() {
        let question = format!("setup()\n{TODO_MARKER}\nsecond()\nfirst()");
        let answer = "setup()\nfirst()\nsecond()";
        let raw = practice_output(&question, answer);
        // `second()` is found, but `first()` now lies behind the cursor.
        assert_eq!(
            validate_practice(&raw, None).unwrap_err(),
            ShapeError::AnswerMissingLines { line: 4 }
        );
    }

    #[test]
    fn sentinel_stripped_before_extraction() {
        let question = format!("def f():\n    {TODO_MARKER}");
        let answer = "def f():\n    return 1";
        let raw = format!(
            "{}\n</output>\n```python\nleftover junk\n```",
            practice_output(&question, answer)
        );
        let artifact = validate_practice(&raw, Some("</output>")).unwrap();
        assert_eq!(artifact.language, "python");
    }

    #[test]
    fn required_sentinel_missing_rejected() {
        let raw = practice_output("a", "b");
        assert!(matches!(
            validate_practice(&raw, Some("</output>")).unwrap_err(),
            ShapeError::SentinelMissing { .. }
        ));
    }

    #[test]
    fn validation_is_idempotent() {
        let question = format!("def add(a, b):\n    {TODO_MARKER}");
        let answer = "def add(a, b):\n    return a + b";
        let raw = practice_output(&question, answer);
        let first = validate_practice(&raw, None).unwrap();
        let second = validate_practice(&raw, None).unwrap();
        assert_eq!(first, second);
    }
}
