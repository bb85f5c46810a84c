//! Spoken command recognition.
//!
//! Commands are matched against fixed phrase sets on the whole utterance, so
//! "next" is a command while "next tuesday" is field content. Recognition
//! runs before interpretation, which keeps a literal command word from being
//! parsed as an answer.

use serde::{Deserialize, Serialize};

const SKIP_PHRASES: &[&str] = &["skip", "next", "pass"];
const BACK_PHRASES: &[&str] = &["back", "previous", "go back"];
const REPEAT_PHRASES: &[&str] = &["repeat", "say again", "what"];
const CLEAR_PHRASES: &[&str] = &["clear", "delete", "erase"];

/// Words read as "yes" while confirming and by checkbox fields.
pub(crate) const AFFIRMATIVE_WORDS: &[&str] = &["yes", "yeah", "correct", "true", "ok"];
/// Words read as "no" while confirming and by checkbox fields.
pub(crate) const NEGATIVE_WORDS: &[&str] = &["no", "nope", "false", "negative"];

/// Classification of a finalized utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Skip,
    Back,
    Repeat,
    Clear,
    /// Only produced while a candidate is being confirmed.
    Affirm,
    /// Only produced while a candidate is being confirmed.
    Deny,
    /// Not a command; the utterance is field content.
    None,
}

/// Lower-cases, trims, and strips the punctuation ASR engines attach to
/// short utterances ("Yes.", "What?").
pub fn normalize(utterance: &str) -> String {
    utterance
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classifies `utterance`.
///
/// Affirm/deny are recognized only when `confirming` is set; otherwise those
/// words are ordinary content (a checkbox answer, for instance).
pub fn recognize(utterance: &str, confirming: bool) -> Command {
    let phrase = normalize(utterance);
    let phrase = phrase.as_str();

    if confirming {
        if AFFIRMATIVE_WORDS.contains(&phrase) {
            return Command::Affirm;
        }
        if NEGATIVE_WORDS.contains(&phrase) {
            return Command::Deny;
        }
    }

    if SKIP_PHRASES.contains(&phrase) {
        Command::Skip
    } else if BACK_PHRASES.contains(&phrase) {
        Command::Back
    } else if REPEAT_PHRASES.contains(&phrase) {
        Command::Repeat
    } else if CLEAR_PHRASES.contains(&phrase) {
        Command::Clear
    } else {
        Command::None
    }
}

/// Reads a yes/no word, `None` for anything else.
pub(crate) fn yes_no(utterance: &str) -> Option<bool> {
    let phrase = normalize(utterance);
    if AFFIRMATIVE_WORDS.contains(&phrase.as_str()) {
        Some(true)
    } else if NEGATIVE_WORDS.contains(&phrase.as_str()) {
        Some(false)
    } else {
        None
    }
}
