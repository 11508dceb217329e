//! Moderation pre-screen and model refusal detection.
//!
//! The pre-screen runs on acquired text before any AI call; a hit marks
//! the whole analysis refused. Refusal detection runs on generated prose
//! sections; a hit is recorded for review but is a section-level soft
//! failure, never a pipeline failure.

use std::sync::OnceLock;

use regex::Regex;

/// Content patterns that block analysis outright.
const BLOCKED_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)how to (build|make|assemble) (a|an) (bomb|explosive|pipe bomb)", "weapons instructions"),
    (r"(?i)synthesi[sz]e (methamphetamine|fentanyl|nerve agent)", "drug synthesis instructions"),
    (r"(?i)child (sexual abuse|exploitation) material", "csam"),
];

/// Opening phrases and tells of an AI refusal in place of a section.
const REFUSAL_PATTERNS: &[&str] = &[
    r"(?i)^\s*(i'm sorry|i am sorry|i apologize),? (but )?i (can('|no)t|cannot|am unable)",
    r"(?i)^\s*i (can('|no)t|cannot|am unable to) (assist|help|provide|summarize|analyze)",
    r"(?i)^\s*as an ai( language model)?[, ]",
    r"(?i)\bi (cannot|can't) assist with (that|this) request\b",
    r"(?i)\bgoes against (my|our) (content )?polic(y|ies)\b",
];

/// Check acquired content before analysis. Returns the block reason.
pub fn pre_screen(title: Option<&str>, text: &str) -> Option<&'static str> {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    let regexes = CELL.get_or_init(|| {
        BLOCKED_PATTERNS
            .iter()
            .map(|(p, _)| Regex::new(p).expect("pattern is a compile-time constant"))
            .collect()
    });
    let combined = match title {
        Some(t) => format!("{t}\n{text}"),
        None => text.to_string(),
    };
    for (regex, (_, reason)) in regexes.iter().zip(BLOCKED_PATTERNS) {
        if regex.is_match(&combined) {
            return Some(reason);
        }
    }
    None
}

/// Detect an AI refusal in generated section text.
pub fn detect_refusal(text: &str) -> bool {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    let regexes = CELL.get_or_init(|| {
        REFUSAL_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("pattern is a compile-time constant"))
            .collect::<Vec<_>>()
    });
    regexes.iter().any(|r| r.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_screen_blocks_and_passes() {
        assert!(pre_screen(None, "a tutorial on how to build a bomb at home").is_some());
        assert!(pre_screen(Some("How to make an explosive device"), "body").is_some());
        assert!(pre_screen(Some("Senate passes budget bill"), "ordinary news text").is_none());
    }

    #[test]
    fn test_refusal_detected() {
        assert!(detect_refusal("I'm sorry, but I cannot summarize this content."));
        assert!(detect_refusal("I cannot assist with that request."));
        assert!(detect_refusal("As an AI language model, I must decline."));
    }

    #[test]
    fn test_normal_prose_passes() {
        assert!(!detect_refusal(
            "The video explains how the committee reached its decision and what happens next."
        ));
        // mentions of refusal inside a summary are not a refusal
        assert!(!detect_refusal("The senator said she cannot support the bill."));
    }
}
