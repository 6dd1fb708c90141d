//! Goal pre-flight: filter out conversational messages before they cost a
//! page capture.
//!
//! Greetings and short chitchat ("hi", "thanks", "what can you do?") get a
//! canned reply instead of an agent run. Anything carrying an action verb
//! is treated as a task, however short.

use once_cell::sync::Lazy;
use regex::Regex;

static GREETING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(hi|hiya|hello|hey|yo|howdy|good (morning|afternoon|evening)|thanks|thank you|ok|okay|cool|nice|great|what can you do|who are you|help)\s*[!.?]*\s*$",
    )
    .expect("static regex")
});

static ACTION_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(fill|enter|type|click|open|navigate|go to|search|create|add|submit|upload|select|scroll|list|post|publish|update|edit|delete|login|log in|sign in|complete|replay)\b",
    )
    .expect("static regex")
});

/// True when the goal reads as conversation rather than a task.
pub fn is_conversational(goal: &str) -> bool {
    let trimmed = goal.trim();
    if trimmed.is_empty() {
        return true;
    }
    if ACTION_VERB_RE.is_match(trimmed) {
        return false;
    }
    if GREETING_RE.is_match(trimmed) {
        return true;
    }
    // Short phrases with no verb and no question about a page are chat.
    trimmed.split_whitespace().count() <= 3 && !trimmed.contains("://")
}

/// Canned reply for conversational goals.
pub fn help_message() -> &'static str {
    "I automate listing workflows in the browser. Describe a task like \
     \"fill the new listing form at example.com with 123 Main St\" and I \
     will work through it step by step."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_are_conversational() {
        for goal in ["hi", "Hello!", "  hey  ", "thanks", "what can you do?"] {
            assert!(is_conversational(goal), "{goal:?}");
        }
    }

    #[test]
    fn tasks_are_not() {
        for goal in [
            "fill the address field with 123 Main St",
            "go to https://mls.example.com and create a listing",
            "click submit",
        ] {
            assert!(!is_conversational(goal), "{goal:?}");
        }
    }

    #[test]
    fn empty_goal_is_conversational() {
        assert!(is_conversational("   "));
    }
}
