// SPDX-License-Identifier: Apache-2.0

//! Crisis-keyword heuristic applied to every chat message.
//!
//! This is a floor, not a safety guarantee. It is a plain case-insensitive
//! substring match, so it misses paraphrases ("I don't want to be here
//! anymore"), misspellings, other languages and anything split across
//! messages, and it flags benign text that happens to contain a keyword
//! ("this deadline will kill me", "harmony"). Callers must treat a `false`
//! result as "no keyword matched", never as "the message is safe".

pub const SENSITIVE_KEYWORDS: [&str; 4] = ["suicide", "kill", "harm", "death"];

/// Returns true when `text` contains any keyword, ignoring case.
#[must_use]
pub fn classify(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SENSITIVE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Keywords found in `text`, in list order. Used for alert bodies.
#[must_use]
pub fn matched_keywords(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    SENSITIVE_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| lowered.contains(keyword))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_crisis_language() {
        assert!(classify("I want to kill myself"));
        assert!(classify("thinking about suicide"));
        assert!(!classify("I had a great day"));
    }

    #[test]
    fn matching_ignores_case() {
        assert!(classify("KILL"));
        assert!(classify("Self-Harm"));
    }

    #[test]
    fn reports_which_keywords_matched() {
        assert_eq!(
            matched_keywords("Death and HARM"),
            vec!["harm", "death"]
        );
        assert!(matched_keywords("fine").is_empty());
    }
}
