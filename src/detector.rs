//! # Question-Boundary Detection
//!
//! Decides whether an accumulating transcript looks like one complete spoken
//! interview question. The detector is a pure, swappable strategy so a
//! VAD/silence-based or model-based implementation can replace the heuristic
//! without touching the session state machine.
//!
//! The heuristic trades precision for simplicity: a false negative leaves
//! text in the transcript buffer for the next chunk, a false positive cuts a
//! question short. Both are accepted behavior.

/// Strategy seam for question-boundary detection.
pub trait QuestionBoundaryDetector: Send + Sync {
    /// Pure classification of a transcript; no side effects.
    fn is_complete_question(&self, text: &str) -> bool;
}

/// Words that commonly open an interview question.
const QUESTION_STARTERS: [&str; 14] = [
    "what", "how", "why", "tell", "describe", "explain", "can", "could", "would", "do", "does",
    "have", "where", "when",
];

/// Minimum word count before starter-word matching applies. Shorter text is
/// assumed to be a fragment still being spoken.
const MIN_QUESTION_WORDS: usize = 10;

/// Rule-based detector.
#[derive(Debug, Default, Clone)]
pub struct HeuristicDetector;

impl QuestionBoundaryDetector for HeuristicDetector {
    fn is_complete_question(&self, text: &str) -> bool {
        let text = text.trim();

        if text.is_empty() {
            return false;
        }

        // An explicit question mark always wins, regardless of length.
        if text.ends_with('?') {
            return true;
        }

        let mut words = text.split_whitespace();
        let first_word = match words.next() {
            Some(word) => word.to_lowercase(),
            None => return false,
        };

        let word_count = 1 + words.count();
        word_count >= MIN_QUESTION_WORDS && QUESTION_STARTERS.contains(&first_word.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> bool {
        HeuristicDetector.is_complete_question(text)
    }

    #[test]
    fn test_empty_and_whitespace_are_not_questions() {
        assert!(!detect(""));
        assert!(!detect("   "));
        assert!(!detect("\t\n"));
    }

    #[test]
    fn test_question_mark_wins_regardless_of_length() {
        assert!(detect("why?"));
        assert!(detect("Why should we hire you?"));
        assert!(detect(
            "could you possibly walk me through every single project you have ever shipped?"
        ));
    }

    #[test]
    fn test_short_text_without_question_mark_is_incomplete() {
        assert!(!detect("tell me about"));
        assert!(!detect("what is your"));
        // Nine words, one short of the threshold.
        assert!(!detect("what is the thing you are most proud of"));
    }

    #[test]
    fn test_long_starter_phrase_is_a_question() {
        // Ten words, starts with "what".
        assert!(detect("what is your biggest weakness as a software engineer today"));
        assert!(detect("tell me about a time you disagreed with your manager"));
    }

    #[test]
    fn test_starter_word_is_case_insensitive() {
        assert!(detect("What is your biggest weakness as a software engineer today"));
        assert!(detect("DESCRIBE a project where you had to learn something new"));
    }

    #[test]
    fn test_long_text_without_starter_is_incomplete() {
        assert!(!detect(
            "yesterday I went to the store and bought some milk and bread"
        ));
    }
}
