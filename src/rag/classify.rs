//! Query complexity classification.
//!
//! Decides how much retrieval a message deserves. Greetings and small talk skip retrieval
//! entirely; longer or analytical questions fetch a wider candidate pool for reranking.

use serde::Serialize;

const GREETINGS: [&str; 16] = [
    "hello", "hi", "hey", "good morning", "good afternoon", "good evening", "greetings",
    "howdy", "what's up", "wassup", "hola", "bonjour", "namaste", "yo", "sup", "heyo",
];

const CONVERSATIONAL: [&str; 18] = [
    "how are you", "how's it going", "how do you do", "nice to meet you", "thanks",
    "thank you", "bye", "goodbye", "good night", "see you", "take care", "cheers", "great",
    "awesome", "perfect", "cool", "ok", "okay",
];

const SIMPLE_INDICATORS: [&str; 7] = ["who", "what", "when", "where", "how much", "price", "cost"];

const COMPLEX_INDICATORS: [&str; 5] = ["explain", "describe", "analyze", "compare", "detailed"];

/// Conversational messages are only treated as small talk up to this many words.
const MAX_CONVERSATIONAL_WORDS: usize = 4;
const MAX_SIMPLE_WORDS: usize = 5;
const MIN_COMPLEX_WORDS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryComplexity {
    Greeting,
    Simple,
    Medium,
    Complex,
}

impl QueryComplexity {
    /// Factor applied to `maxRetrievalDocs` to size the candidate pool.
    pub fn candidate_multiplier(self) -> usize {
        match self {
            QueryComplexity::Greeting => 0,
            QueryComplexity::Simple => 1,
            QueryComplexity::Medium | QueryComplexity::Complex => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryComplexity::Greeting => "greeting",
            QueryComplexity::Simple => "simple",
            QueryComplexity::Medium => "medium",
            QueryComplexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw user message.
pub fn classify(query: &str) -> QueryComplexity {
    let lower = query.trim().to_lowercase();
    let words = lower.split_whitespace().count();
    let normalized = normalize(&lower);

    if is_greeting(&lower)
        || (words <= MAX_CONVERSATIONAL_WORDS && contains_any_phrase(&normalized, &CONVERSATIONAL))
    {
        return QueryComplexity::Greeting;
    }

    if words <= MAX_SIMPLE_WORDS && contains_any_phrase(&normalized, &SIMPLE_INDICATORS) {
        return QueryComplexity::Simple;
    }

    if words >= MIN_COMPLEX_WORDS || COMPLEX_INDICATORS.iter().any(|k| lower.contains(k)) {
        return QueryComplexity::Complex;
    }

    QueryComplexity::Medium
}

fn is_greeting(lower: &str) -> bool {
    let bare = lower.trim_end_matches(['!', '.', '?', ',']);
    GREETINGS.iter().any(|g| {
        bare == *g
            || [" ", ",", "!"]
                .iter()
                .any(|sep| lower.starts_with(&format!("{}{}", g, sep)))
    })
}

/// Lowercased words separated by single spaces, punctuation other than apostrophes removed.
fn normalize(lower: &str) -> String {
    lower
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word phrase match, so "ok" does not fire inside "book".
fn contains_any_phrase(normalized: &str, phrases: &[&str]) -> bool {
    let padded = format!(" {} ", normalized);
    phrases.iter().any(|p| padded.contains(&format!(" {} ", p)))
}
