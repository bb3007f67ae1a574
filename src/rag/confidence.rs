//! Answer confidence scoring and uncertainty detection.

use super::Source;

/// Phrases that show the model could not answer from the knowledge base.
const UNCERTAINTY_PHRASES: [&str; 7] = [
    "i'm not sure about that",
    "i don't know",
    "not sure about that",
    "don't have information about",
    "cannot find information",
    "not in my knowledge base",
    "not available in my knowledge",
];

/// Phrases that cut confidence sharply when they appear in an answer.
const STRONG_UNCERTAINTY: [&str; 7] = [
    "i don't know",
    "i cannot answer",
    "i'm unable to help",
    "no information available",
    "not provided in the context",
    "i don't have access to",
    "cannot find",
];

const QUESTION_WORDS: [&str; 13] = [
    "what", "how", "when", "where", "why", "who", "can", "could", "would", "is", "are", "do",
    "does",
];

/// Our own handoff wording, which means the answer should go to a human.
const HANDOFF_PHRASE: &str = "let me connect you with";

/// Whether a user message asks for information rather than making small talk.
pub fn is_substantive(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    let first_word = lower
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .unwrap_or("");

    lower.contains('?')
        || QUESTION_WORDS.contains(&first_word)
        || lower.split_whitespace().count() > 3
}

/// Whether the answer admits the knowledge base did not cover the question.
pub fn is_uncertain(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    UNCERTAINTY_PHRASES.iter().any(|p| lower.contains(p))
}

/// Confidence in a grounded answer, in `[0, 1]`.
pub fn confidence_score(answer: &str, sources: &[Source]) -> f32 {
    let lower = answer.to_lowercase();
    if lower.contains(HANDOFF_PHRASE) {
        return 0.0;
    }

    let mut confidence = if sources.is_empty() { 0.3 } else { 0.7 };

    if sources.iter().any(|s| s.rerank_score.is_some()) {
        let avg = sources.iter().map(|s| s.rerank_score.unwrap_or(0.0)).sum::<f32>()
            / sources.len() as f32;
        confidence = match avg {
            a if a > 0.8 => 0.95,
            a if a > 0.6 => 0.85,
            a if a > 0.4 => 0.75,
            _ => 0.60,
        };
    } else if !sources.is_empty() {
        confidence += ((sources.len() - 1) as f32 * 0.1).min(0.2);
        let avg = sources.iter().map(|s| s.score).sum::<f32>() / sources.len() as f32;
        if avg < 0.1 {
            confidence = 0.60;
        }
    }

    if answer.chars().count() > 100 {
        confidence += 0.05;
    }

    if STRONG_UNCERTAINTY.iter().any(|p| lower.contains(p)) {
        confidence -= 0.4;
    }

    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_payload;

    fn source(score: f32, rerank_score: Option<f32>) -> Source {
        Source {
            content: "passage".to_string(),
            metadata: test_payload("w1", "i1", "passage"),
            title: "Test item".to_string(),
            doc_type: "text".to_string(),
            score,
            rerank_score,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_no_sources() {
        assert!(approx(confidence_score("Sure.", &[]), 0.3));
    }

    #[test]
    fn test_vector_scores() {
        let sources = [source(0.5, None), source(0.4, None), source(0.3, None), source(0.3, None)];
        assert!(approx(confidence_score("We open at nine.", &sources), 0.9));
        assert!(approx(confidence_score("We open at nine.", &sources[..1]), 0.7));
    }

    #[test]
    fn test_low_vector_scores() {
        let sources = [source(0.06, None), source(0.07, None)];
        assert!(approx(confidence_score("Maybe.", &sources), 0.6));
    }

    #[test]
    fn test_rerank_tiers() {
        assert!(approx(confidence_score("ok", &[source(0.2, Some(0.9))]), 0.95));
        assert!(approx(confidence_score("ok", &[source(0.2, Some(0.7))]), 0.85));
        assert!(approx(confidence_score("ok", &[source(0.2, Some(0.5))]), 0.75));
        assert!(approx(confidence_score("ok", &[source(0.2, Some(0.1))]), 0.6));
    }

    #[test]
    fn test_long_answer_bonus() {
        let answer = "a".repeat(150);
        assert!(approx(confidence_score(&answer, &[source(0.5, None)]), 0.75));
    }

    #[test]
    fn test_strong_uncertainty_penalty() {
        let score = confidence_score("Sorry, I don't know the answer.", &[source(0.5, None)]);
        assert!(approx(score, 0.3));
        assert!(approx(confidence_score("I cannot find it.", &[]), 0.0));
    }

    #[test]
    fn test_handoff_phrase_zeroes() {
        let answer = "Let me connect you with a team member.";
        assert_eq!(confidence_score(answer, &[source(0.9, Some(0.95))]), 0.0);
    }

    #[test]
    fn test_substantive() {
        assert!(is_substantive("refund?"));
        assert!(is_substantive("Where is my parcel"));
        assert!(is_substantive("I need help with billing"));
        assert!(!is_substantive("cool thanks"));
        assert!(!is_substantive("issue"));
    }

    #[test]
    fn test_uncertain() {
        assert!(is_uncertain("I'm not sure about that from my current knowledge base."));
        assert!(is_uncertain("That's NOT IN MY KNOWLEDGE BASE."));
        assert!(!is_uncertain("We open at nine."));
    }
}
