//! Sentiment classification.
//!
//! The classifier is a long-lived service built once at startup and shared
//! behind an `Arc`. The default implementation is an English word-list scorer
//! with single-token negation handling.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ClassificationError;
use crate::pipeline::types::{Polarity, SentimentResult};

/// Text → polarity capability.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Classify a message body.
    async fn classify(&self, text: &str) -> Result<SentimentResult, ClassificationError>;
}

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "beautiful", "best", "brilliant", "comfortable", "cool", "delight",
    "delighted", "enjoy", "enjoyed", "excellent", "fantastic", "fast", "fine", "glad", "good",
    "great", "happy", "helpful", "impressed", "incredible", "like", "liked", "love", "loved",
    "lovely", "nice", "perfect", "pleased", "quality", "recommend", "reliable", "satisfied",
    "smooth", "super", "thank", "thanks", "wonderful", "works", "worth",
];

const NEGATIVE_WORDS: &[&str] = &[
    "angry", "annoyed", "annoying", "awful", "bad", "broke", "broken", "cheap", "complaint",
    "crap", "damaged", "defective", "disappointed", "disappointing", "dislike", "fail",
    "failed", "faulty", "frustrated", "garbage", "hate", "hated", "horrible", "late", "lousy",
    "mediocre", "poor", "problem", "refund", "return", "rude", "sad", "slow", "terrible",
    "unhappy", "useless", "waste", "worse", "worst", "wrong",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "dont", "don't", "didnt", "didn't", "isnt", "isn't", "wasnt",
    "wasn't", "doesnt", "doesn't", "cant", "can't", "wont", "won't", "hardly",
];

/// Word-list sentiment classifier.
pub struct LexiconClassifier {
    token: Regex,
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negators: HashSet<&'static str>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            // Built from a literal; cannot fail.
            token: Regex::new(r"[a-z]+(?:'[a-z]+)?").unwrap(),
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    /// Signed score and number of sentiment-bearing tokens.
    fn score(&self, text: &str) -> (i32, u32) {
        let lowered = text.to_lowercase();
        let mut score = 0i32;
        let mut matched = 0u32;
        let mut negate = false;

        for token in self.token.find_iter(&lowered).map(|m| m.as_str()) {
            if self.negators.contains(token) {
                negate = true;
                continue;
            }
            let weight = if self.positive.contains(token) {
                1
            } else if self.negative.contains(token) {
                -1
            } else {
                0
            };
            if weight != 0 {
                matched += 1;
                score += if negate { -weight } else { weight };
            }
            negate = false;
        }

        (score, matched)
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, text: &str) -> Result<SentimentResult, ClassificationError> {
        if text.trim().is_empty() {
            return Err(ClassificationError::EmptyInput);
        }

        let (score, matched) = self.score(text);
        let confidence = if matched == 0 {
            0.0
        } else {
            (score.unsigned_abs() as f32 / matched as f32).min(1.0)
        };

        Ok(SentimentResult {
            polarity: Polarity::from_score(score),
            confidence,
        })
    }
}
