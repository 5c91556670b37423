//! Rule-based sentiment scoring.
//!
//! Text is lower-cased, stripped of punctuation and split on whitespace. Each
//! token is looked up in fixed positive/negative/intensity/negation lists. A
//! negation word flips the polarity of the next sentiment word only.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "awesome", "fantastic", "wonderful", "love",
    "loved", "like", "liked", "happy", "glad", "best", "better", "brilliant", "enjoy",
    "enjoyed", "perfect", "nice", "pleasant", "positive", "superb", "outstanding", "win",
    "winning", "success", "successful", "impressive", "recommend", "beautiful", "delightful",
    "fun", "helpful", "satisfied", "strong", "incredible", "favorite", "thrilled", "excited",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "hate", "hated", "dislike", "poor", "worst",
    "worse", "sad", "angry", "disappointing", "disappointed", "negative", "ugly", "boring",
    "fail", "failed", "failure", "lose", "losing", "loss", "broken", "useless", "annoying",
    "frustrating", "frustrated", "mediocre", "weak", "painful", "slow", "unhappy", "waste",
    "problem", "wrong", "pathetic", "disaster", "dreadful", "regret",
];

const INTENSITY_WORDS: &[&str] = &[
    "very", "really", "extremely", "incredibly", "absolutely", "totally", "so", "super",
    "highly", "completely", "truly", "deeply", "utterly",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "dont", "doesnt",
    "didnt", "isnt", "wasnt", "arent", "werent", "cant", "cannot", "wont", "wouldnt",
    "shouldnt", "couldnt", "hardly", "barely",
];

/// Confidence reported when the text carries no net polarity
const NEUTRAL_CONFIDENCE: f64 = 0.5;
/// Confidence added per intensity word
const INTENSITY_BOOST: f64 = 0.1;
/// Upper bound on reported confidence
const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SentimentError {
    #[error("Text is empty")]
    EmptyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub intensity_count: usize,
}

impl SentimentScore {
    pub fn format(&self) -> String {
        format!(
            "{:?} ({:.0}% confidence) | +{} / -{} | intensifiers: {}",
            self.label,
            self.confidence * 100.0,
            self.positive_count,
            self.negative_count,
            self.intensity_count
        )
    }
}

pub struct SentimentAnalyzer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    intensity: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            intensity: INTENSITY_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    pub fn analyze(&self, text: &str) -> Result<SentimentScore, SentimentError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(SentimentError::EmptyInput);
        }

        let mut positive_count = 0;
        let mut negative_count = 0;
        let mut intensity_count = 0;
        let mut negate = false;

        for token in &tokens {
            let token = token.as_str();
            if self.negation.contains(token) {
                negate = true;
            } else if self.positive.contains(token) {
                if negate {
                    negative_count += 1;
                } else {
                    positive_count += 1;
                }
                negate = false;
            } else if self.negative.contains(token) {
                if negate {
                    positive_count += 1;
                } else {
                    negative_count += 1;
                }
                negate = false;
            } else if self.intensity.contains(token) {
                intensity_count += 1;
            }
        }

        let (label, confidence) = if positive_count == negative_count {
            (SentimentLabel::Neutral, NEUTRAL_CONFIDENCE)
        } else {
            let label = if positive_count > negative_count {
                SentimentLabel::Positive
            } else {
                SentimentLabel::Negative
            };
            let matched = (positive_count + negative_count) as f64;
            let ratio = positive_count.max(negative_count) as f64 / matched;
            let boosted = ratio + INTENSITY_BOOST * intensity_count as f64;
            (label, boosted.min(MAX_CONFIDENCE))
        };

        Ok(SentimentScore {
            label,
            confidence,
            positive_count,
            negative_count,
            intensity_count,
        })
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case, drop punctuation (apostrophes vanish so "don't" reads "dont")
/// and split on whitespace
fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '\'' | '\u{2019}' => None,
            c if c.is_alphanumeric() || c.is_whitespace() => Some(c),
            _ => Some(' '),
        })
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_text() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("What a great game, I love this team!").unwrap();
        assert_eq!(score.label, SentimentLabel::Positive);
        assert_eq!(score.positive_count, 2);
        assert_eq!(score.negative_count, 0);
        assert!((score.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_negation_flips_next_word_only() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("The defense was not good. Bad coaching.").unwrap();
        assert_eq!(score.positive_count, 0);
        assert_eq!(score.negative_count, 2);
        assert_eq!(score.label, SentimentLabel::Negative);

        // Apostrophes are dropped, so "don't" is a negation
        let score = analyzer.analyze("I don't hate it, it's good").unwrap();
        assert_eq!(score.positive_count, 2);
        assert_eq!(score.label, SentimentLabel::Positive);
    }

    #[test]
    fn test_mixed_confidence_and_intensity() {
        let analyzer = SentimentAnalyzer::new();
        // 2 positive, 1 negative -> 2/3
        let score = analyzer.analyze("good food, great view, slow service").unwrap();
        assert!((score.confidence - 2.0 / 3.0).abs() < 1e-9);

        // Intensity nudges confidence upward
        let score = analyzer
            .analyze("very good food, great view, slow service")
            .unwrap();
        assert_eq!(score.intensity_count, 1);
        assert!((score.confidence - (2.0 / 3.0 + 0.1)).abs() < 1e-9);

        // ...but never beyond the cap
        let score = analyzer
            .analyze("really really really extremely good")
            .unwrap();
        assert_eq!(score.confidence, 0.95);
    }

    #[test]
    fn test_neutral_and_ties() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.analyze("The game starts at noon").unwrap();
        assert_eq!(score.label, SentimentLabel::Neutral);
        assert_eq!(score.confidence, 0.5);

        let score = analyzer.analyze("good offense, bad defense").unwrap();
        assert_eq!(score.label, SentimentLabel::Neutral);
        assert_eq!(score.confidence, 0.5);
    }

    #[test]
    fn test_empty_input() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze(""), Err(SentimentError::EmptyInput));
        assert_eq!(analyzer.analyze("   \n"), Err(SentimentError::EmptyInput));
        assert_eq!(analyzer.analyze("?!..."), Err(SentimentError::EmptyInput));
    }

    #[test]
    fn test_deterministic() {
        let analyzer = SentimentAnalyzer::new();
        let text = "Not bad at all, really impressive comeback";
        let first = analyzer.analyze(text).unwrap();
        let second = analyzer.analyze(text).unwrap();
        assert_eq!(first, second);
    }
}
