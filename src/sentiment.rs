//! Coarse polarity tagging of free text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Positive iff polarity > 0, Negative iff < 0, Neutral iff exactly 0.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            Sentiment::Positive
        } else if polarity < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SentimentScore {
    pub label: Sentiment,
    pub polarity: f64,
}

impl SentimentScore {
    pub fn new(polarity: f64) -> Self {
        let polarity = polarity.clamp(-1.0, 1.0);
        Self {
            label: Sentiment::from_polarity(polarity),
            polarity,
        }
    }
}

pub trait SentimentTagger: Send + Sync {
    fn analyze(&self, text: &str) -> SentimentScore;
}

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("blessed", 0.5),
    ("calm", 0.3),
    ("cheerful", 0.8),
    ("content", 0.3),
    ("delighted", 0.7),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("grateful", 0.6),
    ("great", 0.8),
    ("happy", 0.8),
    ("hope", 0.3),
    ("joy", 0.8),
    ("kind", 0.6),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("peaceful", 0.5),
    ("perfect", 1.0),
    ("proud", 0.8),
    ("relaxed", 0.3),
    ("thankful", 0.5),
    ("wonderful", 1.0),
    ("angry", -0.5),
    ("annoyed", -0.4),
    ("anxious", -0.25),
    ("awful", -1.0),
    ("bad", -0.7),
    ("bored", -0.5),
    ("depressed", -0.6),
    ("disappointed", -0.75),
    ("exhausted", -0.4),
    ("frustrated", -0.7),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.5),
    ("lonely", -0.5),
    ("miserable", -1.0),
    ("nervous", -0.3),
    ("pain", -0.6),
    ("poor", -0.4),
    ("sad", -0.5),
    ("scared", -0.5),
    ("stressed", -0.5),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("upset", -0.6),
    ("worried", -0.4),
    ("worse", -0.4),
    ("worst", -1.0),
];

const INTENSIFIERS: &[&str] = &["very", "really", "so", "extremely", "incredibly"];
const NEGATORS: &[&str] = &["not", "no", "never"];

const INTENSIFIER_FACTOR: f64 = 1.3;
const NEGATION_FACTOR: f64 = -0.5;

/// Averages word polarities from a fixed lexicon, with simple modifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconTagger;

impl LexiconTagger {
    fn polarity_of(word: &str) -> Option<f64> {
        LEXICON.iter().find(|(w, _)| *w == word).map(|(_, p)| *p)
    }

    fn is_negator(word: &str) -> bool {
        NEGATORS.contains(&word) || word.ends_with("n't")
    }
}

impl SentimentTagger for LexiconTagger {
    fn analyze(&self, text: &str) -> SentimentScore {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty());

        let mut scores = Vec::new();
        // Pending modifiers for the next scored word; repeats do not compound.
        let (mut intensified, mut negated) = (false, false);
        for word in words {
            if INTENSIFIERS.contains(&word) {
                intensified = true;
            } else if Self::is_negator(word) {
                negated = true;
            } else if let Some(mut p) = Self::polarity_of(word) {
                if intensified {
                    p *= INTENSIFIER_FACTOR;
                }
                if negated {
                    p *= NEGATION_FACTOR;
                }
                scores.push(p.clamp(-1.0, 1.0));
                (intensified, negated) = (false, false);
            }
        }

        if scores.is_empty() {
            return SentimentScore::new(0.0);
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        SentimentScore::new(mean)
    }
}
