//! Rule-based content filter for voter reviews.
//!
//! The filter is a pure function of the text: no state, no I/O, so it can be
//! shared freely between request handlers.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Words that suggest abuse or spam.
pub const BANNED_WORDS: &[&str] = &[
    "spam",
    "hate",
    "violence",
    "scam",
    "fake",
    "abusive",
    "fraud",
    "corrupt",
    "bribe",
    "illegal",
    "terrorist",
    "bomb",
    "kill",
    "murder",
    "death",
    "stupid",
    "idiot",
    "fool",
    "worthless",
    "useless",
    "garbage",
];

/// Words that suggest a positive review.
pub const POSITIVE_WORDS: &[&str] = &["good", "excellent", "great", "amazing", "wonderful", "fantastic"];

pub const MIN_LENGTH: usize = 10;
pub const MAX_LENGTH: usize = 500;

/// More banned words than this is treated as spam outright.
const SPAM_BANNED_COUNT: usize = 2;
/// Texts with more words than this are checked for repetition.
const REPETITION_MIN_WORDS: usize = 5;
/// Minimum share of distinct words in a non-repetitive text.
const MIN_UNIQUE_RATIO: f64 = 0.5;

/// The word lists a [`ModerationFilter`] matches against.
#[derive(Debug, Clone, Copy)]
pub struct WordLists {
    pub banned: &'static [&'static str],
    pub positive: &'static [&'static str],
}

impl Default for WordLists {
    fn default() -> Self {
        Self {
            banned: BANNED_WORDS,
            positive: POSITIVE_WORDS,
        }
    }
}

/// Why the filter reached its verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    TooShort,
    TooLong,
    Spam,
    PotentiallyInappropriate,
    Repetitive,
    Appropriate,
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort => write!(
                f,
                "Review too short - minimum {MIN_LENGTH} characters required"
            ),
            Self::TooLong => write!(
                f,
                "Review too long - maximum {MAX_LENGTH} characters allowed"
            ),
            Self::Spam => write!(f, "Inappropriate language or spam content detected"),
            Self::PotentiallyInappropriate => {
                write!(f, "Potentially inappropriate content detected")
            }
            Self::Repetitive => write!(f, "Repetitive content appears to be spam"),
            Self::Appropriate => write!(f, "Content is appropriate"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
}

/// Outcome of moderating a piece of text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
    /// Whether the text may be published immediately.
    pub approved: bool,
    pub reason: Reason,
    /// How sure the filter is of its verdict, in percent.
    pub confidence: u8,
    pub sentiment: Sentiment,
}

impl Moderation {
    fn rejected(reason: Reason, confidence: u8) -> Self {
        Self {
            approved: false,
            reason,
            confidence,
            sentiment: Sentiment::Neutral,
        }
    }
}

/// Deterministic keyword and repetition based content filter.
#[derive(Debug, Clone, Default)]
pub struct ModerationFilter {
    words: WordLists,
}

impl ModerationFilter {
    pub fn new(words: WordLists) -> Self {
        Self { words }
    }

    /// Classify the text. The first matching rule decides.
    pub fn classify(&self, text: &str) -> Moderation {
        let length = text.chars().count();
        if length < MIN_LENGTH {
            return Moderation::rejected(Reason::TooShort, 100);
        }
        if length > MAX_LENGTH {
            return Moderation::rejected(Reason::TooLong, 100);
        }

        let lowercase = text.to_lowercase();
        let banned = count_contained(&lowercase, self.words.banned);
        let positive = count_contained(&lowercase, self.words.positive);

        if banned > SPAM_BANNED_COUNT {
            return Moderation::rejected(Reason::Spam, 95);
        }
        if banned > 0 && positive == 0 {
            return Moderation::rejected(Reason::PotentiallyInappropriate, 75);
        }
        if is_repetitive(text) {
            return Moderation::rejected(Reason::Repetitive, 80);
        }

        Moderation {
            approved: true,
            reason: Reason::Appropriate,
            confidence: 90,
            sentiment: if positive > banned {
                Sentiment::Positive
            } else {
                Sentiment::Neutral
            },
        }
    }
}

/// Number of list entries that occur anywhere in the text.
fn count_contained(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|word| text.contains(*word)).count()
}

/// Split on single spaces and compare words exactly, case included.
fn is_repetitive(text: &str) -> bool {
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() <= REPETITION_MIN_WORDS {
        return false;
    }
    let unique: HashSet<&str> = words.iter().copied().collect();
    (unique.len() as f64 / words.len() as f64) < MIN_UNIQUE_RATIO
}
