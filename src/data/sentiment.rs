//! Lexicon-based sentiment scoring for Danish/English football news
//!
//! Scores are the difference between positive and negative keyword hits divided
//! by the word count of the text, so real-world values are small and the label
//! thresholds are tight.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DataError;

lazy_static! {
    /// Anything that is not a word character, whitespace or a Danish letter
    static ref NON_WORD_CHARS: Regex = Regex::new(r"[^\w\sæøåÆØÅ]")
        .expect("Failed to compile NON_WORD_CHARS regex - this is a bug in the hardcoded pattern");
}

/// Label boundary on either side of zero
pub const LABEL_THRESHOLD: f64 = 0.005;

/// Positive keywords (mostly Danish match reporting vocabulary)
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "sejr", "vinder", "vandt", "fantastisk", "fantastiske", "stor", "store", "god", "gode",
    "glad", "glade", "lykkelig", "lykkelige", "fremragende", "perfekt", "perfekte",
    "stærk", "stærke", "godt", "succes", "succesfuld", "succesfulde",
    "fremgang", "fremgangsrig", "fremgangsrige", "oprykning", "mesterskab",
    "champions league", "europa league", "pokal", "trofæ", "trofæer",
    "mål", "målscorer", "assist", "assister", "clean sheet", "nulstilling",
    "forløsning", "forløsende", "tiltrængt", "vigtig", "vigtige", "afgørende",
    "kæmpe", "kæmper", "kæmpede", "kæmpet",
    "stråler", "strålende", "brilliant", "brilliante", "genial", "geniale",
    "talent", "talenter", "lovende", "fremtid", "fremtidig", "fremtidige",
    "victory", "win", "champion",
];

/// Negative keywords
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "nederlag", "taber", "tabte", "dårlig", "dårlige", "skuffende", "skuffet",
    "ydmygelse", "ydmyget", "ydmygende", "fadæse", "katastrofe", "katastrofal",
    "mareridt", "mareridts", "problem", "problemer", "krise", "kriser",
    "svag", "svage", "svært", "vanskelig", "vanskelige", "udfordring",
    "udfordringer", "mistillid", "kritik", "kritiserer",
    "ballade", "hærværk", "boykot", "boykotter", "protest", "protester",
    "skandale", "skandaler", "skuffelse", "frustreret",
    "vred", "vrede", "rasende", "forarget", "forargelse", "skam",
    "pinlig", "pinlige", "flov", "flove", "bange", "bekymret", "bekymringer",
    "defeat", "crisis", "scandal",
];

/// Sentiment label attached to every stored article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Classify a raw lexicon score
    pub fn from_score(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Glyph used when listing articles in notifications
    pub fn glyph(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "🟢",
            SentimentLabel::Negative => "🔴",
            SentimentLabel::Neutral => "🟡",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(DataError::validation_error(
                "sentiment_label".to_string(),
                format!("Unknown sentiment label: {}", other),
            )),
        }
    }
}

/// Result of scoring one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub score: f64,
    pub label: SentimentLabel,
}

impl SentimentScore {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

/// Maps raw text to a sentiment score. Implementations must be pure.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> SentimentScore;
}

/// Keyword-counting scorer over a fixed bilingual lexicon
#[derive(Debug, Clone)]
pub struct LexiconSentimentScorer {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for LexiconSentimentScorer {
    fn default() -> Self {
        Self::new(
            POSITIVE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            NEGATIVE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl LexiconSentimentScorer {
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        Self {
            positive: normalize_lexicon(positive),
            negative: normalize_lexicon(negative),
        }
    }

    /// Count lexicon terms present in already-normalized text
    fn count_matches(lexicon: &[String], text: &str) -> usize {
        lexicon.iter().filter(|term| text.contains(term.as_str())).count()
    }
}

impl SentimentScorer for LexiconSentimentScorer {
    fn score(&self, text: &str) -> SentimentScore {
        let normalized = normalize_text(text);
        let total_words = normalized.split_whitespace().count();
        if total_words == 0 {
            return SentimentScore::neutral();
        }

        let positive_count = Self::count_matches(&self.positive, &normalized);
        let negative_count = Self::count_matches(&self.negative, &normalized);
        let score = (positive_count as f64 - negative_count as f64) / total_words as f64;
        let label = SentimentLabel::from_score(score);

        tracing::debug!(
            score,
            %label,
            positive = positive_count,
            negative = negative_count,
            "Scored text sentiment"
        );

        SentimentScore { score, label }
    }
}

/// Strip punctuation (keeping Danish letters) and lowercase
pub fn normalize_text(text: &str) -> String {
    NON_WORD_CHARS.replace_all(text, " ").to_lowercase()
}

/// Lowercase, trim and deduplicate keyword terms
fn normalize_lexicon(terms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_neutral() {
        let scorer = LexiconSentimentScorer::default();
        assert_eq!(scorer.score(""), SentimentScore::neutral());
        assert_eq!(scorer.score("  ...!!  "), SentimentScore::neutral());
    }

    #[test]
    fn test_positive_danish_headline() {
        let scorer = LexiconSentimentScorer::default();
        let result = scorer.score("Brøndby kæmper sig til fantastisk sejr");
        assert!(result.score > 0.0);
        assert_eq!(result.label, SentimentLabel::Positive);
    }

    #[test]
    fn test_negative_danish_headline() {
        let scorer = LexiconSentimentScorer::default();
        let result = scorer.score("Brøndby-fadæse: Ydmyget i Island");
        assert!(result.score < 0.0);
        assert_eq!(result.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_score_is_ratio_of_matches_to_words() {
        let scorer = LexiconSentimentScorer::new(vec!["sejr".into()], vec!["krise".into()]);
        // one positive term in four words
        let result = scorer.score("en stor sejr idag");
        assert!((result.score - 0.25).abs() < 1e-12);
        // each term counts once regardless of repetition
        let result = scorer.score("sejr sejr sejr sejr");
        assert!((result.score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_punctuation_is_stripped_but_danish_letters_kept() {
        assert_eq!(normalize_text("Brøndby-fadæse: ÆØÅ!"), "brøndby fadæse  æøå ");
    }

    #[test]
    fn test_label_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.005), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.0051), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.005), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.0051), SentimentLabel::Negative);
    }

    #[test]
    fn test_label_round_trips_through_str() {
        for label in [SentimentLabel::Positive, SentimentLabel::Negative, SentimentLabel::Neutral] {
            assert_eq!(label.as_str().parse::<SentimentLabel>().ok(), Some(label));
        }
        assert!("bullish".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_lexicon_is_deduplicated() {
        let scorer = LexiconSentimentScorer::new(
            vec!["God".into(), "god".into(), " god ".into()],
            vec![],
        );
        let result = scorer.score("god kamp");
        assert!((result.score - 0.5).abs() < 1e-12);
    }
}
