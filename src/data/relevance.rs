//! Topical relevance of an article to the tracked club

/// Default topical keywords
pub const TOPICAL_KEYWORDS: &[&str] = &[
    "brøndby",
    "brondby",
    "brøndby if",
    "brondby if",
    "brøndby stadion",
    "brondby stadion",
    "superliga",
    "danish football",
    "danish soccer",
];

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    keywords: Vec<String>,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(TOPICAL_KEYWORDS.iter().map(|s| s.to_string()).collect())
    }
}

impl RelevanceScorer {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Share of topical keywords present in the article, capped at 1.0
    pub fn score(&self, title: &str, description: &str, content: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }

        let text = format!("{} {} {}", title, description, content).to_lowercase();
        let matches = self
            .keywords
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .count();

        (matches as f64 / self.keywords.len() as f64).min(1.0)
    }

    /// True when any topical keyword occurs in the text
    pub fn is_relevant(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_keywords_scores_zero() {
        let scorer = RelevanceScorer::default();
        assert_eq!(scorer.score("Vejret i morgen", "", ""), 0.0);
        assert_eq!(RelevanceScorer::new(vec![]).score("brøndby", "", ""), 0.0);
    }

    #[test]
    fn test_each_keyword_counts_once() {
        let scorer = RelevanceScorer::new(vec!["brøndby".into(), "superliga".into()]);
        assert_eq!(scorer.score("Brøndby Brøndby Brøndby", "", ""), 0.5);
        assert_eq!(scorer.score("Brøndby", "topkamp i Superliga", ""), 1.0);
    }

    #[test]
    fn test_score_is_monotonic_in_distinct_keywords() {
        let scorer = RelevanceScorer::default();
        let texts = [
            "kamp i aften",
            "superliga kamp i aften",
            "brøndby superliga kamp i aften",
            "brøndby if superliga kamp på brøndby stadion",
        ];
        let scores: Vec<f64> = texts.iter().map(|t| scorer.score(t, "", "")).collect();
        for pair in scores.windows(2) {
            assert!(pair[1] >= pair[0], "scores should not decrease: {:?}", scores);
        }
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_is_relevant() {
        let scorer = RelevanceScorer::default();
        assert!(scorer.is_relevant("BRØNDBY vinder derbyet"));
        assert!(!scorer.is_relevant("FCK vinder derbyet"));
    }
}
