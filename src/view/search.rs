//! Fuzzy text ranking for the search step.

/// Scores how well a query matches a piece of text.
///
/// Lower scores are better; `None` means "no match". Implementations must be
/// deterministic so that ranking is reproducible.
pub trait SearchRanker {
    fn score(&self, query: &str, text: &str) -> Option<f64>;
}

/// Default match threshold: a query may differ from the best matching
/// window of the text in up to 30% of its characters.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Approximate substring matcher.
///
/// The score is the edit distance between the query and the closest
/// substring of the text, divided by the query length. Matching is
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyRanker {
    pub threshold: f64,
}

impl FuzzyRanker {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for FuzzyRanker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SearchRanker for FuzzyRanker {
    fn score(&self, query: &str, text: &str) -> Option<f64> {
        let query: Vec<char> = query.trim().to_lowercase().chars().collect();
        if query.is_empty() {
            return Some(0.0);
        }
        let text: Vec<char> = text.to_lowercase().chars().collect();

        let distance = substring_distance(&query, &text);
        let score = distance as f64 / query.len() as f64;
        (score <= self.threshold).then_some(score)
    }
}

/// Smallest edit distance between `query` and any substring of `text`.
fn substring_distance(query: &[char], text: &[char]) -> usize {
    // row[j]: cost of matching the current query prefix ending at text[j - 1].
    // A match may start anywhere, so the first row is all zeros.
    let mut row = vec![0usize; text.len() + 1];

    for (i, &qc) in query.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &tc) in text.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(qc != tc);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }

    row.into_iter().min().unwrap_or(query.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_substring_scores_zero() {
        let ranker = FuzzyRanker::default();
        assert_eq!(ranker.score("report", "Write the quarterly report"), Some(0.0));
    }

    #[test]
    fn case_is_ignored() {
        let ranker = FuzzyRanker::default();
        assert_eq!(ranker.score("GROCERIES", "buy groceries"), Some(0.0));
    }

    #[test]
    fn tolerates_a_typo() {
        let ranker = FuzzyRanker::default();
        let score = ranker.score("groceires", "buy groceries").unwrap();
        assert!(score > 0.0 && score <= DEFAULT_THRESHOLD);
    }

    #[test]
    fn rejects_unrelated_text() {
        let ranker = FuzzyRanker::default();
        assert_eq!(ranker.score("dentist", "Water the plants"), None);
        assert_eq!(ranker.score("dentist", ""), None);
    }

    #[test]
    fn closer_match_scores_better() {
        let ranker = FuzzyRanker::default();
        let exact = ranker.score("meeting", "team meeting").unwrap();
        let typo = ranker.score("meeting", "team meetnig").unwrap();
        assert!(exact < typo);
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = FuzzyRanker::new(0.0);
        assert_eq!(strict.score("groceires", "buy groceries"), None);
        assert_eq!(strict.score("groceries", "buy groceries"), Some(0.0));
    }

    #[test]
    fn substring_distance_counts_edits() {
        let q: Vec<char> = "abc".chars().collect();
        let t: Vec<char> = "xxabxx".chars().collect();
        assert_eq!(substring_distance(&q, &t), 1);
        assert_eq!(substring_distance(&q, &[]), 3);
    }
}
