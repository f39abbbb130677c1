use strsim::normalized_levenshtein;

/// A candidate that scored above the similarity threshold.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Match {
    pub value: String,
    pub score: u8,
}

/// Similarity score between two strings on a 0-100 scale, case-insensitive.
pub fn similarity(a: &str, b: &str) -> u8 {
    let score = normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) * 100.0;
    score.round() as u8
}

/// Ranks `candidates` against `query`, keeping only those strictly above
/// `threshold`, best first. `limit` caps the result when set.
pub fn rank_matches<'a, I>(
    query: &str,
    candidates: I,
    threshold: u8,
    limit: Option<usize>,
) -> Vec<Match>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matches: Vec<Match> = candidates
        .into_iter()
        .map(|candidate| Match {
            value: candidate.to_string(),
            score: similarity(query, candidate),
        })
        .filter(|m| m.score > threshold)
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.value.cmp(&b.value)));
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_hundred() {
        assert_eq!(similarity("Dupont SARL", "Dupont SARL"), 100);
        assert_eq!(similarity("DUPONT sarl", "dupont SARL"), 100);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(similarity("Dupont", "xyzzy") < 30);
    }

    #[test]
    fn threshold_is_strict() {
        let matches = rank_matches("abcd", ["abcd"], 100, None);
        assert!(matches.is_empty());
        let matches = rank_matches("abcd", ["abcd"], 99, None);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn results_are_ordered_best_first_and_capped() {
        let candidates = ["Dupont SARL", "Dupond SARL", "Martin SA", "Dupont"];
        let matches = rank_matches("Dupont SARL", candidates, 50, Some(2));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].value, "Dupont SARL");
        assert_eq!(matches[0].score, 100);
        assert!(matches[0].score >= matches[1].score);
    }
}
