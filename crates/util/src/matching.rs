//! Fuzzy matching primitives used by the completion resolver.
//!
//! [`fuzzy_score`] is a classic subsequence matcher: every character of the
//! query must appear in order within the candidate, and the raw score
//! rewards consecutive runs, word-boundary hits, and prefix matches while
//! penalizing gaps and long candidates. [`similarity`] normalizes that raw
//! score into `[0, 1]` by dividing through the query's score against
//! itself, which is what the thresholded resolver consumes.

const CONSECUTIVE_BONUS: i64 = 6;
const WORD_BOUNDARY_BONUS: i64 = 10;
const PREFIX_BONUS: i64 = 30;
const EARLY_MATCH_BONUS: i64 = 20;

/// Subsequence score of `query` within `candidate`.
///
/// Returns `Some(score)` when every character of `query` (case-insensitive)
/// appears in order within `candidate`, `None` otherwise. Higher is better;
/// scores can be negative for long candidates with scattered matches.
///
/// # Example
/// ```rust
/// use chainterm_util::matching::fuzzy_score;
///
/// assert!(fuzzy_score("swap", "sw").unwrap() > 0);
/// assert!(fuzzy_score("bridge", "xyz").is_none());
/// assert_eq!(fuzzy_score("anything", ""), Some(0));
/// ```
pub fn fuzzy_score(candidate: &str, query: &str) -> Option<i64> {
    if query.is_empty() {
        return Some(0);
    }
    if candidate.is_empty() {
        return None;
    }

    let hay: Vec<char> = candidate.chars().flat_map(char::to_lowercase).collect();
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    let mut score = 0i64;
    let mut hay_index = 0usize;
    let mut consecutive = 0i64;
    let mut first_match: Option<usize> = None;
    let mut previous_match: Option<usize> = None;

    for &wanted in &needle {
        let found = hay[hay_index..].iter().position(|&c| c == wanted)?;
        let at = hay_index + found;

        if first_match.is_none() {
            first_match = Some(at);
        }

        if let Some(prev) = previous_match {
            if at == prev + 1 {
                consecutive += 1;
            } else {
                consecutive = 1;
            }
            // Gap penalty between matched characters.
            score -= (at - prev - 1) as i64 / 2;
        }
        score += CONSECUTIVE_BONUS * consecutive;

        if is_word_boundary(&hay, at) {
            score += WORD_BOUNDARY_BONUS;
        }

        hay_index = at + 1;
        previous_match = Some(at);
    }

    if hay.starts_with(&needle) {
        score += PREFIX_BONUS;
    }
    if let Some(start) = first_match {
        score += i64::max(0, EARLY_MATCH_BONUS - start as i64);
    }

    // Shorter candidates are preferred.
    score -= hay.len() as i64 / 8;

    Some(score)
}

fn is_word_boundary(hay: &[char], index: usize) -> bool {
    index == 0
        || hay
            .get(index - 1)
            .is_some_and(|c| c.is_whitespace() || c.is_ascii_punctuation())
}

/// Normalized similarity between a candidate and a query, in `[0, 1]`.
///
/// The raw subsequence score is divided by the query's score against
/// itself (its best achievable score) and clamped. A non-matching pair
/// scores `0.0`; an exact match scores `1.0`.
///
/// # Example
/// ```rust
/// use chainterm_util::matching::similarity;
///
/// assert_eq!(similarity("swap", "swap"), 1.0);
/// assert!(similarity("swap", "sw") > 0.3);
/// assert_eq!(similarity("bridge", "xyz"), 0.0);
/// ```
pub fn similarity(candidate: &str, query: &str) -> f64 {
    let Some(raw) = fuzzy_score(candidate, query) else {
        return 0.0;
    };
    let Some(best) = fuzzy_score(query, query) else {
        return 0.0;
    };
    if best <= 0 {
        // Degenerate queries (empty or single low-scoring char) cannot be
        // normalized meaningfully; treat exact equality as the only match.
        return if candidate.eq_ignore_ascii_case(query) { 1.0 } else { 0.0 };
    }
    (raw as f64 / best as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_in_order_subsequences_only() {
        assert!(fuzzy_score("uniswap-v4", "usw").is_some());
        assert!(fuzzy_score("uniswap-v4", "wsu").is_none());
    }

    #[test]
    fn prefix_beats_scattered_match() {
        let prefix = fuzzy_score("swap", "sw").unwrap();
        let scattered = fuzzy_score("show-wallet-positions", "sw").unwrap();
        assert!(prefix > scattered);
    }

    #[test]
    fn scoring_is_case_insensitive() {
        assert_eq!(fuzzy_score("Swap", "swap"), fuzzy_score("swap", "SWAP"));
    }

    #[test]
    fn exact_match_normalizes_to_one() {
        assert_eq!(similarity("price", "price"), 1.0);
        assert_eq!(similarity("PRICE", "price"), 1.0);
    }

    #[test]
    fn similarity_is_bounded() {
        for candidate in ["s", "swap", "super-long-command-identifier", "sw"] {
            let s = similarity(candidate, "sw");
            assert!((0.0..=1.0).contains(&s), "similarity {s} out of range for {candidate}");
        }
    }

    #[test]
    fn non_match_is_zero() {
        assert_eq!(similarity("bridge", "swap"), 0.0);
    }

    #[test]
    fn abbreviation_clears_default_threshold() {
        // The completion resolver runs with a 0.3 threshold by default;
        // a leading abbreviation must survive it.
        assert!(similarity("price", "pr") > 0.3);
        assert!(similarity("balance", "bal") > 0.3);
    }
}
