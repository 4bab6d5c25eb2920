//! Word similarity scores on a 0..100 scale
//!
//! A candidate is scored with three measures and the best one is kept:
//! - `ratio`: longest common subsequence, `2 * lcs / (len_a + len_b)`
//! - `partial_ratio`: best `ratio` of the shorter word against every
//!   equally long window of the longer one, when lengths are close
//! - normalized Levenshtein distance (`strsim`)

/// Minimum length ratio for the windowed comparison
const PARTIAL_MIN_LENGTH_RATIO: f64 = 0.75;

/// Best of the three similarity measures, 0..100
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return if a == b { 100.0 } else { 0.0 };
    }

    let ratio = ratio_chars(&a, &b);
    let partial = partial_ratio_chars(&a, &b);
    let a_str: String = a.iter().collect();
    let b_str: String = b.iter().collect();
    let levenshtein = strsim::normalized_levenshtein(&a_str, &b_str);

    ratio.max(partial).max(levenshtein) * 100.0
}

/// LCS ratio, 0..1
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

fn partial_ratio_chars(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if (short.len() as f64 / long.len() as f64) < PARTIAL_MIN_LENGTH_RATIO {
        return 0.0;
    }
    long.windows(short.len())
        .map(|window| ratio_chars(short, window))
        .fold(0.0, f64::max)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_words() {
        assert_eq!(similarity("solde", "solde"), 100.0);
    }

    #[test]
    fn test_ratio() {
        // lcs("virement", "virrement") = 8
        assert!((ratio("virement", "virrement") - 16.0 / 17.0).abs() < 1e-9);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_misspelling_scores_high() {
        assert!(similarity("virrement", "virement") >= 90.0);
        assert!(similarity("consultr", "consulter") >= 70.0);
    }

    #[test]
    fn test_unrelated_words_score_low() {
        assert!(similarity("juliette", "juillet") < 100.0);
        assert!(similarity("xylophone", "solde") < 70.0);
    }

    #[test]
    fn test_partial_ratio_needs_close_lengths() {
        let short: Vec<char> = "sold".chars().collect();
        let long: Vec<char> = "soldesoldes".chars().collect();
        assert_eq!(partial_ratio_chars(&short, &long), 0.0);
    }
}
