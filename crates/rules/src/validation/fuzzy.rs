//! Edit-distance helpers for "did you mean" hints and id format checks.

/// Closest candidate by Levenshtein distance, or `None` when even the best
/// one differs in more than half of the longer string's characters.
pub(crate) fn closest_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input = input.to_lowercase();
    let (best, dist) = candidates
        .iter()
        .map(|c| (*c, levenshtein(&input, &c.to_lowercase())))
        .min_by_key(|(_, d)| *d)?;
    let longest = input.chars().count().max(best.chars().count());
    (dist <= longest / 2).then_some(best)
}

/// Levenshtein edit distance over chars (single rolling row).
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diag + usize::from(ca != *cb);
            diag = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diag + 1);
        }
    }
    row[b.len()]
}

/// `^[a-z0-9]+(-[a-z0-9]+)*$`
pub(crate) fn is_kebab_case(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}
