use std::collections::HashMap;

/// Similarity between two normalized strings, in `[0.0, 1.0]`.
///
/// Strings of near-equal length are compared position by position, which
/// rewards small in-place edits and stays cheap. Everything else falls back
/// to word overlap scored Dice-style. Commutative: both inputs go through
/// the same path with the same weight.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();

    if len_a.abs_diff(len_b) <= 3 {
        let matching = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
        return matching as f64 / len_a.max(len_b) as f64;
    }

    word_overlap(a, b)
}

/// Dice coefficient over words longer than two characters. Short connectives
/// carry no signal and are excluded from the overlap, but still count toward
/// the denominator. Repeated words match at most as often as they occur in
/// the other string.
fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a: Vec<&str> = a.split(' ').collect();
    let words_b: Vec<&str> = b.split(' ').collect();
    let total = words_a.len() + words_b.len();
    if total == 0 {
        return 0.0;
    }

    let mut budget: HashMap<&str, usize> = HashMap::new();
    for w in &words_b {
        *budget.entry(w).or_insert(0) += 1;
    }

    let mut common = 0usize;
    for w in &words_a {
        if w.chars().count() <= 2 {
            continue;
        }
        if let Some(remaining) = budget.get_mut(w) {
            if *remaining > 0 {
                *remaining -= 1;
                common += 1;
            }
        }
    }

    (2.0 * common as f64) / total as f64
}
