use std::fmt;

use quotedeck_core::Quote;
use serde::{Deserialize, Serialize};

use crate::similarity::similarity;
use crate::text::normalize;

/// Text similarity needed when the author matches exactly.
const SIMILAR_TEXT: f64 = 0.90;
/// Author similarity needed when the text matches exactly.
const SIMILAR_AUTHOR: f64 = 0.85;
/// Thresholds when both fields are merely close.
const NEAR_BOTH_TEXT: f64 = 0.95;
const NEAR_BOTH_AUTHOR: f64 = 0.90;

/// Why two quotes were judged duplicates of each other.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchReason {
    ExactMatch,
    SimilarTextSameAuthor(f64),
    SameTextSimilarAuthor(f64),
    BothSimilar { text: f64, author: f64 },
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::ExactMatch => write!(f, "exact_match"),
            MatchReason::SimilarTextSameAuthor(sim) => {
                write!(f, "similar_quote_same_author_{sim:.2}")
            }
            MatchReason::SameTextSimilarAuthor(sim) => {
                write!(f, "same_quote_similar_author_{sim:.2}")
            }
            MatchReason::BothSimilar { text, author } => {
                write!(f, "both_similar_q{text:.2}_a{author:.2}")
            }
        }
    }
}

/// Compare two quotes after normalization and explain a match, if any.
///
/// Rules fire in order: exact match on both fields, near-identical text by
/// the same author, identical text by a near-identical author, then both
/// fields close at once under stricter thresholds.
pub fn judge(a: &Quote, b: &Quote) -> Option<MatchReason> {
    let text_a = normalize(&a.text);
    let text_b = normalize(&b.text);
    let author_a = normalize(&a.author);
    let author_b = normalize(&b.author);

    if text_a == text_b && author_a == author_b {
        return Some(MatchReason::ExactMatch);
    }

    let text_sim = similarity(&text_a, &text_b);
    if text_sim >= SIMILAR_TEXT && author_a == author_b {
        return Some(MatchReason::SimilarTextSameAuthor(text_sim));
    }

    let author_sim = similarity(&author_a, &author_b);
    if text_a == text_b && author_sim >= SIMILAR_AUTHOR {
        return Some(MatchReason::SameTextSimilarAuthor(author_sim));
    }

    if text_sim >= NEAR_BOTH_TEXT && author_sim >= NEAR_BOTH_AUTHOR {
        return Some(MatchReason::BothSimilar {
            text: text_sim,
            author: author_sim,
        });
    }

    None
}

pub fn are_similar(a: &Quote, b: &Quote) -> bool {
    judge(a, b).is_some()
}

/// A set of at least two quotes judged duplicates of the group's first member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub quotes: Vec<Quote>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Partition quotes into duplicate groups.
///
/// Greedy quadratic scan: each unprocessed quote anchors a group and claims
/// every later unprocessed quote similar to it. Similarity is not transitive,
/// so membership goes to the earliest anchor that claims a quote.
pub fn find_duplicate_groups(quotes: &[Quote]) -> Vec<DuplicateGroup> {
    let mut processed = vec![false; quotes.len()];
    let mut groups = Vec::new();

    for i in 0..quotes.len() {
        if processed[i] {
            continue;
        }
        let mut members = vec![i];
        for j in (i + 1)..quotes.len() {
            if processed[j] {
                continue;
            }
            if are_similar(&quotes[i], &quotes[j]) {
                members.push(j);
            }
        }
        if members.len() > 1 {
            for &m in &members {
                processed[m] = true;
            }
            groups.push(DuplicateGroup {
                quotes: members.iter().map(|&m| quotes[m].clone()).collect(),
            });
        } else {
            processed[i] = true;
        }
    }

    groups
}
