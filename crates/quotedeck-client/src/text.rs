/// Canonicalize a quote or author string for comparison.
///
/// Lowercases, collapses runs of whitespace, folds typographic punctuation
/// into ASCII, and strips trailing periods, so `"Mark Twain."` and
/// `"mark  twain"` compare equal. Applying it twice changes nothing.
pub fn normalize(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let folded: String = lowered
        .chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{2014}' | '\u{2013}' => '-',
            c => c,
        })
        .collect();
    let folded = folded.replace('\u{2026}', "...");
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('.').trim_end().to_string()
}

/// Shorten display text to `max` characters, marking the cut with `...`.
pub fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        assert_eq!(normalize("  Be Yourself  "), "be yourself");
    }

    #[test]
    fn test_collapses_internal_whitespace() {
        assert_eq!(normalize("be\t\tyourself\n now"), "be yourself now");
    }

    #[test]
    fn test_folds_typographic_punctuation() {
        assert_eq!(normalize("\u{201c}Stay hungry\u{201d}"), "\"stay hungry\"");
        assert_eq!(normalize("don\u{2019}t stop"), "don't stop");
        assert_eq!(normalize("life \u{2014} a journey"), "life - a journey");
        assert_eq!(normalize("to be continued\u{2026}"), "to be continued");
    }

    #[test]
    fn test_strips_trailing_periods() {
        assert_eq!(normalize("Be yourself."), "be yourself");
        assert_eq!(normalize("Be yourself..."), "be yourself");
        // Interior periods survive.
        assert_eq!(normalize("J.R.R. Tolkien"), "j.r.r. tolkien");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "  Be Yourself.  ",
            "\u{201c}Carpe\u{2026} diem\u{201d}",
            "J. K.  Rowling...",
            "",
            "...",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_empty_and_period_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_ellipsize_counts_chars_not_bytes() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("a very long quotation", 6), "a very...");
        assert_eq!(ellipsize("ääääää", 4), "ääää...");
    }
}
