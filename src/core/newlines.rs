// Explicit newline configuration for `Config::newline`: a caller who knows
// their data uses an unusual row terminator can set this directly instead
// of relying on `heuristics::guess_newline`'s auto-detection.

#[derive(Debug, Clone)]
pub struct Newlines {
    /// Candidate terminator patterns, longest-first so a greedy match (e.g.
    /// preferring a two-byte sequence over a one-byte prefix of it) picks
    /// the longest one that matches at a given position.
    pub patterns: Vec<Vec<u8>>,
}

impl Newlines {
    /// Sorts `patterns` longest-first for greedy matching.
    pub fn custom(mut patterns: Vec<Vec<u8>>) -> Self {
        patterns.sort_by_key(|b| std::cmp::Reverse(b.len()));
        Newlines { patterns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_sorts_longest_first() {
        let nl = Newlines::custom(vec![b"|".to_vec(), b"<br>".to_vec()]);
        assert_eq!(nl.patterns[0], b"<br>".to_vec());
        assert_eq!(nl.patterns[1], b"|".to_vec());
    }
}
