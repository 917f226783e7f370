//! Tokenizer shared by indexing and retrieval.
//!
//! Text is split on every character outside `[A-Za-z0-9_]` and lowercased.
//! Index keywords keep tokens longer than 3 characters; query keywords are
//! stricter and keep tokens longer than 4.

use std::collections::HashSet;

/// Index keywords must be longer than this.
pub const INDEX_MIN_EXCLUSIVE: usize = 3;

/// Query keywords must be longer than this.
pub const QUERY_MIN_EXCLUSIVE: usize = 4;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lowercased tokens in source order, duplicates included.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !is_word_char(c))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

/// Deduplicated keyword set stored for each indexed file.
pub fn index_keywords(content: &str) -> HashSet<String> {
    tokens(content).filter(|t| t.len() > INDEX_MIN_EXCLUSIVE).collect()
}

/// Query keywords, deduplicated, in first-occurrence order.
pub fn query_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(query)
        .filter(|t| t.len() > QUERY_MIN_EXCLUSIVE)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_word_characters() {
        let toks: Vec<String> = tokens("fn parse_config(path: &Path) -> Result<()>").collect();
        assert_eq!(toks, vec!["fn", "parse_config", "path", "path", "result"]);
    }

    #[test]
    fn non_ascii_letters_are_separators() {
        let toks: Vec<String> = tokens("naïve café").collect();
        assert_eq!(toks, vec!["na", "ve", "caf"]);
    }

    #[test]
    fn index_keywords_drop_short_tokens() {
        let kw = index_keywords("let user = User::load(id); user.save()");
        assert!(kw.contains("user"));
        assert!(kw.contains("load"));
        assert!(kw.contains("save"));
        assert!(!kw.contains("let"));
        assert!(!kw.contains("id"));
        assert_eq!(kw.len(), 3);
    }

    #[test]
    fn query_keywords_are_stricter_and_deduplicated() {
        let kw = query_keywords("Fix the login issue: LOGIN fails, user sees issue page");
        assert_eq!(kw, vec!["login", "issue", "fails"]);
    }

    #[test]
    fn short_query_has_no_keywords() {
        assert!(query_keywords("fix the bug now").is_empty());
        assert!(query_keywords("").is_empty());
    }
}
