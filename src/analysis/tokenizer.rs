//! Exact and lossy tokenizers.
//!
//! # Examples
//!
//! ```
//! use dualdex::analysis::tokenizer::{tokenize, tokenize_lossy_trigrams};
//!
//! let exact = tokenize("Café, crème!");
//! assert_eq!(exact.normalized, "cafe creme");
//! assert_eq!(exact.tokens, vec!["cafe", "creme"]);
//!
//! let lossy = tokenize_lossy_trigrams("Café");
//! assert_eq!(lossy, vec!["caf", "afe", "cafe*"]);
//! ```

use ahash::AHashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Marker appended to prefix tokens.
pub const WILDCARD: char = '*';

/// Maximum number of characters kept in a prefix token.
pub const PREFIX_LEN: usize = 4;

/// Length of a lossy gram.
pub const TRIGRAM_LEN: usize = 3;

/// Output of [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokenized {
    /// The normalized text, words separated by single spaces.
    pub normalized: String,
    /// The words of `normalized`, in order. Empty for blank input.
    pub tokens: Vec<String>,
}

/// Lossy tokens of a query, split by kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LossyQuery {
    /// 3-grams of every query word long enough to have one.
    pub trigrams: Vec<String>,
    /// Prefix tokens for words too short to yield a 3-gram.
    pub prefixes: Vec<String>,
}

impl LossyQuery {
    /// All tokens, trigrams first.
    pub fn all(&self) -> Vec<String> {
        self.trigrams
            .iter()
            .chain(self.prefixes.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.trigrams.is_empty() && self.prefixes.is_empty()
    }

    /// Keep at most `max_tokens` tokens, trigrams first.
    pub fn truncate(&mut self, max_tokens: usize) {
        if self.trigrams.len() >= max_tokens {
            self.trigrams.truncate(max_tokens);
            self.prefixes.clear();
        } else {
            let room = max_tokens - self.trigrams.len();
            self.prefixes.truncate(room);
        }
    }
}

/// Normalize text the way both indexes expect it.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c))
    {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Tokenize text into whole normalized words.
pub fn tokenize(text: &str) -> Tokenized {
    let normalized = normalize(text);
    let tokens = normalized.split_whitespace().map(str::to_string).collect();
    Tokenized { normalized, tokens }
}

/// Tokenize text into the lossy token set used at indexing time.
///
/// Every word contributes its 3-grams (when it has at least three characters)
/// and one prefix token of up to [`PREFIX_LEN`] characters followed by
/// [`WILDCARD`]. Duplicates are dropped; first-seen order is kept.
pub fn tokenize_lossy_trigrams(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let mut seen = AHashSet::new();
    let mut out = Vec::new();

    for word in normalized.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for gram in trigrams_of(&chars) {
            push_unique(&mut out, &mut seen, gram);
        }
        push_unique(&mut out, &mut seen, prefix_of(&chars));
    }

    out
}

/// Tokenize a query into lossy tokens for candidate discovery.
///
/// Words of three or more characters are constrained by their 3-grams alone;
/// shorter words fall back to their prefix token.
pub fn tokenize_lossy_query(text: &str) -> LossyQuery {
    let normalized = normalize(text);
    let mut seen = AHashSet::new();
    let mut query = LossyQuery::default();

    for word in normalized.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() >= TRIGRAM_LEN {
            for gram in trigrams_of(&chars) {
                push_unique(&mut query.trigrams, &mut seen, gram);
            }
        } else {
            push_unique(&mut query.prefixes, &mut seen, prefix_of(&chars));
        }
    }

    query
}

/// Whether a lossy token is a prefix token.
pub fn is_prefix_token(token: &str) -> bool {
    token.ends_with(WILDCARD)
}

fn trigrams_of(chars: &[char]) -> impl Iterator<Item = String> + '_ {
    chars.windows(TRIGRAM_LEN).map(|w| w.iter().collect())
}

fn prefix_of(chars: &[char]) -> String {
    let mut prefix: String = chars.iter().take(PREFIX_LEN).collect();
    prefix.push(WILDCARD);
    prefix
}

fn push_unique(out: &mut Vec<String>, seen: &mut AHashSet<String>, token: String) {
    if seen.insert(token.clone()) {
        out.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_punctuation() {
        assert_eq!(normalize("  Héllo,   WÖRLD!! "), "hello world");
        assert_eq!(normalize("naïve—café"), "naive cafe");
        assert_eq!(normalize("ｆｕｌｌ width"), "full width");
        assert_eq!(normalize("abc123 x_y"), "abc123 x y");
    }

    #[test]
    fn test_tokenize_blank_input() {
        let result = tokenize("   \t ");
        assert!(result.tokens.is_empty());
        assert_eq!(result.normalized, "");

        assert!(tokenize("").tokens.is_empty());
        assert!(tokenize("!!! ---").tokens.is_empty());
    }

    #[test]
    fn test_tokenize_words() {
        let result = tokenize("\"Hello world\"");
        assert_eq!(result.tokens, vec!["hello", "world"]);
    }

    #[test]
    fn test_lossy_trigrams() {
        let tokens = tokenize_lossy_trigrams("hello hi");
        assert_eq!(tokens, vec!["hel", "ell", "llo", "hell*", "hi*"]);
    }

    #[test]
    fn test_lossy_trigrams_dedup() {
        let tokens = tokenize_lossy_trigrams("aaaa aaaa");
        assert_eq!(tokens, vec!["aaa", "aaaa*"]);
    }

    #[test]
    fn test_lossy_unicode() {
        let tokens = tokenize_lossy_trigrams("日本語");
        assert_eq!(tokens, vec!["日本語", "日本語*"]);
    }

    #[test]
    fn test_lossy_query_split() {
        let query = tokenize_lossy_query("hello to you");
        assert_eq!(query.trigrams, vec!["hel", "ell", "llo", "you"]);
        assert_eq!(query.prefixes, vec!["to*"]);
        assert!(is_prefix_token("to*"));
        assert!(!is_prefix_token("you"));
        assert_eq!(query.all().len(), 5);
    }

    #[test]
    fn test_lossy_query_truncate() {
        let mut query = tokenize_lossy_query("hello to");
        query.truncate(4);
        assert_eq!(query.trigrams.len(), 3);
        assert_eq!(query.prefixes, vec!["to*"]);

        query.truncate(2);
        assert_eq!(query.trigrams, vec!["hel", "ell"]);
        assert!(query.prefixes.is_empty());
    }
}
