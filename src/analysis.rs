//! Text analysis for the lossy and exact indexes.
//!
//! Both indexes see the same normalized text: compatibility decomposition,
//! diacritics stripped, lowercased, and every run of characters that is not a
//! letter or digit collapsed into a single space. On top of that:
//!
//! - the exact index stores whole words ([`tokenizer::tokenize`]);
//! - the lossy index stores 3-grams plus one wildcard-suffixed prefix per word
//!   ([`tokenizer::tokenize_lossy_trigrams`]).

pub mod tokenizer;

pub use tokenizer::{
    LossyQuery, PREFIX_LEN, TRIGRAM_LEN, Tokenized, WILDCARD, is_prefix_token, normalize,
    tokenize, tokenize_lossy_query, tokenize_lossy_trigrams,
};
