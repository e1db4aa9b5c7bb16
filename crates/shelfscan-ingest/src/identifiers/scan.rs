use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifiers::isbn::Isbn;

/// 13-digit tokens must start with `978`; 10-digit tokens may end in `X`/`x`.
/// Hyphens are allowed between digits.
static ISBN_CANDIDATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b978(?:-?\d){10}\b|\b\d(?:-?\d){8}-?[\dXx]\b").expect("valid regex")
});

/// An ISBN-shaped token that has not been checksum-validated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text exactly as it appeared in the block.
    pub matched: String,
    /// `matched` with hyphens removed.
    pub compact: String,
}

impl Candidate {
    fn new(matched: &str) -> Self {
        Self {
            matched: matched.to_string(),
            compact: matched.chars().filter(|c| *c != '-').collect(),
        }
    }

    pub fn validate(&self) -> crate::error::Result<Isbn> {
        Isbn::parse(&self.compact)
    }
}

/// First ISBN-shaped token in `text`. Only the first match is considered.
pub fn scan(text: &str) -> Option<Candidate> {
    ISBN_CANDIDATE_REGEX
        .find(text)
        .map(|m| Candidate::new(m.as_str()))
}

/// Scan a block and validate its first candidate.
pub fn find_isbn_in_text(text: &str) -> Option<Isbn> {
    scan(text).and_then(|candidate| candidate.validate().ok())
}

/// Scan successive blocks, stopping at the first one whose candidate validates.
pub fn find_isbn_in_blocks<I, S>(blocks: I) -> Option<Isbn>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    blocks
        .into_iter()
        .find_map(|block| find_isbn_in_text(block.as_ref()))
}
