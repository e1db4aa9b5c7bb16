use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Which form the input validated as before normalization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IsbnKind {
    Isbn10,
    Isbn13,
}

/// A checksum-validated ISBN, always carried in its 13-digit form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Isbn {
    pub raw: String,
    pub isbn13: String,
    pub kind: IsbnKind,
}

fn strip_isbn(input: &str) -> String {
    input.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

/// Digits of a 10-character candidate; a trailing `X`/`x` maps to 10.
fn isbn10_digits(s: &str) -> Option<Vec<u8>> {
    if s.len() != 10 {
        return None;
    }
    s.bytes()
        .enumerate()
        .map(|(i, b)| match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'X' | b'x' if i == 9 => Some(10),
            _ => None,
        })
        .collect()
}

fn isbn13_digits(s: &str) -> Option<Vec<u8>> {
    if s.len() != 13 {
        return None;
    }
    s.bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect()
}

fn check_isbn10(digits: &[u8]) -> bool {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| (10 - i as u32) * d as u32)
        .sum();
    sum % 11 == 0
}

fn weighted_sum13(digits: &[u8]) -> u32 {
    digits
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 } else { d as u32 * 3 })
        .sum()
}

fn check_isbn13(digits: &[u8]) -> bool {
    weighted_sum13(digits) % 10 == 0
}

fn isbn10_to_isbn13(digits10: &[u8]) -> String {
    let mut d13: Vec<u8> = vec![9, 7, 8];
    d13.extend_from_slice(&digits10[..9]);
    let check = (10 - weighted_sum13(&d13) % 10) % 10;
    d13.push(check as u8);
    d13.iter().map(|d| char::from(b'0' + d)).collect()
}

impl Isbn {
    /// Validate `input` as ISBN-10 or ISBN-13 (hyphens and spaces ignored) and
    /// normalize it to ISBN-13. ISBN-10 input is re-prefixed with `978`.
    pub fn parse(input: &str) -> Result<Self> {
        let stripped = strip_isbn(input);

        if let Some(digits) = isbn10_digits(&stripped).filter(|d| check_isbn10(d)) {
            return Ok(Self {
                raw: input.to_string(),
                isbn13: isbn10_to_isbn13(&digits),
                kind: IsbnKind::Isbn10,
            });
        }

        if isbn13_digits(&stripped).is_some_and(|d| check_isbn13(&d)) {
            return Ok(Self {
                raw: input.to_string(),
                isbn13: stripped,
                kind: IsbnKind::Isbn13,
            });
        }

        Err(IngestError::InvalidIsbn(input.to_string()))
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.isbn13)
    }
}

/// Normalize any valid ISBN-10/13 string to its canonical 13-digit form.
pub fn normalize(raw: &str) -> Result<String> {
    Isbn::parse(raw).map(|isbn| isbn.isbn13)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isbn10_check_char(prefix9: &str) -> char {
        let sum: u32 = prefix9
            .bytes()
            .enumerate()
            .map(|(i, b)| (10 - i as u32) * (b - b'0') as u32)
            .sum();
        match (11 - sum % 11) % 11 {
            10 => 'X',
            d => char::from(b'0' + d as u8),
        }
    }

    fn is_valid_isbn13(s: &str) -> bool {
        isbn13_digits(s).is_some_and(|d| check_isbn13(&d))
    }

    #[test]
    fn valid_isbn13_is_unchanged() {
        let isbn = Isbn::parse("9780306406157").unwrap();
        assert_eq!(isbn.isbn13, "9780306406157");
        assert_eq!(isbn.kind, IsbnKind::Isbn13);
    }

    #[test]
    fn isbn13_with_hyphens_and_spaces() {
        assert_eq!(normalize("978-0-306-40615-7").unwrap(), "9780306406157");
        assert_eq!(normalize("978 1 801 07736 1").unwrap(), "9781801077361");
    }

    #[test]
    fn valid_isbn10_converts() {
        let isbn = Isbn::parse("0306406152").unwrap();
        assert_eq!(isbn.kind, IsbnKind::Isbn10);
        assert_eq!(isbn.isbn13, "9780306406157");
        assert_eq!(normalize("0-13-110362-8").unwrap(), "9780131103627");
    }

    #[test]
    fn isbn10_with_x_check() {
        assert_eq!(normalize("007462542X").unwrap(), "9780074625422");
        assert_eq!(normalize("0-07-462542-x").unwrap(), "9780074625422");
    }

    #[test]
    fn isbn13_979_prefix_is_accepted() {
        assert_eq!(normalize("9791032305690").unwrap(), "9791032305690");
    }

    #[test]
    fn every_valid_isbn10_maps_to_checksummed_978() {
        for n in (0..1_000_000_000u64).step_by(7_919_113) {
            let prefix = format!("{n:09}");
            let isbn10 = format!("{prefix}{}", isbn10_check_char(&prefix));
            let isbn13 = normalize(&isbn10).unwrap();
            assert_eq!(isbn13.len(), 13, "{isbn10}");
            assert!(isbn13.starts_with("978"), "{isbn10}");
            assert_eq!(&isbn13[3..12], prefix, "{isbn10}");
            assert!(is_valid_isbn13(&isbn13), "{isbn10} -> {isbn13}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["0306406152", "978-1-801-07736-1", "007462542X", "9791032305690"] {
            let once = normalize(raw).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        for raw in [
            "9780306406158",  // wrong ISBN-13 check digit
            "0306406153",     // wrong ISBN-10 check digit
            "030640615",      // too short
            "97803064061570", // too long
            "978030640615X",  // X only allowed in ISBN-10
            "03064X6152",     // X not in check position
            "0306.406152",    // punctuation other than hyphen/space
            "",
        ] {
            let err = Isbn::parse(raw).unwrap_err();
            assert!(matches!(err, IngestError::InvalidIsbn(_)), "{raw}");
        }
    }
}
