//! Mac OS Roman strings and the folding tables used to compare them.
//!
//! Stack text is stored as single-byte Mac OS Roman. It is kept as raw bytes in a
//! [`MacString`]; conversion to Unicode goes through `encoding_rs::MACINTOSH`, and
//! case or diacritic insensitive comparison goes through two 256-entry tables rather
//! than locale rules, so results match what HyperCard itself computed.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use encoding_rs::MACINTOSH;

/// A byte string in the Mac OS Roman encoding.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacString(Vec<u8>);

impl MacString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Encodes a Unicode string. Characters without a Mac OS Roman equivalent are
    /// replaced the way `encoding_rs` does for legacy encoders.
    pub fn from_unicode(text: &str) -> Self {
        let (bytes, _, _) = MACINTOSH.encode(text);
        Self(bytes.into_owned())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes to Unicode.
    pub fn to_unicode(&self) -> Cow<'_, str> {
        MACINTOSH.decode_without_bom_handling(&self.0).0
    }

    /// Lower case copy, accents stripped.
    pub fn to_lowercase_without_accents(&self) -> MacString {
        MacString(self.0.iter().map(|&c| LOWERCASE_NO_ACCENT_TABLE[c as usize]).collect())
    }

    /// Byte-wise comparison.
    pub fn compare(&self, other: &MacString) -> Ordering {
        compare_with(&self.0, &other.0, |c| c)
    }

    /// Case-insensitive comparison.
    pub fn compare_ignoring_case(&self, other: &MacString) -> Ordering {
        compare_with(&self.0, &other.0, |c| LOWERCASE_TABLE[c as usize])
    }

    /// Case and diacritics insensitive comparison, the one HyperCard uses for `is`.
    pub fn compare_ignoring_case_and_diacritics(&self, other: &MacString) -> Ordering {
        compare_with(&self.0, &other.0, |c| LOWERCASE_NO_ACCENT_TABLE[c as usize])
    }
}

fn compare_with(a: &[u8], b: &[u8], transform: impl Fn(u8) -> u8) -> Ordering {
    a.iter()
        .map(|&c| transform(c))
        .cmp(b.iter().map(|&c| transform(c)))
}

impl From<&[u8]> for MacString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for MacString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for MacString {
    fn from(text: &str) -> Self {
        Self::from_unicode(text)
    }
}

impl fmt::Display for MacString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_unicode())
    }
}

impl fmt::Debug for MacString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_unicode())
    }
}

/// Maps every Mac OS Roman character to its lower case form.
pub const LOWERCASE_TABLE: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27,
    0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    0x40, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77,
    0x78, 0x79, 0x7A, 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
    0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77,
    0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    0x8A, 0x8C, 0x8D, 0x8E, 0x96, 0x9A, 0x9F, 0x87,
    0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8D, 0x8E, 0x8F,
    0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97,
    0x98, 0x99, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F,
    0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xBE, 0xBF,
    0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7,
    0xB8, 0xB9, 0xBA, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF,
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
    0xC8, 0xC9, 0xCA, 0x88, 0x8B, 0x9B, 0xCF, 0xCF,
    0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
    0xD8, 0xD8, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF,
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0x89, 0x90, 0x87,
    0x91, 0x8F, 0x92, 0x94, 0x95, 0x93, 0x97, 0x99,
    0xF0, 0x98, 0x9C, 0x9E, 0x9D, 0xF5, 0xF6, 0xF7,
    0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

/// Maps every Mac OS Roman character to its lower case form without diacritics.
pub const LOWERCASE_NO_ACCENT_TABLE: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27,
    0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    0x40, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77,
    0x78, 0x79, 0x7A, 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
    0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77,
    0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    0x61, 0x61, 0x63, 0x65, 0x6E, 0x6F, 0x75, 0x61,
    0x61, 0x61, 0x61, 0x61, 0x61, 0x63, 0x65, 0x65,
    0x65, 0x65, 0x69, 0x69, 0x69, 0x69, 0x6E, 0x6F,
    0x6F, 0x6F, 0x6F, 0x6F, 0x75, 0x75, 0x75, 0x75,
    0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0x61, 0x6F,
    0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7,
    0xB8, 0xB9, 0xBA, 0x61, 0x6F, 0xBD, 0x61, 0x6F,
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0x05, 0xC6, 0xC7,
    0xC8, 0xC9, 0xCA, 0x61, 0x61, 0x6F, 0x6F, 0x6F,
    0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
    0x79, 0x79, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF,
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0x61, 0x65, 0x61,
    0x65, 0x65, 0x69, 0x69, 0x69, 0x69, 0x6F, 0x6F,
    0xF0, 0x6F, 0x75, 0x75, 0x75, 0xF5, 0xF6, 0xF7,
    0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];
