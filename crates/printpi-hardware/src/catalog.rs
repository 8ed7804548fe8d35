//! Firmware error code to user message translation.

use crate::reply::ErrorCode;
use printpi_core::constants::{MAX_ENROLLMENT_SLOT, MSG_UNDEFINED_ERROR};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// One row of the catalog: a code range and the message shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub codes: RangeInclusive<u32>,
    pub message: String,
}

impl CatalogEntry {
    pub fn single(code: u32, message: impl Into<String>) -> Self {
        Self {
            codes: code..=code,
            message: message.into(),
        }
    }

    pub fn range(codes: RangeInclusive<u32>, message: impl Into<String>) -> Self {
        Self {
            codes,
            message: message.into(),
        }
    }
}

/// Messages of the GT-511 firmware error codes.
const BUILTIN_MESSAGES: &[(u32, &str)] = &[
    (0x1001, "CAPTURE TIMEOUT"),
    (0x1002, "INVALID BAUD RATE"),
    (0x1003, "INVALID ENROLLMENT ID"),
    (0x1004, "ENROLLMENT ID NOT USED"),
    (0x1005, "ENROLLMENT ID ALREADY USED"),
    (0x1006, "COMMUNICATION ERROR"),
    (0x1007, "VERIFICATION FAILED"),
    (0x1008, "IDENTIFICATION FAILED"),
    (0x1009, "DATABASE FULL"),
    (0x100A, "DATABASE EMPTY"),
    (0x100B, "ENROLLMENT OUT OF ORDER"),
    (0x100C, "BAD FINGER"),
    (0x100D, "ENROLLMENT FAILED"),
    (0x100E, "COMMAND NOT SUPPORTED"),
    (0x100F, "DEVICE ERROR"),
    (0x1010, "CAPTURE CANCELLED"),
    (0x1011, "INVALID PARAMETER"),
    (0x1012, "FINGER IS NOT PRESSED"),
];

/// Total mapping from [`ErrorCode`] to a human-readable message.
///
/// Entries are searched newest first, so an entry added later shadows any
/// overlapping earlier one. Codes no entry covers, and raw non-numeric codes,
/// translate to the fallback message.
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    entries: Vec<CatalogEntry>,
    fallback: String,
}

impl ErrorCatalog {
    /// Catalog with only the fallback message.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fallback: MSG_UNDEFINED_ERROR.to_string(),
        }
    }

    /// Firmware table plus the already-enrolled slot range.
    pub fn builtin() -> Self {
        let catalog = Self::empty().with_entry(CatalogEntry::range(
            0..=MAX_ENROLLMENT_SLOT,
            "FINGER ALREADY ENROLLED",
        ));

        BUILTIN_MESSAGES
            .iter()
            .fold(catalog, |catalog, (code, message)| {
                catalog.with_entry(CatalogEntry::single(*code, *message))
            })
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_fallback(mut self, message: impl Into<String>) -> Self {
        self.fallback = message.into();
        self
    }

    /// Add entries from a `[catalog]` config table keyed by hexadecimal code.
    ///
    /// Keys that are not hexadecimal codes are skipped with a warning.
    pub fn with_overrides(self, overrides: &BTreeMap<String, String>) -> Self {
        overrides.iter().fold(self, |catalog, (key, message)| {
            match ErrorCode::parse(key).as_numeric() {
                Some(code) => catalog.with_entry(CatalogEntry::single(code, message.clone())),
                None => {
                    tracing::warn!(key = %key, "Ignoring catalog entry with non-hexadecimal code");
                    catalog
                }
            }
        })
    }

    /// Message for `code`.
    pub fn translate(&self, code: &ErrorCode) -> &str {
        let Some(numeric) = code.as_numeric() else {
            return &self.fallback;
        };

        self.entries
            .iter()
            .rev()
            .find(|entry| entry.codes.contains(&numeric))
            .map(|entry| entry.message.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::Numeric(0x1001), "CAPTURE TIMEOUT")]
    #[case(ErrorCode::Numeric(0x100C), "BAD FINGER")]
    #[case(ErrorCode::Numeric(0x100D), "ENROLLMENT FAILED")]
    #[case(ErrorCode::Numeric(0x1012), "FINGER IS NOT PRESSED")]
    #[case(ErrorCode::Numeric(0), "FINGER ALREADY ENROLLED")]
    #[case(ErrorCode::Numeric(41), "FINGER ALREADY ENROLLED")]
    #[case(ErrorCode::Numeric(199), "FINGER ALREADY ENROLLED")]
    #[case(ErrorCode::Numeric(200), "UNDEFINED ERROR")]
    #[case(ErrorCode::Numeric(0x2000), "UNDEFINED ERROR")]
    #[case(ErrorCode::Raw("HHHH".to_string()), "UNDEFINED ERROR")]
    fn test_builtin_translation(#[case] code: ErrorCode, #[case] expected: &str) {
        assert_eq!(ErrorCatalog::builtin().translate(&code), expected);
    }

    #[test]
    fn test_parsed_code_spellings_agree() {
        let catalog = ErrorCatalog::builtin();
        for text in ["x100C", "100c", "0x100C"] {
            assert_eq!(catalog.translate(&ErrorCode::parse(text)), "BAD FINGER");
        }
    }

    #[test]
    fn test_later_entry_shadows_earlier() {
        let catalog = ErrorCatalog::builtin()
            .with_entry(CatalogEntry::single(0x100C, "CLEAN THE SENSOR"));
        assert_eq!(
            catalog.translate(&ErrorCode::Numeric(0x100C)),
            "CLEAN THE SENSOR"
        );
        assert_eq!(
            catalog.translate(&ErrorCode::Numeric(0x100D)),
            "ENROLLMENT FAILED"
        );
    }

    #[test]
    fn test_config_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("1013".to_string(), "SENSOR DIRTY".to_string());
        overrides.insert("0x100c".to_string(), "TRY AGAIN".to_string());
        overrides.insert("bogus!".to_string(), "ignored".to_string());

        let catalog = ErrorCatalog::builtin().with_overrides(&overrides);
        assert_eq!(catalog.translate(&ErrorCode::Numeric(0x1013)), "SENSOR DIRTY");
        assert_eq!(catalog.translate(&ErrorCode::Numeric(0x100C)), "TRY AGAIN");
        assert_eq!(catalog.len(), ErrorCatalog::builtin().len() + 2);
    }

    #[test]
    fn test_empty_catalog_is_total() {
        let catalog = ErrorCatalog::empty().with_fallback("?");
        assert!(catalog.is_empty());
        assert_eq!(catalog.translate(&ErrorCode::Numeric(0x100C)), "?");
        assert_eq!(catalog.fallback(), "?");
    }
}
