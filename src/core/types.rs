use serde::Serialize;
use std::fmt;

/// Where inside a document an occurrence was found.
///
/// The locator is opaque to the pipeline: it is only stored, compared for
/// deduplication of source locations and rendered in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Line number in a text document (1-indexed)
    Line { line: u64 },
    /// Page number in a paginated document (1-indexed)
    Page { page: u32 },
    /// Cell reference in a spreadsheet
    Cell { sheet: String, cell: String },
    /// Anything else a parser wants to record
    Other { value: String },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Line { line } => write!(f, "L{line}"),
            Locator::Page { page } => write!(f, "p.{page}"),
            Locator::Cell { sheet, cell } => write!(f, "{sheet}!{cell}"),
            Locator::Other { value } => write!(f, "{value}"),
        }
    }
}

/// A document plus a locator inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    /// Identifier of the source document (usually a path)
    pub document: String,
    /// Position of the occurrence inside the document
    pub locator: Locator,
}

impl SourceLocation {
    pub fn new<S: Into<String>>(document: S, locator: Locator) -> Self {
        Self {
            document: document.into(),
            locator,
        }
    }

    /// Shorthand for a line locator in a text document.
    pub fn line<S: Into<String>>(document: S, line: u64) -> Self {
        Self::new(document, Locator::Line { line })
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document, self.locator)
    }
}

/// A raw URL string as emitted by a document parser.
///
/// Immutable once built; the pipeline consumes each occurrence exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOccurrence {
    raw_url: String,
    source: SourceLocation,
}

/// Errors that can occur when creating a `RawOccurrence`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOccurrenceError {
    /// URL is missing or empty
    MissingUrl,
    /// Document identifier is missing or empty
    MissingDocument,
    /// Line or page number is zero
    InvalidPosition,
}

impl fmt::Display for RawOccurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUrl => write!(f, "URL is required and cannot be empty"),
            Self::MissingDocument => write!(f, "Document is required and cannot be empty"),
            Self::InvalidPosition => write!(f, "Line and page numbers must be greater than 0"),
        }
    }
}

impl std::error::Error for RawOccurrenceError {}

impl RawOccurrence {
    /// Create a new RawOccurrence with validation.
    ///
    /// # Examples
    /// ```
    /// use linksentry::core::types::{RawOccurrence, SourceLocation};
    ///
    /// let occurrence = RawOccurrence::new(
    ///     "https://example.com".to_string(),
    ///     SourceLocation::line("README.md", 42),
    /// ).unwrap();
    /// assert_eq!(occurrence.raw_url(), "https://example.com");
    /// assert_eq!(occurrence.source().document, "README.md");
    /// ```
    pub fn new(raw_url: String, source: SourceLocation) -> Result<Self, RawOccurrenceError> {
        if raw_url.trim().is_empty() {
            return Err(RawOccurrenceError::MissingUrl);
        }
        if source.document.trim().is_empty() {
            return Err(RawOccurrenceError::MissingDocument);
        }
        match source.locator {
            Locator::Line { line: 0 } | Locator::Page { page: 0 } => {
                return Err(RawOccurrenceError::InvalidPosition);
            }
            _ => {}
        }

        Ok(Self { raw_url, source })
    }

    /// Create a RawOccurrence without validation.
    ///
    /// Used by parsers that have already guaranteed a non-empty URL and a
    /// valid locator.
    pub(crate) fn new_unchecked(raw_url: String, source: SourceLocation) -> Self {
        Self { raw_url, source }
    }

    /// The URL exactly as the parser found it.
    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Split into the raw URL and its source location.
    pub fn into_parts(self) -> (String, SourceLocation) {
        (self.raw_url, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_occurrence_creation() {
        let occurrence = RawOccurrence::new(
            "https://example.com".to_string(),
            SourceLocation::line("test.md", 42),
        )
        .unwrap();

        assert_eq!(occurrence.raw_url(), "https://example.com");
        assert_eq!(occurrence.source().document, "test.md");
        assert_eq!(occurrence.source().locator, Locator::Line { line: 42 });
    }

    #[test]
    fn test_raw_occurrence_creation_validation() {
        let result = RawOccurrence::new("  ".to_string(), SourceLocation::line("test.md", 1));
        assert!(matches!(result, Err(RawOccurrenceError::MissingUrl)));

        let result = RawOccurrence::new(
            "https://example.com".to_string(),
            SourceLocation::line("test.md", 0),
        );
        assert!(matches!(result, Err(RawOccurrenceError::InvalidPosition)));

        let result = RawOccurrence::new(
            "https://example.com".to_string(),
            SourceLocation::new("report.pdf", Locator::Page { page: 0 }),
        );
        assert!(matches!(result, Err(RawOccurrenceError::InvalidPosition)));

        let result = RawOccurrence::new(
            "https://example.com".to_string(),
            SourceLocation::line("", 3),
        );
        assert!(matches!(result, Err(RawOccurrenceError::MissingDocument)));
    }

    #[test]
    fn test_raw_url_is_kept_verbatim() {
        // Cleanup belongs to the normalizer, not to the occurrence
        let occurrence = RawOccurrence::new(
            " <https://example.com/a>. ".to_string(),
            SourceLocation::line("test.md", 1),
        )
        .unwrap();
        assert_eq!(occurrence.raw_url(), " <https://example.com/a>. ");
    }

    #[test]
    fn test_source_location_ordering_is_by_document_then_locator() {
        let a = SourceLocation::line("a.md", 10);
        let b = SourceLocation::line("a.md", 2);
        let c = SourceLocation::line("b.md", 1);

        assert!(b < a);
        assert!(a < c);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::Line { line: 7 }.to_string(), "L7");
        assert_eq!(Locator::Page { page: 3 }.to_string(), "p.3");
        assert_eq!(
            SourceLocation::new(
                "sheet.xlsx",
                Locator::Cell {
                    sheet: "Links".to_string(),
                    cell: "B7".to_string(),
                }
            )
            .to_string(),
            "sheet.xlsx:Links!B7"
        );
        assert_eq!(
            Locator::Other {
                value: "slide 4".to_string()
            }
            .to_string(),
            "slide 4"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RawOccurrenceError::MissingUrl.to_string(),
            "URL is required and cannot be empty"
        );
        assert_eq!(
            RawOccurrenceError::InvalidPosition.to_string(),
            "Line and page numbers must be greater than 0"
        );
    }
}
