//! Error types for the harvester.
//!
//! Uses the dual-error pattern: `ParseError` for structural problems in a
//! single gii document, and `HarvesterError` for library consumers with the
//! surrounding download, storage and orchestration context.

use thiserror::Error;

/// A gii document deviates from every document shape seen so far.
///
/// Any of these aborts the parse of the whole document. The orchestrator
/// logs the error and skips that one law.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML is not well-formed.
    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Document contains no `norm` elements at all.
    #[error("Document contains no header norm")]
    MissingHeaderNorm,

    /// Required attribute or element missing.
    #[error("Missing required {field} in norm {doknr}")]
    MissingField { field: &'static str, doknr: String },

    /// Identifier carries neither the article nor the section marker.
    #[error("Unknown norm structure encountered: {0}")]
    UnknownNormShape(String),

    /// `text` element with a `format` other than `XML` or `decorated`.
    #[error("Unknown text format {}", .0.as_deref().unwrap_or("<none>"))]
    UnsupportedTextFormat(Option<String>),

    /// `text[@format=decorated]` that is expected to be empty but is not.
    #[error("Found text[@format=decorated] with unexpected text content in {0}")]
    DecoratedTextWithContent(String),

    /// Text with both a table of contents and regular content.
    #[error("Found norm {0} with both TOC and Content")]
    ConflictingTextSections(String),

    /// Neither official nor juristic abbreviations present.
    #[error("No abbreviation found for norm {0}")]
    EmptyAbbreviationSet(String),

    /// Several elements where a single value was expected.
    #[error("Multiple values found for <{element}> but not requested: {count}")]
    MultipleValues { element: String, count: usize },

    /// Section norm without a usable `gliederungseinheit`.
    #[error("Section norm {0} has no section code")]
    MissingSectionInfo(String),

    /// No registered section code matches, not even the root.
    #[error("Could not resolve parent section for code '{0}'")]
    UnresolvableParentCode(String),

    /// Same norm identifier used twice within one law.
    #[error("Duplicate norm identifier {0}")]
    DuplicateIdentifier(String),
}

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Structural problem in a gii document.
    #[error("Failed to parse law XML: {0}")]
    Parse(#[from] ParseError),

    /// XML parsing failed outside of a law document (e.g. the catalog).
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response without a `Last-Modified` header.
    #[error("No Last-Modified header in response from {url}")]
    MissingLastModified { url: String },

    /// `Last-Modified` header that is not an HTTP date.
    #[error("Invalid Last-Modified header '{0}'")]
    InvalidLastModified(String),

    /// Catalog entry whose link yields no slug.
    #[error("Invalid catalog entry: {0}")]
    InvalidCatalogEntry(String),

    /// Slug that is unsafe to use as a path component.
    #[error("Invalid law slug: '{0}'")]
    InvalidSlug(String),

    /// Law archive that does not contain exactly one XML file.
    #[error("Expected 1 XML file for {slug}, got {count}")]
    UnexpectedXmlFileCount { slug: String, count: usize },

    /// Law archive could not be unpacked.
    #[error("Failed to unpack archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Object storage request failed.
    #[error("Object storage request failed: {0}")]
    ObjectStorage(String),

    /// Data location string that names no usable location.
    #[error("Invalid data location '{0}'")]
    InvalidDataLocation(String),

    /// Catalog would remove an implausible number of laws.
    #[error("Refusing to remove {count} laws (limit is {limit}); the catalog is probably incomplete")]
    TooManyRemovals { count: usize, limit: usize },

    /// Content identifier already owned by another stored law.
    #[error("Content item {doknr} already belongs to law {owner}")]
    DuplicateContentId { doknr: String, owner: String },

    /// Law not present in the store or location.
    #[error("Law not found: {0}")]
    LawNotFound(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

/// Result type alias for the gii document parser.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
