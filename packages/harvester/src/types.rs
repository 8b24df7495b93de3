//! Core data types for the harvester.
//!
//! These types represent German federal laws as published on
//! gesetze-im-internet.de and the content items they are made of.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// A publication reference (`fundstelle`) of a law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    /// Citation within the periodical (e.g., "1995, 554").
    pub reference: String,

    /// Periodical abbreviation (e.g., "BGBl II").
    pub periodical: String,
}

/// A status note (`standangabe`) of a law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Kind of status (e.g., "Stand", "Hinweis").
    pub category: String,

    /// Free text describing the status.
    pub comment: String,
}

/// Section coordinates (`gliederungseinheit`) of a norm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Hierarchical code made of 3-character groups (e.g., "020030").
    pub code: String,

    /// Display label (e.g., "Abschnitt 1").
    pub name: String,

    /// Optional section title.
    pub title: Option<String>,
}

/// Prelude texts attached to the header norm of a law.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    pub body: Option<String>,
    pub footnotes: Option<String>,
    pub documentary_footnotes: Option<String>,
}

/// Metadata of a law, taken from its first `norm` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderNorm {
    /// Document number (e.g., "BJNR055429995").
    pub doknr: String,

    /// Primary abbreviation (e.g., "SkAufG").
    pub abbreviation: String,

    /// Further abbreviations, without the primary one.
    pub extra_abbreviations: Vec<String>,

    /// Date of the original enactment (`ausfertigung-datum`).
    pub first_published: String,

    /// Build timestamp of the source document (`builddate`).
    pub source_timestamp: String,

    /// Full title (`langue`).
    pub title_long: String,

    /// Short title (`kurzue`).
    pub title_short: Option<String>,

    pub publication_info: Vec<PublicationInfo>,

    pub status_info: Vec<StatusInfo>,

    pub notes: Notes,
}

/// Text fields carried by articles and heading articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    /// Main text, with embedded markup preserved verbatim.
    pub body: Option<String>,

    /// Footnotes inside the text block.
    pub footnotes: Option<String>,

    /// Documentary footnotes (`fussnoten`).
    pub documentary_footnotes: Option<String>,
}

impl TextBody {
    /// Whether body or footnote text is present.
    ///
    /// Documentary footnotes alone do not make a heading carry prose.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.body.is_some() || self.footnotes.is_some()
    }
}

/// Variant-specific part of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum ContentKind {
    /// A single norm with prose.
    Article(TextBody),

    /// A structural heading without prose.
    Heading,

    /// A heading that also carries prose and has children.
    HeadingArticle(TextBody),
}

/// Discriminant of [`ContentKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Article,
    Heading,
    HeadingArticle,
}

impl ItemType {
    /// Get the string value used in serialized output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Heading => "heading",
            Self::HeadingArticle => "heading_article",
        }
    }

    /// Whether items of this type may be parents of other items.
    #[must_use]
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Heading | Self::HeadingArticle)
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One body norm of a law, placed in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Document number of the norm (e.g., "BJNR055429995BJNE000300000").
    pub doknr: String,

    /// Display name (e.g., "Art 1" or "Abschnitt 2").
    pub name: String,

    pub title: Option<String>,

    /// Nesting depth, 0 for top-level items.
    pub depth: usize,

    /// Document number of the parent item, `None` for top-level items.
    pub parent: Option<String>,

    #[serde(flatten)]
    pub kind: ContentKind,
}

impl ContentItem {
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        match self.kind {
            ContentKind::Article(_) => ItemType::Article,
            ContentKind::Heading => ItemType::Heading,
            ContentKind::HeadingArticle(_) => ItemType::HeadingArticle,
        }
    }

    /// Text fields, `None` for plain headings.
    #[must_use]
    pub fn text(&self) -> Option<&TextBody> {
        match &self.kind {
            ContentKind::Article(text) | ContentKind::HeadingArticle(text) => Some(text),
            ContentKind::Heading => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.text().and_then(|t| t.body.as_deref())
    }

    #[must_use]
    pub fn footnotes(&self) -> Option<&str> {
        self.text().and_then(|t| t.footnotes.as_deref())
    }

    #[must_use]
    pub fn documentary_footnotes(&self) -> Option<&str> {
        self.text().and_then(|t| t.documentary_footnotes.as_deref())
    }
}

/// A parsed law: header metadata plus its content items in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Law {
    pub doknr: String,
    pub abbreviation: String,
    pub extra_abbreviations: Vec<String>,
    pub first_published: String,
    pub source_timestamp: String,
    pub title_long: String,
    pub title_short: Option<String>,
    pub publication_info: Vec<PublicationInfo>,
    pub status_info: Vec<StatusInfo>,
    pub notes: Notes,
    pub contents: Vec<ContentItem>,
}

impl Law {
    /// Build a law from its header and content items.
    #[must_use]
    pub fn new(header: HeaderNorm, contents: Vec<ContentItem>) -> Self {
        Self {
            doknr: header.doknr,
            abbreviation: header.abbreviation,
            extra_abbreviations: header.extra_abbreviations,
            first_published: header.first_published,
            source_timestamp: header.source_timestamp,
            title_long: header.title_long,
            title_short: header.title_short,
            publication_info: header.publication_info,
            status_info: header.status_info,
            notes: header.notes,
            contents,
        }
    }

    /// URL slug derived from the primary abbreviation.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.abbreviation)
    }

    /// Find a content item by document number.
    #[must_use]
    pub fn find_item(&self, doknr: &str) -> Option<&ContentItem> {
        self.contents.iter().find(|item| item.doknr == doknr)
    }
}

/// A law as handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLaw {
    /// Catalog slug the law was ingested from (e.g., "skaufg").
    pub gii_slug: String,

    /// URL slug derived from the primary abbreviation.
    pub slug: String,

    /// Non-XML files shipped in the law archive.
    pub attachment_names: Vec<String>,

    pub law: Law,
}

impl StoredLaw {
    #[must_use]
    pub fn new(gii_slug: impl Into<String>, law: Law, attachment_names: Vec<String>) -> Self {
        Self {
            gii_slug: gii_slug.into(),
            slug: law.slug(),
            attachment_names,
            law,
        }
    }
}

/// Regex for slug generation - matches anything outside `[a-z0-9]`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]").expect("valid regex"));

/// Regex for slug generation - matches runs of underscores.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

/// Generate a URL-friendly slug from an abbreviation.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::types::slugify;
///
/// assert_eq!(slugify("SkAufG"), "skaufg");
/// assert_eq!(slugify("BÄAusbV 2004"), "baeausbv_2004");
/// assert_eq!(slugify("WiStrG 1954"), "wistrg_1954");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let text: String = text.nfc().collect::<String>().to_lowercase();
    let text = text
        .replace('ß', "ss")
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue");
    let text = SLUG_INVALID.replace_all(&text, "_");
    SLUG_UNDERSCORES.replace_all(&text, "_").into_owned()
}
