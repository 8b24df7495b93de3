//! Classification and field extraction for single `norm` elements.

use roxmltree::Node;

use crate::config::{ARTICLE_MARKER, SECTION_MARKER};
use crate::error::{ParseError, ParseResult};
use crate::gii::metadata::{
    optional_child_text, parse_abbreviations, parse_publication_info, parse_section_info,
    parse_status_info,
};
use crate::gii::text::{content_text, text};
use crate::types::{HeaderNorm, Notes, SectionInfo, TextBody};
use crate::xml::{find_all_by_path, find_child, get_attribute};

/// Shape of a body norm, derived from its document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormKind {
    /// Single norm (`...NE...`).
    Article,

    /// Structural group (`...NG...`).
    Section,
}

/// Classify a norm by its document number.
///
/// # Errors
/// [`ParseError::UnknownNormShape`] when neither marker is present.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::gii::{classify, NormKind};
///
/// assert_eq!(classify("BJNR055429995BJNE000700305").unwrap(), NormKind::Article);
/// assert_eq!(classify("BJNR055429995BJNG000200305").unwrap(), NormKind::Section);
/// assert!(classify("BJNR055429995").is_err());
/// ```
pub fn classify(doknr: &str) -> ParseResult<NormKind> {
    if doknr.contains(ARTICLE_MARKER) {
        Ok(NormKind::Article)
    } else if doknr.contains(SECTION_MARKER) {
        Ok(NormKind::Section)
    } else {
        Err(ParseError::UnknownNormShape(doknr.to_string()))
    }
}

/// One `norm` element with its identifying attributes.
#[derive(Debug, Clone, Copy)]
pub struct RawNorm<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub doknr: &'a str,
    pub builddate: Option<&'a str>,
    pub metadata: Option<Node<'a, 'input>>,
    pub textdata: Option<Node<'a, 'input>>,
}

impl<'a, 'input> RawNorm<'a, 'input> {
    /// Wrap a `norm` element.
    ///
    /// # Errors
    /// [`ParseError::MissingField`] when the `doknr` attribute is absent.
    pub fn from_node(node: Node<'a, 'input>) -> ParseResult<Self> {
        let doknr = get_attribute(node, "doknr").ok_or_else(|| ParseError::MissingField {
            field: "doknr",
            doknr: format!("at byte {}", node.range().start),
        })?;

        Ok(Self {
            node,
            doknr,
            builddate: get_attribute(node, "builddate"),
            metadata: find_child(node, "metadaten"),
            textdata: find_child(node, "textdaten"),
        })
    }

    /// Text of a single `metadaten` child.
    pub fn metadata_text(&self, tag: &str) -> ParseResult<Option<String>> {
        match self.metadata {
            Some(metadata) => optional_child_text(metadata, tag),
            None => Ok(None),
        }
    }

    fn require_metadata_text(&self, tag: &'static str) -> ParseResult<String> {
        self.metadata_text(tag)?
            .ok_or_else(|| self.missing(tag))
    }

    fn require_metadata(&self) -> ParseResult<Node<'a, 'input>> {
        self.metadata.ok_or_else(|| self.missing("metadaten"))
    }

    fn missing(&self, field: &'static str) -> ParseError {
        ParseError::MissingField {
            field,
            doknr: self.doknr.to_string(),
        }
    }
}

/// Body and footnotes from `textdaten/text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextContent {
    pub body: Option<String>,
    pub footnotes: Option<String>,
}

/// Parse the `textdaten/text` element of a norm.
///
/// `decorated` texts are layout-only and must be empty. `XML` texts carry
/// either a `Content` or a `TOC` section plus optional `Footnotes`.
pub fn parse_text(norm: &RawNorm<'_, '_>) -> ParseResult<TextContent> {
    let elements = find_all_by_path(norm.node, "textdaten/text");
    let element = match elements.as_slice() {
        [] => return Ok(TextContent::default()),
        [element] => *element,
        _ => {
            return Err(ParseError::MultipleValues {
                element: "textdaten/text".to_string(),
                count: elements.len(),
            })
        }
    };

    match get_attribute(element, "format") {
        Some("decorated") => {
            if text(&[element])?.is_some() {
                return Err(ParseError::DecoratedTextWithContent(norm.doknr.to_string()));
            }
            Ok(TextContent::default())
        }
        Some("XML") => {
            let content = content_text(&find_all_by_path(element, "Content"))?;
            let toc = text(&find_all_by_path(element, "TOC"))?;
            if content.is_some() && toc.is_some() {
                return Err(ParseError::ConflictingTextSections(norm.doknr.to_string()));
            }

            Ok(TextContent {
                body: content.or(toc),
                footnotes: text(&find_all_by_path(element, "Footnotes"))?,
            })
        }
        other => Err(ParseError::UnsupportedTextFormat(other.map(String::from))),
    }
}

/// Parse `textdaten/fussnoten/Content`, mapping placeholders to `None`.
pub fn parse_documentary_footnotes(norm: &RawNorm<'_, '_>) -> ParseResult<Option<String>> {
    content_text(&find_all_by_path(norm.node, "textdaten/fussnoten/Content"))
}

/// Parse the header norm of a law.
///
/// # Errors
/// [`ParseError::MissingField`] when `builddate`, `langue` or
/// `ausfertigung-datum` is absent, plus any text or abbreviation error.
pub fn parse_header_norm(norm: &RawNorm<'_, '_>) -> ParseResult<HeaderNorm> {
    let metadata = norm.require_metadata()?;
    let abbreviations = parse_abbreviations(metadata, norm.doknr)?;
    let text = parse_text(norm)?;

    Ok(HeaderNorm {
        doknr: norm.doknr.to_string(),
        abbreviation: abbreviations.primary,
        extra_abbreviations: abbreviations.extra,
        first_published: norm.require_metadata_text("ausfertigung-datum")?,
        source_timestamp: norm
            .builddate
            .map(String::from)
            .ok_or_else(|| norm.missing("builddate"))?,
        title_long: norm.require_metadata_text("langue")?,
        title_short: norm.metadata_text("kurzue")?,
        publication_info: parse_publication_info(metadata)?,
        status_info: parse_status_info(metadata)?,
        notes: Notes {
            body: text.body,
            footnotes: text.footnotes,
            documentary_footnotes: parse_documentary_footnotes(norm)?,
        },
    })
}

/// A classified body norm, ready for tree placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyNorm {
    pub doknr: String,
    pub kind: NormKind,
    pub name: String,
    pub title: Option<String>,
    pub section: Option<SectionInfo>,
    pub text: TextBody,
}

impl BodyNorm {
    /// Section code, if one is present and non-empty.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.section
            .as_ref()
            .map(|section| section.code.as_str())
            .filter(|code| !code.is_empty())
    }
}

/// Parse a body norm.
///
/// Articles take their name from `enbez` and title from `titel`, sections
/// from their `gliederungseinheit`.
///
/// # Errors
/// [`ParseError::UnknownNormShape`] for unclassifiable norms and
/// [`ParseError::MissingSectionInfo`] for sections without a code.
pub fn parse_body_norm(norm: &RawNorm<'_, '_>) -> ParseResult<BodyNorm> {
    let kind = classify(norm.doknr)?;
    let section = match norm.metadata {
        Some(metadata) => parse_section_info(metadata)?,
        None => None,
    };

    let text = parse_text(norm)?;
    let text = TextBody {
        body: text.body,
        footnotes: text.footnotes,
        documentary_footnotes: parse_documentary_footnotes(norm)?,
    };

    let (name, title) = match kind {
        NormKind::Article => (
            norm.metadata_text("enbez")?.unwrap_or_default(),
            norm.metadata_text("titel")?,
        ),
        NormKind::Section => match &section {
            Some(info) if !info.code.is_empty() => (info.name.clone(), info.title.clone()),
            _ => return Err(ParseError::MissingSectionInfo(norm.doknr.to_string())),
        },
    };

    Ok(BodyNorm {
        doknr: norm.doknr.to_string(),
        kind,
        name,
        title,
        section,
        text,
    })
}
