//! Structured fields from a norm's `metadaten` block.

use roxmltree::Node;

use crate::error::{ParseError, ParseResult};
use crate::gii::text::{text, texts};
use crate::types::{PublicationInfo, SectionInfo, StatusInfo};
use crate::xml::{find_all_by_path, find_child, find_children};

/// Primary and further abbreviations of a law.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviations {
    pub primary: String,
    pub extra: Vec<String>,
}

/// Collect official (`amtabk`) then juristic (`jurabk`) abbreviations.
///
/// Empty values are dropped and duplicates removed, keeping the first
/// occurrence. The first remaining value is the primary abbreviation.
///
/// # Arguments
/// * `metadata` - The `metadaten` element of a norm
/// * `doknr` - Document number, for error reporting
///
/// # Errors
/// [`ParseError::EmptyAbbreviationSet`] when no abbreviation remains.
pub fn parse_abbreviations(metadata: Node<'_, '_>, doknr: &str) -> ParseResult<Abbreviations> {
    let official: Vec<_> = find_children(metadata, "amtabk").collect();
    let juristic: Vec<_> = find_children(metadata, "jurabk").collect();

    let mut unique: Vec<String> = Vec::new();
    for abbreviation in texts(&official).into_iter().chain(texts(&juristic)) {
        if !abbreviation.is_empty() && !unique.contains(&abbreviation) {
            unique.push(abbreviation);
        }
    }

    let mut values = unique.into_iter();
    let primary = values
        .next()
        .ok_or_else(|| ParseError::EmptyAbbreviationSet(doknr.to_string()))?;

    Ok(Abbreviations {
        primary,
        extra: values.collect(),
    })
}

/// Parse all `fundstelle` entries.
pub fn parse_publication_info(metadata: Node<'_, '_>) -> ParseResult<Vec<PublicationInfo>> {
    find_children(metadata, "fundstelle")
        .map(|entry| {
            Ok(PublicationInfo {
                reference: child_text(entry, "zitstelle")?,
                periodical: child_text(entry, "periodikum")?,
            })
        })
        .collect()
}

/// Parse all `standangabe` entries.
pub fn parse_status_info(metadata: Node<'_, '_>) -> ParseResult<Vec<StatusInfo>> {
    find_children(metadata, "standangabe")
        .map(|entry| {
            Ok(StatusInfo {
                category: child_text(entry, "standtyp")?,
                comment: child_text(entry, "standkommentar")?,
            })
        })
        .collect()
}

/// Parse the `gliederungseinheit` block, if present.
///
/// A missing code or label becomes an empty string, a missing title `None`.
pub fn parse_section_info(metadata: Node<'_, '_>) -> ParseResult<Option<SectionInfo>> {
    let Some(unit) = find_child(metadata, "gliederungseinheit") else {
        return Ok(None);
    };

    Ok(Some(SectionInfo {
        code: child_text(unit, "gliederungskennzahl")?,
        name: child_text(unit, "gliederungsbez")?,
        title: optional_child_text(unit, "gliederungstitel")?,
    }))
}

/// Text of the single child with the given tag, `None` when absent or empty.
pub fn optional_child_text(node: Node<'_, '_>, tag: &str) -> ParseResult<Option<String>> {
    text(&find_all_by_path(node, tag))
}

fn child_text(node: Node<'_, '_>, tag: &str) -> ParseResult<String> {
    Ok(optional_child_text(node, tag)?.unwrap_or_default())
}
