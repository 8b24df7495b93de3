//! Law assembly from a complete gii document.

use std::io::Read;
use std::path::Path;

use crate::error::{ParseError, ParseResult, Result};
use crate::gii::norm::{parse_body_norm, parse_header_norm, RawNorm};
use crate::gii::tree::build_content_tree;
use crate::types::Law;
use crate::xml::{find_children, parse_document};

/// Parse a gii document into a [`Law`].
///
/// The first `norm` below the root element describes the law, all further
/// norms are its content in document order.
///
/// # Errors
/// Any [`ParseError`]; a single malformed norm fails the whole document.
pub fn parse_law_str(xml: &str) -> ParseResult<Law> {
    let doc = parse_document(xml)?;

    let norms = find_children(doc.root_element(), "norm")
        .map(RawNorm::from_node)
        .collect::<ParseResult<Vec<_>>>()?;
    let (header, body) = norms.split_first().ok_or(ParseError::MissingHeaderNorm)?;

    let header = parse_header_norm(header)?;
    let body = body
        .iter()
        .map(parse_body_norm)
        .collect::<ParseResult<Vec<_>>>()?;
    let contents = build_content_tree(body)?;

    tracing::debug!(
        doknr = %header.doknr,
        abbreviation = %header.abbreviation,
        items = contents.len(),
        "Parsed law"
    );

    Ok(Law::new(header, contents))
}

/// Parse a gii document from a reader.
pub fn parse_law_reader(mut reader: impl Read) -> Result<Law> {
    let mut xml = String::new();
    reader.read_to_string(&mut xml)?;
    Ok(parse_law_str(&xml)?)
}

/// Parse a gii document from a file.
pub fn parse_law_file(path: &Path) -> Result<Law> {
    let xml = std::fs::read_to_string(path)?;
    Ok(parse_law_str(&xml)?)
}
