//! Text extraction from gii elements.
//!
//! Body texts contain presentation markup (`P`, `BR`, `DL`, `pre`, ...) that
//! is carried through verbatim as a string.

use roxmltree::Node;

use crate::error::{ParseError, ParseResult};
use crate::xml::{get_tag_name, inner_markup};

/// Content that marks an otherwise empty text section.
pub const EMPTY_CONTENT_PATTERNS: [&str; 2] = ["<P/>", "<P>-</P>"];

/// Extract the markup of each element, trimmed.
///
/// Empty strings are kept, so the result has one entry per element.
pub fn texts(elements: &[Node<'_, '_>]) -> Vec<String> {
    elements
        .iter()
        .map(|element| inner_markup(*element).trim().to_string())
        .collect()
}

/// Extract the markup of a single element.
///
/// # Returns
/// `None` when no element is given or the trimmed text is empty.
///
/// # Errors
/// [`ParseError::MultipleValues`] when more than one element is given.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use rechtsinfo_harvester::gii::text;
///
/// let doc = Document::parse("<Content> <P>Text</P> </Content>").unwrap();
/// let value = text(&[doc.root_element()]).unwrap();
/// assert_eq!(value.as_deref(), Some("<P>Text</P>"));
/// assert_eq!(text(&[]).unwrap(), None);
/// ```
pub fn text(elements: &[Node<'_, '_>]) -> ParseResult<Option<String>> {
    match elements {
        [] => Ok(None),
        [element] => {
            let value = inner_markup(*element);
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        [first, ..] => Err(ParseError::MultipleValues {
            element: get_tag_name(*first).to_string(),
            count: elements.len(),
        }),
    }
}

/// Extract a `Content` section, mapping the empty placeholders to `None`.
pub fn content_text(elements: &[Node<'_, '_>]) -> ParseResult<Option<String>> {
    Ok(text(elements)?.filter(|value| !EMPTY_CONTENT_PATTERNS.contains(&value.as_str())))
}
