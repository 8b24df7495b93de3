//! Parser for the gii-norm XML format of gesetze-im-internet.de.
//!
//! A document is a `dokumente` element with one header `norm` followed by
//! the body norms of the law. The parser classifies each norm, extracts its
//! metadata and text, and places it in the content tree.

mod law;
mod metadata;
mod norm;
mod text;
mod tree;

pub use law::{parse_law_file, parse_law_reader, parse_law_str};
pub use metadata::{
    parse_abbreviations, parse_publication_info, parse_section_info, parse_status_info,
    Abbreviations,
};
pub use norm::{
    classify, parse_body_norm, parse_documentary_footnotes, parse_header_norm, parse_text,
    BodyNorm, NormKind, RawNorm, TextContent,
};
pub use text::{content_text, text, texts, EMPTY_CONTENT_PATTERNS};
pub use tree::{build_content_tree, nest_contents, ContentNode, SectionRegistry, TreeBuilder};
