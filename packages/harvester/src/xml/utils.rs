//! XML utility functions for navigating gii documents and writing markup back out.

use roxmltree::{Document, Node, NodeType, ParsingOptions};

/// Namespace bound to the reserved `xml` prefix.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse an XML document, allowing a DOCTYPE declaration.
///
/// Every gii document starts with `<!DOCTYPE dokumente SYSTEM ...>`, which
/// roxmltree rejects under its default options.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::xml::parse_document;
///
/// let xml = r#"<!DOCTYPE dokumente SYSTEM "gii-norm.dtd"><dokumente/>"#;
/// let doc = parse_document(xml).unwrap();
/// assert_eq!(doc.root_element().tag_name().name(), "dokumente");
/// ```
pub fn parse_document(xml: &str) -> Result<Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options)
}

/// Get the tag name without namespace prefix.
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
///
/// # Arguments
/// * `node` - Parent node to search in
/// * `tag` - Tag name to search for
///
/// # Returns
/// First matching child element, or `None` if not found
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use rechtsinfo_harvester::xml::find_child;
///
/// let xml = r#"<metadaten><jurabk>SkAufG</jurabk></metadaten>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "jurabk").is_some());
/// assert!(find_child(root, "amtabk").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find every descendant element matching a path of tag names.
///
/// Each step fans out over all matching children, so `fundstelle/periodikum`
/// yields the `periodikum` of every `fundstelle`.
/// Results are in document order.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use rechtsinfo_harvester::xml::find_all_by_path;
///
/// let xml = r#"<m><f><p>a</p></f><f><p>b</p><p>c</p></f></m>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let found: Vec<_> = find_all_by_path(doc.root_element(), "f/p")
///     .into_iter()
///     .filter_map(|n| n.text())
///     .collect();
/// assert_eq!(found, vec!["a", "b", "c"]);
/// ```
pub fn find_all_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];

    for part in path.split('/') {
        current = current
            .into_iter()
            .flat_map(|parent| {
                parent
                    .children()
                    .filter(|child| child.is_element() && get_tag_name(*child) == part)
            })
            .collect();
    }

    current
}

/// Get the text content of a node, trimmed.
///
/// # Returns
/// Trimmed text content, or empty string if no text
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Get an attribute value from a node.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Serialize the content of an element back to markup.
///
/// Text, child elements, comments and processing instructions are written
/// in document order. The element's own tags are not included.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use rechtsinfo_harvester::xml::inner_markup;
///
/// let xml = r#"<Content><P>(1) Text<BR/>mehr</P></Content>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(inner_markup(doc.root_element()), "<P>(1) Text<BR/>mehr</P>");
/// ```
pub fn inner_markup(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: Node<'_, '_>, out: &mut String) {
    match node.node_type() {
        NodeType::Element => write_element(node, out),
        NodeType::Text => escape_into(node.text().unwrap_or_default(), false, out),
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(node.text().unwrap_or_default());
            out.push_str("-->");
        }
        NodeType::PI => {
            if let Some(pi) = node.pi() {
                out.push_str("<?");
                out.push_str(pi.target);
                if let Some(value) = pi.value {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push_str("?>");
            }
        }
        NodeType::Root => {
            for child in node.children() {
                write_node(child, out);
            }
        }
    }
}

fn write_element(node: Node<'_, '_>, out: &mut String) {
    let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());

    out.push('<');
    out.push_str(&name);
    for attr in node.attributes() {
        out.push(' ');
        out.push_str(&qualified_name(node, attr.namespace(), attr.name()));
        out.push_str("=\"");
        escape_into(attr.value(), true, out);
        out.push('"');
    }

    if node.has_children() {
        out.push('>');
        for child in node.children() {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    } else {
        out.push_str("/>");
    }
}

fn qualified_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NAMESPACE) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_with_doctype() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE dokumente SYSTEM "http://www.gesetze-im-internet.de/dtd/1.01/gii-norm.dtd">
<dokumente builddate="20200722212521" doknr="BJNR055429995"><norm/></dokumente>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "dokumente");
        assert_eq!(
            get_attribute(doc.root_element(), "doknr"),
            Some("BJNR055429995")
        );
    }

    #[test]
    fn test_find_child() {
        let xml = r#"<norm><metadaten/><textdaten/></norm>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert!(find_child(root, "metadaten").is_some());
        assert!(find_child(root, "textdaten").is_some());
        assert!(find_child(root, "fussnoten").is_none());
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<metadaten><jurabk>A</jurabk><amtabk>B</amtabk><jurabk>C</jurabk></metadaten>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();

        let found: Vec<_> = find_children(doc.root_element(), "jurabk").collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_find_all_by_path_empty_when_missing() {
        let xml = r#"<metadaten><jurabk>A</jurabk></metadaten>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();

        assert!(find_all_by_path(doc.root_element(), "fundstelle/periodikum").is_empty());
    }

    #[test]
    fn test_get_text() {
        let xml = r#"<enbez>  Art 1  </enbez>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "Art 1");
    }

    #[test]
    fn test_inner_markup_keeps_mixed_content() {
        let xml = r#"<Content>vor <B>fett</B> nach<BR/>ende</Content>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(
            inner_markup(doc.root_element()),
            "vor <B>fett</B> nach<BR/>ende"
        );
    }

    #[test]
    fn test_inner_markup_keeps_xml_prefix() {
        let xml = r#"<Content><pre xml:space="preserve">(+++ x +++)<BR/></pre></Content>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(
            inner_markup(doc.root_element()),
            r#"<pre xml:space="preserve">(+++ x +++)<BR/></pre>"#
        );
    }

    #[test]
    fn test_inner_markup_escapes() {
        let xml = r#"<Content><A href="a?b=1&amp;c=&quot;2&quot;">x &lt; y &amp; z</A></Content>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(
            inner_markup(doc.root_element()),
            r#"<A href="a?b=1&amp;c=&quot;2&quot;">x &lt; y &amp; z</A>"#
        );
    }

    #[test]
    fn test_inner_markup_comment_and_pi() {
        let xml = r#"<Content><!-- note --><?page 12?>text</Content>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(
            inner_markup(doc.root_element()),
            "<!-- note --><?page 12?>text"
        );
    }

    #[test]
    fn test_inner_markup_empty_element() {
        let xml = r#"<Content><P/></Content>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(inner_markup(doc.root_element()), "<P/>");
    }
}
