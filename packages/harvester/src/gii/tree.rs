//! Content tree construction from a flat sequence of body norms.
//!
//! Section codes (`gliederungskennzahl`) are hierarchical in groups of three
//! characters: `020030` sits below `020`. A norm's parent is the registered
//! section with the longest matching group prefix, with the empty code
//! standing for the law itself.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::SECTION_CODE_GROUP_WIDTH;
use crate::error::{ParseError, ParseResult};
use crate::gii::norm::{BodyNorm, NormKind};
use crate::types::{ContentItem, ContentKind, ItemType};

/// Sections seen so far, by code. `None` is the law root.
#[derive(Debug, Clone)]
pub struct SectionRegistry {
    by_code: HashMap<String, Option<usize>>,
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut by_code = HashMap::new();
        by_code.insert(String::new(), None);
        Self { by_code }
    }

    /// Register the item at `index` under `code`, replacing earlier entries.
    pub fn register(&mut self, code: &str, index: usize) {
        self.by_code.insert(code.to_string(), Some(index));
    }

    /// Find the parent for `code`.
    ///
    /// Tries the full code first, then drops one group at a time from the
    /// right. A trailing partial group counts as a group.
    ///
    /// # Returns
    /// Index of the parent item, or `None` for the root.
    ///
    /// # Examples
    /// ```
    /// use rechtsinfo_harvester::gii::SectionRegistry;
    ///
    /// let mut sections = SectionRegistry::new();
    /// sections.register("020", 4);
    ///
    /// assert_eq!(sections.resolve("020030").unwrap(), Some(4));
    /// assert_eq!(sections.resolve("030").unwrap(), None);
    /// ```
    pub fn resolve(&self, code: &str) -> ParseResult<Option<usize>> {
        for end in group_boundaries(code).into_iter().rev() {
            if let Some(parent) = self.by_code.get(&code[..end]) {
                return Ok(*parent);
            }
        }
        Err(ParseError::UnresolvableParentCode(code.to_string()))
    }
}

/// Byte offsets at which code prefixes end: `0`, each group end, `code.len()`.
fn group_boundaries(code: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = code
        .char_indices()
        .map(|(offset, _)| offset)
        .step_by(SECTION_CODE_GROUP_WIDTH)
        .collect();
    boundaries.push(code.len());
    boundaries.dedup();
    boundaries
}

/// Accumulates content items for one law.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    items: Vec<ContentItem>,
    sections: SectionRegistry,
    current_parent: Option<usize>,
    with_children: HashSet<usize>,
    seen: HashSet<String>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the next body norm in document order.
    ///
    /// Articles with a section code go below the matching section, others
    /// below the most recent section. Sections are placed by their own code
    /// and become the most recent section.
    pub fn push(&mut self, norm: BodyNorm) -> ParseResult<()> {
        if !self.seen.insert(norm.doknr.clone()) {
            return Err(ParseError::DuplicateIdentifier(norm.doknr));
        }

        let index = self.items.len();
        let parent = match norm.kind {
            NormKind::Article => match norm.code() {
                Some(code) => self.sections.resolve(code)?,
                None => self.current_parent,
            },
            NormKind::Section => {
                let code = norm
                    .code()
                    .ok_or_else(|| ParseError::MissingSectionInfo(norm.doknr.clone()))?;
                let parent = self.sections.resolve(code)?;
                self.sections.register(code, index);
                self.current_parent = Some(index);
                parent
            }
        };

        if let Some(parent) = parent {
            self.with_children.insert(parent);
        }

        let depth = parent.map_or(0, |p| self.items[p].depth + 1);
        let kind = match norm.kind {
            NormKind::Article => ContentKind::Article(norm.text),
            NormKind::Section if norm.text.has_text() => ContentKind::HeadingArticle(norm.text),
            NormKind::Section => ContentKind::Heading,
        };

        let item = ContentItem {
            parent: parent.map(|p| self.items[p].doknr.clone()),
            doknr: norm.doknr,
            name: norm.name,
            title: norm.title,
            depth,
            kind,
        };

        tracing::debug!(
            doknr = %item.doknr,
            item_type = %item.item_type(),
            parent = item.parent.as_deref().unwrap_or("<root>"),
            depth,
            "Placed content item"
        );

        self.items.push(item);
        Ok(())
    }

    /// Finish the tree, turning heading articles without children into articles.
    #[must_use]
    pub fn finish(mut self) -> Vec<ContentItem> {
        for (index, item) in self.items.iter_mut().enumerate() {
            if item.item_type() != ItemType::HeadingArticle || self.with_children.contains(&index) {
                continue;
            }

            let kind = std::mem::replace(&mut item.kind, ContentKind::Heading);
            item.kind = match kind {
                ContentKind::HeadingArticle(text) => ContentKind::Article(text),
                other => other,
            };
            tracing::debug!(doknr = %item.doknr, "Heading without children becomes article");
        }
        self.items
    }
}

/// Build the content tree for the body norms of one law.
///
/// # Returns
/// Content items in document order with parents and depths assigned.
pub fn build_content_tree(
    norms: impl IntoIterator<Item = BodyNorm>,
) -> ParseResult<Vec<ContentItem>> {
    let mut builder = TreeBuilder::new();
    for norm in norms {
        builder.push(norm)?;
    }
    Ok(builder.finish())
}

/// A content item with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentNode<'a> {
    #[serde(flatten)]
    pub item: &'a ContentItem,
    pub children: Vec<ContentNode<'a>>,
}

/// Rebuild the nested tree from the flat item list.
///
/// Only the `doknr`/`parent` links are used. Items whose parent is unknown
/// or does not precede them are treated as top-level items.
pub fn nest_contents(items: &[ContentItem]) -> Vec<ContentNode<'_>> {
    let index_of: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (item.doknr.as_str(), index))
        .collect();

    let mut child_indices: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match item
            .parent
            .as_deref()
            .and_then(|parent| index_of.get(parent))
        {
            Some(&parent) if parent < index => child_indices[parent].push(index),
            _ => roots.push(index),
        }
    }

    // Children always come after their parent, so building back to front
    // finds every child already built.
    let mut built: Vec<Option<ContentNode<'_>>> = vec![None; items.len()];
    for index in (0..items.len()).rev() {
        let children = child_indices[index]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(ContentNode {
            item: &items[index],
            children,
        });
    }

    roots
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SectionInfo, TextBody};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn article(doknr: &str, code: Option<&str>) -> BodyNorm {
        BodyNorm {
            doknr: doknr.to_string(),
            kind: NormKind::Article,
            name: doknr.to_string(),
            title: None,
            section: code.map(|code| SectionInfo {
                code: code.to_string(),
                name: String::new(),
                title: None,
            }),
            text: TextBody {
                body: Some("<P>Text</P>".to_string()),
                ..TextBody::default()
            },
        }
    }

    fn section(doknr: &str, code: &str, body: Option<&str>) -> BodyNorm {
        BodyNorm {
            doknr: doknr.to_string(),
            kind: NormKind::Section,
            name: doknr.to_string(),
            title: None,
            section: Some(SectionInfo {
                code: code.to_string(),
                name: doknr.to_string(),
                title: None,
            }),
            text: TextBody {
                body: body.map(String::from),
                ..TextBody::default()
            },
        }
    }

    fn summary(items: &[ContentItem]) -> Vec<(&str, ItemType, usize, Option<&str>)> {
        items
            .iter()
            .map(|i| (i.doknr.as_str(), i.item_type(), i.depth, i.parent.as_deref()))
            .collect()
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let mut sections = SectionRegistry::new();
        sections.register("020", 0);
        sections.register("020010", 1);

        assert_eq!(sections.resolve("020030").unwrap(), Some(0));
        assert_eq!(sections.resolve("020010005").unwrap(), Some(1));
        assert_eq!(sections.resolve("020010").unwrap(), Some(1));
        assert_eq!(sections.resolve("010").unwrap(), None);
        assert_eq!(sections.resolve("").unwrap(), None);
    }

    #[test]
    fn test_resolve_partial_trailing_group() {
        let mut sections = SectionRegistry::new();
        sections.register("020", 3);

        assert_eq!(sections.resolve("0201").unwrap(), Some(3));
        assert_eq!(sections.resolve("02").unwrap(), None);
    }

    #[test]
    fn test_group_boundaries() {
        assert_eq!(group_boundaries(""), vec![0]);
        assert_eq!(group_boundaries("020"), vec![0, 3]);
        assert_eq!(group_boundaries("020030"), vec![0, 3, 6]);
        assert_eq!(group_boundaries("0203"), vec![0, 3, 4]);
    }

    #[test]
    fn test_article_follows_current_section() {
        let items = build_content_tree(vec![
            section("A", "020", None),
            article("a1", None),
        ])
        .unwrap();

        assert_eq!(
            summary(&items),
            vec![
                ("A", ItemType::Heading, 0, None),
                ("a1", ItemType::Article, 1, Some("A")),
            ]
        );
    }

    #[test]
    fn test_article_code_overrides_current_section() {
        let items = build_content_tree(vec![
            section("A", "010", None),
            section("B", "020", None),
            article("a1", Some("010")),
        ])
        .unwrap();

        assert_eq!(items[2].parent.as_deref(), Some("A"));
        assert_eq!(items[2].depth, 1);
    }

    #[test]
    fn test_section_placed_by_code_not_predecessor() {
        let items = build_content_tree(vec![
            section("A", "010", None),
            section("A1", "010010", None),
            section("B", "020", None),
            article("b1", None),
        ])
        .unwrap();

        assert_eq!(
            summary(&items),
            vec![
                ("A", ItemType::Heading, 0, None),
                ("A1", ItemType::Heading, 1, Some("A")),
                ("B", ItemType::Heading, 0, None),
                ("b1", ItemType::Article, 1, Some("B")),
            ]
        );
    }

    #[test]
    fn test_heading_article_downgraded_without_children() {
        let items = build_content_tree(vec![
            section("A", "010", Some("<P>Prosa</P>")),
            section("B", "020", Some("<P>Prosa</P>")),
            article("b1", Some("020")),
        ])
        .unwrap();

        assert_eq!(items[0].item_type(), ItemType::Article);
        assert_eq!(items[0].body(), Some("<P>Prosa</P>"));
        assert_eq!(items[1].item_type(), ItemType::HeadingArticle);
    }

    #[test]
    fn test_heading_with_footnotes_is_heading_article() {
        let mut norm = section("A", "010", None);
        norm.text.footnotes = Some("<P>Fn</P>".to_string());

        let items = build_content_tree(vec![norm, article("a1", None)]).unwrap();
        assert_eq!(items[0].item_type(), ItemType::HeadingArticle);
        assert_eq!(items[0].footnotes(), Some("<P>Fn</P>"));
    }

    #[test]
    fn test_duplicate_identifier() {
        let err = build_content_tree(vec![article("a1", None), article("a1", None)]).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateIdentifier(ref d) if d == "a1"));
    }

    #[test]
    fn test_empty_article_code_uses_current_parent() {
        let items = build_content_tree(vec![
            section("A", "010", None),
            article("a1", Some("")),
        ])
        .unwrap();
        assert_eq!(items[1].parent.as_deref(), Some("A"));
    }

    #[test]
    fn test_nest_contents() {
        let items = build_content_tree(vec![
            article("pre", None),
            section("A", "010", None),
            article("a1", None),
            section("A1", "010010", None),
            article("a11", None),
            section("B", "020", None),
        ])
        .unwrap();

        let tree = nest_contents(&items);
        let roots: Vec<_> = tree.iter().map(|n| n.item.doknr.as_str()).collect();
        assert_eq!(roots, vec!["pre", "A", "B"]);

        let a = &tree[1];
        let children: Vec<_> = a.children.iter().map(|n| n.item.doknr.as_str()).collect();
        assert_eq!(children, vec!["a1", "A1"]);
        assert_eq!(a.children[1].children[0].item.doknr, "a11");
        assert!(tree[2].children.is_empty());
    }

    #[test]
    fn test_nest_contents_unknown_parent_is_root() {
        let mut items = build_content_tree(vec![article("a1", None)]).unwrap();
        items[0].parent = Some("missing".to_string());

        let tree = nest_contents(&items);
        assert_eq!(tree.len(), 1);
    }

    /// Section code of one to three groups, or up to three for articles.
    fn code(min_groups: usize) -> impl Strategy<Value = String> {
        prop::collection::vec(prop_oneof![Just("010"), Just("020"), Just("030")], min_groups..=3)
            .prop_map(|groups| groups.concat())
    }

    /// `(is_section, code, has_text)` for one body norm.
    fn norm_shape() -> impl Strategy<Value = (bool, String, bool)> {
        prop_oneof![
            (code(1), any::<bool>()).prop_map(|(code, text)| (true, code, text)),
            code(0).prop_map(|code| (false, code, true)),
        ]
    }

    fn norms_from(shapes: &[(bool, String, bool)]) -> Vec<BodyNorm> {
        shapes
            .iter()
            .enumerate()
            .map(|(index, (is_section, code, has_text))| {
                let doknr = format!("N{index}");
                if *is_section {
                    section(&doknr, code, has_text.then_some("<P>Prosa</P>"))
                } else {
                    article(&doknr, Some(code.as_str()))
                }
            })
            .collect()
    }

    fn node_count(nodes: &[ContentNode<'_>]) -> usize {
        nodes.iter().map(|node| 1 + node_count(&node.children)).sum()
    }

    proptest! {
        #[test]
        fn tree_links_point_backwards_to_headings(
            shapes in prop::collection::vec(norm_shape(), 0..40)
        ) {
            let items = build_content_tree(norms_from(&shapes)).unwrap();
            prop_assert_eq!(items.len(), shapes.len());

            let position: HashMap<&str, usize> = items
                .iter()
                .enumerate()
                .map(|(index, item)| (item.doknr.as_str(), index))
                .collect();

            for (index, item) in items.iter().enumerate() {
                prop_assert_eq!(&item.doknr, &format!("N{index}"));
                match item.parent.as_deref() {
                    None => prop_assert_eq!(item.depth, 0),
                    Some(parent) => {
                        let parent_index = position[parent];
                        let parent_item = &items[parent_index];
                        prop_assert!(parent_index < index);
                        prop_assert!(shapes[parent_index].0);
                        prop_assert_ne!(parent_item.item_type(), ItemType::Article);
                        prop_assert_eq!(item.depth, parent_item.depth + 1);
                    }
                }
            }
        }

        #[test]
        fn section_parent_code_is_group_prefix(
            shapes in prop::collection::vec(norm_shape(), 0..40)
        ) {
            let items = build_content_tree(norms_from(&shapes)).unwrap();

            for (index, item) in items.iter().enumerate() {
                let (is_section, code, _) = &shapes[index];
                if !*is_section {
                    continue;
                }
                if let Some(parent) = item.parent.as_deref() {
                    let parent_index = items.iter().position(|i| i.doknr == parent).unwrap();
                    let parent_code = &shapes[parent_index].1;
                    prop_assert!(code.starts_with(parent_code.as_str()));
                    prop_assert_eq!(parent_code.len() % SECTION_CODE_GROUP_WIDTH, 0);
                }
            }
        }

        #[test]
        fn item_types_follow_text_and_children(
            shapes in prop::collection::vec(norm_shape(), 0..40)
        ) {
            let items = build_content_tree(norms_from(&shapes)).unwrap();
            let parents: HashSet<&str> = items.iter().filter_map(|i| i.parent.as_deref()).collect();

            for (item, (is_section, _, has_text)) in items.iter().zip(&shapes) {
                let has_children = parents.contains(item.doknr.as_str());
                let expected = match (is_section, has_text, has_children) {
                    (false, _, _) => ItemType::Article,
                    (true, false, _) => ItemType::Heading,
                    (true, true, true) => ItemType::HeadingArticle,
                    (true, true, false) => ItemType::Article,
                };
                prop_assert_eq!(item.item_type(), expected);
            }
        }

        #[test]
        fn nesting_covers_every_item(
            shapes in prop::collection::vec(norm_shape(), 0..40)
        ) {
            let items = build_content_tree(norms_from(&shapes)).unwrap();
            let tree = nest_contents(&items);

            prop_assert_eq!(node_count(&tree), items.len());
            prop_assert!(tree.iter().all(|node| node.item.parent.is_none()));
        }
    }
}
