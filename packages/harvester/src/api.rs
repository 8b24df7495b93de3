//! JSON documents in the shape served by the read API.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::types::{ContentItem, ItemType, Law, Notes, PublicationInfo, StatusInfo};

/// Top-level API document.
#[derive(Debug, Serialize)]
pub struct ApiDocument<'a> {
    pub data: ApiLaw<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLaw<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'a str,
    pub abbreviation: &'a str,
    pub extra_abbreviations: &'a [String],
    pub first_published: &'a str,
    pub source_timestamp: &'a str,
    pub title_long: &'a str,
    pub title_short: Option<&'a str>,
    pub publication_info: &'a [PublicationInfo],
    pub status_info: &'a [StatusInfo],
    pub notes: ApiNotes<'a>,
    pub contents: Vec<ApiContentItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotes<'a> {
    pub body: Option<&'a str>,
    pub footnotes: Option<&'a str>,
    pub documentary_footnotes: Option<&'a str>,
}

impl<'a> From<&'a Notes> for ApiNotes<'a> {
    fn from(notes: &'a Notes) -> Self {
        Self {
            body: notes.body.as_deref(),
            footnotes: notes.footnotes.as_deref(),
            documentary_footnotes: notes.documentary_footnotes.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiContentItem<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'a str,
    pub title: Option<&'a str>,
    #[serde(flatten)]
    pub text: Option<ApiText<'a>>,
    pub content_level: usize,
    pub parent: Option<ApiReference<'a>>,
}

/// Text fields, present for articles and heading articles only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiText<'a> {
    pub body: Option<&'a str>,
    pub footnotes: Option<&'a str>,
    pub documentary_footnotes: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ApiReference<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'a str,
}

/// API name of an item type.
#[must_use]
pub fn api_type_name(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Article => "article",
        ItemType::Heading => "heading",
        ItemType::HeadingArticle => "headingArticle",
    }
}

/// Build the API document for a law.
#[must_use]
pub fn law_to_api_document(law: &Law) -> ApiDocument<'_> {
    let types: HashMap<&str, ItemType> = law
        .contents
        .iter()
        .map(|item| (item.doknr.as_str(), item.item_type()))
        .collect();

    let contents = law
        .contents
        .iter()
        .map(|item| content_item(item, &types))
        .collect();

    ApiDocument {
        data: ApiLaw {
            kind: "law",
            id: &law.doknr,
            abbreviation: &law.abbreviation,
            extra_abbreviations: &law.extra_abbreviations,
            first_published: &law.first_published,
            source_timestamp: &law.source_timestamp,
            title_long: &law.title_long,
            title_short: law.title_short.as_deref(),
            publication_info: &law.publication_info,
            status_info: &law.status_info,
            notes: ApiNotes::from(&law.notes),
            contents,
        },
    }
}

fn content_item<'a>(item: &'a ContentItem, types: &HashMap<&str, ItemType>) -> ApiContentItem<'a> {
    let parent = item.parent.as_deref().map(|id| ApiReference {
        kind: types
            .get(id)
            .map_or("heading", |item_type| api_type_name(*item_type)),
        id,
    });

    ApiContentItem {
        id: &item.doknr,
        kind: api_type_name(item.item_type()),
        name: &item.name,
        title: item.title.as_deref(),
        text: item.text().map(|text| ApiText {
            body: text.body.as_deref(),
            footnotes: text.footnotes.as_deref(),
            documentary_footnotes: text.documentary_footnotes.as_deref(),
        }),
        content_level: item.depth,
        parent,
    }
}

/// Serialize a law as API JSON.
///
/// # Arguments
/// * `law` - The law to serialize
/// * `pretty` - Indent the output
pub fn law_to_api_json(law: &Law, pretty: bool) -> Result<String> {
    let document = law_to_api_document(law);
    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(json)
}
