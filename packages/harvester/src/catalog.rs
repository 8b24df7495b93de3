//! Remote law catalog (`gii-toc.xml`) and archive downloads.

use std::collections::BTreeMap;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::config::validate_slug;
use crate::error::{HarvesterError, Result};
use crate::http::{create_client, download_bytes, download_with_timestamp, fetch_last_modified};
use crate::xml::{find_all_by_path, get_text};

/// Catalog slug → archive download URL, ordered by slug.
pub type Toc = BTreeMap<String, String>;

/// A downloaded law archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// URL the archive was downloaded from.
    pub url: String,

    /// Zip file contents.
    pub bytes: Vec<u8>,

    /// `Last-Modified` of the download as `YYYYMMDD`.
    pub last_modified: String,
}

/// Source of law archives.
pub trait Catalog {
    /// Fetch the list of all published laws.
    fn fetch_toc(&self) -> Result<Toc>;

    /// Fetch the `YYYYMMDD` last-modified stamp of an archive.
    fn last_modified(&self, url: &str) -> Result<String>;

    /// Download an archive.
    fn fetch_archive(&self, url: &str) -> Result<Archive>;
}

/// Catalog backed by gesetze-im-internet.de.
pub struct HttpCatalog {
    client: Client,
    toc_url: String,
}

impl HttpCatalog {
    pub fn new(toc_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            toc_url: toc_url.into(),
        })
    }

    #[must_use]
    pub fn toc_url(&self) -> &str {
        &self.toc_url
    }
}

impl Catalog for HttpCatalog {
    fn fetch_toc(&self) -> Result<Toc> {
        let bytes = download_bytes(&self.client, &self.toc_url)?;
        let xml = String::from_utf8_lossy(&bytes);
        let toc = parse_toc(&xml)?;
        tracing::info!(url = %self.toc_url, laws = toc.len(), "Fetched catalog");
        Ok(toc)
    }

    fn last_modified(&self, url: &str) -> Result<String> {
        fetch_last_modified(&self.client, url)
    }

    fn fetch_archive(&self, url: &str) -> Result<Archive> {
        let download = download_with_timestamp(&self.client, url)?;
        Ok(Archive {
            url: url.to_string(),
            bytes: download.bytes,
            last_modified: download.last_modified,
        })
    }
}

/// Parse the catalog XML (`/items/item/link`).
///
/// Entries whose link yields no usable slug are skipped with a warning.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::catalog::parse_toc;
///
/// let xml = r#"<items><item><title>SkAufG</title>
///   <link>http://www.gesetze-im-internet.de/skaufg/xml.zip</link></item></items>"#;
/// let toc = parse_toc(xml).unwrap();
/// assert_eq!(toc["skaufg"], "http://www.gesetze-im-internet.de/skaufg/xml.zip");
/// ```
pub fn parse_toc(xml: &str) -> Result<Toc> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "items" {
        return Err(HarvesterError::InvalidCatalogEntry(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let mut toc = Toc::new();
    for link in find_all_by_path(root, "item/link") {
        let url = get_text(link);
        match slug_from_url(&url) {
            Ok(slug) => {
                toc.insert(slug, url);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping catalog entry"),
        }
    }
    Ok(toc)
}

/// Extract the slug from an archive URL (`.../<slug>/xml.zip`).
pub fn slug_from_url(url: &str) -> Result<String> {
    let invalid = || HarvesterError::InvalidCatalogEntry(url.to_string());

    let parsed = Url::parse(url).map_err(|_| invalid())?;
    let segments: Vec<&str> = parsed.path_segments().ok_or_else(invalid)?.collect();
    let slug = segments
        .len()
        .checked_sub(2)
        .and_then(|index| segments.get(index))
        .filter(|slug| !slug.is_empty())
        .ok_or_else(invalid)?;

    validate_slug(slug).map_err(|_| invalid())?;
    Ok((*slug).to_string())
}
