//! Persistence sink for parsed laws.
//!
//! A store holds one record per law. Upserting replaces the previous record
//! of the same law, including its entire content list, and rejects content
//! identifiers that already belong to a different law.

mod yaml;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{HarvesterError, Result};
use crate::types::StoredLaw;

pub use yaml::{generate_yaml, YamlFileStore};

/// Sink for parsed laws.
pub trait LawStore {
    /// Insert a law, replacing any stored version of it.
    ///
    /// A stored law is replaced when it has the same document number or the
    /// same catalog slug.
    ///
    /// # Errors
    /// [`HarvesterError::DuplicateContentId`] when a content identifier is
    /// already owned by another law. The store is left unchanged.
    fn upsert(&mut self, law: StoredLaw) -> Result<()>;

    /// Delete the law ingested from a catalog slug.
    ///
    /// # Returns
    /// Whether a law was deleted.
    fn delete_by_gii_slug(&mut self, gii_slug: &str) -> Result<bool>;

    /// Catalog slugs of all stored laws.
    fn gii_slugs(&self) -> Result<BTreeSet<String>>;

    /// Find a law by its URL slug.
    fn find_by_slug(&self, slug: &str) -> Result<Option<StoredLaw>>;
}

/// Identity of a stored law, enough to check uniqueness without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LawIndexEntry {
    pub doknr: String,
    pub slug: String,
    pub content_ids: Vec<String>,
}

impl LawIndexEntry {
    pub fn of(law: &StoredLaw) -> Self {
        Self {
            doknr: law.law.doknr.clone(),
            slug: law.slug.clone(),
            content_ids: law.law.contents.iter().map(|item| item.doknr.clone()).collect(),
        }
    }
}

/// Index of stored laws by catalog slug, with content ownership.
#[derive(Debug, Default)]
pub(crate) struct LawIndex {
    by_gii_slug: BTreeMap<String, LawIndexEntry>,
    content_owner: HashMap<String, String>,
}

impl LawIndex {
    /// Catalog slugs of the stored laws that `law` replaces.
    pub fn replaced_by(&self, law: &StoredLaw) -> Vec<String> {
        self.by_gii_slug
            .iter()
            .filter(|(gii_slug, entry)| **gii_slug == law.gii_slug || entry.doknr == law.law.doknr)
            .map(|(gii_slug, _)| gii_slug.clone())
            .collect()
    }

    /// Check that no content identifier of `law` belongs to a law outside `replaced`.
    pub fn check_unique(&self, law: &StoredLaw, replaced: &[String]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for item in &law.law.contents {
            if !seen.insert(item.doknr.as_str()) {
                return Err(HarvesterError::DuplicateContentId {
                    doknr: item.doknr.clone(),
                    owner: law.gii_slug.clone(),
                });
            }
            if let Some(owner) = self.content_owner.get(&item.doknr) {
                if !replaced.contains(owner) {
                    return Err(HarvesterError::DuplicateContentId {
                        doknr: item.doknr.clone(),
                        owner: owner.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, gii_slug: &str, entry: LawIndexEntry) {
        for id in &entry.content_ids {
            self.content_owner.insert(id.clone(), gii_slug.to_string());
        }
        self.by_gii_slug.insert(gii_slug.to_string(), entry);
    }

    pub fn remove(&mut self, gii_slug: &str) -> Option<LawIndexEntry> {
        let entry = self.by_gii_slug.remove(gii_slug)?;
        for id in &entry.content_ids {
            if self.content_owner.get(id).map(String::as_str) == Some(gii_slug) {
                self.content_owner.remove(id);
            }
        }
        Some(entry)
    }

    pub fn gii_slugs(&self) -> BTreeSet<String> {
        self.by_gii_slug.keys().cloned().collect()
    }

    pub fn gii_slug_for_slug(&self, slug: &str) -> Option<&str> {
        self.by_gii_slug
            .iter()
            .find(|(_, entry)| entry.slug == slug)
            .map(|(gii_slug, _)| gii_slug.as_str())
    }
}

/// Store keeping all laws in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    laws: BTreeMap<String, StoredLaw>,
    index: LawIndex,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.laws.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.laws.is_empty()
    }

    /// Get a law by catalog slug.
    #[must_use]
    pub fn get(&self, gii_slug: &str) -> Option<&StoredLaw> {
        self.laws.get(gii_slug)
    }
}

impl LawStore for MemoryStore {
    fn upsert(&mut self, law: StoredLaw) -> Result<()> {
        let replaced = self.index.replaced_by(&law);
        self.index.check_unique(&law, &replaced)?;

        for gii_slug in &replaced {
            self.index.remove(gii_slug);
            self.laws.remove(gii_slug);
        }
        self.index.insert(&law.gii_slug, LawIndexEntry::of(&law));
        self.laws.insert(law.gii_slug.clone(), law);
        Ok(())
    }

    fn delete_by_gii_slug(&mut self, gii_slug: &str) -> Result<bool> {
        self.index.remove(gii_slug);
        Ok(self.laws.remove(gii_slug).is_some())
    }

    fn gii_slugs(&self) -> Result<BTreeSet<String>> {
        Ok(self.index.gii_slugs())
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<StoredLaw>> {
        Ok(self
            .index
            .gii_slug_for_slug(slug)
            .and_then(|gii_slug| self.laws.get(gii_slug))
            .cloned())
    }
}
