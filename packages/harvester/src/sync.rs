//! Ingestion orchestration: catalog → location → store.
//!
//! Laws are processed one at a time. A law that fails is logged, recorded in
//! the report and skipped; the run continues with the next law. Only a
//! failure to read the catalog or an implausible number of removals aborts
//! the whole run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::catalog::{Catalog, Toc};
use crate::config::MAX_REMOVALS;
use crate::error::{HarvesterError, Result};
use crate::gii::parse_law_reader;
use crate::location::Location;
use crate::store::LawStore;
use crate::types::StoredLaw;

/// Options for sync runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Abort when more laws than this would be removed.
    pub max_removals: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_removals: MAX_REMOVALS,
        }
    }
}

/// A law that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLaw {
    pub slug: String,
    pub error: String,
}

/// Outcome of a sync run, by catalog slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<FailedLaw>,
}

impl SyncReport {
    fn fail(&mut self, slug: &str, error: &HarvesterError) {
        tracing::error!(slug, error = %error, "Skipping law");
        self.failed.push(FailedLaw {
            slug: slug.to_string(),
            error: error.to_string(),
        });
    }

    /// Whether every law was processed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} removed, {} unchanged, {} failed",
            self.created.len(),
            self.updated.len(),
            self.removed.len(),
            self.unchanged.len(),
            self.failed.len()
        )
    }
}

/// Which laws a sync run has to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// In the catalog, not in the location.
    pub new: Vec<String>,

    /// In the catalog and in the location; may or may not have changed.
    pub existing: Vec<String>,

    /// In the location or the store, not in the catalog.
    pub removed: Vec<String>,
}

impl SyncPlan {
    /// Compare the catalog with the location and, if given, the store.
    ///
    /// # Examples
    /// ```
    /// use std::collections::{BTreeMap, BTreeSet};
    /// use rechtsinfo_harvester::sync::SyncPlan;
    ///
    /// let toc = BTreeMap::from([
    ///     ("a".to_string(), "http://host/a/xml.zip".to_string()),
    ///     ("b".to_string(), "http://host/b/xml.zip".to_string()),
    /// ]);
    /// let known = BTreeMap::from([
    ///     ("b".to_string(), "20200101".to_string()),
    ///     ("c".to_string(), "20200101".to_string()),
    /// ]);
    ///
    /// let plan = SyncPlan::new(&toc, &known, &BTreeSet::new());
    /// assert_eq!(plan.new, vec!["a"]);
    /// assert_eq!(plan.existing, vec!["b"]);
    /// assert_eq!(plan.removed, vec!["c"]);
    /// ```
    #[must_use]
    pub fn new(toc: &Toc, known: &BTreeMap<String, String>, stored: &BTreeSet<String>) -> Self {
        let new = toc
            .keys()
            .filter(|slug| !known.contains_key(*slug))
            .cloned()
            .collect();
        let existing = toc
            .keys()
            .filter(|slug| known.contains_key(*slug))
            .cloned()
            .collect();
        let removed = known
            .keys()
            .chain(stored.iter())
            .filter(|slug| !toc.contains_key(*slug))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            new,
            existing,
            removed,
        }
    }
}

/// Refuse runs that would remove more than `limit` laws.
pub fn check_removals(count: usize, limit: usize) -> Result<()> {
    if count > limit {
        return Err(HarvesterError::TooManyRemovals { count, limit });
    }
    Ok(())
}

/// Whether a remote archive stamp is newer than the known one.
#[must_use]
pub fn is_newer(remote: &str, known: &str) -> bool {
    remote > known
}

/// Parse the law stored under `slug` in the location and upsert it.
pub fn ingest_law(location: &dyn Location, store: &mut dyn LawStore, slug: &str) -> Result<()> {
    let law = parse_law_reader(location.xml_file_for(slug)?)?;
    let attachments = location.attachment_names(slug)?;
    let stored = StoredLaw::new(slug, law, attachments);

    tracing::info!(
        slug,
        abbreviation = %stored.law.abbreviation,
        items = stored.law.contents.len(),
        "Ingesting law"
    );
    store.upsert(stored)
}

/// Download phase only: bring the location in line with the catalog.
pub fn sync_location(
    catalog: &dyn Catalog,
    location: &dyn Location,
    options: &SyncOptions,
) -> Result<SyncReport> {
    run_sync(catalog, location, None, options)
}

/// Full pipeline: download changed laws, ingest them and drop removed ones.
///
/// Laws present in the location but missing from the store are ingested as
/// well. When ingesting a freshly downloaded law fails, its location entry
/// is dropped so the next run downloads it again.
pub fn sync_laws(
    catalog: &dyn Catalog,
    location: &dyn Location,
    store: &mut dyn LawStore,
    options: &SyncOptions,
) -> Result<SyncReport> {
    run_sync(catalog, location, Some(store), options)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Change {
    Created,
    Updated,
}

fn run_sync(
    catalog: &dyn Catalog,
    location: &dyn Location,
    mut store: Option<&mut dyn LawStore>,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let toc = catalog.fetch_toc()?;
    let known = location.list_slugs_with_timestamps()?;
    let stored = match store.as_deref() {
        Some(store) => store.gii_slugs()?,
        None => BTreeSet::new(),
    };

    let plan = SyncPlan::new(&toc, &known, &stored);
    check_removals(plan.removed.len(), options.max_removals)?;
    tracing::info!(
        new = plan.new.len(),
        existing = plan.existing.len(),
        removed = plan.removed.len(),
        "Planned sync"
    );

    let mut report = SyncReport::default();
    let mut changes: Vec<(&str, Change)> = plan
        .new
        .iter()
        .map(|slug| (slug.as_str(), Change::Created))
        .collect();

    for slug in &plan.existing {
        let (Some(url), Some(known_stamp)) = (toc.get(slug), known.get(slug)) else {
            continue;
        };
        match catalog.last_modified(url) {
            Ok(remote) if is_newer(&remote, known_stamp) => {
                changes.push((slug.as_str(), Change::Updated));
            }
            Ok(_) => match store.as_deref_mut() {
                Some(store) if !stored.contains(slug) => {
                    match ingest_law(location, store, slug) {
                        Ok(()) => report.created.push(slug.clone()),
                        Err(e) => report.fail(slug, &e),
                    }
                }
                _ => report.unchanged.push(slug.clone()),
            },
            Err(e) => report.fail(slug, &e),
        }
    }

    for (slug, change) in changes {
        let Some(url) = toc.get(slug) else {
            continue;
        };
        let result = catalog
            .fetch_archive(url)
            .and_then(|archive| location.create_or_replace(slug, &archive));
        if let Err(e) = result {
            report.fail(slug, &e);
            continue;
        }

        if let Some(store) = store.as_deref_mut() {
            if let Err(e) = ingest_law(location, store, slug) {
                report.fail(slug, &e);
                if let Err(e) = location.remove(slug) {
                    tracing::warn!(slug, error = %e, "Could not drop location entry");
                }
                continue;
            }
        }

        tracing::info!(slug, url = %url, "Downloaded law");
        match change {
            Change::Created => report.created.push(slug.to_string()),
            Change::Updated => report.updated.push(slug.to_string()),
        }
    }

    for slug in &plan.removed {
        let mut result = location.remove(slug);
        if let Some(store) = store.as_deref_mut() {
            result = result.and_then(|()| store.delete_by_gii_slug(slug).map(|_| ()));
        }
        match result {
            Ok(()) => {
                tracing::info!(slug = %slug, "Removed law");
                report.removed.push(slug.clone());
            }
            Err(e) => report.fail(slug, &e),
        }
    }

    tracing::info!(%report, "Sync finished");
    Ok(report)
}

/// Ingest phase only: bring the store in line with the location.
///
/// Every law in the location is parsed and upserted. Stored laws no longer
/// in the location are deleted.
pub fn ingest_location(
    location: &dyn Location,
    store: &mut dyn LawStore,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let known = location.list_slugs_with_timestamps()?;
    let stored = store.gii_slugs()?;

    let removed: Vec<&String> = stored.iter().filter(|slug| !known.contains_key(*slug)).collect();
    check_removals(removed.len(), options.max_removals)?;

    let mut report = SyncReport::default();
    for slug in known.keys() {
        match ingest_law(location, store, slug) {
            Ok(()) if stored.contains(slug) => report.updated.push(slug.clone()),
            Ok(()) => report.created.push(slug.clone()),
            Err(e) => report.fail(slug, &e),
        }
    }

    for slug in removed {
        match store.delete_by_gii_slug(slug) {
            Ok(_) => report.removed.push(slug.clone()),
            Err(e) => report.fail(slug, &e),
        }
    }

    tracing::info!(%report, "Ingest finished");
    Ok(report)
}
