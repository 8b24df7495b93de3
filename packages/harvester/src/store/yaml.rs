//! Law store writing one YAML file per law.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{LawIndex, LawIndexEntry, LawStore};
use crate::config::validate_slug;
use crate::error::Result;
use crate::types::StoredLaw;

/// Generate the YAML document for a stored law.
pub fn generate_yaml(law: &StoredLaw) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(law)?;
    Ok(format!("---\n{yaml}"))
}

/// Store of `<root>/<gii_slug>.yaml` files.
///
/// The index of all stored laws is loaded when the store is opened.
#[derive(Debug)]
pub struct YamlFileStore {
    root: PathBuf,
    index: LawIndex,
}

impl YamlFileStore {
    /// Open a store directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut index = LawIndex::default();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            let Some(gii_slug) = law_file_slug(&path) else {
                continue;
            };
            let law = read_law(&path)?;
            index.insert(&gii_slug, LawIndexEntry::of(&law));
        }

        tracing::debug!(root = %root.display(), laws = index.gii_slugs().len(), "Opened law store");
        Ok(Self { root, index })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding a law.
    pub fn path_for(&self, gii_slug: &str) -> Result<PathBuf> {
        validate_slug(gii_slug)?;
        Ok(self.root.join(format!("{gii_slug}.yaml")))
    }

    /// Read a law by catalog slug.
    pub fn load(&self, gii_slug: &str) -> Result<Option<StoredLaw>> {
        let path = self.path_for(gii_slug)?;
        if !path.exists() {
            return Ok(None);
        }
        read_law(&path).map(Some)
    }
}

/// Catalog slug of a `<slug>.yaml` file, `None` for other files.
fn law_file_slug(path: &Path) -> Option<String> {
    if path.extension()? != "yaml" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    validate_slug(stem).ok()?;
    Some(stem.to_string())
}

fn read_law(path: &Path) -> Result<StoredLaw> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml_ng::from_str(&content)?)
}

/// Write a file atomically: temp file, sync, rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&temp_file, path)?;
    Ok(())
}

/// Remove a file. Returns whether it existed.
fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl LawStore for YamlFileStore {
    fn upsert(&mut self, law: StoredLaw) -> Result<()> {
        let path = self.path_for(&law.gii_slug)?;
        let replaced = self.index.replaced_by(&law);
        self.index.check_unique(&law, &replaced)?;

        write_atomic(&path, &generate_yaml(&law)?)?;
        for gii_slug in replaced.iter().filter(|slug| **slug != law.gii_slug) {
            remove_if_exists(&self.path_for(gii_slug)?)?;
        }

        // Index changes only once the files are in place.
        for gii_slug in &replaced {
            self.index.remove(gii_slug);
        }
        self.index.insert(&law.gii_slug, LawIndexEntry::of(&law));

        tracing::debug!(gii_slug = %law.gii_slug, path = %path.display(), "Stored law");
        Ok(())
    }

    fn delete_by_gii_slug(&mut self, gii_slug: &str) -> Result<bool> {
        let path = self.path_for(gii_slug)?;
        let existed = remove_if_exists(&path)?;
        self.index.remove(gii_slug);
        Ok(existed)
    }

    fn gii_slugs(&self) -> Result<BTreeSet<String>> {
        Ok(self.index.gii_slugs())
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<StoredLaw>> {
        match self.index.gii_slug_for_slug(slug) {
            Some(gii_slug) => self.load(gii_slug),
            None => Ok(None),
        }
    }
}
