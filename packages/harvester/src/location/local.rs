//! Law archives unpacked into a local directory.
//!
//! Each law lives in its own directory named after its catalog slug, next
//! to a `.timestamp` file holding the `Last-Modified` stamp of the archive.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use super::{is_xml, Location};
use crate::catalog::Archive;
use crate::config::{is_timestamp, validate_slug, MISSING_TIMESTAMP};
use crate::error::{HarvesterError, Result};

/// Name of the timestamp marker file.
pub const TIMESTAMP_FILE: &str = ".timestamp";

/// Location in a local directory.
#[derive(Debug, Clone)]
pub struct LocalPathLocation {
    data_dir: PathBuf,
}

impl LocalPathLocation {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn law_dir(&self, slug: &str) -> Result<PathBuf> {
        validate_slug(slug)?;
        Ok(self.data_dir.join(slug))
    }

    fn file_names(&self, slug: &str) -> Result<Vec<String>> {
        let dir = self.law_dir(slug)?;
        if !dir.is_dir() {
            return Err(HarvesterError::LawNotFound(slug.to_string()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Location for LocalPathLocation {
    fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        if !self.data_dir.is_dir() {
            return Ok(result);
        }

        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let slug = entry.file_name().to_string_lossy().into_owned();
            if validate_slug(&slug).is_err() {
                continue;
            }

            let timestamp = match fs::read_to_string(entry.path().join(TIMESTAMP_FILE)) {
                Ok(content) if is_timestamp(content.trim()) => content.trim().to_string(),
                Ok(content) => {
                    tracing::warn!(slug = %slug, content = content.trim(), "Invalid timestamp marker");
                    MISSING_TIMESTAMP.to_string()
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(slug = %slug, "No {TIMESTAMP_FILE} in law directory");
                    MISSING_TIMESTAMP.to_string()
                }
                Err(e) => return Err(e.into()),
            };
            result.insert(slug, timestamp);
        }

        Ok(result)
    }

    fn xml_file_for(&self, slug: &str) -> Result<Box<dyn Read>> {
        let xml_files: Vec<String> = self
            .file_names(slug)?
            .into_iter()
            .filter(|name| is_xml(name))
            .collect();

        match xml_files.as_slice() {
            [name] => {
                let file = fs::File::open(self.law_dir(slug)?.join(name))?;
                Ok(Box::new(file))
            }
            _ => Err(HarvesterError::UnexpectedXmlFileCount {
                slug: slug.to_string(),
                count: xml_files.len(),
            }),
        }
    }

    fn attachment_names(&self, slug: &str) -> Result<Vec<String>> {
        Ok(self
            .file_names(slug)?
            .into_iter()
            .filter(|name| !name.starts_with('.') && !is_xml(name))
            .collect())
    }

    fn create_or_replace(&self, slug: &str, archive: &Archive) -> Result<()> {
        let dir = self.law_dir(slug)?;
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.as_slice()))?;

        self.remove(slug)?;
        fs::create_dir_all(&dir)?;
        if let Err(e) = zip.extract(&dir) {
            self.remove(slug)?;
            return Err(e.into());
        }
        fs::write(dir.join(TIMESTAMP_FILE), &archive.last_modified)?;

        tracing::debug!(
            slug,
            files = zip.len(),
            timestamp = %archive.last_modified,
            "Stored law archive"
        );
        Ok(())
    }

    fn remove(&self, slug: &str) -> Result<()> {
        let dir = self.law_dir(slug)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
