//! Storage of downloaded law archives.
//!
//! A location keeps the unpacked files of every law under its catalog slug,
//! together with the `Last-Modified` stamp of the archive they came from.
//! Laws live either in a local directory ([`LocalPathLocation`]) or in an
//! S3 bucket ([`S3Location`]).

mod local;
mod s3;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::catalog::Archive;
use crate::config::DataLocation;
use crate::error::Result;

pub use local::{LocalPathLocation, TIMESTAMP_FILE};
pub use s3::{S3Location, TIMESTAMP_MARKER_PREFIX};

/// Place where downloaded law archives are kept.
pub trait Location {
    /// All stored slugs with their `YYYYMMDD` stamps.
    fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>>;

    /// Open the XML document of a law.
    fn xml_file_for(&self, slug: &str) -> Result<Box<dyn Read>>;

    /// Names of the non-XML files of a law, sorted.
    fn attachment_names(&self, slug: &str) -> Result<Vec<String>>;

    /// Replace the stored files of a law with the contents of an archive.
    fn create_or_replace(&self, slug: &str, archive: &Archive) -> Result<()>;

    /// Remove a law. Removing an unknown slug is not an error.
    fn remove(&self, slug: &str) -> Result<()>;
}

/// Open the location a configuration points at.
pub fn open_location(data_location: &DataLocation) -> Result<Box<dyn Location>> {
    match data_location {
        DataLocation::Local(path) => Ok(Box::new(LocalPathLocation::new(path))),
        DataLocation::S3 { bucket, prefix } => Ok(Box::new(S3Location::from_env(bucket, prefix)?)),
    }
}

pub(crate) fn is_xml(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
