//! Configuration constants and validation functions for the harvester.

use regex::Regex;
use reqwest::Url;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::{HarvesterError, Result};

/// Table of contents listing every law published on gesetze-im-internet.de.
pub const TOC_URL: &str = "http://www.gesetze-im-internet.de/gii-toc.xml";

/// HTTP timeout in seconds.
///
/// Law archives for large codes (BGB, SGB) are several megabytes.
pub const HTTP_TIMEOUT_SECS: u64 = 120;

/// Maximum number of laws a single sync run may remove.
///
/// A truncated catalog download would otherwise delete most stored laws.
pub const MAX_REMOVALS: usize = 250;

/// Identifier marker of a single norm (article).
pub const ARTICLE_MARKER: &str = "NE";

/// Identifier marker of a structural group (section heading).
pub const SECTION_MARKER: &str = "NG";

/// Width of one segment of a section code (`gliederungskennzahl`).
pub const SECTION_CODE_GROUP_WIDTH: usize = 3;

/// Format of archive timestamps (derived from `Last-Modified`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d";

/// Timestamp reported for location entries without a timestamp marker.
pub const MISSING_TIMESTAMP: &str = "00000000";

/// Slug pattern: catalog slugs are plain path segments.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("valid regex"));

/// Timestamp pattern: YYYYMMDD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("valid regex"));

/// Validate a gesetze-im-internet.de slug.
///
/// Slugs end up as directory and file names, so anything that could escape
/// the data directory is rejected.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::config::validate_slug;
///
/// assert!(validate_slug("skaufg").is_ok());
/// assert!(validate_slug("sgb_5").is_ok());
/// assert!(validate_slug("../etc").is_err());
/// ```
pub fn validate_slug(slug: &str) -> Result<()> {
    if SLUG_PATTERN.is_match(slug) && !slug.contains("..") {
        Ok(())
    } else {
        Err(HarvesterError::InvalidSlug(slug.to_string()))
    }
}

/// Check whether a string is a `YYYYMMDD` archive timestamp.
#[must_use]
pub fn is_timestamp(value: &str) -> bool {
    TIMESTAMP_PATTERN.is_match(value)
}

/// Default directory of the YAML law store.
pub const DEFAULT_STORE_PATH: &str = "./store";

/// Where downloaded law archives are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    /// Local directory.
    Local(PathBuf),

    /// Key prefix in an S3 bucket, without leading or trailing slashes.
    S3 { bucket: String, prefix: String },
}

impl DataLocation {
    /// Parse a `DATA_LOCATION` value.
    ///
    /// `s3://bucket/prefix` selects object storage, anything else is a
    /// local directory.
    ///
    /// # Examples
    /// ```
    /// use rechtsinfo_harvester::config::DataLocation;
    ///
    /// let location = DataLocation::parse("s3://laws/gii").unwrap();
    /// assert_eq!(
    ///     location,
    ///     DataLocation::S3 { bucket: "laws".into(), prefix: "gii".into() }
    /// );
    /// assert!(matches!(DataLocation::parse("./data").unwrap(), DataLocation::Local(_)));
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        if !value.starts_with("s3://") {
            return Ok(Self::Local(PathBuf::from(value)));
        }

        let url =
            Url::parse(value).map_err(|_| HarvesterError::InvalidDataLocation(value.to_string()))?;
        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| HarvesterError::InvalidDataLocation(value.to_string()))?;

        Ok(Self::S3 {
            bucket: bucket.to_string(),
            prefix: url.path().trim_matches('/').to_string(),
        })
    }
}

impl fmt::Display for DataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
        }
    }
}

/// Runtime configuration for the ingestion commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvesterConfig {
    /// Storage holding one unpacked archive per law.
    pub data_location: DataLocation,

    /// Directory of the YAML law store.
    pub store_path: PathBuf,

    /// Catalog URL.
    pub toc_url: String,

    /// Removal guard for sync runs.
    pub max_removals: usize,
}

impl HarvesterConfig {
    /// Read configuration from the environment.
    ///
    /// `DATA_LOCATION` is required. `STORE_PATH` defaults to `./store`,
    /// `GII_TOC_URL` to [`TOC_URL`] and `MAX_REMOVALS` to [`MAX_REMOVALS`].
    pub fn from_env() -> Result<Self> {
        let data_location = std::env::var("DATA_LOCATION")
            .map_err(|_| HarvesterError::Config("DATA_LOCATION not set".into()))?;
        Self::with_env_defaults(DataLocation::parse(&data_location)?)
    }

    /// Configuration for an explicit data location, other fields from the environment.
    pub fn with_env_defaults(data_location: DataLocation) -> Result<Self> {
        let store_path = Self::store_path_from_env();

        let toc_url = std::env::var("GII_TOC_URL").unwrap_or_else(|_| TOC_URL.into());

        let max_removals = match std::env::var("MAX_REMOVALS") {
            Ok(value) => value.parse().map_err(|_| {
                HarvesterError::Config(format!("MAX_REMOVALS is not a number: {value}"))
            })?,
            Err(_) => MAX_REMOVALS,
        };

        Ok(Self {
            data_location,
            store_path,
            toc_url,
            max_removals,
        })
    }

    /// Law store directory from `STORE_PATH`, defaulting to [`DEFAULT_STORE_PATH`].
    #[must_use]
    pub fn store_path_from_env() -> PathBuf {
        std::env::var("STORE_PATH")
            .unwrap_or_else(|_| DEFAULT_STORE_PATH.into())
            .into()
    }

    pub fn new(data_location: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            data_location: DataLocation::Local(data_location.into()),
            store_path: store_path.into(),
            toc_url: TOC_URL.to_string(),
            max_removals: MAX_REMOVALS,
        }
    }

    pub fn with_toc_url(mut self, toc_url: impl Into<String>) -> Self {
        self.toc_url = toc_url.into();
        self
    }

    pub fn with_max_removals(mut self, max_removals: usize) -> Self {
        self.max_removals = max_removals;
        self
    }
}
