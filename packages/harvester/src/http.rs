//! HTTP client wrapper for gesetze-im-internet.de.
//!
//! Failed requests are not retried: a law that fails to download is picked
//! up again by the next sync run.

use std::time::Duration;

use chrono::DateTime;
use reqwest::blocking::{Client, Response};
use reqwest::header::LAST_MODIFIED;

use crate::config::{HTTP_TIMEOUT_SECS, TIMESTAMP_FORMAT};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("rechtsinfo-harvester/", env!("CARGO_PKG_VERSION"));

/// A downloaded response body with its `Last-Modified` stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,

    /// `Last-Modified` as `YYYYMMDD`.
    pub last_modified: String,
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with timeout and user agent.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Download a URL.
///
/// # Arguments
/// * `client` - HTTP client to use
/// * `url` - URL to download from
///
/// # Returns
/// Raw bytes of the response body
pub fn download_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

/// Download a URL together with its `Last-Modified` stamp.
pub fn download_with_timestamp(client: &Client, url: &str) -> Result<Download> {
    let response = client.get(url).send()?.error_for_status()?;
    let last_modified = last_modified_of(&response, url)?;
    let bytes = response.bytes()?.to_vec();

    tracing::debug!(url, bytes = bytes.len(), %last_modified, "Downloaded");
    Ok(Download {
        bytes,
        last_modified,
    })
}

/// Fetch the `Last-Modified` stamp of a URL with a HEAD request.
pub fn fetch_last_modified(client: &Client, url: &str) -> Result<String> {
    let response = client.head(url).send()?.error_for_status()?;
    last_modified_of(&response, url)
}

fn last_modified_of(response: &Response, url: &str) -> Result<String> {
    let header = response
        .headers()
        .get(LAST_MODIFIED)
        .ok_or_else(|| HarvesterError::MissingLastModified {
            url: url.to_string(),
        })?;
    let header = header
        .to_str()
        .map_err(|_| HarvesterError::InvalidLastModified(format!("{header:?}")))?;
    last_modified_stamp(header)
}

/// Convert an HTTP date to a `YYYYMMDD` stamp.
///
/// # Examples
/// ```
/// use rechtsinfo_harvester::http::last_modified_stamp;
///
/// assert_eq!(
///     last_modified_stamp("Wed, 22 Jul 2020 19:25:21 GMT").unwrap(),
///     "20200722"
/// );
/// ```
pub fn last_modified_stamp(header: &str) -> Result<String> {
    let date = DateTime::parse_from_rfc2822(header.trim())
        .map_err(|_| HarvesterError::InvalidLastModified(header.to_string()))?;
    Ok(date.format(TIMESTAMP_FORMAT).to_string())
}
