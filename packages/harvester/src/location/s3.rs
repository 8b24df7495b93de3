//! Law archives unpacked into an S3 bucket.
//!
//! Every law is stored below `{prefix}/{slug}/`. The archive stamp is kept
//! as an empty object named `.last_modified_YYYYMMDD` next to the files,
//! so listing the bucket yields slugs and stamps in one pass.

use std::collections::BTreeMap;
use std::future::Future;
use std::io::{Cursor, Read};

use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;

use super::{is_xml, Location};
use crate::catalog::Archive;
use crate::config::{is_timestamp, validate_slug, MISSING_TIMESTAMP};
use crate::error::{HarvesterError, Result};

/// Name prefix of the timestamp marker object.
pub const TIMESTAMP_MARKER_PREFIX: &str = ".last_modified_";

/// Region used when neither the environment nor the AWS profile names one.
const DEFAULT_REGION: &str = "eu-central-1";

/// Upper limit of keys in one `DeleteObjects` request.
const DELETE_BATCH_SIZE: usize = 1000;

fn storage_error<E: std::error::Error>(e: E) -> HarvesterError {
    HarvesterError::ObjectStorage(DisplayErrorContext(e).to_string())
}

/// Location in an S3 bucket.
///
/// The [`Location`] trait is synchronous, so requests run on a private
/// current-thread runtime. Do not call it from within another runtime.
pub struct S3Location {
    runtime: Runtime,
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl std::fmt::Debug for S3Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Location")
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl S3Location {
    /// Connect using credentials and region from the AWS environment.
    pub fn from_env(bucket: &str, prefix: &str) -> Result<Self> {
        let runtime = Self::runtime()?;
        let region = RegionProviderChain::default_provider().or_else(DEFAULT_REGION);
        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load(),
        );
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self::with_runtime(
            runtime,
            Client::from_conf(s3_config),
            bucket,
            prefix,
        ))
    }

    /// Use a preconfigured client, e.g. one pointing at a local endpoint.
    pub fn with_client(client: Client, bucket: &str, prefix: &str) -> Result<Self> {
        Ok(Self::with_runtime(Self::runtime()?, client, bucket, prefix))
    }

    fn with_runtime(runtime: Runtime, client: Client, bucket: &str, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        let key_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };

        Self {
            runtime,
            client,
            bucket: bucket.to_string(),
            key_prefix,
        }
    }

    fn runtime() -> Result<Runtime> {
        Ok(tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?)
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn law_prefix(&self, slug: &str) -> Result<String> {
        validate_slug(slug)?;
        Ok(format!("{}{slug}/", self.key_prefix))
    }

    /// All keys below a prefix, following continuation tokens.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .block_on(
                    self.client
                        .list_objects_v2()
                        .bucket(&self.bucket)
                        .prefix(prefix)
                        .set_continuation_token(continuation_token.take())
                        .send(),
                )
                .map_err(storage_error)?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    /// Object names of one law, relative to its prefix, sorted.
    fn file_names(&self, slug: &str) -> Result<Vec<String>> {
        let law_prefix = self.law_prefix(slug)?;
        let mut names: Vec<String> = self
            .list_keys(&law_prefix)?
            .iter()
            .filter_map(|key| key.strip_prefix(&law_prefix))
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(HarvesterError::LawNotFound(slug.to_string()));
        }
        names.sort();
        Ok(names)
    }

    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(storage_error)?;
            let body = output.body.collect().await.map_err(storage_error)?;
            Ok::<_, HarvesterError>(body.into_bytes().to_vec())
        })
    }

    fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.block_on(
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send(),
        )
        .map_err(storage_error)?;
        Ok(())
    }

    fn delete_keys(&self, keys: &[String]) -> Result<()> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_error)?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(storage_error)?;

            let output = self
                .block_on(
                    self.client
                        .delete_objects()
                        .bucket(&self.bucket)
                        .delete(delete)
                        .send(),
                )
                .map_err(storage_error)?;

            if let Some(error) = output.errors().first() {
                return Err(HarvesterError::ObjectStorage(format!(
                    "Could not delete {}: {}",
                    error.key().unwrap_or("<unknown>"),
                    error.message().unwrap_or("no message")
                )));
            }
        }
        Ok(())
    }
}

/// Read every file of a zip archive into memory.
fn archive_members(archive: &Archive) -> Result<Vec<(String, Vec<u8>)>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.as_slice()))?;
    let mut members = Vec::with_capacity(zip.len());

    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let Some(name) = file.enclosed_name() else {
            return Err(HarvesterError::ObjectStorage(format!(
                "Unsafe file name in archive: {}",
                file.name()
            )));
        };
        let name = name.to_string_lossy().replace('\\', "/");

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        members.push((name, content));
    }

    Ok(members)
}

impl Location for S3Location {
    fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>> {
        let mut found: BTreeMap<String, Option<String>> = BTreeMap::new();

        for key in self.list_keys(&self.key_prefix)? {
            let Some((slug, name)) = key
                .strip_prefix(&self.key_prefix)
                .and_then(|rest| rest.split_once('/'))
            else {
                continue;
            };
            if validate_slug(slug).is_err() {
                continue;
            }

            let stamp = found.entry(slug.to_string()).or_default();
            if let Some(value) = name.strip_prefix(TIMESTAMP_MARKER_PREFIX) {
                if is_timestamp(value) {
                    *stamp = Some(value.to_string());
                }
            }
        }

        Ok(found
            .into_iter()
            .map(|(slug, stamp)| {
                let stamp = stamp.unwrap_or_else(|| {
                    tracing::warn!(slug = %slug, "No {TIMESTAMP_MARKER_PREFIX} marker for law");
                    MISSING_TIMESTAMP.to_string()
                });
                (slug, stamp)
            })
            .collect())
    }

    fn xml_file_for(&self, slug: &str) -> Result<Box<dyn Read>> {
        let xml_files: Vec<String> = self
            .file_names(slug)?
            .into_iter()
            .filter(|name| is_xml(name))
            .collect();

        match xml_files.as_slice() {
            [name] => {
                let key = format!("{}{name}", self.law_prefix(slug)?);
                Ok(Box::new(Cursor::new(self.get_object(&key)?)))
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
        let law_prefix = self.law_prefix(slug)?;
        let members = archive_members(archive)?;

        self.remove(slug)?;
        let count = members.len();
        for (name, content) in members {
            self.put_object(&format!("{law_prefix}{name}"), content)?;
        }
        self.put_object(
            &format!("{law_prefix}{TIMESTAMP_MARKER_PREFIX}{}", archive.last_modified),
            Vec::new(),
        )?;

        tracing::debug!(
            slug,
            bucket = %self.bucket,
            files = count,
            timestamp = %archive.last_modified,
            "Stored law archive"
        );
        Ok(())
    }

    fn remove(&self, slug: &str) -> Result<()> {
        let keys = self.list_keys(&self.law_prefix(slug)?)?;
        if keys.is_empty() {
            return Ok(());
        }
        self.delete_keys(&keys)
    }
}
