//! Tests for the S3 location against a mock S3 endpoint.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use pretty_assertions::assert_eq;
use rechtsinfo_harvester::catalog::Archive;
use rechtsinfo_harvester::error::HarvesterError;
use rechtsinfo_harvester::location::{Location, S3Location};
use rechtsinfo_harvester::store::{LawStore, MemoryStore};
use rechtsinfo_harvester::sync::ingest_law;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, path_regex, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUCKET: &str = "rechtsinfo";

/// Mock server plus the runtime that drives its setup calls.
///
/// The location under test runs its own runtime, so the tests themselves
/// are plain synchronous tests.
struct MockS3 {
    runtime: Runtime,
    server: MockServer,
}

impl MockS3 {
    fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { runtime, server }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn location(&self, prefix: &str) -> S3Location {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-central-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .endpoint_url(self.server.uri())
            .force_path_style(true)
            .build();
        S3Location::with_client(aws_sdk_s3::Client::from_conf(config), BUCKET, prefix).unwrap()
    }

    /// Method and path of every request received so far.
    fn requests(&self) -> Vec<(String, String)> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .map(|request| {
                (
                    request.method.as_str().to_string(),
                    request.url.path().to_string(),
                )
            })
            .collect()
    }

    fn delete_bodies(&self) -> Vec<String> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|request| request.method.as_str() == "POST")
            .map(|request| String::from_utf8_lossy(&request.body).into_owned())
            .collect()
    }
}

fn list_result(keys: &[&str], next_token: Option<&str>) -> ResponseTemplate {
    let contents: String = keys
        .iter()
        .map(|key| format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"))
        .collect();
    let truncation = match next_token {
        Some(token) => {
            format!("<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>")
        }
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>{BUCKET}</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>{truncation}{contents}</ListBucketResult>"#,
        keys.len()
    );
    ResponseTemplate::new(200).set_body_raw(body, "application/xml")
}

fn list_mock(prefix: &str, keys: &[&str]) -> Mock {
    Mock::given(method("GET"))
        .and(path_regex(format!(r"^/{BUCKET}/?$")))
        .and(query_param("list-type", "2"))
        .and(query_param("prefix", prefix))
        .respond_with(list_result(keys, None))
}

fn fixture_bytes() -> Vec<u8> {
    std::fs::read(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("skaufg")
            .join("BJNR055429995.xml"),
    )
    .unwrap()
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_list_slugs_with_timestamps() {
    let s3 = MockS3::start();
    s3.mount(list_mock(
        "laws/",
        &[
            "laws/bgb/BJNR001950896.xml",
            "laws/skaufg/.last_modified_20200722",
            "laws/skaufg/BJNR055429995.xml",
            "laws/skaufg/bild.jpg",
            "laws/stray.txt",
        ],
    ));

    let listed = s3.location("laws").list_slugs_with_timestamps().unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed["skaufg"], "20200722");
    assert_eq!(listed["bgb"], "00000000");
}

#[test]
fn test_list_follows_continuation_tokens() {
    let s3 = MockS3::start();
    s3.mount(
        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/{BUCKET}/?$")))
            .and(query_param("prefix", "laws/"))
            .and(query_param_is_missing("continuation-token"))
            .respond_with(list_result(
                &["laws/a/.last_modified_20200101", "laws/a/a.xml"],
                Some("page2"),
            )),
    );
    s3.mount(
        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/{BUCKET}/?$")))
            .and(query_param("prefix", "laws/"))
            .and(query_param("continuation-token", "page2"))
            .respond_with(list_result(
                &["laws/b/.last_modified_20210101", "laws/b/b.xml"],
                None,
            )),
    );

    let listed = s3.location("laws/").list_slugs_with_timestamps().unwrap();

    assert_eq!(listed["a"], "20200101");
    assert_eq!(listed["b"], "20210101");
}

#[test]
fn test_ingest_from_bucket() {
    let s3 = MockS3::start();
    s3.mount(list_mock(
        "laws/skaufg/",
        &[
            "laws/skaufg/.last_modified_20200722",
            "laws/skaufg/BJNR055429995.xml",
            "laws/skaufg/bild.jpg",
        ],
    ));
    s3.mount(
        Mock::given(method("GET"))
            .and(path("/rechtsinfo/laws/skaufg/BJNR055429995.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(fixture_bytes())),
    );
    let location = s3.location("laws");

    assert_eq!(location.attachment_names("skaufg").unwrap(), vec!["bild.jpg"]);

    let mut xml = String::new();
    location
        .xml_file_for("skaufg")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("BJNR055429995"));

    let mut store = MemoryStore::new();
    ingest_law(&location, &mut store, "skaufg").unwrap();
    let stored = store.find_by_slug("skaufg").unwrap().unwrap();
    assert_eq!(stored.law.abbreviation, "SkAufG");
    assert_eq!(stored.attachment_names, vec!["bild.jpg"]);
}

#[test]
fn test_unknown_law() {
    let s3 = MockS3::start();
    s3.mount(list_mock("laws/missing/", &[]));

    let err = s3.location("laws").xml_file_for("missing").err().unwrap();
    assert!(matches!(err, HarvesterError::LawNotFound(_)));
}

#[test]
fn test_create_or_replace_uploads_members_and_marker() {
    let s3 = MockS3::start();
    s3.mount(list_mock("laws/skaufg/", &["laws/skaufg/old.xml"]));
    s3.mount(
        Mock::given(method("POST"))
            .and(path_regex(format!(r"^/{BUCKET}/?$")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<?xml version="1.0" encoding="UTF-8"?><DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"></DeleteResult>"#,
                "application/xml",
            )),
    );
    s3.mount(Mock::given(method("PUT")).respond_with(ResponseTemplate::new(200)));

    let archive = Archive {
        url: "http://www.gesetze-im-internet.de/skaufg/xml.zip".to_string(),
        bytes: zip_bytes(&[("BJNR055429995.xml", "<dokumente/>"), ("bild.jpg", "jpg")]),
        last_modified: "20200722".to_string(),
    };
    s3.location("laws").create_or_replace("skaufg", &archive).unwrap();

    let uploads: Vec<String> = s3
        .requests()
        .into_iter()
        .filter(|(method, _)| method == "PUT")
        .map(|(_, path)| path)
        .collect();
    assert_eq!(
        uploads,
        vec![
            "/rechtsinfo/laws/skaufg/BJNR055429995.xml",
            "/rechtsinfo/laws/skaufg/bild.jpg",
            "/rechtsinfo/laws/skaufg/.last_modified_20200722",
        ]
    );

    let deletes = s3.delete_bodies();
    assert_eq!(deletes.len(), 1);
    assert!(deletes[0].contains("<Key>laws/skaufg/old.xml</Key>"));
}

#[test]
fn test_remove_without_objects_sends_no_delete() {
    let s3 = MockS3::start();
    s3.mount(list_mock("skaufg/", &[]));

    s3.location("").remove("skaufg").unwrap();

    assert!(s3.requests().iter().all(|(method, _)| method == "GET"));
}

#[test]
fn test_invalid_archive_leaves_bucket_untouched() {
    let s3 = MockS3::start();
    let archive = Archive {
        url: "u".to_string(),
        bytes: b"not a zip".to_vec(),
        last_modified: "20200722".to_string(),
    };

    let err = s3.location("laws").create_or_replace("skaufg", &archive).unwrap_err();

    assert!(matches!(err, HarvesterError::Zip(_)));
    assert!(s3.requests().is_empty());
}

#[test]
fn test_rejects_unsafe_slug() {
    let s3 = MockS3::start();
    let err = s3.location("laws").remove("../x").unwrap_err();
    assert!(matches!(err, HarvesterError::InvalidSlug(_)));
}
