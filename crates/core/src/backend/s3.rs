use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tracing::debug;

use super::Backend;
use crate::error::{StoreError, StoreResult};
use crate::object::{content_type_from_name, validate_name};

const NOT_FOUND: u16 = 404;

pub struct S3Backend {
    bucket: Box<Bucket>,
    prefix: String,
}

impl S3Backend {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        prefix: Option<&str>,
    ) -> StoreResult<Self> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .context("invalid S3 credentials")?;
        let bucket = Bucket::new(bucket_name, region, credentials)
            .with_context(|| format!("invalid S3 bucket: {bucket_name}"))?
            .with_path_style();
        let prefix = prefix.unwrap_or("").trim_matches('/').to_string();
        Ok(Self { bucket, prefix })
    }

    fn full_path(&self, name: &str) -> StoreResult<String> {
        validate_name(name)?;
        if self.prefix.is_empty() {
            Ok(name.to_string())
        } else {
            Ok(format!("{}/{name}", self.prefix))
        }
    }

    fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match key.strip_prefix(&self.list_prefix()) {
            Some(stripped) => stripped.to_string(),
            None => key,
        }
    }
}

/// Depending on the `fail-on-err` feature of `rust-s3`, a 404 arrives
/// either as an error or as a plain status code; both map to `NotFound`.
fn check_status(status: u16, name: &str, op: &str, key: &str) -> StoreResult<()> {
    match status {
        200..=299 => Ok(()),
        NOT_FOUND => Err(StoreError::not_found(name)),
        _ => Err(StoreError::Io(anyhow::anyhow!(
            "S3 {op} failed: {key} returned {status}"
        ))),
    }
}

fn map_error(err: S3Error, name: &str, op: &str, key: &str) -> StoreError {
    match err {
        S3Error::HttpFailWithBody(NOT_FOUND, _) => StoreError::not_found(name),
        other => StoreError::Io(anyhow::Error::new(other).context(format!("S3 {op} failed: {key}"))),
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn read(&self, name: &str) -> StoreResult<Bytes> {
        let full = self.full_path(name)?;
        debug!(key = %full, "S3 GET");
        let response = self
            .bucket
            .get_object(&full)
            .await
            .map_err(|e| map_error(e, name, "GET", &full))?;
        check_status(response.status_code(), name, "GET", &full)?;
        Ok(Bytes::from(response.to_vec()))
    }

    async fn write(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let full = self.full_path(name)?;
        let content_type = content_type_from_name(name);
        debug!(key = %full, size = data.len(), content_type = %content_type, "S3 PUT");
        let response = self
            .bucket
            .put_object_with_content_type(&full, data, &content_type)
            .await
            .map_err(|e| map_error(e, name, "PUT", &full))?;
        check_status(response.status_code(), name, "PUT", &full)
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let full = self.full_path(name)?;
        debug!(key = %full, "S3 HEAD");
        let result = match self.bucket.head_object(&full).await {
            Ok((_, status)) => check_status(status, name, "HEAD", &full),
            Err(e) => Err(map_error(e, name, "HEAD", &full)),
        };
        match result {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let prefix = self.list_prefix();
        debug!(prefix = %prefix, "S3 LIST");
        let results = self
            .bucket
            .list(prefix.clone(), Some("/".to_string()))
            .await
            .with_context(|| format!("S3 LIST failed: {prefix}"))?;
        let mut names = Vec::new();
        for result in results {
            for obj in result.contents {
                names.push(self.strip_prefix(obj.key));
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        if !self.exists(name).await? {
            return Err(StoreError::not_found(name));
        }
        let full = self.full_path(name)?;
        debug!(key = %full, "S3 DELETE");
        let response = self
            .bucket
            .delete_object(&full)
            .await
            .map_err(|e| map_error(e, name, "DELETE", &full))?;
        check_status(response.status_code(), name, "DELETE", &full)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn backend(prefix: Option<&str>) -> S3Backend {
        S3Backend::new(
            "images",
            "http://127.0.0.1:9000",
            "auto",
            "access",
            "secret",
            prefix,
        )
        .unwrap()
    }

    #[test]
    fn keys_are_scoped_under_prefix() {
        let plain = backend(None);
        assert_eq!(plain.full_path("a.png").unwrap(), "a.png");
        assert_eq!(plain.list_prefix(), "");

        let scoped = backend(Some("/uploads/"));
        assert_eq!(scoped.full_path("a.png").unwrap(), "uploads/a.png");
        assert_eq!(scoped.list_prefix(), "uploads/");
        assert_eq!(scoped.strip_prefix("uploads/a.png".into()), "a.png");
        assert_eq!(scoped.strip_prefix("other/a.png".into()), "other/a.png");
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let scoped = backend(Some("uploads"));
        assert!(matches!(
            scoped.full_path("../other/a.png"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(200, "a.png", "GET", "a.png").is_ok());
        assert!(check_status(204, "a.png", "DELETE", "a.png").is_ok());
        assert!(
            check_status(404, "a.png", "GET", "a.png")
                .unwrap_err()
                .is_not_found()
        );
        assert!(matches!(
            check_status(403, "a.png", "GET", "a.png"),
            Err(StoreError::Io(_))
        ));
        let err = map_error(
            S3Error::HttpFailWithBody(404, String::new()),
            "a.png",
            "GET",
            "a.png",
        );
        assert!(err.is_not_found());
        let err = map_error(
            S3Error::HttpFailWithBody(500, "boom".into()),
            "a.png",
            "GET",
            "a.png",
        );
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn invalid_names_fail_before_any_request() {
        let b = backend(None);
        assert!(matches!(
            b.read("../../etc/passwd").await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            b.delete("a/b.png").await,
            Err(StoreError::Validation(_))
        ));
    }

    fn backend_at(server: &MockServer, prefix: Option<&str>) -> S3Backend {
        S3Backend::new("images", &server.uri(), "auto", "access", "secret", prefix).unwrap()
    }

    const NO_SUCH_KEY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>"#;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>images</Name>
  <Prefix>uploads/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>uploads/b.png</Key>
    <LastModified>2026-10-19T10:00:00.000Z</LastModified>
    <ETag>"b"</ETag>
    <Size>3</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>uploads/a.png</Key>
    <LastModified>2026-10-19T10:00:00.000Z</LastModified>
    <ETag>"a"</ETag>
    <Size>5</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

    #[tokio::test]
    async fn get_returns_object_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .mount(&server)
            .await;

        let data = backend_at(&server, None).read("a.png").await.unwrap();
        assert_eq!(&data[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn get_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/missing.png"))
            .respond_with(ResponseTemplate::new(404).set_body_string(NO_SUCH_KEY))
            .mount(&server)
            .await;

        let err = backend_at(&server, None).read("missing.png").await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn get_403_is_io_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/forbidden.png"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = backend_at(&server, None)
            .read("forbidden.png")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "{err}");
    }

    #[tokio::test]
    async fn put_sends_guessed_content_type_under_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/images/uploads/cat.png"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        backend_at(&server, Some("uploads"))
            .write("cat.png", b"\x89PNG")
            .await
            .unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn delete_of_missing_object_sends_no_delete() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/images/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let backend = backend_at(&server, None);
        assert!(!backend.exists("missing.png").await.unwrap());
        let err = backend.delete("missing.png").await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
        server.verify().await;
    }

    #[tokio::test]
    async fn delete_checks_head_then_removes() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/images/a.png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/images/a.png"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend_at(&server, None).delete("a.png").await.unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn list_strips_prefix_from_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("list-type", "2"))
            .and(query_param("prefix", "uploads/"))
            .and(query_param("delimiter", "/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml")
                    .set_body_string(LISTING),
            )
            .mount(&server)
            .await;

        let names = backend_at(&server, Some("uploads")).list().await.unwrap();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
