//! Google Cloud Storage object store.
//!
//! Uses the JSON API directly: a metadata `GET` for existence checks and a
//! media upload guarded by `ifGenerationMatch=0`, so an existing object is
//! never overwritten.

use crate::http::{error_from_response, request_error};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use tracing::debug;
use tuneup_training::{ObjectStore, TrainingError, TrainingResult};

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

/// Create-only uploads into one Cloud Storage bucket.
pub struct GcsObjectStore {
    bucket: String,
    access_token: String,
    http_client: Client,
    base_url: String,
}

impl GcsObjectStore {
    /// Creates a store for `bucket` authenticating with an OAuth access token.
    #[must_use]
    pub fn with_access_token(bucket: String, access_token: String) -> Self {
        Self { bucket, access_token, http_client: Client::new(), base_url: DEFAULT_BASE_URL.to_string() }
    }

    /// Points the client at a different endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn uri(&self, name: &str) -> String {
        format!("gs://{}/{}", self.bucket, name)
    }

    async fn exists(&self, name: &str) -> TrainingResult<bool> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(name)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| request_error("check object", &e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(response, &format!("check object {}", self.uri(name))).await),
        }
    }

    async fn upload_new(&self, local_path: &Path, name: &str) -> TrainingResult<String> {
        debug!(path = %local_path.display(), object = %self.uri(name), "Uploading to Cloud Storage");

        let body = tokio::fs::read(local_path).await?;
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, urlencoding::encode(&self.bucket));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media"), ("name", name), ("ifGenerationMatch", "0")])
            .header(reqwest::header::CONTENT_TYPE, "application/jsonl")
            .body(body)
            .send()
            .await
            .map_err(|e| request_error("upload object", &e))?;

        match response.status() {
            s if s.is_success() => Ok(self.uri(name)),
            StatusCode::PRECONDITION_FAILED => Err(TrainingError::DestinationExists(self.uri(name))),
            _ => Err(error_from_response(response, &format!("upload {}", self.uri(name))).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn store(server: &mockito::Server) -> GcsObjectStore {
        GcsObjectStore::with_access_token("bucket".to_string(), "token".to_string()).with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_exists_maps_status_codes() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("GET", "/storage/v1/b/bucket/o/present.jsonl")
            .match_header("authorization", "Bearer token")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/storage/v1/b/bucket/o/absent.jsonl")
            .with_status(404)
            .create_async()
            .await;
        let broken = server
            .mock("GET", "/storage/v1/b/bucket/o/broken.jsonl")
            .with_status(500)
            .with_body("backend error")
            .create_async()
            .await;

        let store = store(&server);
        assert!(store.exists("present.jsonl").await.unwrap());
        assert!(!store.exists("absent.jsonl").await.unwrap());
        assert!(matches!(store.exists("broken.jsonl").await, Err(TrainingError::Transport(_))));

        found.assert_async().await;
        missing.assert_async().await;
        broken.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_uses_create_only_precondition() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/upload/storage/v1/b/bucket/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "train.jsonl".into()),
                Matcher::UrlEncoded("ifGenerationMatch".into(), "0".into()),
            ]))
            .match_body("{\"contents\":[]}\n")
            .with_status(200)
            .with_body(r#"{"name": "train.jsonl"}"#)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let local = temp.path().join("train.jsonl");
        std::fs::write(&local, "{\"contents\":[]}\n").unwrap();

        let uri = store(&server).upload_new(&local, "train.jsonl").await.unwrap();
        assert_eq!(uri, "gs://bucket/train.jsonl");
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_precondition_is_destination_exists() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/upload/storage/v1/b/bucket/o")
            .match_query(Matcher::Any)
            .with_status(412)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let local = temp.path().join("x.jsonl");
        std::fs::write(&local, "").unwrap();

        let err = store(&server).upload_new(&local, "x.jsonl").await.unwrap_err();
        assert!(matches!(err, TrainingError::DestinationExists(uri) if uri == "gs://bucket/x.jsonl"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/upload/storage/v1/b/bucket/o")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let local = temp.path().join("x.jsonl");
        std::fs::write(&local, "").unwrap();

        let err = store(&server).upload_new(&local, "x.jsonl").await.unwrap_err();
        assert!(matches!(err, TrainingError::Transport(msg) if msg.contains("forbidden")));
    }
}
