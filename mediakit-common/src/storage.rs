//! Cloud Storage client used for media artifacts.

use crate::auth::{scopes, Credentials};
use crate::error::StorageError;

/// Parsed `gs://bucket/object` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    /// Bucket name
    pub bucket: String,
    /// Object path within the bucket
    pub object: String,
}

impl ObjectUri {
    /// Parse a `gs://bucket/path` URI.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidUri` when the scheme, bucket, or object
    /// path is missing.
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let rest = uri
            .strip_prefix("gs://")
            .ok_or_else(|| StorageError::InvalidUri(format!("expected gs:// scheme: {uri}")))?;

        let (bucket, object) = rest
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidUri(format!("expected bucket and object path: {uri}")))?;

        if bucket.is_empty() {
            return Err(StorageError::InvalidUri(format!("empty bucket name: {uri}")));
        }
        if object.is_empty() {
            return Err(StorageError::InvalidUri(format!("empty object path: {uri}")));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }

    /// File name component of the object path.
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }
}

impl std::fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

/// JSON-API Cloud Storage client.
pub struct StorageClient {
    http: reqwest::Client,
    creds: Credentials,
    /// API root, overridable so tests can point at a mock server.
    base_url: String,
}

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

impl StorageClient {
    /// Client over the given credentials against the production API.
    pub fn new(creds: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            creds,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Client against a non-default API root. Used by tests.
    pub fn with_base_url(creds: Credentials, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            creds,
            base_url,
        }
    }

    /// Upload `data` to `uri` with the given content type.
    ///
    /// # Errors
    /// Returns `StorageError::Transfer` on request or status failures.
    pub async fn upload(
        &self,
        uri: &ObjectUri,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let token = self
            .creds
            .bearer_token(&[scopes::STORAGE_READ_WRITE])
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            uri.bucket,
            urlencoding::encode(&uri.object)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Content-Type", content_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::transfer(uri.to_string(), "upload", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::transfer(
                uri.to_string(),
                "upload",
                format!("status {status}: {body}"),
            ));
        }

        Ok(())
    }

    /// Download the object at `uri`.
    ///
    /// # Errors
    /// Returns `StorageError::Transfer` on request or status failures.
    pub async fn download(&self, uri: &ObjectUri) -> Result<Vec<u8>, StorageError> {
        let token = self
            .creds
            .bearer_token(&[scopes::STORAGE_READ_ONLY])
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))?;

        let url = format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            uri.bucket,
            urlencoding::encode(&uri.object)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| StorageError::transfer(uri.to_string(), "download", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::transfer(
                uri.to_string(),
                "download",
                format!("status {status}: {body}"),
            ));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| StorageError::transfer(uri.to_string(), "download", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parse_accepts_nested_object_paths() {
        let uri = ObjectUri::parse("gs://media/outputs/2024/clip.mp4").unwrap();
        assert_eq!(uri.bucket, "media");
        assert_eq!(uri.object, "outputs/2024/clip.mp4");
        assert_eq!(uri.file_name(), "clip.mp4");
    }

    #[test]
    fn parse_display_round_trips() {
        let raw = "gs://bucket/a/b.wav";
        assert_eq!(ObjectUri::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn parse_rejects_wrong_scheme() {
        assert!(ObjectUri::parse("s3://bucket/key").is_err());
        assert!(ObjectUri::parse("/local/path.mp4").is_err());
    }

    #[test]
    fn parse_rejects_missing_object() {
        assert!(ObjectUri::parse("gs://bucket").is_err());
        assert!(ObjectUri::parse("gs://bucket/").is_err());
        assert!(ObjectUri::parse("gs:///object").is_err());
    }

    #[tokio::test]
    async fn download_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/media/o/clip.wav"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
            .mount(&server)
            .await;

        let client = StorageClient::with_base_url(Credentials::fixed("t"), server.uri());
        let uri = ObjectUri::parse("gs://media/clip.wav").unwrap();
        let data = client.download(&uri).await.unwrap();
        assert_eq!(data, b"RIFFdata");
    }

    #[tokio::test]
    async fn download_maps_404_to_transfer_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("No such object"))
            .mount(&server)
            .await;

        let client = StorageClient::with_base_url(Credentials::fixed("t"), server.uri());
        let uri = ObjectUri::parse("gs://media/gone.wav").unwrap();
        let err = client.download(&uri).await.unwrap_err();
        assert!(matches!(err, StorageError::Transfer { verb: "download", .. }));
    }

    #[tokio::test]
    async fn upload_posts_media_to_upload_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/media/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "out/clip.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = StorageClient::with_base_url(Credentials::fixed("t"), server.uri());
        let uri = ObjectUri::parse("gs://media/out/clip.gif").unwrap();
        client.upload(&uri, b"GIF89a", "image/gif").await.unwrap();
    }

    #[tokio::test]
    async fn upload_surfaces_status_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = StorageClient::with_base_url(Credentials::fixed("t"), server.uri());
        let uri = ObjectUri::parse("gs://media/out.gif").unwrap();
        let err = client.upload(&uri, b"x", "image/gif").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
