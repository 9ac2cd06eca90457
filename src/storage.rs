use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

// 1. StorageService Contract

/// StorageService
///
/// Defines the abstract contract for the object store holding post images. Posts
/// reference images by object key only; bytes travel directly between the client
/// and the store via presigned URLs, never through this service. The trait lets
/// tests swap the real S3 client for the in-memory Mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision the bucket in MinIO automatically. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary, signed URL allowing a client to upload a post
    /// image directly to the bucket.
    ///
    /// # Arguments
    /// * `key`: the final object key under the image prefix.
    /// * `content_type`: the expected MIME type; only image types are accepted.
    async fn presigned_image_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

// 2. The Real Implementation (S3/MinIO)

/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3, compatible with both the
/// local Dockerized MinIO instance and managed S3-style storage in production.
/// `force_path_style(true)` is required for MinIO-style gateways.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Calls the idempotent CreateBucket API; safe to run at every startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    /// presigned_image_upload_url
    ///
    /// Produces a short-lived PUT URL constrained to the declared image content
    /// type. Non-image types are rejected before any signing happens.
    async fn presigned_image_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        if !content_type.starts_with("image/") {
            return Err(format!("unsupported content type: {}", content_type));
        }

        // Ten-minute expiry keeps the upload window tight.
        let expires_in = Duration::from_secs(600);

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The signed request pins this Content-Type; uploads with another
            // type fail at the store.
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in).map_err(|e| e.to_string())?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) from a user-provided key
/// segment so a crafted filename cannot escape the image prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)

/// MockStorageService
///
/// Mock implementation of `StorageService` used by handler tests, returning a
/// deterministic local-style URL without network traffic.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn presigned_image_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock storage error: simulation requested".to_string());
        }
        if !content_type.starts_with("image/") {
            return Err(format!("unsupported content type: {}", content_type));
        }

        let sanitized_key = sanitize_key(key);

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitized_key
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
