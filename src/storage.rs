use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lifetime of a presigned vehicle-image upload URL.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Contract for the object store holding vehicle photos. Handlers only ever hand out
/// presigned PUT URLs; image bytes never pass through this server.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Called at startup in `Env::Local` only.
    async fn ensure_bucket_exists(&self);

    /// Generates a time-limited URL allowing a client to PUT one object at `key`.
    /// The upload must carry `content_type`.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> AppResult<String>;
}

/// S3StorageClient
///
/// aws-sdk-s3 client pointed at MinIO locally or any S3-compatible endpoint in
/// production. Path-style addressing is forced for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
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

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails with BucketAlreadyOwnedByYou on every restart after the first.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| AppError::Internal(format!("Invalid presigning config: {e}")))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!(key, error = %e, "Failed to presign upload");
                AppError::Internal(format!("Failed to presign upload: {e}"))
            })?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a caller-influenced key cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// vehicle_image_key
///
/// `vehicles/<vehicle_id>/<random uuid>.<ext>`. The extension is taken from the
/// uploaded filename, lower-cased and restricted to ASCII alphanumerics; `bin` when
/// nothing usable remains.
pub fn vehicle_image_key(vehicle_id: Uuid, filename: &str) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    format!("vehicles/{}/{}.{}", vehicle_id, Uuid::new_v4(), ext)
}

/// MockStorageService
///
/// Network-free `StorageService` for tests and the in-memory demo mode.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, presigning fails.
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

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> AppResult<String> {
        if self.should_fail {
            return Err(AppError::Internal(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle on the storage service inside `AppState`.
pub type StorageState = Arc<dyn StorageService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_segments_are_removed() {
        assert_eq!(sanitize_key("vehicles/../../etc/./passwd"), "vehicles/etc/passwd");
        assert_eq!(sanitize_key("//a//b/"), "a/b");
    }

    #[test]
    fn image_keys_live_under_the_vehicle_prefix() {
        let id = Uuid::new_v4();
        let key = vehicle_image_key(id, "Front View.JPG");
        assert!(key.starts_with(&format!("vehicles/{id}/")));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn unusable_extensions_fall_back_to_bin() {
        let id = Uuid::new_v4();
        assert!(vehicle_image_key(id, "noextension").ends_with(".bin"));
        assert!(vehicle_image_key(id, "weird.../").ends_with(".bin"));
    }
}
