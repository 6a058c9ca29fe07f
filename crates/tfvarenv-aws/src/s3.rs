use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::BucketVersioningStatus;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use tfvarenv_core::{
    CoreError, ObjectStore, ObjectVersion, PutObject, PutOutput, Result, StoredObject,
};

/// S3 error codes meaning "nothing stored at this key/version"
const MISSING_CODES: [&str; 3] = ["NoSuchKey", "NoSuchVersion", "NotFound"];

pub struct AwsStore {
    s3: S3Client,
    sts: StsClient,
    region: String,
}

impl std::fmt::Debug for AwsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsStore")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsStore {
    /// Builds clients for `region` from the default credential chain.
    pub async fn new(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        tracing::debug!("Created AWS clients for region {}", region);
        Self {
            s3: S3Client::new(&sdk_config),
            sts: StsClient::new(&sdk_config),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl ObjectStore for AwsStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<Option<StoredObject>> {
        tracing::debug!(
            "GetObject s3://{}/{} version={}",
            bucket,
            key,
            version_id.unwrap_or("latest")
        );

        let response = self
            .s3
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() || is_missing(err.code()) {
                    return Ok(None);
                }
                return Err(CoreError::Storage(format!(
                    "failed to get s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&err)
                )));
            }
        };

        let version_id = output.version_id().map(str::to_string);
        let metadata = output.metadata().cloned().unwrap_or_default();
        let last_modified = output.last_modified().and_then(to_chrono);
        let content = output
            .body
            .collect()
            .await
            .map_err(|e| {
                CoreError::Storage(format!("failed to read s3://{}/{}: {}", bucket, key, e))
            })?
            .into_bytes()
            .to_vec();

        Ok(Some(StoredObject {
            content,
            version_id,
            metadata,
            last_modified,
        }))
    }

    async fn put_object(&self, request: PutObject) -> Result<PutOutput> {
        tracing::debug!(
            "PutObject s3://{}/{} ({} bytes)",
            request.bucket,
            request.key,
            request.content.len()
        );

        let metadata = (!request.metadata.is_empty()).then_some(request.metadata);
        let output = self
            .s3
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.content))
            .set_content_type(request.content_type)
            .set_metadata(metadata)
            .send()
            .await
            .map_err(|e| {
                CoreError::Storage(format!(
                    "failed to put s3://{}/{}: {}",
                    request.bucket,
                    request.key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(PutOutput {
            version_id: output.version_id().map(str::to_string),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn check_versioning(&self, bucket: &str) -> Result<()> {
        let output = self
            .s3
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                CoreError::Storage(format!(
                    "failed to read versioning of bucket {}: {}",
                    bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        match output.status() {
            Some(BucketVersioningStatus::Enabled) => Ok(()),
            _ => Err(CoreError::Storage(format!(
                "versioning is not enabled on bucket {}",
                bucket
            ))),
        }
    }

    async fn list_versions(
        &self,
        bucket: &str,
        key: &str,
        limit: usize,
    ) -> Result<Vec<ObjectVersion>> {
        let output = self
            .s3
            .list_object_versions()
            .bucket(bucket)
            .prefix(key)
            .max_keys(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| {
                CoreError::Storage(format!(
                    "failed to list versions of s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .versions()
            .iter()
            .filter(|v| v.key() == Some(key))
            .take(limit)
            .map(|v| ObjectVersion {
                version_id: v.version_id().unwrap_or_default().to_string(),
                last_modified: v.last_modified().and_then(to_chrono),
                size: v.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                is_latest: v.is_latest().unwrap_or(false),
            })
            .collect())
    }

    async fn caller_account_id(&self) -> Result<String> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                CoreError::Storage(format!(
                    "failed to get caller identity: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| CoreError::Storage("caller identity has no account".to_string()))
    }
}

fn is_missing(code: Option<&str>) -> bool {
    code.is_some_and(|c| MISSING_CODES.contains(&c))
}

fn to_chrono(time: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}
