use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use partnerdesk_core::AwsSettings;

use crate::store::{ListPage, ObjectMeta, ObjectStore, StoreError};

pub async fn load_sdk_config(aws: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some((access_key, secret_key)) = aws.static_credentials() {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "partnerdesk",
        ));
    }
    loader.load().await
}

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(sdk: &SdkConfig, aws: &AwsSettings, bucket: impl Into<String>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk);
        if let Some(endpoint) = &aws.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.into(),
        }
    }

    fn copy_source(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.bucket, encoded.join("/"))
    }
}

fn classify<E>(err: SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|resp| resp.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    match (status, code.as_deref()) {
        (Some(404), _) | (_, Some("NoSuchKey" | "NotFound" | "404")) => {
            StoreError::NotFound(key.to_string())
        }
        (Some(403), _) | (_, Some("AccessDenied" | "403")) => StoreError::AccessDenied(message),
        _ => StoreError::Backend(message),
    }
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(&self, cursor: Option<String>) -> Result<ListPage, StoreError> {
        let mut req = self.client.list_objects_v2().bucket(&self.bucket);
        if let Some(token) = cursor {
            req = req.continuation_token(token);
        }
        let output = req.send().await.map_err(|err| classify(err, &self.bucket))?;
        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next_cursor = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ListPage { keys, next_cursor })
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(err, key))?;
        Ok(ObjectMeta {
            key: key.to_string(),
            last_modified: output.last_modified().and_then(to_chrono),
            size: output.content_length().unwrap_or(0).max(0) as u64,
        })
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        debug!(bucket = %self.bucket, key, bytes = body.len(), "put_object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| classify(err, key))?;
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError> {
        debug!(bucket = %self.bucket, source, destination, "copy_object");
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(self.copy_source(source))
            .key(destination)
            .send()
            .await
            .map_err(|err| classify(err, source))?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| classify(err, &self.bucket))?;
        debug!(
            bucket = %self.bucket,
            requested = keys.len(),
            errors = output.errors().len(),
            "delete_objects"
        );
        Ok(())
    }
}
