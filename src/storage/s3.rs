//! AWS S3 storage implementation.
//!
//! The list is a single object. The ETag returned on read is sent back as
//! `If-Match` on write, so S3 rejects the PUT with 412 when another run has
//! replaced the object in between.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::{PostingList, S3StoreConfig, VersionToken};
use crate::storage::ListStore;

/// S3-backed list store.
pub struct S3Store {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create the store with credentials from the default AWS chain.
    pub async fn from_config(config: &S3StoreConfig) -> Self {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&aws), &config.bucket, &config.key)
    }

    async fn put(&self, bytes: Vec<u8>, condition: Condition<'_>) -> Result<VersionToken> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(bytes))
            .content_type("application/json");

        let request = match condition {
            Condition::Matches(etag) => request.if_match(etag),
            Condition::Absent => request.if_none_match("*"),
        };

        match request.send().await {
            Ok(output) => {
                let etag = output
                    .e_tag()
                    .ok_or_else(|| AppError::store(self.location(), "PUT returned no ETag"))?;
                Ok(VersionToken::new(etag))
            }
            // 412: condition failed; 409: a concurrent conditional write won.
            Err(err) if matches!(status_of(&err), Some(409 | 412)) => Err(AppError::Conflict {
                location: self.location(),
            }),
            Err(err) => Err(AppError::store(self.location(), err.into_service_error())),
        }
    }
}

enum Condition<'a> {
    Matches(&'a str),
    Absent,
}

fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

#[async_trait]
impl ListStore for S3Store {
    async fn read(&self) -> Result<(VersionToken, PostingList)> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let etag = output
                    .e_tag()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::store(self.location(), "GET returned no ETag"))?;
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::store(self.location(), e))?
                    .into_bytes();
                let list = PostingList::from_json_slice(&bytes)?;
                Ok((VersionToken::new(etag), list))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Err(AppError::NotInitialized {
                        location: self.location(),
                    })
                } else {
                    Err(AppError::store(self.location(), service_err))
                }
            }
        }
    }

    async fn write(
        &self,
        list: &PostingList,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken> {
        let version = self
            .put(list.to_json_pretty()?, Condition::Matches(expected.as_str()))
            .await?;
        log::info!("{} (s3://{}/{})", message, self.bucket, self.key);
        Ok(version)
    }

    async fn init(&self) -> Result<VersionToken> {
        self.put(PostingList::default().to_json_pretty()?, Condition::Absent)
            .await
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}
