//! S3-compatible storage backend

use crate::config::BucketConfig;
use crate::error::{Error, Result};
use crate::storage::ByteStream;
use crate::types::RemoteObject;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

/// S3 minimum part size (5MB); smaller payloads use a single PUT
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// S3-compatible storage backend
#[derive(Clone)]
pub struct S3Store {
    /// S3 client
    client: Client,
    /// Bucket name
    bucket: String,
    /// Region the client signs for
    region: String,
}

impl S3Store {
    /// Create a new S3 backend from explicit endpoint and credentials
    pub async fn new(config: &BucketConfig) -> Result<Self> {
        let region = config.effective_region().to_string();
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "mediasync",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(!config.virtual_host_style)
            .build();

        tracing::debug!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            region = %region,
            virtual_host_style = config.virtual_host_style,
            "Created S3 client"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List every object in the bucket, draining all pages
    pub async fn list(&self) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();

        let mut paginator = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = paginator.next().await {
            let output = page.map_err(|e| store_error("listing bucket", e))?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    if key.ends_with('/') {
                        continue;
                    }
                    objects.push(RemoteObject::new(key, obj.size().unwrap_or(0).max(0) as u64));
                }
            }
        }

        Ok(objects)
    }

    /// Get object metadata (head request)
    pub async fn head(&self, name: &str) -> Result<Option<RemoteObject>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(output) => Ok(Some(RemoteObject::new(
                name,
                output.content_length().unwrap_or(0).max(0) as u64,
            ))),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(store_error("head object", e)),
        }
    }

    /// Read an object as a stream of chunks
    pub async fn get(&self, name: &str) -> Result<ByteStream> {
        use tokio_util::io::ReaderStream;

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(Error::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(store_error("get object", e)),
        };

        let stream = ReaderStream::new(output.body.into_async_read()).map(|result| {
            result.map_err(|e| Error::store(format!("reading object body: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    /// Upload exactly `size` bytes from the stream
    ///
    /// Payloads below [`MIN_PART_SIZE`] are buffered and sent with one PUT;
    /// larger ones go through a multipart upload that is aborted on failure.
    pub async fn put(&self, name: &str, mut stream: ByteStream, size: u64) -> Result<u64> {
        if size < MIN_PART_SIZE {
            let mut buffer = BytesMut::with_capacity(size as usize);
            while let Some(chunk) = stream.next().await {
                buffer.extend_from_slice(&chunk?);
                if buffer.len() as u64 > size {
                    break;
                }
            }
            check_size(name, size, buffer.len() as u64)?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(name)
                .content_length(size as i64)
                .body(AwsByteStream::from(buffer.freeze()))
                .send()
                .await
                .map_err(|e| store_error("put object", e))?;

            return Ok(size);
        }

        let upload_id = self.create_multipart_upload(name).await?;
        match self.upload_parts(name, &upload_id, stream, size).await {
            Ok(parts) => {
                self.complete_multipart_upload(name, &upload_id, parts).await?;
                Ok(size)
            }
            Err(e) => {
                if let Err(abort_err) = self.abort_multipart_upload(name, &upload_id).await {
                    tracing::warn!(name = %name, error = %abort_err, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        name: &str,
        upload_id: &str,
        mut stream: ByteStream,
        size: u64,
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut part_number = 1;
        let mut buffer = BytesMut::new();
        let mut total = 0u64;

        while let Some(chunk) = stream.next().await {
            let data = chunk?;
            total += data.len() as u64;
            if total > size {
                break;
            }
            buffer.extend_from_slice(&data);

            if buffer.len() as u64 >= MIN_PART_SIZE {
                let part = self
                    .upload_part(name, upload_id, part_number, buffer.split().freeze())
                    .await?;
                parts.push(part);
                part_number += 1;
            }
        }
        check_size(name, size, total)?;

        if !buffer.is_empty() {
            let part = self
                .upload_part(name, upload_id, part_number, buffer.freeze())
                .await?;
            parts.push(part);
        }

        Ok(parts)
    }

    /// Delete an object
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| store_error("delete object", e))?;

        Ok(())
    }

    /// Create a bucket in this client's region
    pub async fn create_bucket(&self, name: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(name);
        if self.region != crate::config::DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                tracing::debug!(bucket = %name, "Bucket already exists");
                Ok(())
            }
            Err(e) => Err(store_error("create bucket", e)),
        }
    }

    async fn create_multipart_upload(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| store_error("create multipart upload", e))?;

        output
            .upload_id()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::store("no upload ID returned"))
    }

    async fn upload_part(
        &self,
        name: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<CompletedPart> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(name)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(|e| store_error("upload part", e))?;

        let etag = output
            .e_tag()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::store(format!("no ETag returned for part {}", part_number)))?;

        Ok(CompletedPart::builder()
            .part_number(part_number)
            .e_tag(etag)
            .build())
    }

    async fn complete_multipart_upload(
        &self,
        name: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(name)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| store_error("complete multipart upload", e))?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, name: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(name)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| store_error("abort multipart upload", e))?;

        Ok(())
    }
}

/// Keep the whole cause chain; the SDK's Display alone is just "service error"
fn store_error(context: &str, err: impl std::error::Error) -> Error {
    Error::store(format!("{}: {}", context, DisplayErrorContext(err)))
}

fn check_size(name: &str, expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::SizeMismatch {
            name: name.to_string(),
            expected,
            actual,
        })
    }
}
