//! S3 adapter: streamed multipart writes and sequential reads

use crate::pipe::BlobReader;
use crate::{BlobDownload, BlobError, BlobUpload, ByteSource, Result, DEFAULT_PART_SIZE};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::SdkBody;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use uuid::Uuid;

/// S3 backend configuration options
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket holding all blob keys
    pub bucket: String,
    /// AWS region (optional, will use the default chain if not set)
    pub region: Option<String>,
    /// Custom endpoint URL (e.g. for MinIO or localstack)
    pub endpoint: Option<String>,
    /// Force path-style access (required for some S3-compatible services)
    pub force_path_style: bool,
    /// Part size for multipart uploads in bytes
    pub part_size: usize,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            force_path_style: false,
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

/// Derive the storage key for a blob reference.
///
/// The dash-free uuid encoding is split `aa/bb/rest` so keys fan out
/// across backend prefixes instead of piling onto one.
pub fn blob_key(id: Uuid) -> String {
    let s = id.simple().to_string();
    format!("_blob/{}/{}/{}", &s[..2], &s[2..4], &s[4..])
}

/// Object-storage backed blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    config: S3Config,
}

impl S3BlobStore {
    /// Connect a new store with the given configuration.
    pub async fn new(config: S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(BlobError::backend("configure", "bucket name cannot be empty"));
        }
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let base = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Ok(Self { client, config })
    }

    async fn begin_multipart(&self, key: &str) -> Result<MultipartState> {
        let out = self
            .client
            .create_multipart_upload()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| BlobError::backend("create multipart upload", DisplayErrorContext(&err)))?;
        let upload_id = out
            .upload_id()
            .ok_or_else(|| BlobError::backend("create multipart upload", "missing upload id"))?
            .to_owned();
        let guard = AbortGuard {
            client: self.client.clone(),
            bucket: self.config.bucket.clone(),
            key: key.to_owned(),
            upload_id: upload_id.clone(),
        };
        Ok(MultipartState {
            upload_id,
            parts: Vec::new(),
            next_part: 1,
            guard,
        })
    }

    /// Write one part. Parts go out strictly in order, one at a time.
    async fn write_part(&self, key: &str, state: &mut MultipartState, part: Bytes) -> Result<()> {
        let out = self
            .client
            .upload_part()
            .bucket(&self.config.bucket)
            .key(key)
            .upload_id(&state.upload_id)
            .part_number(state.next_part)
            .body(SdkBody::from(part).into())
            .send()
            .await
            .map_err(|err| BlobError::backend("upload part", DisplayErrorContext(&err)))?;
        state.parts.push(
            CompletedPart::builder()
                .part_number(state.next_part)
                .set_e_tag(out.e_tag().map(str::to_owned))
                .build(),
        );
        state.next_part += 1;
        Ok(())
    }
}

#[async_trait]
impl BlobUpload for S3BlobStore {
    async fn upload(&self, mut body: ByteSource<'_>) -> Result<(Uuid, i64)> {
        let id = Uuid::now_v7();
        let key = blob_key(id);
        let part_size = self.config.part_size;

        let mut buf = BytesMut::new();
        let mut size: i64 = 0;
        let mut mp: Option<MultipartState> = None;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            size += chunk.len() as i64;
            buf.extend_from_slice(&chunk);
            while buf.len() >= part_size {
                let part = buf.split_to(part_size).freeze();
                let state = match mp.as_mut() {
                    Some(state) => state,
                    None => mp.insert(self.begin_multipart(&key).await?),
                };
                self.write_part(&key, state, part).await?;
            }
        }

        match mp {
            // the whole body fit inside one part
            None => {
                self.client
                    .put_object()
                    .bucket(&self.config.bucket)
                    .key(&key)
                    .body(SdkBody::from(buf.freeze()).into())
                    .send()
                    .await
                    .map_err(|err| BlobError::backend("put object", DisplayErrorContext(&err)))?;
            }
            Some(mut state) => {
                if !buf.is_empty() {
                    self.write_part(&key, &mut state, buf.freeze()).await?;
                }
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(state.parts))
                    .build();
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.config.bucket)
                    .key(&key)
                    .upload_id(&state.upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|err| {
                        BlobError::backend("complete multipart upload", DisplayErrorContext(&err))
                    })?;
                // upload landed, nothing to abort
                std::mem::forget(state.guard);
            }
        }
        tracing::debug!(blob = %id, size, "uploaded blob");
        Ok((id, size))
    }
}

#[async_trait]
impl BlobDownload for S3BlobStore {
    async fn download(&self, id: Uuid) -> Result<(BlobReader, String)> {
        let key = blob_key(id);
        let (tx, rx) = BlobReader::pipe();
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        // one sequential read per request, no ranged fan-out
        let task = tokio::spawn(async move {
            let out = client.get_object().bucket(&bucket).key(&key).send().await;
            let mut stream = match out {
                Ok(out) => out.body,
                Err(err) => {
                    let _ = tx.send(Err(translate_get(err))).await;
                    return;
                }
            };
            loop {
                match stream.try_next().await {
                    Ok(Some(chunk)) => {
                        // a closed receiver means the caller went away
                        if tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(err) => {
                        let _ = tx
                            .send(Err(BlobError::backend("read object body", err)))
                            .await;
                        return;
                    }
                }
            }
        });
        BlobReader::peek(rx, task).await
    }
}

fn translate_get(err: SdkError<GetObjectError>) -> BlobError {
    if let Some(service) = err.as_service_error() {
        if service.is_no_such_key() {
            return BlobError::NotExist;
        }
    }
    BlobError::backend("get object", DisplayErrorContext(&err))
}

struct MultipartState {
    upload_id: String,
    parts: Vec<CompletedPart>,
    next_part: i32,
    guard: AbortGuard,
}

/// Aborts the multipart upload if it never completes, so failed
/// uploads do not accumulate unfinished parts in the bucket.
struct AbortGuard {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        let client = self.client.clone();
        let bucket = std::mem::take(&mut self.bucket);
        let key = std::mem::take(&mut self.key);
        let upload_id = std::mem::take(&mut self.upload_id);
        tokio::spawn(async move {
            if let Err(err) = client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(key, error = %DisplayErrorContext(&err), "failed to abort multipart upload");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_fans_out_two_levels() {
        let id = Uuid::parse_str("0123cdef-0123-7def-8123-456789abcdef").unwrap();
        let key = blob_key(id);
        assert_eq!(key, "_blob/01/23/cdef01237def8123456789abcdef");
    }

    #[test]
    fn key_is_stable_per_reference() {
        let id = Uuid::now_v7();
        assert_eq!(blob_key(id), blob_key(id));
        assert_ne!(blob_key(id), blob_key(Uuid::now_v7()));
    }
}
