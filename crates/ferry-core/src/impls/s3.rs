//! S3ClientFactory / S3Client - rust-s3 ベースの StorageClient
//!
//! # 実装詳細
//! - connect では接続しない（Bucket は呼び出しごとに作る軽量な値）
//! - fail-on-err を無効にしているので、ステータスコードは自分で確認する
//! - NoSuchKey の判定はレスポンスボディの `<Code>` で行う
//! - 一覧は ListObjectsV2 を 1 ページずつ取得し、continuation token をたどる
//! - オブジェクトは 1 件ずつ順番に転送する

use crate::domain::config::StorageEndpointConfig;
use crate::domain::locator::ArtifactLocator;
use crate::impls::local_fs::{ensure_parent, list_files, local_path_for};
use crate::ports::{ClientFactory, StorageClient};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::command::Command;
use s3::creds::Credentials;
use s3::creds::error::CredentialsError;
use s3::error::S3Error;
use s3::request::tokio_backend::ReqwestRequest;
use s3::request::{Request as _, ResponseData};
use s3::serde_types::ListBucketResult;
use s3::Region;
use serde::Deserialize;
use std::path::Path;

/// S3ClientError は S3Client のエラー
#[derive(Debug, thiserror::Error)]
pub enum S3ClientError {
    #[error("NoSuchKey: s3://{bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("s3://{bucket}/{key}: HTTP {status} {code}")]
    Status {
        bucket: String,
        key: String,
        status: u16,
        code: String,
    },

    /// 空のオブジェクト名。`GET /bucket/` はバケットの一覧になってしまう
    #[error("s3://{bucket}/: object name cannot be empty")]
    EmptyKey { bucket: String },

    #[error("failed to load S3 credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    S3(#[from] S3Error),

    #[error("malformed S3 response: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// S3ClientFactory は設定から S3Client を作る
#[derive(Debug, Clone, Copy, Default)]
pub struct S3ClientFactory;

impl ClientFactory for S3ClientFactory {
    type Client = S3Client;

    fn connect(&self, config: &StorageEndpointConfig) -> Result<S3Client, S3ClientError> {
        let credentials = if config.has_static_credentials() {
            Credentials::new(
                Some(&config.access_key),
                Some(&config.secret_key),
                None,
                None,
                None,
            )?
        } else {
            // env / profile / instance metadata の順に探す
            Credentials::new(None, None, None, None, None)?
        };

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint_url(config),
        };

        Ok(S3Client {
            region,
            credentials,
            path_style: config.path_style,
        })
    }
}

/// 設定から endpoint の URL を組み立てる
///
/// - 空: AWS S3 (`https://s3.{region}.amazonaws.com`)
/// - scheme 付き: そのまま
/// - それ以外: `secure` に応じて https / http を付ける
pub fn endpoint_url(config: &StorageEndpointConfig) -> String {
    if config.endpoint.is_empty() {
        format!("https://s3.{}.amazonaws.com", config.region)
    } else if config.endpoint.contains("://") {
        config.endpoint.clone()
    } else {
        let scheme = if config.secure { "https" } else { "http" };
        format!("{scheme}://{}", config.endpoint)
    }
}

/// S3Client は 1 回の Load / Save 用のハンドル
pub struct S3Client {
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Client {
    fn bucket(&self, name: &str) -> Result<Box<Bucket>, S3ClientError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }

    async fn fetch(&self, bucket: &Bucket, key: &str, dest: &Path) -> Result<(), S3ClientError> {
        let response = bucket
            .get_object(key)
            .await
            .map_err(|e| from_s3_error(e, &bucket.name, key))?;
        check_status(&response, &bucket.name, key)?;
        ensure_parent(dest).await?;
        tokio::fs::write(dest, response.bytes()).await?;
        Ok(())
    }

    async fn store(&self, bucket: &Bucket, key: &str, src: &Path) -> Result<(), S3ClientError> {
        let data = tokio::fs::read(src).await?;
        let response = bucket
            .put_object(key, &data)
            .await
            .map_err(|e| from_s3_error(e, &bucket.name, key))?;
        check_status(&response, &bucket.name, key)
    }

    /// ListObjectsV2 を 1 ページ分取得する
    ///
    /// `Bucket::list_page` はステータスを見る前にボディを一覧として読むので、
    /// エラーレスポンスの `<Code>` が失われる。ここではステータスを先に確認する。
    async fn list_page(
        &self,
        bucket: &Bucket,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListBucketResult, S3ClientError> {
        let command = Command::ListObjectsV2 {
            prefix: prefix.to_string(),
            delimiter: delimiter.map(str::to_string),
            continuation_token,
            start_after: None,
            max_keys: None,
        };
        let request = ReqwestRequest::new(bucket, "/", command).await?;
        let response = request
            .response_data(false)
            .await
            .map_err(|e| from_s3_error(e, &bucket.name, prefix))?;
        check_status(&response, &bucket.name, prefix)?;
        Ok(quick_xml::de::from_reader(response.as_slice())?)
    }
}

#[async_trait]
impl StorageClient for S3Client {
    type Error = S3ClientError;

    async fn get_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), S3ClientError> {
        require_key(bucket, key)?;
        let bucket = self.bucket(bucket)?;
        self.fetch(&bucket, key, dest).await
    }

    async fn get_prefix(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), S3ClientError> {
        let locator = ArtifactLocator::new(bucket, key);
        let prefix = locator.prefix();
        let bucket = self.bucket(bucket)?;
        let mut token = None;
        loop {
            let page = self.list_page(&bucket, &prefix, None, token).await?;
            for object in &page.contents {
                // フォルダマーカー（末尾 `/`）は relative_key が None を返す
                let Some(rel) = locator.relative_key(&object.key) else {
                    continue;
                };
                let path = local_path_for(dest, rel)?;
                self.fetch(&bucket, &object.key, &path).await?;
            }
            token = page.next_continuation_token;
            if token.is_none() {
                return Ok(());
            }
        }
    }

    async fn is_prefix(&self, bucket: &str, key: &str) -> Result<bool, S3ClientError> {
        let prefix = ArtifactLocator::new(bucket, key).prefix();
        let bucket = self.bucket(bucket)?;
        let mut token = None;
        loop {
            let page = self.list_page(&bucket, &prefix, Some("/"), token).await?;
            let has_prefixes = page
                .common_prefixes
                .as_ref()
                .is_some_and(|prefixes| !prefixes.is_empty());
            if !page.contents.is_empty() || has_prefixes {
                return Ok(true);
            }
            token = page.next_continuation_token;
            if token.is_none() {
                return Ok(false);
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<(), S3ClientError> {
        require_key(bucket, key)?;
        let bucket = self.bucket(bucket)?;
        self.store(&bucket, key, src).await
    }

    async fn put_prefix(&self, bucket: &str, key: &str, src: &Path) -> Result<(), S3ClientError> {
        let locator = ArtifactLocator::new(bucket, key);
        let bucket = self.bucket(bucket)?;
        for file in list_files(src).await? {
            self.store(&bucket, &locator.child_key(&file.rel), &file.path)
                .await?;
        }
        Ok(())
    }

    fn is_not_found(&self, err: &S3ClientError) -> bool {
        matches!(err, S3ClientError::NoSuchKey { .. })
    }
}

fn require_key(bucket: &str, key: &str) -> Result<(), S3ClientError> {
    if key.is_empty() {
        return Err(S3ClientError::EmptyKey {
            bucket: bucket.to_string(),
        });
    }
    Ok(())
}

fn check_status(response: &ResponseData, bucket: &str, key: &str) -> Result<(), S3ClientError> {
    let status = response.status_code();
    if (200..300).contains(&status) {
        return Ok(());
    }
    let body = String::from_utf8_lossy(response.bytes());
    Err(classify_failure(status, &body, bucket, key))
}

// fail-on-err が有効なビルドでは非 2xx が HttpFailWithBody で返ってくる
fn from_s3_error(err: S3Error, bucket: &str, key: &str) -> S3ClientError {
    match err {
        S3Error::HttpFailWithBody(status, body) => classify_failure(status, &body, bucket, key),
        other => S3ClientError::S3(other),
    }
}

/// 失敗したレスポンスを分類
///
/// `NoSuchKey`、またはエラーコードのない 404 だけが NotFound。
/// `NoSuchBucket` などは NotFound として扱わない。
fn classify_failure(status: u16, body: &str, bucket: &str, key: &str) -> S3ClientError {
    let code = error_code(body);
    match (status, code.as_deref()) {
        (_, Some("NoSuchKey")) | (404, None) => S3ClientError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        _ => S3ClientError::Status {
            bucket: bucket.to_string(),
            key: key.to_string(),
            status,
            code: code.unwrap_or_default(),
        },
    }
}

/// S3 のエラーレスポンス `<Error><Code>..</Code>..</Error>`
#[derive(Debug, Deserialize)]
struct S3ErrorBody {
    #[serde(rename = "Code")]
    code: Option<String>,
}

/// エラーレスポンスから `<Code>` を取り出す。XML でなければ None
fn error_code(body: &str) -> Option<String> {
    quick_xml::de::from_str::<S3ErrorBody>(body)
        .ok()?
        .code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
}
