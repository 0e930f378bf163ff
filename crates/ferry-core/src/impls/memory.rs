//! InMemoryStore - 開発用のオブジェクトストア
//!
//! # 学習ポイント
//! - Arc<Mutex<..>> で複数クライアント間の状態共有
//! - await をまたいで MutexGuard を保持しない
//! - S3 と同じプレフィックス規則（ArtifactLocator::prefix）

use crate::domain::config::StorageEndpointConfig;
use crate::domain::locator::ArtifactLocator;
use crate::impls::local_fs::{ensure_parent, list_files, local_path_for};
use crate::ports::{ClientFactory, StorageClient};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// MemoryError は InMemoryClient のエラー
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("NoSuchKey: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("NoSuchBucket: {0}")]
    NoSuchBucket(String),

    #[error("{bucket}/: object name cannot be empty")]
    EmptyKey { bucket: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// InMemoryStore はバケット → キー → バイト列のマップ
///
/// # 実装詳細
/// - ClientFactory として振る舞い、connect ごとに状態を共有するクライアントを返す
/// - connect の回数を数える（呼び出しごとにクライアントが作られることの確認用）
/// - バケットは `create_bucket` か `insert` で作られる
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    buckets: Arc<Mutex<Buckets>>,
    connects: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        lock(&self.buckets).entry(bucket.to_string()).or_default();
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        lock(&self.buckets)
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.buckets).get(bucket)?.get(key).cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.buckets)
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// これまでに connect された回数
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

impl ClientFactory for InMemoryStore {
    type Client = InMemoryClient;

    fn connect(&self, _config: &StorageEndpointConfig) -> Result<InMemoryClient, MemoryError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(InMemoryClient {
            buckets: self.buckets.clone(),
        })
    }
}

/// InMemoryClient は InMemoryStore への 1 回分のハンドル
#[derive(Debug)]
pub struct InMemoryClient {
    buckets: Arc<Mutex<Buckets>>,
}

impl InMemoryClient {
    fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, MemoryError> {
        let buckets = lock(&self.buckets);
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| MemoryError::NoSuchBucket(bucket.to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| MemoryError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn write(&self, bucket: &str, key: String, data: Vec<u8>) -> Result<(), MemoryError> {
        let mut buckets = lock(&self.buckets);
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| MemoryError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(key, data);
        Ok(())
    }

    /// プレフィックス配下の (相対キー, データ) を取り出す
    fn snapshot_prefix(
        &self,
        locator: &ArtifactLocator,
    ) -> Result<Vec<(String, Vec<u8>)>, MemoryError> {
        let buckets = lock(&self.buckets);
        let objects = buckets
            .get(&locator.bucket)
            .ok_or_else(|| MemoryError::NoSuchBucket(locator.bucket.clone()))?;
        Ok(objects
            .iter()
            .filter_map(|(key, data)| {
                locator
                    .relative_key(key)
                    .map(|rel| (rel.to_string(), data.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl StorageClient for InMemoryClient {
    type Error = MemoryError;

    async fn get_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), MemoryError> {
        require_key(bucket, key)?;
        let data = self.read(bucket, key)?;
        ensure_parent(dest).await?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn get_prefix(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), MemoryError> {
        let locator = ArtifactLocator::new(bucket, key);
        for (rel, data) in self.snapshot_prefix(&locator)? {
            let path = local_path_for(dest, &rel)?;
            ensure_parent(&path).await?;
            tokio::fs::write(&path, data).await?;
        }
        Ok(())
    }

    async fn is_prefix(&self, bucket: &str, key: &str) -> Result<bool, MemoryError> {
        let prefix = ArtifactLocator::new(bucket, key).prefix();
        let buckets = lock(&self.buckets);
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| MemoryError::NoSuchBucket(bucket.to_string()))?;
        Ok(objects.keys().any(|k| k.starts_with(&prefix)))
    }

    async fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<(), MemoryError> {
        require_key(bucket, key)?;
        let data = tokio::fs::read(src).await?;
        self.write(bucket, key.to_string(), data)
    }

    async fn put_prefix(&self, bucket: &str, key: &str, src: &Path) -> Result<(), MemoryError> {
        let locator = ArtifactLocator::new(bucket, key);
        for file in list_files(src).await? {
            let data = tokio::fs::read(&file.path).await?;
            self.write(bucket, locator.child_key(&file.rel), data)?;
        }
        Ok(())
    }

    fn is_not_found(&self, err: &MemoryError) -> bool {
        matches!(err, MemoryError::NoSuchKey { .. })
    }
}

fn require_key(bucket: &str, key: &str) -> Result<(), MemoryError> {
    if key.is_empty() {
        return Err(MemoryError::EmptyKey {
            bucket: bucket.to_string(),
        });
    }
    Ok(())
}

fn lock(buckets: &Mutex<Buckets>) -> MutexGuard<'_, Buckets> {
    buckets.lock().unwrap_or_else(PoisonError::into_inner)
}
