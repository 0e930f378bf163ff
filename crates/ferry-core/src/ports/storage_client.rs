//! StorageClient port - S3 互換ストレージへの転送プリミティブ
//!
//! # 実装
//! - **S3ClientFactory / S3Client**: rust-s3 ベース（本番用）
//! - **InMemoryStore / InMemoryClient**: 開発用・テスト用

use crate::domain::config::StorageEndpointConfig;
use async_trait::async_trait;
use std::path::Path;

/// ClientFactory は接続設定からクライアントを生成
///
/// # 設計原則
/// - Load / Save の呼び出しごとに新しいクライアントを作る（プールしない）
/// - 設定値の検証はしない。生成エラーはそのまま返す
/// - 接続を張るかどうかは実装次第
pub trait ClientFactory: Send + Sync {
    type Client: StorageClient;

    fn connect(
        &self,
        config: &StorageEndpointConfig,
    ) -> Result<Self::Client, <Self::Client as StorageClient>::Error>;
}

/// ClientFactory が返すクライアントのエラー型
pub type ClientError<F> = <<F as ClientFactory>::Client as StorageClient>::Error;

/// StorageClient はバケット内のオブジェクト・プレフィックスを転送
///
/// `key` は呼び出し側が渡したままの値です。プレフィックスとして扱う場合の
/// 正規化は [`crate::domain::ArtifactLocator::prefix`] に従います。
#[async_trait]
pub trait StorageClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// 単一オブジェクトを `dest` に書き出す
    async fn get_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), Self::Error>;

    /// プレフィックス配下の全オブジェクトを `dest` 配下に書き出す
    async fn get_prefix(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), Self::Error>;

    /// `key` 配下に 1 つでもオブジェクトがあれば true
    async fn is_prefix(&self, bucket: &str, key: &str) -> Result<bool, Self::Error>;

    /// ローカルファイルを単一オブジェクトとして保存
    async fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<(), Self::Error>;

    /// ローカルディレクトリ配下のファイルを `key` 配下に保存
    async fn put_prefix(&self, bucket: &str, key: &str, src: &Path) -> Result<(), Self::Error>;

    /// エラーが「キーが存在しない」を意味するかどうか
    fn is_not_found(&self, err: &Self::Error) -> bool;
}
