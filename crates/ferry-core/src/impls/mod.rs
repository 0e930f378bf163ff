//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **S3ClientFactory / S3Client**: rust-s3 ベース（本番用）
//! - **InMemoryStore**: 開発用・テスト用のオブジェクトストア
//! - **TokioLocalFs**: tokio::fs によるローカルパス判定
//! - **TracingEventSink / NoopEventSink / RecordingEventSink**: イベント出力

pub mod s3;
pub mod memory;
pub mod local_fs;
pub mod event_sink;

// 主要な型を再エクスポート
pub use self::s3::{S3Client, S3ClientError, S3ClientFactory};
pub use self::memory::{InMemoryClient, InMemoryStore, MemoryError};
pub use self::local_fs::TokioLocalFs;
pub use self::event_sink::{NoopEventSink, RecordingEventSink, TracingEventSink};
