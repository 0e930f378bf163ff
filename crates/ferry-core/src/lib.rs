//! ferry-core
//!
//! S3 互換ストレージとワークフローステップのローカルファイルシステムの間で
//! artifact（ファイル、または仮想ディレクトリ）を転送するためのコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（config, locator, errors, events）
//! - **ports**: 抽象化レイヤー（ClientFactory, StorageClient, LocalFs, EventSink）
//! - **impls**: 実装（S3, InMemory, Tokio ベースのローカル FS, tracing への出力）
//! - **app**: Load / Save パイプライン（ArtifactDriver）

pub mod domain;
pub mod ports;
pub mod impls;
pub mod app;

pub use app::ArtifactDriver;
pub use domain::{ArtifactError, ArtifactLocator, StorageEndpointConfig};
