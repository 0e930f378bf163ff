//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! パイプラインが依存する外部の協力者（S3 クライアント、ローカル FS、
//! ログ出力）はすべて trait 越しに注入されます。

pub mod storage_client;
pub mod local_fs;
pub mod event_sink;

// 主要な trait を再エクスポート
pub use self::storage_client::{ClientError, ClientFactory, StorageClient};
pub use self::local_fs::LocalFs;
pub use self::event_sink::EventSink;
