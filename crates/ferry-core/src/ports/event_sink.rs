//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - TracingEventSink: tracing へ出力（デフォルト）
//! - NoopEventSink: 何もしない
//! - RecordingEventSink: メモリに溜める（テスト用）

use crate::domain::events::TransferEvent;

/// EventSink は転送イベントを記録
///
/// グローバルなロガーに直接書かず、パイプラインに注入します。
/// これによりテストで出力を差し替えられます。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TransferEvent);
}
