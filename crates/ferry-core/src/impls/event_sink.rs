//! EventSink の実装
//!
//! - **TracingEventSink**: tracing への出力（デフォルト）
//! - **NoopEventSink**: 何もしない
//! - **RecordingEventSink**: 受け取ったイベントを保持（テスト用）

use crate::domain::events::TransferEvent;
use crate::ports::EventSink;
use std::sync::{Arc, Mutex, PoisonError};

/// TracingEventSink は tracing のイベントとして出力
///
/// プレフィックス判定の失敗は warn、経路の選択は debug。
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: TransferEvent) {
        let locator = event.locator();
        let (bucket, key) = (&locator.bucket, &locator.key);
        match &event {
            TransferEvent::ProbeFailed { error, .. } => {
                tracing::warn!(
                    %bucket,
                    %key,
                    %error,
                    "failed to test if key is a directory, returning original error"
                );
            }
            TransferEvent::PrefixProbed { is_prefix, .. } => {
                tracing::debug!(%bucket, %key, is_prefix, "key not found as object, probed prefix");
            }
            TransferEvent::ObjectFetched { .. } => {
                tracing::debug!(%bucket, %key, "fetched object");
            }
            TransferEvent::PrefixFetched { .. } => {
                tracing::debug!(%bucket, %key, "fetched prefix");
            }
            TransferEvent::ObjectStored { .. } => {
                tracing::debug!(%bucket, %key, "stored object");
            }
            TransferEvent::PrefixStored { .. } => {
                tracing::debug!(%bucket, %key, "stored prefix");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: TransferEvent) {}
}

/// RecordingEventSink は受け取ったイベントを順番に保持
///
/// clone したインスタンス同士でイベント列を共有します。
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<TransferEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn warnings(&self) -> Vec<TransferEvent> {
        self.events().into_iter().filter(|e| e.is_warning()).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: TransferEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
