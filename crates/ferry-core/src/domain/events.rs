//! Events - 転送中に発生するイベント
//!
//! パイプラインは EventSink にイベントを渡すだけで、
//! ログ出力の方法は知りません。

use super::locator::ArtifactLocator;

/// TransferEvent は Load / Save の経路選択を表す
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// 単一オブジェクトとして取得できた
    ObjectFetched { locator: ArtifactLocator },

    /// NoSuchKey だったのでプレフィックスかどうかを調べた
    PrefixProbed {
        locator: ArtifactLocator,
        is_prefix: bool,
    },

    /// プレフィックス判定自体が失敗した（元の NotFound エラーを返す）
    ProbeFailed {
        locator: ArtifactLocator,
        error: String,
    },

    /// プレフィックス配下をまとめて取得した
    PrefixFetched { locator: ArtifactLocator },

    /// ローカルのファイルをオブジェクトとして保存した
    ObjectStored { locator: ArtifactLocator },

    /// ローカルのディレクトリをプレフィックス配下に保存した
    PrefixStored { locator: ArtifactLocator },
}

impl TransferEvent {
    pub fn locator(&self) -> &ArtifactLocator {
        match self {
            Self::ObjectFetched { locator }
            | Self::PrefixProbed { locator, .. }
            | Self::ProbeFailed { locator, .. }
            | Self::PrefixFetched { locator }
            | Self::ObjectStored { locator }
            | Self::PrefixStored { locator } => locator,
        }
    }

    /// 運用者に知らせるべきイベントかどうか
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ProbeFailed { .. })
    }
}
