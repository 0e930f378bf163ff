//! Errors - Load / Save パイプラインのエラー
//!
//! ストレージクライアントのエラーは包み直さずにそのまま返します
//! （`#[error(transparent)]`）。variant はどの段階で失敗したかだけを表します。

/// ArtifactError は転送パイプラインのエラー
///
/// `E` はストレージクライアント（[`crate::ports::StorageClient::Error`]）のエラー型。
///
/// # 分類
/// - Connect: クライアント生成の失敗
/// - Transfer: get/put/prefix 系の失敗（NotFound かどうかはクライアントが判定）
/// - LocalPath: ローカルパスの判定に失敗（存在しない、権限がない など）
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Connect(E),

    #[error(transparent)]
    Transfer(E),

    #[error(transparent)]
    LocalPath(std::io::Error),
}
