//! LocalFs port - ローカルファイルシステムの判定

use async_trait::async_trait;
use std::path::Path;

/// LocalFs は保存対象のパスがディレクトリかどうかを判定
///
/// パスが存在しない場合などはエラーになり、Save はそれをそのまま返します。
#[async_trait]
pub trait LocalFs: Send + Sync {
    async fn is_directory(&self, path: &Path) -> std::io::Result<bool>;
}
