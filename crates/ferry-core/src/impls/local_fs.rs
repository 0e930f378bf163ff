//! TokioLocalFs - tokio::fs ベースの LocalFs
//!
//! ディレクトリのアップロードで使う再帰的なファイル列挙もここに置きます。

use crate::ports::LocalFs;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// TokioLocalFs は `tokio::fs::metadata` でパスを判定
///
/// シンボリックリンクは辿った先で判定します。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLocalFs;

#[async_trait]
impl LocalFs for TokioLocalFs {
    async fn is_directory(&self, path: &Path) -> io::Result<bool> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(metadata.is_dir())
    }
}

/// ディレクトリ配下の通常ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// ファイルの実パス
    pub path: PathBuf,
    /// ルートからの相対パス（`/` 区切り）
    pub rel: String,
}

/// `root` 配下の通常ファイルを再帰的に列挙
///
/// # 実装
/// - std::fs の走査を spawn_blocking で実行
/// - ディレクトリとシンボリックリンクは結果に含めない
/// - 相対パスでソート済み
pub async fn list_files(root: &Path) -> io::Result<Vec<LocalFile>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        walk(&root, &root, &mut files)?;
        files.sort_by(|a, b| a.rel.cmp(&b.rel));
        Ok(files)
    })
    .await
    .map_err(|e| io::Error::other(format!("walk failed: {e}")))?
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<LocalFile>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            let rel = relative_key(root, &path)?;
            files.push(LocalFile { path, rel });
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> io::Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|e| io::Error::other(format!("{} is outside {}: {e}", path.display(), root.display())))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// `root` 配下に `/` 区切りの相対キーを展開したパス
///
/// `..` などでルートの外に出るキーは拒否します。
pub fn local_path_for(root: &Path, rel: &str) -> io::Result<PathBuf> {
    let mut path = root.to_path_buf();
    for part in rel.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if part == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key escapes destination: {rel}"),
            ));
        }
        path.push(part);
    }
    Ok(path)
}

/// 書き込み先の親ディレクトリを作成
pub(crate) async fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
