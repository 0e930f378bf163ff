//! ArtifactLocator - バケット内のオブジェクト、またはプレフィックスを指す
//!
//! キーが単一オブジェクトなのかディレクトリ（プレフィックス）なのかは
//! locator 自体からは分かりません。判定は Load パイプラインが行います。

use serde::{Deserialize, Serialize};
use std::fmt;

/// ArtifactLocator は `bucket` と `key` の組
///
/// 呼び出し側が操作ごとに渡し、このクレートは変更しません。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocator {
    pub bucket: String,
    pub key: String,
}

impl ArtifactLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// ディレクトリとして扱うときのプレフィックス
    ///
    /// - 末尾の `/` を取り除いてから `/` を 1 つ付ける
    /// - 空のキーはバケットのルート（空のプレフィックス）
    ///
    /// ```
    /// # use ferry_core::ArtifactLocator;
    /// assert_eq!(ArtifactLocator::new("b", "logs").prefix(), "logs/");
    /// assert_eq!(ArtifactLocator::new("b", "logs//").prefix(), "logs/");
    /// assert_eq!(ArtifactLocator::new("b", "").prefix(), "");
    /// ```
    pub fn prefix(&self) -> String {
        let trimmed = self.key.trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }

    /// キー配下の相対パス `rel` を指すキー
    ///
    /// `rel` は `/` 区切り。区切り文字は重複させない。
    pub fn child_key(&self, rel: &str) -> String {
        let rel = rel.trim_start_matches('/');
        let base = self.key.trim_end_matches('/');
        if base.is_empty() {
            rel.to_string()
        } else if rel.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{rel}")
        }
    }

    /// プレフィックス配下のキーから相対パスを取り出す
    ///
    /// プレフィックスの外にあるキー、フォルダマーカー（末尾 `/`）は `None`。
    pub fn relative_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        let prefix = self.prefix();
        let rel = key.strip_prefix(prefix.as_str())?;
        if rel.is_empty() || rel.ends_with('/') {
            None
        } else {
            Some(rel)
        }
    }
}

impl fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
