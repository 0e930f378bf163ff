//! StorageEndpointConfig - S3 互換エンドポイントへの接続設定
//!
//! ドライバ生成時に一度だけ作られ、以後は読み取り専用です。
//! JSON ファイルから読み込むこともできます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// StorageEndpointConfig は接続パラメータを保持
///
/// # フィールド
/// - `endpoint`: `host:port` または `https://host` 形式。空なら AWS S3
/// - `secure`: scheme のない endpoint に https を使うかどうか
/// - `access_key` が空の場合は環境（env / profile / instance metadata）の認証情報を使う
///
/// Factory 側ではフィールドの検証を行いません（クライアントに委譲）。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEndpointConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_secure")]
    pub secure: bool,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// MinIO などはパス形式（`endpoint/bucket/key`）が必要
    #[serde(default)]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_secure() -> bool {
    true
}

/// ConfigError は設定ファイル読み込み時のエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageEndpointConfig {
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            ..Self::default()
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = access_key.into();
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    /// JSON ファイルから設定を読み込む
    ///
    /// 省略されたフィールドはデフォルト値になります。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 静的な認証情報を使うかどうか
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key.is_empty()
    }
}

impl Default for StorageEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            secure: default_secure(),
            access_key: String::new(),
            secret_key: String::new(),
            path_style: false,
        }
    }
}

// secret_key はログに出さない
impl fmt::Debug for StorageEndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEndpointConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("secure", &self.secure)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("path_style", &self.path_style)
            .finish()
    }
}
