//! CLI 引数の定義
//!
//! clap のヘルプに出る doc コメントは英語のままにしています。

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ferry_core::{ArtifactLocator, StorageEndpointConfig};
use std::path::PathBuf;
use tracing::Level;

/// Move workflow artifacts between the local filesystem and S3-compatible storage.
///
/// A key that does not exist as an object is treated as a directory prefix
/// when objects exist under it.
///
/// ## Examples
///
/// Stage an input (file or directory) before a step runs:
///   ferry --endpoint minio:9000 --insecure load -b artifacts -k runs/42/input /work/input
///
/// Persist a step's output:
///   ferry --config ferry.json save /work/output -b artifacts -k runs/42/output
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Give up after this many seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download an object or prefix to a local path
    Load {
        #[command(flatten)]
        target: TargetArgs,

        /// Destination file (object) or directory (prefix)
        dest: PathBuf,
    },

    /// Upload a local file or directory
    Save {
        /// Source file or directory
        src: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Bucket name
    #[arg(short, long)]
    pub bucket: String,

    /// Object key or prefix
    #[arg(short, long)]
    pub key: String,
}

impl TargetArgs {
    /// bucket / key から ArtifactLocator を作る
    pub fn locator(&self) -> ArtifactLocator {
        ArtifactLocator::new(&self.bucket, &self.key)
    }
}

/// endpoint の設定。フラグと環境変数は設定ファイルより優先
#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// JSON config file with endpoint settings
    #[arg(long, env = "FERRY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// S3 endpoint (host:port or URL); empty means AWS S3
    #[arg(long, env = "FERRY_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Region
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Use http for endpoints given without a scheme
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Use path-style addressing (MinIO)
    #[arg(long, global = true)]
    pub path_style: bool,

    /// Access key; when empty the ambient credential chain is used
    #[arg(long, env = "AWS_ACCESS_KEY_ID", global = true)]
    pub access_key: Option<String>,

    /// Secret key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    pub secret_key: Option<String>,
}

impl EndpointArgs {
    /// endpoint 設定を組み立てる（設定ファイル → 上書き）
    pub fn resolve(&self) -> Result<StorageEndpointConfig> {
        let mut config = match &self.config {
            Some(path) => StorageEndpointConfig::from_json_file(path)?,
            None => StorageEndpointConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(access_key) = &self.access_key {
            config.access_key = access_key.clone();
        }
        if let Some(secret_key) = &self.secret_key {
            config.secret_key = secret_key.clone();
        }
        if self.insecure {
            config.secure = false;
        }
        if self.path_style {
            config.path_style = true;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
