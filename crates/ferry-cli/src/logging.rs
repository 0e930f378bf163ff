//! ログの初期化

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::args::LogLevel;

/// グローバルな subscriber を登録
///
/// 出力先は stderr。`RUST_LOG` があれば `--log-level` より優先します。
pub fn init_logging(level: LogLevel) {
    let level: Level = level.into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
