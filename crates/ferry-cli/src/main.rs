//! ferry CLI
//!
//! ワークフローの artifact を S3 互換ストレージとの間で受け渡す
//!
//! # 流れ
//! 1. 引数を読む
//! 2. ログを初期化
//! 3. 設定ファイル → フラグ / 環境変数の順に endpoint 設定を組み立てる
//! 4. load / save を実行（`--timeout` があれば打ち切る）

use anyhow::{Context, Result};
use clap::Parser;
use ferry_core::ArtifactDriver;
use ferry_core::ports::{ClientFactory, EventSink, LocalFs};
use std::time::Duration;

mod args;
mod logging;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level);

    let config = cli.endpoint.resolve()?;
    tracing::debug!(?config, "resolved endpoint config");
    let driver = ArtifactDriver::s3(config);

    // タイムアウトは呼び出し側（ここ）で掛ける
    match cli.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run(&driver, &cli.command))
            .await
            .with_context(|| format!("transfer timed out after {secs}s"))?,
        None => run(&driver, &cli.command).await,
    }
}

/// サブコマンドを 1 つ実行する
async fn run<F, L, S>(driver: &ArtifactDriver<F, L, S>, command: &Command) -> Result<()>
where
    F: ClientFactory,
    L: LocalFs,
    S: EventSink,
{
    match command {
        Command::Load { target, dest } => {
            let locator = target.locator();
            driver
                .load(&locator, dest)
                .await
                .with_context(|| format!("failed to load {locator} into {}", dest.display()))?;
            tracing::info!(%locator, dest = %dest.display(), "loaded artifact");
        }
        Command::Save { src, target } => {
            let locator = target.locator();
            driver
                .save(src, &locator)
                .await
                .with_context(|| format!("failed to save {} to {locator}", src.display()))?;
            tracing::info!(%locator, src = %src.display(), "saved artifact");
        }
    }
    Ok(())
}
