//! ArtifactDriver - Load / Save パイプライン
//!
//! # Load
//! 1. クライアントを作る
//! 2. キーを単一オブジェクトとして取得
//! 3. NoSuchKey ならプレフィックスかどうかを調べる
//! 4. プレフィックスならまとめて取得
//!
//! プレフィックス判定が失敗した場合、または否定だった場合は、
//! 判定のエラーではなく 2. の NoSuchKey エラーを返します。
//!
//! # Save
//! 1. クライアントを作る
//! 2. ローカルパスがディレクトリかどうかを判定
//! 3. ディレクトリなら put_prefix、それ以外は put_object
//!
//! リトライはしません。どの段階のエラーも包み直さずに返します。

use crate::domain::config::StorageEndpointConfig;
use crate::domain::errors::ArtifactError;
use crate::domain::events::TransferEvent;
use crate::domain::locator::ArtifactLocator;
use crate::impls::event_sink::TracingEventSink;
use crate::impls::local_fs::TokioLocalFs;
use crate::impls::s3::S3ClientFactory;
use crate::ports::{ClientError, ClientFactory, EventSink, LocalFs, StorageClient};
use std::path::Path;

/// ArtifactDriver は 1 つのエンドポイント設定に対する Load / Save
///
/// # 使用例
/// ```ignore
/// let driver = ArtifactDriver::s3(config);
/// driver.load(&ArtifactLocator::new("b", "logs/"), Path::new("/tmp/in")).await?;
/// driver.save(Path::new("/tmp/out"), &ArtifactLocator::new("b", "out")).await?;
/// ```
///
/// # 状態
/// - 設定と協力者（factory, local fs, event sink）以外は持たない
/// - クライアントは呼び出しごとに作り、呼び出しの終わりに捨てる
/// - 複数の呼び出しを並行して実行してよい
pub struct ArtifactDriver<F, L = TokioLocalFs, S = TracingEventSink> {
    config: StorageEndpointConfig,
    factory: F,
    local_fs: L,
    events: S,
}

impl ArtifactDriver<S3ClientFactory> {
    /// rust-s3 と tokio::fs を使う本番用の構成
    pub fn s3(config: StorageEndpointConfig) -> Self {
        Self::new(config, S3ClientFactory)
    }
}

impl<F: ClientFactory> ArtifactDriver<F> {
    pub fn new(config: StorageEndpointConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            local_fs: TokioLocalFs,
            events: TracingEventSink,
        }
    }
}

impl<F, L, S> ArtifactDriver<F, L, S> {
    pub fn with_local_fs<L2: LocalFs>(self, local_fs: L2) -> ArtifactDriver<F, L2, S> {
        ArtifactDriver {
            config: self.config,
            factory: self.factory,
            local_fs,
            events: self.events,
        }
    }

    pub fn with_event_sink<S2: EventSink>(self, events: S2) -> ArtifactDriver<F, L, S2> {
        ArtifactDriver {
            config: self.config,
            factory: self.factory,
            local_fs: self.local_fs,
            events,
        }
    }
}

impl<F, L, S> ArtifactDriver<F, L, S>
where
    F: ClientFactory,
    L: LocalFs,
    S: EventSink,
{
    /// artifact を `dest` にダウンロード
    ///
    /// キーがオブジェクトならファイルとして、プレフィックスなら
    /// `dest` 配下のディレクトリツリーとして書き出します。
    pub async fn load(
        &self,
        locator: &ArtifactLocator,
        dest: &Path,
    ) -> Result<(), ArtifactError<ClientError<F>>> {
        let client = self.factory.connect(&self.config).map_err(ArtifactError::Connect)?;

        let orig_err = match client.get_object(&locator.bucket, &locator.key, dest).await {
            Ok(()) => {
                self.events.emit(TransferEvent::ObjectFetched {
                    locator: locator.clone(),
                });
                return Ok(());
            }
            Err(e) if client.is_not_found(&e) => e,
            Err(e) => return Err(ArtifactError::Transfer(e)),
        };

        // NoSuchKey だった。キーが S3 の「ディレクトリ」かもしれない
        let is_prefix = match client.is_prefix(&locator.bucket, &locator.key).await {
            Ok(is_prefix) => is_prefix,
            Err(probe_err) => {
                self.events.emit(TransferEvent::ProbeFailed {
                    locator: locator.clone(),
                    error: probe_err.to_string(),
                });
                return Err(ArtifactError::Transfer(orig_err));
            }
        };
        self.events.emit(TransferEvent::PrefixProbed {
            locator: locator.clone(),
            is_prefix,
        });
        if !is_prefix {
            // ファイルでもディレクトリでもない
            return Err(ArtifactError::Transfer(orig_err));
        }

        client
            .get_prefix(&locator.bucket, &locator.key, dest)
            .await
            .map_err(ArtifactError::Transfer)?;
        self.events.emit(TransferEvent::PrefixFetched {
            locator: locator.clone(),
        });
        Ok(())
    }

    /// `src` を artifact としてアップロード
    ///
    /// ディレクトリなら配下のファイルを `key/` 以下に、
    /// それ以外は単一オブジェクトとして保存します。
    pub async fn save(
        &self,
        src: &Path,
        locator: &ArtifactLocator,
    ) -> Result<(), ArtifactError<ClientError<F>>> {
        let client = self.factory.connect(&self.config).map_err(ArtifactError::Connect)?;

        let is_dir = self
            .local_fs
            .is_directory(src)
            .await
            .map_err(ArtifactError::LocalPath)?;

        if is_dir {
            client
                .put_prefix(&locator.bucket, &locator.key, src)
                .await
                .map_err(ArtifactError::Transfer)?;
            self.events.emit(TransferEvent::PrefixStored {
                locator: locator.clone(),
            });
        } else {
            client
                .put_object(&locator.bucket, &locator.key, src)
                .await
                .map_err(ArtifactError::Transfer)?;
            self.events.emit(TransferEvent::ObjectStored {
                locator: locator.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::event_sink::RecordingEventSink;
    use crate::impls::memory::{InMemoryStore, MemoryError};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // ────────────────────────────────────────────────────────────────────────
    // 呼び出しを記録し、結果を差し替えられるクライアント
    // ────────────────────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    enum FakeError {
        #[error("NoSuchKey: {0}")]
        NoSuchKey(String),
        #[error("AccessDenied")]
        AccessDenied,
        #[error("list failed")]
        ListFailed,
        #[error("bad endpoint")]
        BadEndpoint,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        GetObject(String, String, PathBuf),
        GetPrefix(String, String, PathBuf),
        IsPrefix(String, String),
        PutObject(String, String, PathBuf),
        PutPrefix(String, String, PathBuf),
    }

    #[derive(Clone)]
    struct Script {
        connect: Result<(), FakeError>,
        get_object: Result<(), FakeError>,
        is_prefix: Result<bool, FakeError>,
        get_prefix: Result<(), FakeError>,
        put: Result<(), FakeError>,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                connect: Ok(()),
                get_object: Ok(()),
                is_prefix: Ok(false),
                get_prefix: Ok(()),
                put: Ok(()),
            }
        }
    }

    #[derive(Clone)]
    struct FakeFactory {
        script: Script,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl FakeFactory {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct FakeClient {
        script: Script,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl FakeClient {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ClientFactory for FakeFactory {
        type Client = FakeClient;

        fn connect(&self, _config: &StorageEndpointConfig) -> Result<FakeClient, FakeError> {
            self.script.connect.clone()?;
            Ok(FakeClient {
                script: self.script.clone(),
                calls: self.calls.clone(),
            })
        }
    }

    #[async_trait]
    impl StorageClient for FakeClient {
        type Error = FakeError;

        async fn get_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), FakeError> {
            self.record(Call::GetObject(bucket.into(), key.into(), dest.into()));
            self.script.get_object.clone()
        }

        async fn get_prefix(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), FakeError> {
            self.record(Call::GetPrefix(bucket.into(), key.into(), dest.into()));
            self.script.get_prefix.clone()
        }

        async fn is_prefix(&self, bucket: &str, key: &str) -> Result<bool, FakeError> {
            self.record(Call::IsPrefix(bucket.into(), key.into()));
            self.script.is_prefix.clone()
        }

        async fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<(), FakeError> {
            self.record(Call::PutObject(bucket.into(), key.into(), src.into()));
            self.script.put.clone()
        }

        async fn put_prefix(&self, bucket: &str, key: &str, src: &Path) -> Result<(), FakeError> {
            self.record(Call::PutPrefix(bucket.into(), key.into(), src.into()));
            self.script.put.clone()
        }

        fn is_not_found(&self, err: &FakeError) -> bool {
            matches!(err, FakeError::NoSuchKey(_))
        }
    }

    struct FakeLocalFs(std::io::Result<bool>);

    #[async_trait]
    impl LocalFs for FakeLocalFs {
        async fn is_directory(&self, _path: &Path) -> std::io::Result<bool> {
            match &self.0 {
                Ok(is_dir) => Ok(*is_dir),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn fake_driver(
        script: Script,
    ) -> (
        ArtifactDriver<FakeFactory, TokioLocalFs, RecordingEventSink>,
        FakeFactory,
        RecordingEventSink,
    ) {
        let factory = FakeFactory::new(script);
        let events = RecordingEventSink::new();
        let driver = ArtifactDriver::new(StorageEndpointConfig::default(), factory.clone())
            .with_event_sink(events.clone());
        (driver, factory, events)
    }

    fn not_found() -> FakeError {
        FakeError::NoSuchKey("b/k".to_string())
    }

    fn locator() -> ArtifactLocator {
        ArtifactLocator::new("b", "k")
    }

    // ────────────────────────────────────────────────────────────────────────
    // Load
    // ────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn load_direct_hit_never_probes() {
        let (driver, factory, events) = fake_driver(Script::default());
        let dest = Path::new("/tmp/in");

        driver.load(&locator(), dest).await.unwrap();

        assert_eq!(
            factory.calls(),
            vec![Call::GetObject("b".into(), "k".into(), dest.into())]
        );
        assert_eq!(
            events.events(),
            vec![TransferEvent::ObjectFetched { locator: locator() }]
        );
    }

    #[tokio::test]
    async fn load_passes_through_other_errors_without_probing() {
        let (driver, factory, _events) = fake_driver(Script {
            get_object: Err(FakeError::AccessDenied),
            is_prefix: Ok(true),
            ..Script::default()
        });

        let err = driver.load(&locator(), Path::new("/tmp/in")).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(FakeError::AccessDenied)));
        assert_eq!(factory.calls().len(), 1);
    }

    #[tokio::test]
    async fn load_falls_back_to_prefix_once() {
        let (driver, factory, events) = fake_driver(Script {
            get_object: Err(not_found()),
            is_prefix: Ok(true),
            ..Script::default()
        });
        let dest = Path::new("/tmp/in");

        driver.load(&locator(), dest).await.unwrap();

        assert_eq!(
            factory.calls(),
            vec![
                Call::GetObject("b".into(), "k".into(), dest.into()),
                Call::IsPrefix("b".into(), "k".into()),
                Call::GetPrefix("b".into(), "k".into(), dest.into()),
            ]
        );
        assert_eq!(
            events.events(),
            vec![
                TransferEvent::PrefixProbed { locator: locator(), is_prefix: true },
                TransferEvent::PrefixFetched { locator: locator() },
            ]
        );
    }

    #[tokio::test]
    async fn load_returns_prefix_fetch_error_unchanged() {
        let (driver, _factory, _events) = fake_driver(Script {
            get_object: Err(not_found()),
            is_prefix: Ok(true),
            get_prefix: Err(FakeError::AccessDenied),
            ..Script::default()
        });

        let err = driver.load(&locator(), Path::new("/tmp/in")).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(FakeError::AccessDenied)));
    }

    #[tokio::test]
    async fn load_negative_probe_returns_original_error() {
        let (driver, factory, events) = fake_driver(Script {
            get_object: Err(not_found()),
            is_prefix: Ok(false),
            ..Script::default()
        });

        let err = driver.load(&locator(), Path::new("/tmp/in")).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(ref e) if *e == not_found()));
        assert!(!factory
            .calls()
            .iter()
            .any(|c| matches!(c, Call::GetPrefix(..))));
        assert!(events.warnings().is_empty());
    }

    #[tokio::test]
    async fn load_probe_failure_returns_original_error_and_warns() {
        let (driver, factory, events) = fake_driver(Script {
            get_object: Err(not_found()),
            is_prefix: Err(FakeError::ListFailed),
            ..Script::default()
        });

        let err = driver.load(&locator(), Path::new("/tmp/in")).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(ref e) if *e == not_found()));
        assert_eq!(err.to_string(), "NoSuchKey: b/k");
        assert_eq!(factory.calls().len(), 2);
        assert_eq!(
            events.warnings(),
            vec![TransferEvent::ProbeFailed {
                locator: locator(),
                error: "list failed".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn load_connect_failure_is_terminal() {
        let (driver, factory, _events) = fake_driver(Script {
            connect: Err(FakeError::BadEndpoint),
            ..Script::default()
        });

        let err = driver.load(&locator(), Path::new("/tmp/in")).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Connect(FakeError::BadEndpoint)));
        assert!(factory.calls().is_empty());
    }

    // ────────────────────────────────────────────────────────────────────────
    // Save
    // ────────────────────────────────────────────────────────────────────────

    #[rstest]
    #[case::directory(true)]
    #[case::file(false)]
    #[tokio::test]
    async fn save_routes_on_local_classification(#[case] is_dir: bool) {
        let (driver, factory, _events) = fake_driver(Script::default());
        let driver = driver.with_local_fs(FakeLocalFs(Ok(is_dir)));
        let src = Path::new("/tmp/out");

        driver.save(src, &locator()).await.unwrap();

        let expected = if is_dir {
            Call::PutPrefix("b".into(), "k".into(), src.into())
        } else {
            Call::PutObject("b".into(), "k".into(), src.into())
        };
        assert_eq!(factory.calls(), vec![expected]);
    }

    #[tokio::test]
    async fn save_local_classification_failure_is_terminal() {
        let (driver, factory, _events) = fake_driver(Script::default());
        let driver = driver.with_local_fs(FakeLocalFs(Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ))));

        let err = driver.save(Path::new("/tmp/missing"), &locator()).await.unwrap_err();

        assert!(matches!(err, ArtifactError::LocalPath(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn save_returns_upload_error_unchanged() {
        let (driver, _factory, _events) = fake_driver(Script {
            put: Err(FakeError::AccessDenied),
            ..Script::default()
        });
        let driver = driver.with_local_fs(FakeLocalFs(Ok(false)));

        let err = driver.save(Path::new("/tmp/out.txt"), &locator()).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(FakeError::AccessDenied)));
    }

    #[tokio::test]
    async fn save_connect_failure_is_terminal() {
        let (driver, factory, _events) = fake_driver(Script {
            connect: Err(FakeError::BadEndpoint),
            ..Script::default()
        });

        let err = driver.save(Path::new("/tmp/out"), &locator()).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Connect(FakeError::BadEndpoint)));
        assert!(factory.calls().is_empty());
    }

    // ────────────────────────────────────────────────────────────────────────
    // InMemoryStore を使ったシナリオ
    // ────────────────────────────────────────────────────────────────────────

    fn memory_driver(
        store: &InMemoryStore,
    ) -> ArtifactDriver<InMemoryStore, TokioLocalFs, RecordingEventSink> {
        ArtifactDriver::new(StorageEndpointConfig::default(), store.clone())
            .with_event_sink(RecordingEventSink::new())
    }

    #[tokio::test]
    async fn scenario_object_hit() {
        let store = InMemoryStore::new();
        store.insert("b", "file.txt", "contents");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.txt");

        memory_driver(&store)
            .load(&ArtifactLocator::new("b", "file.txt"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dest).unwrap(), "contents");
    }

    #[tokio::test]
    async fn scenario_prefix_fallback() {
        let store = InMemoryStore::new();
        store.insert("b", "logs/a.log", "a");
        store.insert("b", "logs/nested/b.log", "b");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("logs");

        memory_driver(&store)
            .load(&ArtifactLocator::new("b", "logs/"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("a.log")).unwrap(), "a");
        assert_eq!(
            std::fs::read_to_string(dest.join("nested/b.log")).unwrap(),
            "b"
        );
    }

    #[tokio::test]
    async fn scenario_missing_key_returns_no_such_key() {
        let store = InMemoryStore::new();
        store.insert("b", "other.txt", "x");
        let dir = tempfile::tempdir().unwrap();

        let err = memory_driver(&store)
            .load(&ArtifactLocator::new("b", "missing"), &dir.path().join("missing"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ArtifactError::Transfer(MemoryError::NoSuchKey { ref key, .. }) if key == "missing"
        ));
    }

    #[tokio::test]
    async fn scenario_missing_bucket_does_not_probe() {
        let store = InMemoryStore::new();
        let driver = memory_driver(&store);
        let dir = tempfile::tempdir().unwrap();

        let err = driver
            .load(&ArtifactLocator::new("nope", "k"), &dir.path().join("k"))
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Transfer(MemoryError::NoSuchBucket(_))));
        assert!(driver.events.events().is_empty());
    }

    #[tokio::test]
    async fn scenario_save_directory_then_load_it_back() {
        let store = InMemoryStore::new();
        store.create_bucket("b");
        let driver = memory_driver(&store);
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("top.txt"), "t").unwrap();
        std::fs::write(src.path().join("sub/inner.txt"), "i").unwrap();

        driver
            .save(src.path(), &ArtifactLocator::new("b", "out"))
            .await
            .unwrap();
        assert_eq!(store.keys("b"), vec!["out/sub/inner.txt", "out/top.txt"]);

        let dest = tempfile::tempdir().unwrap();
        driver
            .load(&ArtifactLocator::new("b", "out"), dest.path())
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.path().join("sub/inner.txt")).unwrap(),
            "i"
        );

        // save と load で 1 回ずつ
        assert_eq!(store.connect_count(), 2);
    }

    #[tokio::test]
    async fn scenario_save_file() {
        let store = InMemoryStore::new();
        store.create_bucket("b");
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("out.txt");
        std::fs::write(&src, "payload").unwrap();

        memory_driver(&store)
            .save(&src, &ArtifactLocator::new("b", "results/out.txt"))
            .await
            .unwrap();

        assert_eq!(store.object("b", "results/out.txt").unwrap(), b"payload");
    }

    #[tokio::test]
    async fn scenario_save_missing_path() {
        let store = InMemoryStore::new();
        store.create_bucket("b");
        let dir = tempfile::tempdir().unwrap();

        let err = memory_driver(&store)
            .save(&dir.path().join("missing"), &ArtifactLocator::new("b", "k"))
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::LocalPath(_)));
        assert!(store.keys("b").is_empty());
    }
}
