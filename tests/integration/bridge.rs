//! Bridge provisioning against fake resolver and compiler

use async_trait::async_trait;
use kiln::bridge::{BridgeProvider, BridgeSettings, Collaborators};
use kiln::cache::{ComponentStore, LocalComponentStore};
use kiln::compile::{CompilerInstance, SourceCompiler};
use kiln::diagnostics::{BuildLog, LogLevel, LogRecord};
use kiln::metadata::VersionMetadata;
use kiln::resolve::{DependencyResolver, ModuleDescriptor, ModuleIdentity, UnresolvedWarning};
use kiln::{KilnError, KilnResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const INTERFACE_NAME: &str = "compiler-interface";

/// Serves jars for whatever the wrapper module depends on
#[derive(Default)]
struct FakeResolver {
    calls: AtomicUsize,
    missing: Mutex<Vec<String>>,
    omit_sources: AtomicBool,
}

impl FakeResolver {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn make_missing(&self, name: &str) {
        self.missing.lock().unwrap().push(name.to_string());
    }

    fn restore(&self, name: &str) {
        self.missing.lock().unwrap().retain(|m| m != name);
    }
}

#[async_trait]
impl DependencyResolver for FakeResolver {
    async fn resolve(
        &self,
        module: &ModuleDescriptor,
        destination: &Path,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>, UnresolvedWarning> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log.debug(&format!("resolving {}", module.identity));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let dependency = module.settings.dependencies()[0].clone();
        if self.missing.lock().unwrap().contains(&dependency.name) {
            return Err(UnresolvedWarning {
                module: module.identity.clone(),
                failures: vec![format!("{} not found", dependency)],
            });
        }

        std::fs::create_dir_all(destination).unwrap();
        let base = format!("{}-{}", dependency.name, dependency.revision);
        let mut names = vec![format!("{}.jar", base)];
        if dependency.name != INTERFACE_NAME && !self.omit_sources.load(Ordering::SeqCst) {
            names.push(format!("{}-sources.jar", base));
        }

        let mut files = Vec::new();
        for name in names {
            let path = destination.join(name);
            std::fs::write(&path, dependency.to_string()).unwrap();
            files.push(path);
        }
        log.warn("repository is deprecated");
        Ok(files)
    }
}

/// Writes the output jar after a short delay, optionally failing once
#[derive(Default)]
struct FakeCompiler {
    calls: AtomicUsize,
    fail_next: AtomicBool,
    seen_sources: Mutex<Vec<PathBuf>>,
}

impl FakeCompiler {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceCompiler for FakeCompiler {
    async fn compile_bridge(
        &self,
        sources: &[PathBuf],
        output_jar: &Path,
        interface_files: &[PathBuf],
        display_name: &str,
        compiler: &CompilerInstance,
        log: &dyn BuildLog,
    ) -> KilnResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_sources.lock().unwrap().extend(sources.iter().cloned());
        log.debug(&format!("compiling {} for {}", display_name, compiler.actual_version));
        assert!(!interface_files.is_empty());
        tokio::time::sleep(Duration::from_millis(100)).await;

        if self.fail_next.swap(false, Ordering::SeqCst) {
            log.error("type mismatch");
            return Err(KilnError::Compilation {
                display_name: display_name.to_string(),
                code: Some(1),
                output: "error: type mismatch".to_string(),
            });
        }

        std::fs::write(output_jar, format!("bridge for {}", compiler.actual_version)).unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct RecordingLog {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLog {
    fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl BuildLog for RecordingLog {
    fn log(&self, record: LogRecord) {
        self.records.lock().unwrap().push(record);
    }
}

struct Fixture {
    temp: TempDir,
    store_root: PathBuf,
    resolver: Arc<FakeResolver>,
    compiler: Arc<FakeCompiler>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        Self {
            store_root: temp.path().join("store"),
            temp,
            resolver: Arc::new(FakeResolver::default()),
            compiler: Arc::new(FakeCompiler::default()),
        }
    }

    fn store(&self) -> Arc<LocalComponentStore> {
        Arc::new(LocalComponentStore::new(&self.store_root))
    }

    /// A provider with its own store handle over the shared root
    fn provider(&self) -> BridgeProvider {
        let settings = BridgeSettings {
            sources: ModuleIdentity::new("org.example", "compiler-bridge_2.12", "1.9.3"),
            interface_organization: "org.example".to_string(),
            interface_name: INTERFACE_NAME.to_string(),
            runtime_version: "52.0".to_string(),
            workspace_root: Some(self.temp.path().join("work")),
        };
        let metadata = VersionMetadata {
            version: "1.9.3".to_string(),
            timestamp: None,
        };
        BridgeProvider::new(
            settings,
            &metadata,
            Collaborators {
                store: self.store(),
                resolver: self.resolver.clone(),
                compiler: self.compiler.clone(),
            },
        )
    }
}

fn scala(version: &str) -> CompilerInstance {
    CompilerInstance::new(version)
}

fn silent() -> Arc<dyn BuildLog> {
    Arc::new(RecordingLog::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_compile_once() {
    let fixture = Fixture::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = fixture.provider();
        handles.push(tokio::spawn(async move {
            provider.provide(&scala("2.12.8"), silent()).await
        }));
    }

    let mut paths = Vec::new();
    for handle in handles {
        paths.push(handle.await.unwrap().unwrap());
    }

    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(fixture.compiler.calls(), 1);
    // interface + bridge sources
    assert_eq!(fixture.resolver.calls(), 2);
    assert_eq!(
        std::fs::read_to_string(&paths[0]).unwrap(),
        "bridge for 2.12.8"
    );
}

#[tokio::test]
async fn cached_bridge_skips_resolver_and_compiler() {
    let fixture = Fixture::new();
    let provider = fixture.provider();

    let first = provider.provide(&scala("2.12.8"), silent()).await.unwrap();
    let resolves = fixture.resolver.calls();

    let second = fixture
        .provider()
        .provide(&scala("2.12.8"), silent())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.resolver.calls(), resolves);
    assert_eq!(fixture.compiler.calls(), 1);
}

#[tokio::test]
async fn compiles_only_the_sources_jar() {
    let fixture = Fixture::new();
    fixture
        .provider()
        .provide(&scala("2.12.8"), silent())
        .await
        .unwrap();

    let seen = fixture.compiler.seen_sources.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0]
        .to_string_lossy()
        .ends_with("compiler-bridge_2.12-1.9.3-sources.jar"));
}

#[tokio::test]
async fn failed_build_is_not_cached() {
    let fixture = Fixture::new();
    let provider = fixture.provider();
    let compiler = scala("2.12.8");

    fixture.compiler.fail_next.store(true, Ordering::SeqCst);
    let err = provider.provide(&compiler, silent()).await.unwrap_err();
    assert!(matches!(err, KilnError::Compilation { code: Some(1), .. }));
    assert!(!fixture
        .store()
        .has(&provider.cache_key(&compiler))
        .await
        .unwrap());

    let jar = provider.provide(&compiler, silent()).await.unwrap();
    assert!(jar.is_file());
    assert_eq!(fixture.compiler.calls(), 2);
}

#[tokio::test]
async fn unresolvable_sources_surface_as_invalid_component() {
    let fixture = Fixture::new();
    fixture.resolver.make_missing("compiler-bridge_2.12");

    let err = fixture
        .provider()
        .provide(&scala("2.12.8"), silent())
        .await
        .unwrap_err();

    match err {
        KilnError::InvalidComponent(message) => {
            assert!(message.contains("org.example:compiler-bridge_2.12:1.9.3"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fixture.compiler.calls(), 0);
}

#[tokio::test]
async fn interface_is_shared_across_compilers() {
    let fixture = Fixture::new();
    let provider = fixture.provider();

    let a = provider.provide(&scala("2.12.8"), silent()).await.unwrap();
    let b = provider.provide(&scala("2.12.9"), silent()).await.unwrap();

    assert_ne!(a, b);
    assert_eq!(fixture.compiler.calls(), 2);
    // one interface fetch, one sources fetch per compiler
    assert_eq!(fixture.resolver.calls(), 3);

    let keys: Vec<String> = fixture
        .store()
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.contains(&"interface-1.9.3".to_string()));
}

#[tokio::test]
async fn runtime_version_separates_entries() {
    let fixture = Fixture::new();
    let provider = fixture.provider();
    let compiler = scala("2.12.8");

    let other_settings = BridgeSettings {
        sources: ModuleIdentity::new("org.example", "compiler-bridge_2.12", "1.9.3"),
        interface_organization: "org.example".to_string(),
        interface_name: INTERFACE_NAME.to_string(),
        runtime_version: "61.0".to_string(),
        workspace_root: None,
    };
    let other = BridgeProvider::new(
        other_settings,
        &VersionMetadata {
            version: "1.9.3".to_string(),
            timestamp: None,
        },
        Collaborators {
            store: fixture.store(),
            resolver: fixture.resolver.clone(),
            compiler: fixture.compiler.clone(),
        },
    );

    assert_ne!(provider.cache_key(&compiler), other.cache_key(&compiler));
    provider.provide(&compiler, silent()).await.unwrap();
    other.provide(&compiler, silent()).await.unwrap();
    assert_eq!(fixture.compiler.calls(), 2);
}

#[tokio::test]
async fn successful_build_only_reports_warnings() {
    let fixture = Fixture::new();
    let log = Arc::new(RecordingLog::default());

    fixture
        .provider()
        .provide(&scala("2.12.8"), log.clone())
        .await
        .unwrap();

    let records = log.records();
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.level >= LogLevel::Warn));
}

#[tokio::test]
async fn failed_build_replays_everything_in_order() {
    let fixture = Fixture::new();
    let log = Arc::new(RecordingLog::default());

    fixture.compiler.fail_next.store(true, Ordering::SeqCst);
    let result = fixture
        .provider()
        .provide(&scala("2.12.8"), log.clone())
        .await;
    assert!(result.is_err());

    let messages: Vec<String> = log.records().into_iter().map(|r| r.message).collect();
    let compiling = messages
        .iter()
        .position(|m| m.starts_with("compiling compiler-bridge_2.12"))
        .expect("debug output replayed on failure");
    let mismatch = messages
        .iter()
        .position(|m| m == "type mismatch")
        .expect("compiler error replayed");
    assert!(compiling < mismatch);
}

#[tokio::test]
async fn missing_sources_jar_fails_then_retry_caches() {
    let fixture = Fixture::new();
    let provider = fixture.provider();
    let compiler = scala("2.12.8");

    // resolution succeeds but publishes no sources jar
    fixture.resolver.omit_sources.store(true, Ordering::SeqCst);
    let err = provider.provide(&compiler, silent()).await.unwrap_err();
    assert!(matches!(err, KilnError::InvalidComponent(_)));
    assert_eq!(fixture.compiler.calls(), 0);
    assert!(!fixture
        .store()
        .has(&provider.cache_key(&compiler))
        .await
        .unwrap());

    fixture.resolver.omit_sources.store(false, Ordering::SeqCst);
    let jar = provider.provide(&compiler, silent()).await.unwrap();

    assert!(jar.is_file());
    assert_eq!(fixture.compiler.calls(), 1);
    assert!(fixture
        .store()
        .has(&provider.cache_key(&compiler))
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_share_one_build() {
    let fixture = Fixture::new();
    fixture.resolver.make_missing("compiler-bridge_2.12");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let provider = fixture.provider();
        handles.push(tokio::spawn(async move {
            provider.provide(&scala("2.12.8"), silent()).await
        }));
    }

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, KilnError::InvalidComponent(_)));
    }
    // interface + one sources attempt
    assert_eq!(fixture.resolver.calls(), 2);
    assert_eq!(fixture.compiler.calls(), 0);

    // the shared failure is not cached
    fixture.resolver.restore("compiler-bridge_2.12");
    fixture
        .provider()
        .provide(&scala("2.12.8"), silent())
        .await
        .unwrap();
    assert_eq!(fixture.resolver.calls(), 3);
    assert_eq!(fixture.compiler.calls(), 1);
}
