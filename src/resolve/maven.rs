//! Maven-layout repository resolver
//!
//! Fetches the declared dependencies of a module from one or more repositories
//! laid out as `<org path>/<name>/<rev>/<name>-<rev>[-<classifier>].jar`.
//! Repositories are tried in order; `http(s)://` repositories are downloaded
//! with `ureq`, `file://` URLs and plain paths are copied from disk.
//!
//! Only the declared coordinates are fetched. POM dependency graphs are not
//! walked.

use crate::diagnostics::{BufferedLog, BuildLog};
use crate::resolve::module::{ModuleDescriptor, ModuleIdentity};
use crate::resolve::{DependencyResolver, UnresolvedWarning};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default repository when none is configured
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

/// Classifier of source artifacts
const SOURCES_CLASSIFIER: &str = "sources";

/// One artifact to fetch for a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtifactRequest {
    file_name: String,
    relative_path: String,
    required: bool,
}

/// Outcome of looking for an artifact in one repository
enum Lookup {
    Found,
    Missing,
}

/// Resolver for Maven-layout repositories
#[derive(Debug, Clone)]
pub struct MavenResolver {
    repositories: Vec<String>,
    agent: ureq::Agent,
}

impl MavenResolver {
    /// Create a resolver over `repositories`, tried in order
    pub fn new(repositories: Vec<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            repositories: repositories
                .into_iter()
                .map(|r| r.trim_end_matches('/').to_string())
                .collect(),
            agent: config.into(),
        }
    }

    /// Configured repositories
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Artifacts fetched for one dependency.
    ///
    /// An explicit classifier selects exactly that artifact. Otherwise the main
    /// jar is required and the sources jar is fetched when published.
    fn requests_for(dep: &ModuleIdentity) -> Vec<ArtifactRequest> {
        let dir = format!(
            "{}/{}/{}",
            dep.organization.replace('.', "/"),
            dep.name,
            dep.revision
        );
        let request = |classifier: Option<&str>, required: bool| {
            let file_name = match classifier {
                Some(c) => format!("{}-{}-{}.jar", dep.name, dep.revision, c),
                None => format!("{}-{}.jar", dep.name, dep.revision),
            };
            ArtifactRequest {
                relative_path: format!("{}/{}", dir, file_name),
                file_name,
                required,
            }
        };

        match dep.classifier.as_deref() {
            Some(classifier) => vec![request(Some(classifier), true)],
            None => vec![request(None, true), request(Some(SOURCES_CLASSIFIER), false)],
        }
    }

    /// Try every repository for one artifact
    fn fetch_one(
        &self,
        request: &ArtifactRequest,
        destination: &Path,
        log: &dyn BuildLog,
    ) -> Result<Option<PathBuf>, String> {
        let target = destination.join(&request.file_name);
        if target.is_file() {
            log.debug(&format!("Already present: {}", target.display()));
            return Ok(Some(target));
        }

        let mut errors = Vec::new();
        for repo in &self.repositories {
            let location = format!("{}/{}", repo, request.relative_path);
            let lookup = if repo.starts_with("http://") || repo.starts_with("https://") {
                log.info(&format!("Downloading {}", location));
                download(&self.agent, &location, &target)
            } else {
                log.debug(&format!("Copying {}", location));
                copy_local(&location, &target)
            };

            match lookup {
                Ok(Lookup::Found) => return Ok(Some(target)),
                Ok(Lookup::Missing) => log.debug(&format!("Not found: {}", location)),
                Err(e) => {
                    log.warn(&format!("Failed to fetch {}: {}", location, e));
                    errors.push(format!("{}: {}", location, e));
                }
            }
        }

        if errors.is_empty() {
            Ok(None)
        } else {
            Err(errors.join(", "))
        }
    }

    fn resolve_blocking(
        &self,
        module: &ModuleDescriptor,
        destination: &Path,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>, UnresolvedWarning> {
        let unresolved = |failures: Vec<String>| UnresolvedWarning {
            module: module.identity.clone(),
            failures,
        };

        fs::create_dir_all(destination).map_err(|e| {
            unresolved(vec![format!("creating {}: {}", destination.display(), e)])
        })?;

        let mut files = Vec::new();
        let mut failures = Vec::new();

        for dep in module.settings.dependencies() {
            for request in Self::requests_for(dep) {
                match self.fetch_one(&request, destination, log) {
                    Ok(Some(path)) => files.push(path),
                    Ok(None) if request.required => {
                        failures.push(format!("{}: {} not found", dep, request.file_name))
                    }
                    Ok(None) => {}
                    Err(e) if request.required => failures.push(format!("{}: {}", dep, e)),
                    Err(_) => {}
                }
            }
        }

        if failures.is_empty() {
            Ok(files)
        } else {
            Err(unresolved(failures))
        }
    }
}

#[async_trait]
impl DependencyResolver for MavenResolver {
    async fn resolve(
        &self,
        module: &ModuleDescriptor,
        destination: &Path,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>, UnresolvedWarning> {
        log.debug(&format!(
            "Resolving {} from {} repositories. Dependencies: {}",
            module.identity,
            self.repositories.len(),
            module.settings.dependencies_display()
        ));
        let resolver = self.clone();
        let owned = module.clone();
        let destination = destination.to_path_buf();

        // Downloads block; run them on the blocking pool and replay their log
        // records afterwards
        let (result, records) = tokio::task::spawn_blocking(move || {
            let records = BufferedLog::new();
            let result = resolver.resolve_blocking(&owned, &destination, &records);
            (result, records)
        })
        .await
        .map_err(|e| UnresolvedWarning {
            module: module.identity.clone(),
            failures: vec![format!("resolver task failed: {}", e)],
        })?;

        records.flush(log, true);
        result
    }
}

/// Download `url` to `target` through a `.part` file
fn download(agent: &ureq::Agent, url: &str, target: &Path) -> Result<Lookup, String> {
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::StatusCode(404)) => return Ok(Lookup::Missing),
        Err(e) => return Err(e.to_string()),
    };

    let part = part_path(target);
    let result = (|| -> io::Result<()> {
        let mut reader = response.into_body().into_reader();
        let mut file = fs::File::create(&part)?;
        io::copy(&mut reader, &mut file)?;
        file.sync_all()?;
        fs::rename(&part, target)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&part);
        return Err(e.to_string());
    }
    Ok(Lookup::Found)
}

/// Copy from a `file://` URL or plain path
fn copy_local(location: &str, target: &Path) -> Result<Lookup, String> {
    let source = Path::new(location.strip_prefix("file://").unwrap_or(location));
    if !source.is_file() {
        return Ok(Lookup::Missing);
    }

    let part = part_path(target);
    let result = fs::copy(source, &part).and_then(|_| fs::rename(&part, target));
    if let Err(e) = result {
        let _ = fs::remove_file(&part);
        return Err(e.to_string());
    }
    Ok(Lookup::Found)
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}
