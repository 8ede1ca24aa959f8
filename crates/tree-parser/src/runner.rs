//! MavenRunner: invoke the depgraph plugin and share in-flight runs.

use std::ffi::OsString;
use std::future::Future;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info};

use crate::error::TreeError;
use crate::parser::{parse_dependency_tree, DependencyTreeOutput};

pub const DEFAULT_DEPGRAPH_VERSION: &str = "4.0.3";
const OUTPUT_FILE_NAME: &str = "dependency-graph.txt";
/// Lines of maven output kept in [`TreeError::ExitStatus`].
const OUTPUT_TAIL_LINES: usize = 20;

#[cfg(windows)]
const WRAPPER_NAMES: &[&str] = &["mvnw.cmd", "mvnw.bat"];
#[cfg(not(windows))]
const WRAPPER_NAMES: &[&str] = &["mvnw"];

/// How maven is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub executable: String,
    /// Use the maven wrapper next to the pom when there is one.
    pub prefer_wrapper: bool,
    pub extra_args: Vec<String>,
    pub depgraph_version: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executable: "mvn".to_string(),
            prefer_wrapper: true,
            extra_args: Vec::new(),
            depgraph_version: DEFAULT_DEPGRAPH_VERSION.to_string(),
        }
    }
}

impl RunnerConfig {
    /// The program to run for `pom`.
    pub fn program_for(&self, pom: &Path) -> PathBuf {
        if self.prefer_wrapper {
            if let Some(dir) = pom.parent() {
                for name in WRAPPER_NAMES {
                    let wrapper = dir.join(name);
                    if wrapper.is_file() {
                        return wrapper;
                    }
                }
            }
        }
        PathBuf::from(&self.executable)
    }

    /// Arguments writing the text graph of `pom` to `output_dir/file_name`.
    pub fn args_for(&self, pom: &Path, output_dir: &Path, file_name: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!(
                "com.github.ferstl:depgraph-maven-plugin:{}:graph",
                self.depgraph_version
            )
            .into(),
            "-DgraphFormat=text".into(),
            "-DshowGroupIds=true".into(),
            "-DshowVersions=true".into(),
            "-DshowDuplicates=true".into(),
            "-DshowConflicts=true".into(),
        ];
        let mut output_dir_arg = OsString::from("-DoutputDirectory=");
        output_dir_arg.push(output_dir);
        args.push(output_dir_arg);
        args.push(format!("-DoutputFileName={file_name}").into());
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push("-f".into());
        args.push(pom.as_os_str().to_owned());
        args
    }
}

/// Run maven once for `pom` and return the raw tree text.
pub async fn run_depgraph(config: &RunnerConfig, pom: &Path) -> Result<String, TreeError> {
    let output_dir = tempfile::tempdir()?;
    let program = config.program_for(pom);
    let args = config.args_for(pom, output_dir.path(), OUTPUT_FILE_NAME);
    info!("running {} for {}", program.display(), pom.display());

    let mut command = tokio::process::Command::new(&program);
    command.args(&args).kill_on_drop(false);
    if let Some(dir) = pom.parent().filter(|d| !d.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    let output = command
        .output()
        .await
        .map_err(|e| TreeError::SpawnFailed(format!("{}: {e}", program.display())))?;

    if !output.status.success() {
        // maven reports build errors on stdout
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(TreeError::ExitStatus {
            code: output.status.code(),
            output: tail(&combined, OUTPUT_TAIL_LINES),
        });
    }

    let output_file = output_dir.path().join(OUTPUT_FILE_NAME);
    match tokio::fs::read_to_string(&output_file).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TreeError::MissingOutput(output_file))
        }
        Err(e) => Err(e.into()),
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

type SharedRun<V> = Shared<BoxFuture<'static, V>>;

/// Deduplicates concurrent runs for the same key.
///
/// The first caller starts the run, later callers await the same future and
/// get a clone of its result. The entry is dropped once the run completes.
pub struct SingleFlight<K, V> {
    inflight: Arc<DashMap<K, SharedRun<V>>>,
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            inflight: self.inflight.clone(),
        }
    }
}

impl<K: Eq + Hash, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub async fn run<F, Fut>(&self, key: K, start: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let run = match self.inflight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let run = start().boxed().shared();
                entry.insert(run.clone());
                run
            }
        };
        let value = run.clone().await;
        self.inflight.remove_if(&key, |_, current| current.ptr_eq(&run));
        value
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.inflight.contains_key(key)
    }
}

/// Resolves dependency trees, one maven invocation per pom at a time.
#[derive(Clone, Default)]
pub struct MavenRunner {
    config: Arc<RunnerConfig>,
    flights: SingleFlight<PathBuf, Result<String, TreeError>>,
}

impl MavenRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
            flights: SingleFlight::default(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// A runner with another config sharing the in-flight runs of this one.
    pub fn with_config(&self, config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
            flights: self.flights.clone(),
        }
    }

    /// Raw tree text for `pom`. Joins the running invocation for the same
    /// pom if there is one.
    pub async fn dependency_tree(&self, pom: &Path) -> Result<String, TreeError> {
        let config = self.config.clone();
        let owned = pom.to_path_buf();
        if self.flights.is_running(&owned) {
            debug!("joining running dependency tree for {}", pom.display());
        }
        self.flights
            .run(owned.clone(), move || async move {
                run_depgraph(&config, &owned).await
            })
            .await
    }

    /// Run maven and parse its output.
    pub async fn resolve(&self, pom: &Path) -> Result<DependencyTreeOutput, TreeError> {
        let raw = self.dependency_tree(pom).await?;
        Ok(parse_dependency_tree(&raw, pom))
    }
}
