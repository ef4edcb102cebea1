use crate::{Error, Result};
use log::{debug, info, warn};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
};
use tokio::sync::{Mutex, OnceCell};

/// Something that can classify every log in a directory in one go.
///
/// The output is the oracle's raw report: one `<path>|<classification>|...` record per line.
pub trait Oracle: Send + Sync {
    fn classify_dir(&self, dir: &Path) -> Result<String>;
}

/// Runs an external classifier program as `<program> <dir>` and captures its stdout.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: PathBuf,
}

impl ProcessOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Oracle for ProcessOracle {
    fn classify_dir(&self, dir: &Path) -> Result<String> {
        debug!("running {} {}", self.program.display(), dir.display());
        let output = Command::new(&self.program)
            .arg(dir)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| Error::OracleUnavailable { program: self.program.clone(), source })?;
        if !output.status.success() {
            // Whatever it managed to print is still usable
            warn!("{} {} exited with {}", self.program.display(), dir.display(), output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Outcome tag and full detail text for one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Short bracketed tag, e.g. `[c]`, `[u]`, `[i]` or `[f]`.
    pub outcome: String,
    /// The classification text as the oracle reported it, starting with the tag.
    pub detail: String,
}

impl ClassificationResult {
    /// Split an oracle classification into its tag and detail. The tag is everything up to the
    /// first space and must start with `[`.
    pub fn from_classification(path: &Path, classification: &str) -> Result<Self> {
        if !classification.starts_with('[') {
            return Err(Error::BadOutcome { path: path.to_owned(), classification: classification.to_owned() });
        }
        let outcome = classification.split(' ').next().unwrap_or(classification);
        Ok(Self { outcome: outcome.to_owned(), detail: classification.to_owned() })
    }
}

/// Every log the oracle classified in one directory.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    entries: HashMap<PathBuf, String>,
}

impl Classification {
    /// Parse an oracle report. Lines that do not split into a path and a classification are dropped.
    pub fn parse(report: &str) -> Self {
        let mut entries = HashMap::new();
        for line in report.trim().lines() {
            let mut fields = line.split('|');
            match (fields.next(), fields.next()) {
                (Some(path), Some(classification)) => {
                    entries.insert(PathBuf::from(path), classification.to_owned());
                }
                _ => debug!("dropping malformed classifier line {:?}", line),
            }
        }
        Self { entries }
    }

    /// Look up the classification of one log.
    pub fn get(&self, log: &Path) -> Result<ClassificationResult> {
        let classification = self.entries.get(log).ok_or_else(|| Error::Unclassified(log.to_owned()))?;
        ClassificationResult::from_classification(log, classification)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Memoizes oracle runs per directory. Cheaply shareable behind an `Arc`; concurrent requests for
/// the same directory wait on a single oracle run.
pub struct ClassificationCache {
    oracle: Arc<dyn Oracle>,
    cells: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<Classification>>>>>,
}

impl ClassificationCache {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle, cells: Mutex::new(HashMap::new()) }
    }

    /// Classify every log in `dir`, invoking the oracle only if this directory hasn't been seen.
    pub async fn classify(&self, dir: &Path) -> Result<Arc<Classification>> {
        let cell = Arc::clone(self.cells.lock().await.entry(dir.to_owned()).or_default());
        let classification = cell
            .get_or_try_init(|| {
                let oracle = Arc::clone(&self.oracle);
                let dir = dir.to_owned();
                async move {
                    info!("classifying logs in {}", dir.display());
                    let report = {
                        let dir = dir.clone();
                        tokio::task::spawn_blocking(move || oracle.classify_dir(&dir)).await??
                    };
                    let classification = Classification::parse(&report);
                    info!("{}: {} logs classified", dir.display(), classification.len());
                    Ok::<_, Error>(Arc::new(classification))
                }
            })
            .await?;
        Ok(Arc::clone(classification))
    }
}
