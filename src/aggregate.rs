use crate::{
    classify::{Classification, ClassificationCache},
    row::AggregatedRow,
    table::AggregatedTable,
    Error, Result,
};
use log::{debug, info};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{mpsc, Mutex};

pub const BASELINE_DIR: &str = "logs";
pub const TRANSFORMED_DIR: &str = "logs-aslp";
pub const DEFAULT_JOBS: usize = 4;

/// Where the two runs live and how many rows to build at once.
#[derive(Debug, Clone)]
pub struct Options {
    pub baseline_dir: PathBuf,
    pub transformed_dir: PathBuf,
    pub jobs: usize,
}

impl Options {
    /// The usual layout: `logs` and `logs-aslp` side by side under `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            baseline_dir: root.join(BASELINE_DIR),
            transformed_dir: root.join(TRANSFORMED_DIR),
            jobs: DEFAULT_JOBS,
        }
    }
}

/// A baseline log and the transformed log for the same test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPair {
    pub id: String,
    pub baseline: PathBuf,
    pub transformed: PathBuf,
}

/// Pair every `*.log` in the baseline directory with the same-named file in the transformed
/// directory. Fails on the first baseline log that has no counterpart.
pub fn discover_pairs(baseline_dir: &Path, transformed_dir: &Path) -> Result<Vec<LogPair>> {
    for dir in [baseline_dir, transformed_dir] {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_owned()));
        }
    }
    let mut pairs = Vec::new();
    for entry in fs::read_dir(baseline_dir).map_err(Error::io(baseline_dir))? {
        let baseline = entry.map_err(Error::io(baseline_dir))?.path();
        if !baseline.is_file() || baseline.extension().map_or(true, |ext| ext != "log") {
            continue;
        }
        let (name, id) = match (baseline.file_name(), baseline.file_stem()) {
            (Some(name), Some(stem)) => (name.to_owned(), stem.to_string_lossy().into_owned()),
            _ => continue,
        };
        let transformed = transformed_dir.join(name);
        if !transformed.is_file() {
            return Err(Error::MissingCounterpart { path: baseline, counterpart: transformed });
        }
        pairs.push(LogPair { id, baseline, transformed });
    }
    pairs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(pairs)
}

/// Build the whole table.
///
/// Both directories are classified first, concurrently; no row is built until both are done.
/// Rows are then built by `options.jobs` workers and collected as they finish. The first failure
/// aborts the run.
pub async fn aggregate(options: &Options, cache: &ClassificationCache) -> Result<AggregatedTable> {
    let pairs = discover_pairs(&options.baseline_dir, &options.transformed_dir)?;
    info!("{} log pairs found", pairs.len());

    let (baseline, transformed) =
        tokio::try_join!(cache.classify(&options.baseline_dir), cache.classify(&options.transformed_dir))?;

    let rows = build_rows(pairs, baseline, transformed, options.jobs).await?;
    Ok(AggregatedTable::from_rows(rows))
}

async fn build_rows(
    pairs: Vec<LogPair>,
    baseline: Arc<Classification>,
    transformed: Arc<Classification>,
    jobs: usize,
) -> Result<Vec<AggregatedRow>> {
    let total = pairs.len();
    let queue = Arc::new(Mutex::new(pairs.into_iter()));
    let (sender, mut receiver) = mpsc::unbounded_channel();

    for worker in 0..jobs.max(1) {
        let queue = Arc::clone(&queue);
        let sender = sender.clone();
        let baseline = Arc::clone(&baseline);
        let transformed = Arc::clone(&transformed);
        tokio::spawn(async move {
            loop {
                let next = queue.lock().await.next();
                let pair = match next {
                    Some(pair) => pair,
                    None => break,
                };
                debug!("worker {}: {}", worker, pair.id);
                let baseline = Arc::clone(&baseline);
                let transformed = Arc::clone(&transformed);
                let result = tokio::task::spawn_blocking(move || {
                    AggregatedRow::build(&pair.id, &pair.baseline, &pair.transformed, &baseline, &transformed)
                })
                .await
                .map_err(Error::from)
                .and_then(|row| row);
                let failed = result.is_err();
                // A closed channel means the run was already aborted
                if sender.send(result).is_err() || failed {
                    break;
                }
            }
        });
    }
    drop(sender);

    let report_every = (total / 256).max(1);
    let mut rows = Vec::with_capacity(total);
    while let Some(result) = receiver.recv().await {
        rows.push(result?);
        if rows.len() % report_every == 0 || rows.len() == total {
            info!("{}/{} rows ({:.2}%)", rows.len(), total, 100.0 * rows.len() as f64 / total as f64);
        }
    }
    Ok(rows)
}
