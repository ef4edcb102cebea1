use anyhow::{Context, Result};
use log::info;
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tvtables::{aggregate, ClassificationCache, Options as AggregateOptions, ProcessOracle};

/// Merge the baseline and transformed validation logs of one test corpus into a single table.
#[derive(StructOpt)]
struct Options {
    /// Directory containing the baseline and transformed log directories
    #[structopt(parse(from_os_str))]
    root_dir: PathBuf,
    /// Where to write the compressed table
    #[structopt(parse(from_os_str), default_value = "table.tar.gz")]
    output: PathBuf,
    /// Classifier invoked once per log directory
    #[structopt(long, env = "TV_CLASSIFIER", default_value = "classify.pl", parse(from_os_str))]
    classifier: PathBuf,
    #[structopt(long, default_value = "logs")]
    baseline_dir: String,
    #[structopt(long, default_value = "logs-aslp")]
    transformed_dir: String,
    /// Number of rows built at once
    #[structopt(short, long, default_value = "4")]
    jobs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load from .env file if it is present
    dotenv::dotenv().ok();
    // Initialize logging
    env_logger::init();
    // Get command line arguments
    let options = Options::from_args();
    let aggregate_options = AggregateOptions {
        baseline_dir: options.root_dir.join(&options.baseline_dir),
        transformed_dir: options.root_dir.join(&options.transformed_dir),
        jobs: options.jobs,
    };
    info!(
        "aggregating {} and {}",
        aggregate_options.baseline_dir.display(),
        aggregate_options.transformed_dir.display()
    );

    let cache = ClassificationCache::new(Arc::new(ProcessOracle::new(options.classifier)));
    let table = aggregate(&aggregate_options, &cache)
        .await
        .with_context(|| format!("failed to aggregate logs under {}", options.root_dir.display()))?;
    table
        .write_archive(&options.output)
        .with_context(|| format!("failed to write {}", options.output.display()))?;

    println!("{}", options.output.display());
    Ok(())
}
