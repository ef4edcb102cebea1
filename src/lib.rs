use std::{io, path::PathBuf};
use thiserror::Error;

pub mod aggregate;
pub mod classify;
pub mod encoding;
pub mod row;
pub mod table;
pub mod transcript;

pub use aggregate::{aggregate, LogPair, Options};
pub use classify::{Classification, ClassificationCache, ClassificationResult, Oracle, ProcessOracle};
pub use encoding::{canonical_encoding, EncodingHistogram, EncodingSummary};
pub use row::AggregatedRow;
pub use table::{read_table, AggregatedTable};
pub use transcript::TranscriptSections;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a run. Variants concerning a single log carry its path,
/// so the final diagnostic always names the offending file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: no matching transformed log at {}", .path.display(), .counterpart.display())]
    MissingCounterpart { path: PathBuf, counterpart: PathBuf },
    #[error("{}: not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("{}: expected at least {expected} sections, found {found}", .path.display())]
    MissingSections { path: PathBuf, expected: usize, found: usize },
    #[error("{}: {section} section does not mention {marker:?}", .path.display())]
    MissingMarker { path: PathBuf, section: &'static str, marker: &'static str },
    #[error("{}: no command line (log has no non-empty lines)", .0.display())]
    MissingCommandLine(PathBuf),
    #[error("{}: bad count in encoding term {term:?}", .path.display())]
    BadEncodingCount { path: PathBuf, term: String },
    #[error("{}: not classified by the oracle", .0.display())]
    Unclassified(PathBuf),
    #[error("{}: classification {classification:?} does not start with an outcome tag", .path.display())]
    BadOutcome { path: PathBuf, classification: String },
    #[error("failed to run classifier {}", .program.display())]
    OracleUnavailable {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
