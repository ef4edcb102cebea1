use crate::{
    classify::{Classification, ClassificationResult},
    encoding::{EncodingHistogram, EncodingSummary},
    transcript::TranscriptSections,
    Result,
};
use log::debug;
use std::path::Path;

/// Everything the table records about one test, merged from its baseline and transformed logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub id: String,
    pub baseline: ClassificationResult,
    pub transformed: ClassificationResult,
    pub command_line: String,
    pub assembly: String,
    pub baseline_output: String,
    pub transformed_output: String,
    pub encoding_counts: EncodingHistogram,
}

impl AggregatedRow {
    /// Build the row for one test. Both directories must already be classified; this only looks
    /// the logs up and reads the files.
    pub fn build(
        id: &str,
        baseline_log: &Path,
        transformed_log: &Path,
        baseline_classification: &Classification,
        transformed_classification: &Classification,
    ) -> Result<Self> {
        debug!("building row {}", id);
        let baseline = baseline_classification.get(baseline_log)?;
        let transformed = transformed_classification.get(transformed_log)?;

        let summary = EncodingSummary::from_file(transformed_log)?;
        let baseline_sections = TranscriptSections::from_file(baseline_log)?;
        let transformed_sections = TranscriptSections::from_file(transformed_log)?;

        Ok(Self {
            id: id.to_owned(),
            baseline,
            transformed,
            command_line: summary.command_line,
            assembly: baseline_sections.assembly,
            baseline_output: baseline_sections.output,
            transformed_output: transformed_sections.output,
            encoding_counts: summary.histogram,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Error;
    use std::{fs, path::PathBuf};

    pub(crate) fn baseline_log_text(output: &str) -> String {
        format!(
            "backend-tv t1.bc\n\n------------ AArch64 Assembly: ------------\n\n\tmov w0, #1\n\tret\n\
             -------------\n\nabout to optimize lifted code:\n\n-----------------\n{}",
            output
        )
    }

    pub(crate) fn transformed_log_text(command_line: &str, counts: &str, output: &str) -> String {
        format!(
            "{}\n\n------------ AArch64 Assembly: ------------\n\n\tmov w0, #1\n\tret\n\
             -------------\n\n2 assembly instructions\nencoding counts: {}\n\n-----------------\n{}",
            command_line, counts, output
        )
    }

    fn write_pair(dir: &Path, baseline: &str, transformed: &str) -> (PathBuf, PathBuf) {
        fs::create_dir_all(dir.join("logs")).unwrap();
        fs::create_dir_all(dir.join("logs-aslp")).unwrap();
        let baseline_log = dir.join("logs").join("t1.log");
        let transformed_log = dir.join("logs-aslp").join("t1.log");
        fs::write(&baseline_log, baseline).unwrap();
        fs::write(&transformed_log, transformed).unwrap();
        (baseline_log, transformed_log)
    }

    #[test]
    fn test_build_row() {
        let dir = tempfile::tempdir().unwrap();
        let (baseline_log, transformed_log) = write_pair(
            dir.path(),
            &baseline_log_text("output A"),
            &transformed_log_text("cmd --flag", "classic_ABx=2,classic_ABy=1,", "output B"),
        );
        let baseline = Classification::parse(&format!("{}|[c] ok", baseline_log.display()));
        let transformed =
            Classification::parse(&format!("{}|[f] ERROR: Mismatch in memory", transformed_log.display()));

        let row = AggregatedRow::build("t1", &baseline_log, &transformed_log, &baseline, &transformed).unwrap();
        assert_eq!(row.id, "t1");
        assert_eq!(row.baseline.outcome, "[c]");
        assert_eq!(row.transformed.outcome, "[f]");
        assert_eq!(row.transformed.detail, "[f] ERROR: Mismatch in memory");
        assert_eq!(row.command_line, "cmd --flag");
        assert_eq!(row.assembly, "\n\tmov w0, #1\n\tret");
        assert_eq!(row.baseline_output, "\noutput A");
        assert_eq!(row.transformed_output, "\noutput B");
        assert_eq!(row.encoding_counts.get("classic_AB"), 3);
        assert_eq!(row.encoding_counts.len(), 1);
    }

    #[test]
    fn test_build_row_requires_classification() {
        let dir = tempfile::tempdir().unwrap();
        let (baseline_log, transformed_log) = write_pair(
            dir.path(),
            &baseline_log_text("output A"),
            &transformed_log_text("cmd", "", "output B"),
        );
        let baseline = Classification::parse(&format!("{}|[c] ok", baseline_log.display()));
        let transformed = Classification::default();

        let error = AggregatedRow::build("t1", &baseline_log, &transformed_log, &baseline, &transformed).unwrap_err();
        assert!(matches!(error, Error::Unclassified(ref path) if path == &transformed_log));
    }

    #[test]
    fn test_build_row_malformed_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let (baseline_log, transformed_log) =
            write_pair(dir.path(), "crashed before printing anything\n", &transformed_log_text("cmd", "", "out"));
        let baseline = Classification::parse(&format!("{}|[f] crash", baseline_log.display()));
        let transformed = Classification::parse(&format!("{}|[c] ok", transformed_log.display()));

        let error = AggregatedRow::build("t1", &baseline_log, &transformed_log, &baseline, &transformed).unwrap_err();
        assert!(matches!(error, Error::MissingSections { ref path, .. } if path == &baseline_log));
    }
}
