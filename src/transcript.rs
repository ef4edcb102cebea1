use crate::{Error, Result};
use std::{fs, path::Path};

/// Separator between transcript sections: a newline followed by a run of hyphens.
pub const SECTION_SEPARATOR: &str = "\n------------";

/// One expected section of a transcript, in order.
struct SectionRule {
    role: &'static str,
    marker: Option<&'static str>,
}

const SECTIONS: [SectionRule; 4] = [
    SectionRule { role: "header", marker: None },
    SectionRule { role: "assembly", marker: Some("AArch64 Assembly") },
    SectionRule { role: "debug", marker: None },
    SectionRule { role: "output", marker: None },
];

const ASSEMBLY: usize = 1;
const OUTPUT: usize = 3;

/// The parts of a validation transcript that end up in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSections {
    /// Assembly listing with its header line removed.
    pub assembly: String,
    /// Final output block with leading hyphens stripped.
    pub output: String,
}

impl TranscriptSections {
    /// Read and parse the log at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        Self::parse(path, &text)
    }

    /// Parse a transcript. `path` is only used to name the log in errors.
    ///
    /// Anything past the fourth section is ignored.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let sections: Vec<&str> = text.split(SECTION_SEPARATOR).collect();
        if sections.len() < SECTIONS.len() {
            return Err(Error::MissingSections {
                path: path.to_owned(),
                expected: SECTIONS.len(),
                found: sections.len(),
            });
        }
        for (rule, section) in SECTIONS.iter().zip(&sections) {
            if let Some(marker) = rule.marker {
                if !section.contains(marker) {
                    return Err(Error::MissingMarker { path: path.to_owned(), section: rule.role, marker });
                }
            }
        }

        let assembly = sections[ASSEMBLY].lines().skip(1).collect::<Vec<_>>().join("\n");
        let output = sections[OUTPUT].trim_start_matches('-').to_owned();
        Ok(Self { assembly, output })
    }
}
