use crate::{row::AggregatedRow, Error, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use log::info;
use std::{
    collections::BTreeSet,
    ffi::OsString,
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

/// Name of the single entry inside the output archive.
pub const TABLE_ENTRY: &str = "table.csv";

pub const ID_COLUMN: &str = "id";

/// Result columns, in the order they follow the encoding columns.
pub const RESULT_COLUMNS: [&str; 7] =
    ["old_outcome", "old_detail", "aslp_outcome", "aslp_detail", "cmdline", "old_output", "aslp_output"];

/// All rows of a run plus the column layout they are written with.
#[derive(Debug, Clone)]
pub struct AggregatedTable {
    columns: Vec<String>,
    rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    /// Fix the column set once every row is known. Rows are sorted by id so the output does not
    /// depend on the order they were built in.
    pub fn from_rows(mut rows: Vec<AggregatedRow>) -> Self {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        let encodings: BTreeSet<&str> = rows.iter().flat_map(|row| row.encoding_counts.keys()).collect();

        let mut columns = Vec::with_capacity(1 + encodings.len() + RESULT_COLUMNS.len());
        columns.push(ID_COLUMN.to_owned());
        columns.extend(encodings.into_iter().map(str::to_owned));
        columns.extend(RESULT_COLUMNS.iter().map(|&c| c.to_owned()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    /// The encoding columns, i.e. everything between the id and the result columns.
    pub fn encoding_columns(&self) -> &[String] {
        &self.columns[1..self.columns.len() - RESULT_COLUMNS.len()]
    }

    /// Render the table as CSV with a header row. Encodings a row never hit are written as `0`.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut data);
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                let mut record = Vec::with_capacity(self.columns.len());
                record.push(row.id.clone());
                record.extend(self.encoding_columns().iter().map(|key| row.encoding_counts.get(key).to_string()));
                record.extend([
                    row.baseline.outcome.clone(),
                    row.baseline.detail.clone(),
                    row.transformed.outcome.clone(),
                    row.transformed.detail.clone(),
                    row.command_line.clone(),
                    row.baseline_output.clone(),
                    row.transformed_output.clone(),
                ]);
                writer.write_record(&record)?;
            }
            writer.flush().map_err(csv::Error::from)?;
        }
        Ok(data)
    }

    /// Write the table as the only entry of a gzip-compressed tar archive at `path`.
    ///
    /// The archive is assembled next to `path` and renamed into place once complete, so a failed
    /// write never leaves a partial table behind.
    pub fn write_archive(&self, path: &Path) -> Result<()> {
        let data = self.to_csv()?;
        let partial = partial_path(path);
        if let Err(error) = write_archive_to(&partial, &data) {
            fs::remove_file(&partial).ok();
            return Err(error);
        }
        fs::rename(&partial, path).map_err(Error::io(path))?;
        info!(
            "wrote {} rows, {} columns ({} bytes of csv) to {}",
            self.rows.len(),
            self.columns.len(),
            data.len(),
            path.display()
        );
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("table"));
    name.push(".partial");
    path.with_file_name(name)
}

fn write_archive_to(path: &Path, data: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(Error::io(path))?;
    let mut archive = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    archive.append_data(&mut header, TABLE_ENTRY, data).map_err(Error::io(path))?;
    let file = archive.into_inner().and_then(GzEncoder::finish).map_err(Error::io(path))?;
    file.sync_all().map_err(Error::io(path))
}

/// Read the table back out of an archive written by [`AggregatedTable::write_archive`].
/// Returns the header and the data records.
pub fn read_table(path: &Path) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
    let file = File::open(path).map_err(Error::io(path))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive.entries().map_err(Error::io(path))? {
        let mut entry = entry.map_err(Error::io(path))?;
        if entry.path().map_err(Error::io(path))?.as_ref() != Path::new(TABLE_ENTRY) {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(Error::io(path))?;
        let mut reader = csv::Reader::from_reader(data.as_slice());
        let header = reader.headers()?.clone();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        return Ok((header, records));
    }
    Err(Error::Io {
        path: path.to_owned(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, format!("archive has no {} entry", TABLE_ENTRY)),
    })
}
