//! CSV reader for the training table.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::Dataset;

/// Reads a headed CSV table into a [`Dataset`] of raw string cells.
///
/// Cells are not interpreted here; numeric parsing happens when features
/// and labels are extracted, so identifier columns may hold anything.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist |
/// | [`IoError::OpenFile`] | Path exists but can't be opened (permissions, not a directory, ...) |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::FileNotFound {
                    path: self.path.clone(),
                    source: e,
                }
            } else {
                IoError::OpenFile {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        // flexible(true) so ragged rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let column_names: Vec<String> = header.iter().map(String::from).collect();
        let expected = column_names.len();
        debug!(expected, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(String::from).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_rows = rows.len(),
            n_columns = column_names.len(),
            "dataset loaded"
        );

        Ok(Dataset::new(self.path.clone(), column_names, rows))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_table() {
        let f = write_csv("fid,elevation,slope,Class\n1,12.5,3.0,1\n2,80.0,0.5,0\n");
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.column_names(), &["fid", "elevation", "slope", "Class"]);
    }

    #[test]
    fn missing_file_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = DatasetReader::new(&dir.path().join("absent.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn path_below_a_regular_file_is_not_missing() {
        let f = write_csv("elevation,Class\n1.0,0\n");
        let err = DatasetReader::new(&f.path().join("inner.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::OpenFile { .. }), "{err:?}");
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("elevation,Class\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn ragged_row_error() {
        let f = write_csv("elevation,slope,Class\n1.0,2.0,0\n1.0,1\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            }
        ));
    }
}
