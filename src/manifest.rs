//! CSV manifest loading.
//!
//! A manifest is a CSV file with a header row containing at least the
//! columns `path`, `start_time`, and `end_time`. Other columns are ignored.
//! Each data row becomes one [`ExtractionJob`]; its output file is named
//! after the zero-based row index, zero-padded to three digits
//! (`000.avi`, `001.avi`, …).
//!
//! ```text
//! path,start_time,end_time
//! videos/a.mp4,00:05,00:20
//! videos/b.mp4,,01:00
//! ```
//!
//! Time cells are passed through untouched; empty cells become `None`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{error::TrimError, extract::ExtractionJob};

const REQUIRED_COLUMNS: [&str; 3] = ["path", "start_time", "end_time"];

/// One data row of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestRow {
    /// Source video.
    pub path: PathBuf,
    /// Clip start, expected as `mm:ss`.
    pub start_time: Option<String>,
    /// Clip end, expected as `mm:ss`.
    pub end_time: Option<String>,
}

/// A parsed manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    origin: PathBuf,
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Read a manifest from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::Manifest`] if the file cannot be opened, lacks a
    /// required column, or contains a row that cannot be read.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TrimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| TrimError::Manifest {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Self::from_reader(file, path)
    }

    /// Read a manifest from any reader. `origin` is only used in errors.
    ///
    /// # Errors
    ///
    /// See [`from_path`](Manifest::from_path).
    pub fn from_reader<R: Read>(reader: R, origin: impl Into<PathBuf>) -> Result<Self, TrimError> {
        let origin = origin.into();
        let manifest_error = |reason: String| TrimError::Manifest {
            path: origin.clone(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|error| manifest_error(error.to_string()))?
            .clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            return Err(manifest_error(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let rows = reader
            .deserialize()
            .collect::<Result<Vec<ManifestRow>, _>>()
            .map_err(|error| manifest_error(error.to_string()))?;

        log::info!("number of videos: {}", rows.len());

        Ok(Self { origin, rows })
    }

    /// Where this manifest was read from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// The data rows, in file order.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the manifest has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Turn every row into a job writing to `output_directory`.
    pub fn jobs(&self, output_directory: &Path, extension: &str) -> Vec<ExtractionJob> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| ExtractionJob {
                source_path: row.path.clone(),
                destination_path: output_directory.join(output_file_name(index, extension)),
                start: row.start_time.clone(),
                end: row.end_time.clone(),
            })
            .collect()
    }
}

/// Name of the clip produced for row `index`, e.g. `007.avi`.
pub fn output_file_name(index: usize, extension: &str) -> String {
    format!("{index:03}.{}", extension.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_are_zero_padded() {
        assert_eq!(output_file_name(0, "avi"), "000.avi");
        assert_eq!(output_file_name(42, ".mp4"), "042.mp4");
        assert_eq!(output_file_name(1234, "avi"), "1234.avi");
    }
}
