//! In-memory company table backed by a CSV file.
//!
//! The whole table is loaded up front and rewritten in full on every save;
//! cells are kept as raw strings so columns the enrichment loop does not know
//! about survive a load/save cycle untouched. Excel and OpenDocument workbooks
//! can be read as input (first sheet only); saves always write CSV.
use crate::record::{Record, UrlField, DESCRIPTION_COLUMN, NAME_COLUMN};
use calamine::Reader;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions loaded through the workbook reader instead of the CSV parser.
pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Raw header row and data rows, before padding.
type Cells = (Vec<String>, Vec<Vec<String>>);

/// Failures loading or persisting the table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The input file does not exist. Fatal before any processing.
    #[error("input dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The header row lacks a column every company table must have.
    #[error("{} has no {column:?} column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("read workbook {}: {source}", .path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// True when `path` names a spreadsheet workbook rather than a CSV file.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Tabular dataset addressed by row position and column header.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordStore {
    /// Load a company table with a header row and a `Company Name` column.
    ///
    /// Short rows are padded with empty cells; rows wider than the header get
    /// placeholder `Unnamed: N` columns so no data is dropped.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let (headers, rows) = if is_workbook(path) {
            read_workbook(path)?
        } else {
            read_csv(path)?
        };
        let store = Self::from_cells(headers, rows);
        if store.column_index(NAME_COLUMN).is_none() {
            return Err(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: NAME_COLUMN,
            });
        }

        tracing::debug!(
            path = %path.display(),
            rows = store.rows.len(),
            columns = store.headers.len(),
            "table loaded"
        );
        Ok(store)
    }

    fn from_cells(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let mut headers: Vec<String> = headers
            .into_iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        while headers.len() < widest {
            headers.push(format!("Unnamed: {}", headers.len()));
        }
        for row in &mut rows {
            row.resize(headers.len(), String::new());
        }
        Self { headers, rows }
    }

    /// Build a store from in-memory cells.
    #[cfg(test)]
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell value, or `None` when the column is missing or the cell is empty.
    pub fn get_field(&self, row: usize, name: &str) -> Option<&str> {
        let column = self.column_index(name)?;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Overwrite a cell, creating the column when it does not exist yet.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range; the table never grows or shrinks.
    pub fn set_field(&mut self, row: usize, name: &str, value: &str) {
        let column = match self.column_index(name) {
            Some(column) => column,
            None => self.push_column(name),
        };
        self.rows[row][column] = value.to_string();
    }

    /// Add any missing columns with empty cells, leaving existing ones as-is.
    pub fn ensure_columns(&mut self, names: &[&str]) {
        for name in names {
            if self.column_index(name).is_none() {
                self.push_column(name);
            }
        }
    }

    fn push_column(&mut self, name: &str) -> usize {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Typed view of the well-known columns for one row.
    pub fn record(&self, row: usize) -> Record {
        let owned = |name: &str| self.get_field(row, name).map(str::to_string);
        Record {
            name: owned(NAME_COLUMN),
            description: self
                .get_field(row, DESCRIPTION_COLUMN)
                .map(str::trim)
                .filter(|desc| !desc.eq_ignore_ascii_case("nan"))
                .unwrap_or_default()
                .to_string(),
            website: owned(UrlField::Website.column()),
            linkedin: owned(UrlField::Linkedin.column()),
            careers_page: owned(UrlField::CareersPage.column()),
            job_listings: owned(UrlField::JobListings.column()),
        }
    }

    /// Rewrite the whole table at `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let write_err = |source: csv::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| write_err(csv::Error::from(err)))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(write_err)?;
        writer.write_record(&self.headers).map_err(write_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|err| write_err(csv::Error::from(err)))?;
        Ok(())
    }
}

fn read_csv(path: &Path) -> Result<Cells, StoreError> {
    let read_err = |source: csv::Error| StoreError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Err(err) => return Err(read_err(csv::Error::from(err))),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(file);
    let headers = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(read_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// First worksheet, with its first row as the header.
fn read_workbook(path: &Path) -> Result<Cells, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let workbook_err = |source: calamine::Error| StoreError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = calamine::open_workbook_auto(path).map_err(workbook_err)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(workbook_err)?,
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    Ok((headers, rows.collect()))
}
