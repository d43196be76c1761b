use crate::error::{FetchError, Result};
use crate::models::ResultTable;
use crate::utils::constants::DATE_COLUMN;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Persists a [`ResultTable`] as `date,<station ids…>` CSV.
///
/// The file is written to a temporary sibling and renamed into place; a partial table
/// never appears at the target path.
pub struct TableWriter;

impl TableWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_table(&self, table: &ResultTable, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        self.write_to(table, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.persist(path).map_err(|e| FetchError::Io(e.error))?;

        info!(
            "Wrote {} rows x {} stations to {}",
            table.n_rows(),
            table.n_cols(),
            path.display()
        );
        Ok(())
    }

    pub fn write_to<W: Write>(&self, table: &ResultTable, sink: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);

        let mut header = Vec::with_capacity(table.n_cols() + 1);
        header.push(DATE_COLUMN);
        header.extend(table.stations().iter().map(String::as_str));
        writer.write_record(&header)?;

        let mut record = Vec::with_capacity(table.n_cols() + 1);
        for (date, cells) in table.rows() {
            record.clear();
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(
                cells
                    .iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}
